//! HTTP routing and request handling.

pub mod auth;
pub mod events;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use marquee_domain::MarqueeError;
use serde_json::json;
use uuid::Uuid;

use crate::context::AppContext;

/// Build the application router.
///
/// The event catalog and sync audit endpoints require a bearer access
/// token; the credential endpoints and the health probe are open.
pub fn router(ctx: Arc<AppContext>) -> Router {
    let protected = Router::new()
        .route("/api/events", get(events::list))
        .route("/api/sync-results", get(events::sync_results))
        .layer(middleware::from_fn_with_state(ctx.clone(), require_auth));

    let open = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/health", get(health));

    protected.merge(open).with_state(ctx)
}

/// Error wrapper mapping domain errors onto HTTP status codes.
pub struct ApiError(MarqueeError);

impl From<MarqueeError> for ApiError {
    fn from(err: MarqueeError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MarqueeError::Auth(_) => StatusCode::UNAUTHORIZED,
            MarqueeError::NotFound(_) => StatusCode::NOT_FOUND,
            MarqueeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            MarqueeError::Database(_)
            | MarqueeError::Config(_)
            | MarqueeError::Network(_)
            | MarqueeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Bearer-token middleware for the protected routes.
///
/// The authenticated user id is stored in request extensions for
/// downstream handlers.
async fn require_auth(
    State(ctx): State<Arc<AppContext>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| MarqueeError::Auth("missing bearer token".into()))?;

    let user_id: Uuid = ctx.auth_service.authenticate(token).await?;
    request.extensions_mut().insert(user_id);

    Ok(next.run(request).await)
}

async fn health(State(ctx): State<Arc<AppContext>>) -> Result<Json<serde_json::Value>, ApiError> {
    ctx.db.health_check()?;
    Ok(Json(json!({ "status": "ok" })))
}
