//! Command-line interface.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use marquee_core::SyncOptions;
use marquee_domain::{MarqueeError, Result};
use tracing::info;

use crate::context::AppContext;
use crate::routes::router;

#[derive(Debug, Parser)]
#[command(name = "marquee", version, about = "Marquee event-catalog backend")]
pub struct Cli {
    /// Path to a config file (otherwise environment variables and the
    /// standard probe locations apply)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server with the periodic retention cleanup
    Serve,
    /// Run one sync against the events provider
    Sync {
        /// Sync records changed on this date (YYYY-MM-DD); defaults to
        /// yesterday
        #[arg(long, conflicts_with = "all")]
        date: Option<NaiveDate>,
        /// Fetch the full catalog instead of one changed-at date
        #[arg(long)]
        all: bool,
        /// Compute everything, write nothing
        #[arg(long)]
        dry_run: bool,
        /// Consider only the first N records
        #[arg(long)]
        limit: Option<usize>,
        /// Entities persisted per atomic chunk
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Purge events outside the retention window
    Cleanup {
        /// Report what would be purged without deleting
        #[arg(long)]
        dry_run: bool,
    },
}

/// Execute the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(path) => marquee_infra::config::load_from_file(Some(path))?,
        None => marquee_infra::config::load()?,
    };
    let ctx = Arc::new(AppContext::new(config)?);

    match cli.command {
        Command::Serve => serve(ctx).await,
        Command::Sync { date, all, dry_run, limit, batch_size } => {
            let options = SyncOptions {
                date,
                all,
                dry_run,
                limit,
                batch_size: batch_size.unwrap_or(ctx.config.sync.batch_size),
            };
            let report = ctx.sync_service.run(options).await?;
            info!(
                received = report.received,
                skipped = report.skipped,
                new_events = report.new_events,
                updated_events = report.updated_events,
                new_venues = report.new_venues,
                dry_run = report.dry_run,
                "sync finished"
            );
            println!(
                "sync finished: {} received, {} skipped, {} new, {} updated, {} venues{}",
                report.received,
                report.skipped,
                report.new_events,
                report.updated_events,
                report.new_venues,
                if report.dry_run { " (dry run)" } else { "" },
            );
            Ok(())
        }
        Command::Cleanup { dry_run } => {
            let service = ctx.cleanup_service();
            let stats = service.cleanup_once(dry_run).await?;
            println!(
                "{} expired event(s), {} deleted{}",
                stats.expired,
                stats.deleted,
                if stats.dry_run { " (dry run)" } else { "" },
            );
            Ok(())
        }
    }
}

async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    let mut cleanup = ctx.cleanup_service();
    cleanup.start().await?;

    let app = router(ctx.clone());
    let listener = tokio::net::TcpListener::bind(&ctx.config.server.bind_addr)
        .await
        .map_err(|e| MarqueeError::Config(format!("failed to bind {}: {e}", ctx.config.server.bind_addr)))?;

    info!(addr = %ctx.config.server.bind_addr, "listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| MarqueeError::Internal(format!("server error: {e}")))?;

    cleanup.stop().await?;
    Ok(())
}
