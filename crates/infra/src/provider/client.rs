use async_trait::async_trait;
use chrono::NaiveDate;
use marquee_core::{EventFeed, FeedBatch};
use marquee_domain::Result;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::http::HttpClient;

/// Hard ceiling on pages followed in a single run, in case the upstream
/// returns a cursor cycle.
const MAX_PAGES: usize = 10_000;

/// One page of the provider feed. The upstream answers either with a
/// paginated envelope or, for small datasets, a bare array of records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderPage {
    Paged { results: Vec<serde_json::Value>, next: Option<String> },
    Bare(Vec<serde_json::Value>),
}

/// Client for the external events feed.
///
/// Wraps the retrying [`HttpClient`] and owns pagination: `fetch_all`
/// follows `next` cursors until the upstream stops supplying one,
/// `fetch_since` asks for a single day's changes. Terminal transport or
/// parse failures never abort a run; the accumulated records are handed
/// back with [`FeedBatch::complete`] set to `false`.
pub struct ProviderClient {
    http: HttpClient,
    base_url: String,
}

impl ProviderClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    async fn fetch_page(&self, url: &str) -> Result<Option<ProviderPage>> {
        let Some(response) = self.http.fetch(url).await? else {
            return Ok(None);
        };

        match response.json::<ProviderPage>().await {
            Ok(page) => Ok(Some(page)),
            Err(err) => {
                warn!(url, error = %err, "provider page failed to parse");
                Ok(None)
            }
        }
    }

    fn since_url(&self, changed_at: NaiveDate) -> Result<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| marquee_domain::MarqueeError::Config(format!("invalid provider URL: {err}")))?;
        url.query_pairs_mut()
            .append_pair("changed_at", &changed_at.format("%Y-%m-%d").to_string());
        Ok(url.into())
    }
}

#[async_trait]
impl EventFeed for ProviderClient {
    async fn fetch_since(&self, changed_at: NaiveDate) -> Result<FeedBatch> {
        let url = self.since_url(changed_at)?;
        debug!(%changed_at, url, "fetching changed records");

        match self.fetch_page(&url).await? {
            Some(ProviderPage::Paged { results, .. }) => {
                Ok(FeedBatch { records: results, pages: 1, complete: true })
            }
            Some(ProviderPage::Bare(records)) => {
                Ok(FeedBatch { records, pages: 1, complete: true })
            }
            None => Ok(FeedBatch { records: Vec::new(), pages: 0, complete: false }),
        }
    }

    async fn fetch_all(&self) -> Result<FeedBatch> {
        let mut batch = FeedBatch { records: Vec::new(), pages: 0, complete: true };
        let mut next_url = Some(self.base_url.clone());

        while let Some(url) = next_url.take() {
            if batch.pages >= MAX_PAGES {
                warn!(pages = batch.pages, "pagination ceiling reached, stopping");
                batch.complete = false;
                break;
            }

            debug!(page = batch.pages + 1, url, "fetching provider page");
            match self.fetch_page(&url).await? {
                Some(ProviderPage::Paged { results, next }) => {
                    batch.pages += 1;
                    batch.records.extend(results);
                    next_url = next;
                }
                Some(ProviderPage::Bare(records)) => {
                    batch.pages += 1;
                    batch.records.extend(records);
                    // A bare array carries no cursor; pagination ends here.
                }
                None => {
                    batch.complete = false;
                    break;
                }
            }
        }

        debug!(pages = batch.pages, records = batch.records.len(), complete = batch.complete, "feed fetch finished");
        Ok(batch)
    }
}
