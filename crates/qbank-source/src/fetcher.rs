//! Request/response boundary between the engine and a page source.
//!
//! Holds no state beyond its settings, so the same `(chain, page)` can be
//! fetched again after a failure.
use std::time::Duration;

use tracing::{debug, warn};

use qbank_core::traits::PageSource;
use qbank_core::{Error, FetchError, FilterChain, Page, PageRequest, Result};

pub struct PoolFetcher<S> {
    source: S,
    max_page_size: u32,
    timeout: Option<Duration>,
}

impl<S: PageSource> PoolFetcher<S> {
    pub fn new(source: S) -> Self { Self { source, max_page_size: 100, timeout: None } }

    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn source(&self) -> &S { &self.source }

    /// Build the wire request, checking the fetch preconditions.
    pub fn request(&self, chain: &FilterChain, page: u32, page_size: u32) -> Result<PageRequest> {
        if !chain.is_resolved() {
            return Err(Error::Unresolved);
        }
        if page < 1 {
            return Err(Error::InvalidPage(page));
        }
        Ok(PageRequest { filter_values: chain.values(), page, limit: page_size.clamp(1, self.max_page_size) })
    }

    pub async fn fetch(&self, chain: &FilterChain, page: u32, page_size: u32) -> Result<Page> {
        let request = self.request(chain, page, page_size)?;
        debug!(source = self.source.source_id(), %chain, page, limit = request.limit, "fetching page");
        let pending = self.source.fetch(&request);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pending).await.unwrap_or(Err(FetchError::Timeout)),
            None => pending.await,
        };
        let fetched = result.and_then(|p| p.check(request.page).map(|()| p));
        match fetched {
            Ok(p) => {
                debug!(page = p.page, total_pages = p.total_pages, items = p.items.len(), "page received");
                Ok(p)
            }
            Err(e) => {
                warn!(source = self.source.source_id(), reason = e.reason(), error = %e, "page fetch failed");
                Err(e.into())
            }
        }
    }
}
