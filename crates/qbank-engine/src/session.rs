use anyhow::Result;

use qbank_core::traits::PageSource;
use qbank_core::{Error, Identifier, SavedSelection};
use qbank_source::PoolFetcher;

use crate::engine::{FetchTicket, Outcome, SelectionEngine};

/// Pairs an engine with a fetcher and runs each ticket to completion.
///
/// `None` means the event needed no fetch (unchanged filter, unresolved chain,
/// nothing more to load).
pub struct Session<S> {
    engine: SelectionEngine,
    fetcher: PoolFetcher<S>,
}

impl<S: PageSource> Session<S> {
    pub fn new(engine: SelectionEngine, fetcher: PoolFetcher<S>) -> Self { Self { engine, fetcher } }

    pub fn engine(&self) -> &SelectionEngine { &self.engine }

    pub fn engine_mut(&mut self) -> &mut SelectionEngine { &mut self.engine }

    pub fn fetcher(&self) -> &PoolFetcher<S> { &self.fetcher }

    pub async fn set_filter(&mut self, k: usize, value: Option<Identifier>) -> Result<Option<Outcome>> {
        let ticket = self.engine.set_filter(k, value)?;
        self.run(ticket).await
    }

    pub async fn seed(&mut self, saved: SavedSelection) -> Result<Option<Outcome>> {
        let ticket = self.engine.seed(saved)?;
        self.run(ticket).await
    }

    pub async fn load_more(&mut self) -> Result<Option<Outcome>> {
        let ticket = self.engine.load_more();
        self.run(ticket).await
    }

    pub async fn retry(&mut self) -> Result<Option<Outcome>> {
        let ticket = self.engine.retry();
        self.run(ticket).await
    }

    /// Keep loading until the pool is exhausted or `max_pages` pages are in.
    pub async fn load_pages(&mut self, max_pages: u32) -> Result<Option<Outcome>> {
        let mut last = None;
        while self.engine.pool().last_page() < max_pages && self.engine.has_more() {
            last = self.load_more().await?;
            if !matches!(last, Some(Outcome::Applied { .. })) {
                break;
            }
        }
        Ok(last)
    }

    async fn run(&mut self, ticket: Option<FetchTicket>) -> Result<Option<Outcome>> {
        let Some(ticket) = ticket else { return Ok(None) };
        let result = match self.fetcher.fetch(&ticket.chain, ticket.page, ticket.page_size).await {
            Ok(page) => Ok(page),
            Err(Error::Fetch(e)) => Err(e),
            Err(other) => return Err(other.into()),
        };
        Ok(Some(self.engine.apply(&ticket, result)))
    }
}
