//! qbank-source
//!
//! The fetch boundary: `PoolFetcher` turns a resolved filter chain into a page
//! request and validates what comes back; `memory` holds the fixture-backed
//! page source used by the CLI and tests.
use anyhow::{anyhow, Result};
use std::path::Path;

use qbank_core::config::SourceSettings;

pub mod fetcher;
pub mod memory;

pub use fetcher::PoolFetcher;
pub use memory::{BankFixture, FixtureQuestion, InMemorySource};

/// Build the page source named by `[source]`, relative paths resolved against `base`.
pub fn get_default_source(settings: &SourceSettings, base: &Path) -> Result<InMemorySource> {
    let path = settings
        .fixture_path(base)
        .ok_or_else(|| anyhow!(qbank_core::Error::InvalidConfig("source.fixture_path is not set".into())))?;
    InMemorySource::from_json_file(&path)
}

/// Default-configured fetcher over the default source.
pub fn get_default_fetcher(settings: &SourceSettings, max_page_size: u32, base: &Path) -> Result<PoolFetcher<InMemorySource>> {
    let source = get_default_source(settings, base)?;
    Ok(PoolFetcher::new(source).with_max_page_size(max_page_size).with_timeout(settings.timeout()))
}
