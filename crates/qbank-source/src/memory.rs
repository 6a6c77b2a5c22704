//! Fixture-backed page source.
//!
//! Serves the same `{items, page, totalPages}` shape as the remote endpoint
//! from an in-memory list, filtered by path prefix and windowed by `limit`.
use anyhow::{Context, Result};
use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::path::Path;

use qbank_core::traits::PageSource;
use qbank_core::{FetchError, Identifier, Item, Page, PageRequest};

/// A question tagged with the filter path it lives under (`[exam, subject, topic]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureQuestion {
    pub path: Vec<Identifier>,
    #[serde(flatten)]
    pub item: Item,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankFixture {
    pub questions: Vec<FixtureQuestion>,
}

pub struct InMemorySource {
    id: String,
    questions: Vec<FixtureQuestion>,
}

impl InMemorySource {
    pub fn new(id: impl Into<String>, questions: Vec<FixtureQuestion>) -> Self { Self { id: id.into(), questions } }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading bank fixture {}", path.display()))?;
        let fixture: BankFixture =
            serde_json::from_str(&raw).with_context(|| format!("parsing bank fixture {}", path.display()))?;
        let name = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
        Ok(Self::new(format!("memory:{name}"), fixture.questions))
    }

    pub fn len(&self) -> usize { self.questions.len() }

    pub fn is_empty(&self) -> bool { self.questions.is_empty() }

    /// Questions whose path starts with `filter_values`, in fixture order.
    pub fn matching<'a>(&'a self, filter_values: &'a [Identifier]) -> impl Iterator<Item = &'a Item> + 'a {
        self.questions.iter().filter(move |q| q.path.starts_with(filter_values)).map(|q| &q.item)
    }

    fn page(&self, request: &PageRequest) -> Result<Page, FetchError> {
        if request.limit == 0 {
            return Err(FetchError::Server("limit must be positive".into()));
        }
        let matched: Vec<&Item> = self.matching(&request.filter_values).collect();
        let limit = request.limit as usize;
        let total_pages = u32::try_from(matched.len().div_ceil(limit).max(1))
            .map_err(|_| FetchError::Server("too many pages".into()))?;
        if request.page == 0 || request.page > total_pages {
            return Err(FetchError::Server(format!("page {} out of range 1..={total_pages}", request.page)));
        }
        let start = (request.page as usize - 1) * limit;
        let items = matched.into_iter().skip(start).take(limit).cloned().collect();
        Ok(Page { items, page: request.page, total_pages })
    }
}

impl PageSource for InMemorySource {
    fn source_id(&self) -> &str { &self.id }

    fn fetch<'a>(&'a self, request: &'a PageRequest) -> BoxFuture<'a, Result<Page, FetchError>> {
        future::ready(self.page(request)).boxed()
    }
}
