use futures::future::BoxFuture;

use crate::error::FetchError;
use crate::types::{Page, PageRequest};

/// The remote paged-query endpoint. Transport is up to the implementation.
pub trait PageSource: Send + Sync {
    /// Stable identifier for logs (e.g. `memory:bank.json`).
    fn source_id(&self) -> &str;
    /// Fetch one page. Must be safe to call again with the same request.
    fn fetch<'a>(&'a self, request: &'a PageRequest) -> BoxFuture<'a, Result<Page, FetchError>>;
}

/// Where a finished selection goes on submit.
pub trait SubmitSink {
    fn submit(&mut self, snapshot: &crate::types::SelectionSnapshot) -> anyhow::Result<()>;
}

impl<T: PageSource + ?Sized> PageSource for Box<T> {
    fn source_id(&self) -> &str { (**self).source_id() }
    fn fetch<'a>(&'a self, request: &'a PageRequest) -> BoxFuture<'a, Result<Page, FetchError>> { (**self).fetch(request) }
}
