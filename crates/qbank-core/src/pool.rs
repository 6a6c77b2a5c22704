//! Page accumulator for one filter signature.
//!
//! Pages are appended in arrival order and deduplicated by item id, so
//! overlapping server pages never double-count an item. The cache only accepts
//! pages for the signature it was last reset to.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::filter::Signature;
use crate::types::{Identifier, Item, Page};

#[derive(Debug, Clone, Default)]
pub struct PoolCache {
    signature: Option<Signature>,
    items: IndexMap<Identifier, Item>,
    last_page: u32,
    total_pages: u32,
}

impl PoolCache {
    pub fn new() -> Self { Self::default() }

    /// Start over for a new filter combination.
    pub fn reset(&mut self, signature: Signature) {
        self.items.clear();
        self.last_page = 0;
        self.total_pages = 0;
        self.signature = Some(signature);
    }

    /// Drop everything, including the signature (no resolved chain).
    pub fn invalidate(&mut self) {
        self.items.clear();
        self.last_page = 0;
        self.total_pages = 0;
        self.signature = None;
    }

    /// Append a page fetched under `signature`; returns how many items were new.
    pub fn append_page(&mut self, signature: &Signature, page: Page) -> Result<usize> {
        if self.signature.as_ref() != Some(signature) {
            return Err(Error::StaleFetch { expected: self.signature.clone(), actual: signature.clone() });
        }
        let before = self.items.len();
        for item in page.items {
            self.items.entry(item.id.clone()).or_insert(item);
        }
        self.last_page = page.page;
        self.total_pages = page.total_pages;
        Ok(self.items.len() - before)
    }

    pub fn has_more(&self) -> bool { self.last_page < self.total_pages }

    pub fn next_page(&self) -> u32 { self.last_page + 1 }

    pub fn signature(&self) -> Option<&Signature> { self.signature.as_ref() }

    pub fn last_page(&self) -> u32 { self.last_page }

    pub fn total_pages(&self) -> u32 { self.total_pages }

    pub fn items(&self) -> impl Iterator<Item = &Item> { self.items.values() }

    pub fn get(&self, id: &Identifier) -> Option<&Item> { self.items.get(id) }

    pub fn contains(&self, id: &Identifier) -> bool { self.items.contains_key(id) }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}
