//! Merge view rendered by forms: the pool plus every selected item.
//!
//! Pool order comes first; selected items that are not in the pool (edit mode,
//! or evicted pages) are appended in selection order. Recomputed on demand.

use crate::pool::PoolCache;
use crate::selection::SelectionSet;
use crate::types::Item;

/// One row of the merge view.
#[derive(Debug, Clone, Copy)]
pub struct BankEntry<'a> {
    pub item: &'a Item,
    pub selected: bool,
    pub in_pool: bool,
}

pub fn compute<'a>(pool: &'a PoolCache, selection: &'a SelectionSet) -> Vec<&'a Item> {
    pool.items()
        .chain(selection.items().filter(|item| !pool.contains(&item.id)))
        .collect()
}

pub fn entries<'a>(pool: &'a PoolCache, selection: &'a SelectionSet) -> Vec<BankEntry<'a>> {
    compute(pool, selection)
        .into_iter()
        .map(|item| BankEntry { item, selected: selection.contains(&item.id), in_pool: pool.contains(&item.id) })
        .collect()
}
