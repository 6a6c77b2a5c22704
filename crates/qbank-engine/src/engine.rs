use std::fmt;

use tracing::{debug, info, warn};

use qbank_core::bank::{self, BankEntry};
use qbank_core::config::EngineSettings;
use qbank_core::traits::SubmitSink;
use qbank_core::{
    Aggregate, FetchError, FilterChain, Identifier, Item, Page, PoolCache, Result, SavedSelection, SelectionSet,
    SelectionSnapshot, Signature, ToggleTarget, Toggled,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// No resolved filter combination.
    Idle,
    Loading { page: u32 },
    Ready,
    LoadingMore { page: u32 },
    Error { reason: FetchError },
}

/// A fetch the caller must perform and hand back through [`SelectionEngine::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub signature: Signature,
    pub chain: FilterChain,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied { added: usize },
    Failed(FetchError),
    /// The ticket was superseded by a filter change or another fetch.
    Discarded,
}

/// Reasons a selection cannot be submitted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitIssue {
    NoFilterResolved,
    EmptySelection,
    FetchPending,
}

impl fmt::Display for SubmitIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SubmitIssue::NoFilterResolved => "Choose an exam, subject and topic first.",
            SubmitIssue::EmptySelection => "Select at least one question.",
            SubmitIssue::FetchPending => "Questions are still loading.",
        };
        f.write_str(msg)
    }
}

pub type Submission = std::result::Result<SelectionSnapshot, Vec<SubmitIssue>>;

/// Filter chain, pool and selection for one form, driven by explicit events.
///
/// Every filter change clears the selection and resets the pool in the same
/// step. Fetch results are only applied if they answer the ticket currently in
/// flight; anything else is dropped.
#[derive(Debug)]
pub struct SelectionEngine {
    chain: FilterChain,
    pool: PoolCache,
    selection: SelectionSet,
    state: EngineState,
    page_size: u32,
    in_flight: Option<FetchTicket>,
    failed: Option<FetchTicket>,
}

impl SelectionEngine {
    pub fn new(chain: FilterChain, page_size: u32) -> Self {
        Self {
            chain: chain.cleared(),
            pool: PoolCache::new(),
            selection: SelectionSet::new(),
            state: EngineState::Idle,
            page_size: page_size.max(1),
            in_flight: None,
            failed: None,
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::new(settings.chain(), settings.page_size))
    }

    pub fn state(&self) -> &EngineState { &self.state }

    pub fn chain(&self) -> &FilterChain { &self.chain }

    pub fn pool(&self) -> &PoolCache { &self.pool }

    pub fn selection(&self) -> &SelectionSet { &self.selection }

    pub fn page_size(&self) -> u32 { self.page_size }

    pub fn in_flight(&self) -> Option<&FetchTicket> { self.in_flight.as_ref() }

    pub fn has_more(&self) -> bool { self.state == EngineState::Ready && self.pool.has_more() }

    /// Change filter level `k`. Returns the page-1 ticket when the new chain is resolved.
    pub fn set_filter(&mut self, k: usize, value: Option<Identifier>) -> Result<Option<FetchTicket>> {
        let next = self.chain.set_level(k, value)?;
        if next.signature() == self.chain.signature() {
            debug!(level = k, "filter unchanged");
            return Ok(None);
        }
        info!(level = k, chain = %next, dropped = self.selection.len(), "filter changed");
        self.selection.clear();
        Ok(self.switch_chain(next))
    }

    /// Convenience for `set_filter` by level key.
    pub fn set_filter_by_key(&mut self, key: &str, value: Option<Identifier>) -> Result<Option<FetchTicket>> {
        let k = self
            .chain
            .position(key)
            .ok_or(qbank_core::Error::InvalidLevel { index: self.chain.len(), len: self.chain.len() })?;
        self.set_filter(k, value)
    }

    /// Edit mode: restore saved filters and selection before any page arrives.
    pub fn seed(&mut self, saved: SavedSelection) -> Result<Option<FetchTicket>> {
        let next = self.chain.with_values(&saved.filter_values)?;
        self.selection.seed(saved.items);
        info!(chain = %next, seeded = self.selection.len(), "selection seeded");
        Ok(self.switch_chain(next))
    }

    fn switch_chain(&mut self, next: FilterChain) -> Option<FetchTicket> {
        self.chain = next;
        self.failed = None;
        if self.chain.is_resolved() {
            self.pool.reset(self.chain.signature());
            let ticket = self.issue(1);
            self.state = EngineState::Loading { page: 1 };
            Some(ticket)
        } else {
            self.pool.invalidate();
            self.in_flight = None;
            self.state = EngineState::Idle;
            None
        }
    }

    fn issue(&mut self, page: u32) -> FetchTicket {
        let ticket =
            FetchTicket { signature: self.chain.signature(), chain: self.chain.clone(), page, page_size: self.page_size };
        self.in_flight = Some(ticket.clone());
        ticket
    }

    /// Next page, only when the pool is ready and not exhausted.
    pub fn load_more(&mut self) -> Option<FetchTicket> {
        if !self.has_more() {
            return None;
        }
        let page = self.pool.next_page();
        self.state = EngineState::LoadingMore { page };
        Some(self.issue(page))
    }

    /// Re-issue the fetch that failed.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        if !matches!(self.state, EngineState::Error { .. }) {
            return None;
        }
        let failed = self.failed.take()?;
        self.state = if failed.page == 1 {
            EngineState::Loading { page: 1 }
        } else {
            EngineState::LoadingMore { page: failed.page }
        };
        Some(self.issue(failed.page))
    }

    /// Hand back the result for `ticket`. Pages with inconsistent numbering fail like any other fetch.
    pub fn apply(&mut self, ticket: &FetchTicket, result: std::result::Result<Page, FetchError>) -> Outcome {
        if self.in_flight.as_ref() != Some(ticket) {
            debug!(signature = %ticket.signature, page = ticket.page, "discarding stale page");
            return Outcome::Discarded;
        }
        self.in_flight = None;
        let page = match result.and_then(|page| page.check(ticket.page).map(|()| page)) {
            Ok(page) => page,
            Err(reason) => return self.fail(ticket, reason),
        };
        match self.pool.append_page(&ticket.signature, page) {
            Ok(added) => {
                info!(page = ticket.page, added, pool = self.pool.len(), "page applied");
                self.state = EngineState::Ready;
                Outcome::Applied { added }
            }
            Err(e) => {
                debug!(error = %e, "pool rejected page");
                Outcome::Discarded
            }
        }
    }

    fn fail(&mut self, ticket: &FetchTicket, reason: FetchError) -> Outcome {
        warn!(page = ticket.page, error = %reason, "fetch failed");
        self.failed = Some(ticket.clone());
        self.state = EngineState::Error { reason: reason.clone() };
        Outcome::Failed(reason)
    }

    pub fn toggle(&mut self, target: impl Into<ToggleTarget>) -> Result<Toggled> { self.selection.toggle(target) }

    /// Toggle an item by id, looking it up in the merge view.
    pub fn toggle_id(&mut self, id: &Identifier) -> Result<Toggled> {
        match self.pool.get(id) {
            Some(item) if !self.selection.contains(id) => {
                let item = item.clone();
                self.selection.toggle(item)
            }
            _ => self.selection.toggle(id.clone()),
        }
    }

    pub fn clear_selection(&mut self) { self.selection.clear(); }

    pub fn aggregate(&self) -> Aggregate { self.selection.aggregate() }

    pub fn snapshot(&self) -> SelectionSnapshot { self.selection.snapshot() }

    pub fn bank(&self) -> Vec<&Item> { bank::compute(&self.pool, &self.selection) }

    pub fn entries(&self) -> Vec<BankEntry<'_>> { bank::entries(&self.pool, &self.selection) }

    /// Snapshot to submit, or the user-facing reasons it cannot be submitted.
    pub fn submission(&self) -> Submission {
        let mut issues = Vec::new();
        if !self.chain.is_resolved() {
            issues.push(SubmitIssue::NoFilterResolved);
        }
        if self.selection.is_empty() {
            issues.push(SubmitIssue::EmptySelection);
        }
        if matches!(self.state, EngineState::Loading { .. }) {
            issues.push(SubmitIssue::FetchPending);
        }
        if issues.is_empty() { Ok(self.snapshot()) } else { Err(issues) }
    }

    /// Hand the snapshot to `sink` if the selection is submittable.
    pub fn submit<K: SubmitSink>(&self, sink: &mut K) -> anyhow::Result<Submission> {
        let snapshot = match self.submission() {
            Ok(s) => s,
            Err(issues) => return Ok(Err(issues)),
        };
        sink.submit(&snapshot)?;
        info!(count = snapshot.count, total_weight = snapshot.total_weight, "selection submitted");
        Ok(Ok(snapshot))
    }
}
