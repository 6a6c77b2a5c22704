//! qbank-engine
//!
//! The selection state machine (`engine`) and an async driver that feeds it
//! pages from a `PoolFetcher` (`session`).
pub mod engine;
pub mod session;

pub use engine::{EngineState, FetchTicket, Outcome, SelectionEngine, SubmitIssue, Submission};
pub use session::Session;
