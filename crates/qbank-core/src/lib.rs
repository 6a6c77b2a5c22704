#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod bank;
pub mod config;
pub mod error;
pub mod filter;
pub mod pool;
pub mod selection;
pub mod traits;
pub mod types;

pub use bank::BankEntry;
pub use error::{Error, FetchError, Result};
pub use filter::{FilterChain, FilterLevel, Signature};
pub use pool::PoolCache;
pub use selection::{SelectionSet, ToggleTarget, Toggled};
pub use types::{Aggregate, Identifier, Item, Page, PageRequest, SavedSelection, SelectionSnapshot};
