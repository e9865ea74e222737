//! Group expense ledger core
//!
//! Split calculation and pairwise debt ledger for expense-sharing groups.
//!
//! # Architecture
//!
//! - **Recompute on read**: balances are derived from the full history on every query
//! - **Integer money**: all amounts are `i64` minor units, never floats
//! - **Repository seam**: persistence is injected through [`GroupRepository`]
//!
//! # Invariants
//!
//! - Splits sum to the expense total exactly, for every policy
//! - Money conservation: Σ(net balances) == 0 for every group history
//! - Deterministic replay: same history → same ledger and balances
//! - Ledger entries are never negative

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod split;
pub mod ledger;
pub mod storage;
pub mod snapshot;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Cents, Currency, Expense, ExpenseDraft, GroupHistory, GroupId, Member, MemberId, NetBalance,
    Payer, Settlement, Split, SplitPolicy,
};
pub use split::{allocate_largest_remainder, compute_shares, SplitRule};
pub use ledger::{build_ledger, compute_net_balances, verify_conservation, LedgerMatrix};
pub use storage::{FileStore, GroupRepository, MemoryStore};
pub use snapshot::GroupSnapshot;
pub use config::Config;
pub use metrics::Metrics;
