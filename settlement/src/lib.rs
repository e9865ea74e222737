//! Settlement Engine
//!
//! Recomputes group balances from the ledger and suggests the transfers that
//! settle everyone up.
//!
//! # Architecture
//!
//! Every read goes through the same pipeline:
//!
//! 1. **Load**: fetch the roster and full history from the [`ledger_core::GroupRepository`]
//! 2. **Rebuild**: replay expenses and settlements into a fresh ledger
//! 3. **Net**: derive per-member net balances and check they sum to zero
//! 4. **Simplify**: greedily match largest debtor with largest creditor
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{GroupId, Member};
//! use settlement::{Config, SettlementEngine};
//!
//! #[tokio::main]
//! async fn main() -> settlement::Result<()> {
//!     let engine = SettlementEngine::new(Config::default())?;
//!     let group = GroupId::new("trip");
//!     engine
//!         .create_group(&group, vec![Member::new("ana", "Ana", "ana@example.com")])
//!         .await?;
//!
//!     let summary = engine.group_summary(&group).await?;
//!     println!("{} suggested transfers", summary.suggestions.len());
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod netting;
pub mod report;
pub mod error;
pub mod config;
pub mod engine;

// Re-exports
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use engine::SettlementEngine;
pub use netting::{apply_suggestions, simplify_debts, verify_plan, NettingEngine};
