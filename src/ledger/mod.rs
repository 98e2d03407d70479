//! Ledger module containing the orchestrator and its account, category,
//! and transaction managers

pub mod account;
pub mod core;
pub mod transaction;

pub use account::*;
pub use core::*;
pub use transaction::*;
