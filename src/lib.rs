//! # Finance Core
//!
//! A personal-finance engine tracking money across multiple accounts,
//! including shared expenses paid on behalf of others.
//!
//! ## Features
//!
//! - **Shared-expense reconciliation**: expenses in a reimbursable
//!   category are settled FIFO against reimbursement income and
//!   unsettled LIFO when income drops, re-derived from source aggregates
//!   on every run
//! - **Installment planning**: one purchase expanded into monthly rows
//!   with calendar-safe date arithmetic
//! - **Recurring obligations**: monthly templates detected and
//!   materialized on demand
//! - **Derived balances**: account and portfolio balances recomputed
//!   from opening balances plus source rows, never cached
//! - **Paired transfers**: inter-account transfers as atomic twin rows
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage
//!
//! ## Quick Start
//!
//! ```rust
//! use finance_core::{AccountKind, Ledger, MemoryStore};
//! use bigdecimal::BigDecimal;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), finance_core::LedgerError> {
//! let mut ledger = Ledger::new(MemoryStore::new());
//! let checking = ledger
//!     .create_account("Checking".to_string(), AccountKind::Checking, BigDecimal::from(1000))
//!     .await?;
//! assert_eq!(ledger.accounts().await?.len(), 1);
//! # let _ = checking;
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod installment;
pub mod ledger;
pub mod reconciliation;
pub mod recurring;
pub mod reports;
pub mod traits;
pub mod transfer;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use installment::{TransactionDraft, MAX_INSTALLMENTS, MIN_INSTALLMENTS};
pub use ledger::*;
pub use reconciliation::{ReconcileOutcome, ReconciliationEngine, SkipReason};
pub use recurring::RecurringManager;
pub use reports::{BalanceAggregator, CategoryStats, MonthBucket};
pub use traits::*;
pub use transfer::TransferCoordinator;
pub use types::*;
pub use utils::*;
