//! Shared-expense reconciliation engine.
//!
//! Keeps the set of settled (`is_reimbursed`) expense rows of a
//! reimbursable category consistent with the reimbursement income the
//! category has received. Every run re-derives both totals from source
//! aggregates rather than a delta log, so an interrupted multi-step
//! flow is repaired by simply running again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::traits::*;
use crate::types::*;

/// Currency-unit tolerance for settlement comparisons (0.01).
pub fn tolerance() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Why a reconciliation run performed no mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The category tracks personal spending; reconciliation does not
    /// apply
    NotReimbursable,
    /// Income and settled value already agree within tolerance
    WithinTolerance,
}

/// Result of a reconciliation run. `Skipped` is a logged no-op, not a
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReconcileOutcome {
    Skipped(SkipReason),
    /// Surplus income covered `rows` expense rows worth `value`
    Settled { rows: usize, value: BigDecimal },
    /// Deficit forced `rows` expense rows worth `value` back to
    /// unsettled
    Unsettled { rows: usize, value: BigDecimal },
}

/// The reconciliation engine.
///
/// Runs for one category at a time; runs on the same category through
/// the same engine are serialized by a per-category async lock, and all
/// mark/unmark updates of a run are applied as a single atomic batch.
pub struct ReconciliationEngine<S: LedgerStore> {
    storage: S,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: LedgerStore> ReconciliationEngine<S> {
    /// Create a new engine over the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, category_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(category_id.to_string()).or_default().clone()
    }

    /// Reconcile one category.
    ///
    /// Surplus income settles unreimbursed expenses oldest-first; a row
    /// is only settled when the remaining surplus covers its full cost
    /// (within tolerance), and the walk stops at the first row that does
    /// not fit: no partial settlement, no reordering. A deficit
    /// unsettles reimbursed expenses newest-first until the shortfall is
    /// recovered.
    pub async fn reconcile(&mut self, category_id: &str) -> LedgerResult<ReconcileOutcome> {
        let category = self
            .storage
            .category(category_id)
            .await?
            .ok_or_else(|| LedgerError::CategoryNotFound(category_id.to_string()))?;

        if !category.is_reimbursable() {
            debug!(
                "reconciliation skipped for '{}': not a reimbursable category",
                category.name
            );
            return Ok(ReconcileOutcome::Skipped(SkipReason::NotReimbursable));
        }

        let lock = self.lock_for(category_id);
        let _guard = lock.lock().await;

        let total_income = self
            .storage
            .sum_amount(&RowFilter {
                category_id: Some(category_id.to_string()),
                kind: Some(TransactionKind::Income),
                ..Default::default()
            })
            .await?;
        let total_reimbursed = self
            .storage
            .sum_amount(&RowFilter {
                category_id: Some(category_id.to_string()),
                kind: Some(TransactionKind::Expense),
                is_reimbursed: Some(true),
                ..Default::default()
            })
            .await?
            .abs();

        let eps = tolerance();
        let mut delta = &total_income - &total_reimbursed;

        if delta > eps {
            // Surplus: settle oldest-first
            let candidates = self
                .storage
                .transactions(
                    &RowFilter {
                        category_id: Some(category_id.to_string()),
                        kind: Some(TransactionKind::Expense),
                        is_reimbursed: Some(false),
                        ..Default::default()
                    },
                    DateOrder::Oldest,
                )
                .await?;

            let mut marked = Vec::new();
            let mut value = BigDecimal::from(0);
            for mut row in candidates {
                let cost = row.cost();
                if delta >= &cost - &eps {
                    row.is_reimbursed = true;
                    delta -= &cost;
                    value += &cost;
                    marked.push(row);
                } else {
                    // The walk never skips ahead to a smaller row
                    break;
                }
            }

            if !marked.is_empty() {
                self.storage.update_transactions(&marked).await?;
            }
            debug!(
                "reconciled '{}': settled {} rows worth {}",
                category.name,
                marked.len(),
                value
            );
            Ok(ReconcileOutcome::Settled {
                rows: marked.len(),
                value,
            })
        } else if delta < -&eps {
            // Deficit: unsettle newest-first
            let target = delta.abs();
            let candidates = self
                .storage
                .transactions(
                    &RowFilter {
                        category_id: Some(category_id.to_string()),
                        kind: Some(TransactionKind::Expense),
                        is_reimbursed: Some(true),
                        ..Default::default()
                    },
                    DateOrder::Newest,
                )
                .await?;

            let mut unmarked = Vec::new();
            let mut recovered = BigDecimal::from(0);
            for mut row in candidates {
                let cost = row.cost();
                row.is_reimbursed = false;
                recovered += &cost;
                unmarked.push(row);
                if recovered >= &target - &eps {
                    break;
                }
            }

            if !unmarked.is_empty() {
                self.storage.update_transactions(&unmarked).await?;
            }
            debug!(
                "reconciled '{}': unsettled {} rows worth {}",
                category.name,
                unmarked.len(),
                recovered
            );
            Ok(ReconcileOutcome::Unsettled {
                rows: unmarked.len(),
                value: recovered,
            })
        } else {
            debug!(
                "reconciliation for '{}' within tolerance (delta {})",
                category.name, delta
            );
            Ok(ReconcileOutcome::Skipped(SkipReason::WithinTolerance))
        }
    }

    /// Clear every settled mark in a category, in one atomic batch.
    ///
    /// Settled marks only make sense while a category tracks
    /// reimbursable spending; call this when it stops doing so. Returns
    /// the number of rows released.
    pub async fn release(&mut self, category_id: &str) -> LedgerResult<usize> {
        let lock = self.lock_for(category_id);
        let _guard = lock.lock().await;

        let settled = self
            .storage
            .transactions(
                &RowFilter {
                    category_id: Some(category_id.to_string()),
                    is_reimbursed: Some(true),
                    ..Default::default()
                },
                DateOrder::Oldest,
            )
            .await?;
        if settled.is_empty() {
            return Ok(0);
        }

        let released: Vec<Transaction> = settled
            .into_iter()
            .map(|mut row| {
                row.is_reimbursed = false;
                row
            })
            .collect();
        self.storage.update_transactions(&released).await?;
        debug!("released {} settled rows in '{}'", released.len(), category_id);
        Ok(released.len())
    }
}
