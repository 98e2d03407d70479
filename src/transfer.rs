//! Inter-account transfers: atomic twin-row creation and deletion.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use log::warn;
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_description, validate_magnitude};

/// Creates and removes the paired rows of an inter-account transfer.
///
/// The two rows share a `transfer_group` key, so the twin of a row is
/// found by id rather than by guessing from amounts and timestamps.
pub struct TransferCoordinator<S: LedgerStore> {
    storage: S,
}

impl<S: LedgerStore> TransferCoordinator<S> {
    /// Create a new coordinator over the given storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Move `amount` from one account to another.
    ///
    /// Inserts exactly two paid rows in one atomic batch: an expense of
    /// `-amount` on the source account and an income of `+amount` on
    /// the destination. Both commit together or neither does.
    pub async fn create_transfer(
        &mut self,
        amount: &BigDecimal,
        from_account_id: &str,
        to_account_id: &str,
        date: NaiveDate,
        description: &str,
    ) -> LedgerResult<(Transaction, Transaction)> {
        validate_magnitude(amount)?;
        validate_description(description)?;
        if from_account_id == to_account_id {
            return Err(LedgerError::Validation(
                "Transfer source and destination must differ".to_string(),
            ));
        }
        if self.storage.account(from_account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(from_account_id.to_string()));
        }
        if self.storage.account(to_account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(to_account_id.to_string()));
        }

        let group = Uuid::new_v4().to_string();

        let mut outbound = Transaction::new(
            format!("{} (sent)", description),
            TransactionKind::Expense,
            amount,
            date,
            from_account_id.to_string(),
            None,
            true,
        );
        outbound.transfer_group = Some(group.clone());

        let mut inbound = Transaction::new(
            format!("{} (received)", description),
            TransactionKind::Income,
            amount,
            date,
            to_account_id.to_string(),
            None,
            true,
        );
        inbound.transfer_group = Some(group);

        let stored = self
            .storage
            .insert_transactions(&[outbound, inbound])
            .await?;
        let mut stored = stored.into_iter();
        match (stored.next(), stored.next()) {
            (Some(out_row), Some(in_row)) => Ok((out_row, in_row)),
            _ => Err(LedgerError::Storage(
                "Transfer batch did not return both rows".to_string(),
            )),
        }
    }

    /// Delete every row of a transfer group in one atomic batch.
    ///
    /// Normally removes the pair; a group that has lost its twin
    /// degrades to single-row deletion.
    pub async fn delete_group(&mut self, transfer_group: &str) -> LedgerResult<usize> {
        let rows = self
            .storage
            .transactions(
                &RowFilter {
                    transfer_group: Some(transfer_group.to_string()),
                    ..Default::default()
                },
                DateOrder::Oldest,
            )
            .await?;

        if rows.len() != 2 {
            warn!(
                "transfer group '{}' has {} rows, expected 2",
                transfer_group,
                rows.len()
            );
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
        self.storage.delete_transactions(&ids).await?;
        Ok(ids.len())
    }
}
