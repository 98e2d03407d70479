//! Transaction management: creation, group-aware edits, and deletion

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::installment::{base_description, expand_installments, TransactionDraft};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_description, validate_magnitude};

/// How to delete a row that belongs to an installment group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Remove only the addressed row
    Single,
    /// Remove the addressed row and all its installment siblings
    Group,
}

/// Input for editing an existing transaction.
#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    pub id: String,
    pub description: String,
    /// Unsigned magnitude; the sign is applied from `kind`
    pub amount: BigDecimal,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub account_id: String,
    pub category_id: Option<String>,
    pub is_paid: bool,
}

/// Manager for ledger rows
pub struct TransactionManager<S: LedgerStore> {
    storage: S,
}

impl<S: LedgerStore> TransactionManager<S> {
    /// Create a new transaction manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create the rows for a draft (one row, or a whole installment
    /// group) as one atomic batch.
    pub async fn create(&mut self, draft: &TransactionDraft) -> LedgerResult<Vec<Transaction>> {
        if self.storage.account(&draft.account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(draft.account_id.clone()));
        }
        if let Some(ref category_id) = draft.category_id {
            if self.storage.category(category_id).await?.is_none() {
                return Err(LedgerError::CategoryNotFound(category_id.clone()));
            }
        }

        let rows = expand_installments(draft)?;
        self.storage.insert_transactions(&rows).await
    }

    /// Get a row by id
    pub async fn transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>> {
        self.storage.transaction(transaction_id).await
    }

    /// Get a row by id, erroring when absent
    pub async fn transaction_required(&self, transaction_id: &str) -> LedgerResult<Transaction> {
        self.storage
            .transaction(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(transaction_id.to_string()))
    }

    /// List rows matching a filter
    pub async fn transactions(
        &self,
        filter: &RowFilter,
        order: DateOrder,
    ) -> LedgerResult<Vec<Transaction>> {
        self.storage.transactions(filter, order).await
    }

    /// Apply an edit.
    ///
    /// Editing a row of an installment group updates the whole group in
    /// one atomic batch: the addressed row takes every edited field,
    /// while siblings take the shared fields (amount, kind, account,
    /// category, base description re-suffixed with their own label) and
    /// keep their own date and paid flag. Editing a plain row updates
    /// just that row.
    pub async fn apply_update(
        &mut self,
        update: &TransactionUpdate,
    ) -> LedgerResult<Vec<Transaction>> {
        validate_description(&update.description)?;
        validate_magnitude(&update.amount)?;

        let original = self.transaction_required(&update.id).await?;

        if self.storage.account(&update.account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(update.account_id.clone()));
        }
        if let Some(ref category_id) = update.category_id {
            if self.storage.category(category_id).await?.is_none() {
                return Err(LedgerError::CategoryNotFound(category_id.clone()));
            }
        }

        let mut updated = Vec::new();

        if let Some(ref group_id) = original.installment_id {
            let base = base_description(&update.description, original.installment_label.as_deref());
            let siblings = self
                .storage
                .transactions(
                    &RowFilter {
                        installment_id: Some(group_id.clone()),
                        ..Default::default()
                    },
                    DateOrder::Oldest,
                )
                .await?;

            for mut sibling in siblings {
                sibling.amount = update.kind.signed(&update.amount);
                sibling.kind = update.kind;
                sibling.account_id = update.account_id.clone();
                sibling.category_id = update.category_id.clone();
                // The settled flag only survives while the row stays an
                // expense; reconciliation re-derives it afterwards
                sibling.is_reimbursed =
                    sibling.is_reimbursed && update.kind == TransactionKind::Expense;

                if sibling.id == update.id {
                    sibling.description = update.description.clone();
                    sibling.date = update.date;
                    sibling.is_paid = update.is_paid;
                } else {
                    sibling.description = match sibling.installment_label {
                        Some(ref label) => format!("{} ({})", base, label),
                        None => base.clone(),
                    };
                }
                updated.push(sibling);
            }
        } else {
            let mut row = original;
            row.description = update.description.clone();
            row.amount = update.kind.signed(&update.amount);
            row.kind = update.kind;
            row.date = update.date;
            row.account_id = update.account_id.clone();
            row.category_id = update.category_id.clone();
            row.is_paid = update.is_paid;
            row.is_reimbursed = row.is_reimbursed && update.kind == TransactionKind::Expense;
            updated.push(row);
        }

        self.storage.update_transactions(&updated).await?;
        Ok(updated)
    }

    /// Toggle a row between planned and consolidated
    pub async fn set_paid(&mut self, transaction_id: &str, is_paid: bool) -> LedgerResult<Transaction> {
        let mut row = self.transaction_required(transaction_id).await?;
        row.is_paid = is_paid;
        self.storage
            .update_transactions(std::slice::from_ref(&row))
            .await?;
        Ok(row)
    }

    /// Delete a row, or its whole installment group, as one atomic
    /// batch. Returns the rows that were removed.
    pub async fn delete(
        &mut self,
        row: &Transaction,
        mode: DeleteMode,
    ) -> LedgerResult<Vec<Transaction>> {
        let doomed = match (&row.installment_id, mode) {
            (Some(group_id), DeleteMode::Group) => {
                self.storage
                    .transactions(
                        &RowFilter {
                            installment_id: Some(group_id.clone()),
                            ..Default::default()
                        },
                        DateOrder::Oldest,
                    )
                    .await?
            }
            _ => vec![row.clone()],
        };

        let ids: Vec<String> = doomed.iter().map(|r| r.id.clone()).collect();
        self.storage.delete_transactions(&ids).await?;
        Ok(doomed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup() -> (MemoryStore, Account) {
        let mut store = MemoryStore::new();
        let account = Account::new(
            "Checking".to_string(),
            AccountKind::Checking,
            BigDecimal::from(0),
        );
        store.insert_account(&account).await.unwrap();
        (store, account)
    }

    fn draft(account_id: &str, installments: u32) -> TransactionDraft {
        TransactionDraft {
            description: "TV".to_string(),
            amount: BigDecimal::from(300),
            kind: TransactionKind::Expense,
            date: date(2025, 1, 15),
            account_id: account_id.to_string(),
            category_id: None,
            is_paid: true,
            installments,
        }
    }

    #[tokio::test]
    async fn create_rejects_missing_references() {
        let (store, account) = setup().await;
        let mut manager = TransactionManager::new(store);

        let mut bad_account = draft("ghost", 1);
        bad_account.account_id = "ghost".to_string();
        assert!(matches!(
            manager.create(&bad_account).await,
            Err(LedgerError::AccountNotFound(_))
        ));

        let mut bad_category = draft(&account.id, 1);
        bad_category.category_id = Some("ghost".to_string());
        assert!(matches!(
            manager.create(&bad_category).await,
            Err(LedgerError::CategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn group_edit_propagates_shared_fields_only() {
        let (store, account) = setup().await;
        let mut manager = TransactionManager::new(store);

        let rows = manager.create(&draft(&account.id, 3)).await.unwrap();
        let edited = &rows[0];

        let updated = manager
            .apply_update(&TransactionUpdate {
                id: edited.id.clone(),
                description: "Smart TV (1/3)".to_string(),
                amount: BigDecimal::from(350),
                kind: TransactionKind::Expense,
                date: date(2025, 1, 20),
                account_id: account.id.clone(),
                category_id: None,
                is_paid: false,
            })
            .await
            .unwrap();

        assert_eq!(updated.len(), 3);
        let first = updated.iter().find(|r| r.id == edited.id).unwrap();
        assert_eq!(first.description, "Smart TV (1/3)");
        assert_eq!(first.date, date(2025, 1, 20));
        assert!(!first.is_paid);

        let second = updated
            .iter()
            .find(|r| r.installment_label.as_deref() == Some("2/3"))
            .unwrap();
        // Renamed from the shared base, own date and paid flag kept
        assert_eq!(second.description, "Smart TV (2/3)");
        assert_eq!(second.date, date(2025, 2, 15));
        assert!(!second.is_paid);
        assert_eq!(second.amount, BigDecimal::from(-350));
    }

    #[tokio::test]
    async fn plain_edit_touches_one_row() {
        let (store, account) = setup().await;
        let mut manager = TransactionManager::new(store);

        let rows = manager.create(&draft(&account.id, 1)).await.unwrap();
        let updated = manager
            .apply_update(&TransactionUpdate {
                id: rows[0].id.clone(),
                description: "Monitor".to_string(),
                amount: BigDecimal::from(120),
                kind: TransactionKind::Expense,
                date: date(2025, 2, 1),
                account_id: account.id.clone(),
                category_id: None,
                is_paid: true,
            })
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].description, "Monitor");
        assert_eq!(updated[0].amount, BigDecimal::from(-120));
    }

    #[tokio::test]
    async fn editing_a_deleted_row_is_an_error() {
        let (store, account) = setup().await;
        let mut manager = TransactionManager::new(store);

        let rows = manager.create(&draft(&account.id, 1)).await.unwrap();
        manager.delete(&rows[0], DeleteMode::Single).await.unwrap();

        let result = manager
            .apply_update(&TransactionUpdate {
                id: rows[0].id.clone(),
                description: "Ghost".to_string(),
                amount: BigDecimal::from(10),
                kind: TransactionKind::Expense,
                date: date(2025, 1, 1),
                account_id: account.id.clone(),
                category_id: None,
                is_paid: true,
            })
            .await;
        assert!(matches!(result, Err(LedgerError::TransactionNotFound(_))));
    }

    #[tokio::test]
    async fn group_delete_removes_all_siblings() {
        let (store, account) = setup().await;
        let mut manager = TransactionManager::new(store.clone());

        let rows = manager.create(&draft(&account.id, 3)).await.unwrap();
        let removed = manager.delete(&rows[1], DeleteMode::Group).await.unwrap();
        assert_eq!(removed.len(), 3);

        let left = store
            .transactions(&RowFilter::default(), DateOrder::Oldest)
            .await
            .unwrap();
        assert!(left.is_empty());
    }

    #[tokio::test]
    async fn single_delete_keeps_siblings() {
        let (store, account) = setup().await;
        let mut manager = TransactionManager::new(store.clone());

        let rows = manager.create(&draft(&account.id, 3)).await.unwrap();
        manager.delete(&rows[1], DeleteMode::Single).await.unwrap();

        let left = store
            .transactions(&RowFilter::default(), DateOrder::Oldest)
            .await
            .unwrap();
        assert_eq!(left.len(), 2);
    }

    #[tokio::test]
    async fn set_paid_flips_the_flag() {
        let (store, account) = setup().await;
        let mut manager = TransactionManager::new(store);

        let rows = manager.create(&draft(&account.id, 1)).await.unwrap();
        let row = manager.set_paid(&rows[0].id, false).await.unwrap();
        assert!(!row.is_paid);
        assert!(!manager
            .transaction_required(&rows[0].id)
            .await
            .unwrap()
            .is_paid);
    }
}
