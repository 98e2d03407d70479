//! In-memory storage implementation for testing and development

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory `LedgerStore` implementation.
///
/// Batch methods check every precondition before touching a table, so a
/// failed batch leaves the store unchanged. Insertion stamps are nudged
/// forward when the wall clock would repeat, keeping `created_at`
/// strictly increasing per insertion.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    categories: Arc<RwLock<HashMap<String, Category>>>,
    recurring: Arc<RwLock<HashMap<String, RecurringExpense>>>,
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
    last_stamp: Arc<Mutex<NaiveDateTime>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            categories: Arc::new(RwLock::new(HashMap::new())),
            recurring: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(HashMap::new())),
            last_stamp: Arc::new(Mutex::new(NaiveDateTime::MIN)),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.accounts.write().unwrap().clear();
        self.categories.write().unwrap().clear();
        self.recurring.write().unwrap().clear();
        self.transactions.write().unwrap().clear();
    }

    fn next_stamp(&self) -> NaiveDateTime {
        let mut last = self.last_stamp.lock().unwrap();
        let now = chrono::Utc::now().naive_utc();
        let stamp = if now > *last {
            now
        } else {
            *last + Duration::microseconds(1)
        };
        *last = stamp;
        stamp
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_account(&mut self, account: &Account) -> LedgerResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        if accounts.contains_key(&account.id) {
            return Err(LedgerError::Validation(format!(
                "Account '{}' already exists",
                account.id
            )));
        }
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        Ok(self.accounts.read().unwrap().get(account_id).cloned())
    }

    async fn accounts(&self) -> LedgerResult<Vec<Account>> {
        let mut all: Vec<Account> = self.accounts.read().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn update_account(&mut self, account: &Account) -> LedgerResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        if !accounts.contains_key(&account.id) {
            return Err(LedgerError::AccountNotFound(account.id.clone()));
        }
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn delete_account(&mut self, account_id: &str) -> LedgerResult<()> {
        if self.accounts.write().unwrap().remove(account_id).is_some() {
            Ok(())
        } else {
            Err(LedgerError::AccountNotFound(account_id.to_string()))
        }
    }

    async fn insert_category(&mut self, category: &Category) -> LedgerResult<()> {
        let mut categories = self.categories.write().unwrap();
        if categories.contains_key(&category.id) {
            return Err(LedgerError::Validation(format!(
                "Category '{}' already exists",
                category.id
            )));
        }
        categories.insert(category.id.clone(), category.clone());
        Ok(())
    }

    async fn category(&self, category_id: &str) -> LedgerResult<Option<Category>> {
        Ok(self.categories.read().unwrap().get(category_id).cloned())
    }

    async fn categories(&self) -> LedgerResult<Vec<Category>> {
        let mut all: Vec<Category> = self.categories.read().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn update_category(&mut self, category: &Category) -> LedgerResult<()> {
        let mut categories = self.categories.write().unwrap();
        if !categories.contains_key(&category.id) {
            return Err(LedgerError::CategoryNotFound(category.id.clone()));
        }
        categories.insert(category.id.clone(), category.clone());
        Ok(())
    }

    async fn delete_category(&mut self, category_id: &str) -> LedgerResult<()> {
        if self.categories.write().unwrap().remove(category_id).is_some() {
            Ok(())
        } else {
            Err(LedgerError::CategoryNotFound(category_id.to_string()))
        }
    }

    async fn insert_recurring(&mut self, template: &RecurringExpense) -> LedgerResult<()> {
        let mut recurring = self.recurring.write().unwrap();
        if recurring.contains_key(&template.id) {
            return Err(LedgerError::Validation(format!(
                "Recurring template '{}' already exists",
                template.id
            )));
        }
        recurring.insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn recurring_template(
        &self,
        template_id: &str,
    ) -> LedgerResult<Option<RecurringExpense>> {
        Ok(self.recurring.read().unwrap().get(template_id).cloned())
    }

    async fn recurring_templates(&self) -> LedgerResult<Vec<RecurringExpense>> {
        let mut all: Vec<RecurringExpense> =
            self.recurring.read().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn update_recurring(&mut self, template: &RecurringExpense) -> LedgerResult<()> {
        let mut recurring = self.recurring.write().unwrap();
        if !recurring.contains_key(&template.id) {
            return Err(LedgerError::TemplateNotFound(template.id.clone()));
        }
        recurring.insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn delete_recurring(&mut self, template_id: &str) -> LedgerResult<()> {
        if self.recurring.write().unwrap().remove(template_id).is_some() {
            Ok(())
        } else {
            Err(LedgerError::TemplateNotFound(template_id.to_string()))
        }
    }

    async fn insert_transactions(
        &mut self,
        rows: &[Transaction],
    ) -> LedgerResult<Vec<Transaction>> {
        let mut transactions = self.transactions.write().unwrap();

        // Validate the whole batch before the first write
        for row in rows {
            if transactions.contains_key(&row.id) {
                return Err(LedgerError::Validation(format!(
                    "Transaction '{}' already exists",
                    row.id
                )));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for row in rows {
            if !seen.insert(&row.id) {
                return Err(LedgerError::Validation(format!(
                    "Duplicate transaction id '{}' in batch",
                    row.id
                )));
            }
        }

        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let mut row = row.clone();
            row.created_at = self.next_stamp();
            transactions.insert(row.id.clone(), row.clone());
            stored.push(row);
        }
        Ok(stored)
    }

    async fn transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .unwrap()
            .get(transaction_id)
            .cloned())
    }

    async fn transactions(
        &self,
        filter: &RowFilter,
        order: DateOrder,
    ) -> LedgerResult<Vec<Transaction>> {
        let transactions = self.transactions.read().unwrap();
        let mut matching: Vec<Transaction> = transactions
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)));
        if order == DateOrder::Newest {
            matching.reverse();
        }
        Ok(matching)
    }

    async fn sum_amount(&self, filter: &RowFilter) -> LedgerResult<BigDecimal> {
        let transactions = self.transactions.read().unwrap();
        Ok(transactions
            .values()
            .filter(|row| filter.matches(row))
            .map(|row| &row.amount)
            .sum())
    }

    async fn update_transactions(&mut self, rows: &[Transaction]) -> LedgerResult<()> {
        let mut transactions = self.transactions.write().unwrap();

        for row in rows {
            if !transactions.contains_key(&row.id) {
                return Err(LedgerError::TransactionNotFound(row.id.clone()));
            }
        }

        for row in rows {
            let mut updated = row.clone();
            // Insertion stamps are immutable
            if let Some(existing) = transactions.get(&row.id) {
                updated.created_at = existing.created_at;
            }
            transactions.insert(updated.id.clone(), updated);
        }
        Ok(())
    }

    async fn delete_transactions(&mut self, transaction_ids: &[String]) -> LedgerResult<()> {
        let mut transactions = self.transactions.write().unwrap();

        for id in transaction_ids {
            if !transactions.contains_key(id) {
                return Err(LedgerError::TransactionNotFound(id.clone()));
            }
        }

        for id in transaction_ids {
            transactions.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(description: &str, amount: i64, date: NaiveDate) -> Transaction {
        let kind = if amount < 0 {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        };
        Transaction::new(
            description.to_string(),
            kind,
            &BigDecimal::from(amount.abs()),
            date,
            "acc".to_string(),
            None,
            true,
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn insertion_stamps_are_strictly_increasing() {
        let mut store = MemoryStore::new();
        let rows: Vec<Transaction> = (0..5)
            .map(|i| row(&format!("r{}", i), -10, date(2025, 1, 1)))
            .collect();
        let stored = store.insert_transactions(&rows).await.unwrap();

        for pair in stored.windows(2) {
            assert!(pair[0].created_at < pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn batch_insert_is_atomic_on_duplicate_id() {
        let mut store = MemoryStore::new();
        let a = row("a", -10, date(2025, 1, 1));
        let mut b = row("b", -20, date(2025, 1, 2));
        b.id = a.id.clone();

        let result = store.insert_transactions(&[a, b]).await;
        assert!(result.is_err());
        assert!(store
            .transactions(&RowFilter::default(), DateOrder::Oldest)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn batch_update_is_atomic_when_a_row_is_missing() {
        let mut store = MemoryStore::new();
        let a = row("a", -10, date(2025, 1, 1));
        let stored = store.insert_transactions(&[a]).await.unwrap();

        let mut present = stored[0].clone();
        present.is_reimbursed = true;
        let missing = row("ghost", -5, date(2025, 1, 2));

        let result = store.update_transactions(&[present, missing]).await;
        assert!(result.is_err());

        let unchanged = store.transaction(&stored[0].id).await.unwrap().unwrap();
        assert!(!unchanged.is_reimbursed);
    }

    #[tokio::test]
    async fn queries_order_by_date_then_insertion() {
        let mut store = MemoryStore::new();
        // Same date, insertion order decides; later date sorts last
        let rows = vec![
            row("first", -10, date(2025, 1, 5)),
            row("second", -20, date(2025, 1, 5)),
            row("later", -30, date(2025, 2, 1)),
        ];
        store.insert_transactions(&rows).await.unwrap();

        let oldest = store
            .transactions(&RowFilter::default(), DateOrder::Oldest)
            .await
            .unwrap();
        let names: Vec<&str> = oldest.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "later"]);

        let newest = store
            .transactions(&RowFilter::default(), DateOrder::Newest)
            .await
            .unwrap();
        assert_eq!(newest[0].description, "later");
    }

    #[tokio::test]
    async fn sum_amount_applies_filters() {
        let mut store = MemoryStore::new();
        let mut expense = row("lunch", -30, date(2025, 1, 5));
        expense.category_id = Some("cat".to_string());
        let mut income = row("refund", 20, date(2025, 1, 6));
        income.category_id = Some("cat".to_string());
        let other = row("unrelated", -99, date(2025, 1, 7));
        store
            .insert_transactions(&[expense, income, other])
            .await
            .unwrap();

        let filter = RowFilter {
            category_id: Some("cat".to_string()),
            kind: Some(TransactionKind::Income),
            ..Default::default()
        };
        assert_eq!(store.sum_amount(&filter).await.unwrap(), BigDecimal::from(20));
    }

    #[tokio::test]
    async fn update_does_not_change_insertion_stamp() {
        let mut store = MemoryStore::new();
        let stored = store
            .insert_transactions(&[row("a", -10, date(2025, 1, 1))])
            .await
            .unwrap();

        let mut tampered = stored[0].clone();
        tampered.created_at = NaiveDateTime::MIN;
        tampered.is_paid = false;
        store.update_transactions(&[tampered]).await.unwrap();

        let reloaded = store.transaction(&stored[0].id).await.unwrap().unwrap();
        assert_eq!(reloaded.created_at, stored[0].created_at);
        assert!(!reloaded.is_paid);
    }
}
