//! Storage abstraction for the finance engine

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::*;

/// Row-level predicates for transaction queries.
///
/// Every field is optional; `None` means "don't filter on this". Date
/// bounds are inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    pub account_id: Option<String>,
    pub category_id: Option<String>,
    pub kind: Option<TransactionKind>,
    pub is_paid: Option<bool>,
    pub is_reimbursed: Option<bool>,
    pub installment_id: Option<String>,
    pub transfer_group: Option<String>,
    pub recurring_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl RowFilter {
    /// Whether a row satisfies every set predicate.
    pub fn matches(&self, row: &Transaction) -> bool {
        if let Some(ref account_id) = self.account_id {
            if row.account_id != *account_id {
                return false;
            }
        }
        if let Some(ref category_id) = self.category_id {
            if row.category_id.as_deref() != Some(category_id.as_str()) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if row.kind != kind {
                return false;
            }
        }
        if let Some(is_paid) = self.is_paid {
            if row.is_paid != is_paid {
                return false;
            }
        }
        if let Some(is_reimbursed) = self.is_reimbursed {
            if row.is_reimbursed != is_reimbursed {
                return false;
            }
        }
        if let Some(ref installment_id) = self.installment_id {
            if row.installment_id.as_deref() != Some(installment_id.as_str()) {
                return false;
            }
        }
        if let Some(ref transfer_group) = self.transfer_group {
            if row.transfer_group.as_deref() != Some(transfer_group.as_str()) {
                return false;
            }
        }
        if let Some(ref recurring_id) = self.recurring_id {
            if row.recurring_id.as_deref() != Some(recurring_id.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if row.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if row.date > to {
                return false;
            }
        }
        true
    }
}

/// Ordering over the composite sort key (date, created_at).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// Date ascending, insertion stamp ascending
    Oldest,
    /// Date descending, insertion stamp descending
    Newest,
}

/// Storage abstraction for the finance engine.
///
/// Allows the engine to work with any backend (PostgreSQL, SQLite,
/// in-memory, etc.). Batch methods are atomic: either every row in the
/// batch is applied or none is, and preconditions are checked before the
/// first write.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // --- accounts ---

    /// Save a new account
    async fn insert_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Get an account by id
    async fn account(&self, account_id: &str) -> LedgerResult<Option<Account>>;

    /// List all accounts
    async fn accounts(&self) -> LedgerResult<Vec<Account>>;

    /// Update an existing account
    async fn update_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Delete an account
    async fn delete_account(&mut self, account_id: &str) -> LedgerResult<()>;

    // --- categories ---

    /// Save a new category
    async fn insert_category(&mut self, category: &Category) -> LedgerResult<()>;

    /// Get a category by id
    async fn category(&self, category_id: &str) -> LedgerResult<Option<Category>>;

    /// List all categories
    async fn categories(&self) -> LedgerResult<Vec<Category>>;

    /// Update an existing category
    async fn update_category(&mut self, category: &Category) -> LedgerResult<()>;

    /// Delete a category
    async fn delete_category(&mut self, category_id: &str) -> LedgerResult<()>;

    // --- recurring templates ---

    /// Save a new recurring template
    async fn insert_recurring(&mut self, template: &RecurringExpense) -> LedgerResult<()>;

    /// Get a recurring template by id
    async fn recurring_template(&self, template_id: &str)
        -> LedgerResult<Option<RecurringExpense>>;

    /// List all recurring templates
    async fn recurring_templates(&self) -> LedgerResult<Vec<RecurringExpense>>;

    /// Update an existing recurring template
    async fn update_recurring(&mut self, template: &RecurringExpense) -> LedgerResult<()>;

    /// Delete a recurring template
    async fn delete_recurring(&mut self, template_id: &str) -> LedgerResult<()>;

    // --- transactions ---

    /// Insert a batch of rows atomically. The store assigns each row's
    /// insertion stamp; the returned rows are the stored copies.
    async fn insert_transactions(&mut self, rows: &[Transaction])
        -> LedgerResult<Vec<Transaction>>;

    /// Get a transaction by id
    async fn transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>>;

    /// List transactions matching a filter, ordered by (date, created_at)
    async fn transactions(
        &self,
        filter: &RowFilter,
        order: DateOrder,
    ) -> LedgerResult<Vec<Transaction>>;

    /// Sum of signed amounts over rows matching a filter
    async fn sum_amount(&self, filter: &RowFilter) -> LedgerResult<BigDecimal>;

    /// Update a batch of rows atomically. Fails without mutating if any
    /// row is missing.
    async fn update_transactions(&mut self, rows: &[Transaction]) -> LedgerResult<()>;

    /// Delete a batch of rows atomically. Fails without mutating if any
    /// row is missing.
    async fn delete_transactions(&mut self, transaction_ids: &[String]) -> LedgerResult<()>;
}
