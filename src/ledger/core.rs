//! Main ledger orchestrator that coordinates accounts, categories,
//! transactions, recurring obligations, transfers, and reconciliation.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use log::debug;

use crate::installment::TransactionDraft;
use crate::ledger::{AccountManager, CategoryManager, DeleteMode, TransactionManager, TransactionUpdate};
use crate::reconciliation::{ReconcileOutcome, ReconciliationEngine};
use crate::recurring::RecurringManager;
use crate::reports::{BalanceAggregator, CategoryStats};
use crate::transfer::TransferCoordinator;
use crate::traits::*;
use crate::types::*;

/// The finance engine's front door.
///
/// Composes the managers over a shared storage backend and runs the
/// reconciliation engine after every mutation that can move a
/// reimbursable category's income or settled totals.
pub struct Ledger<S: LedgerStore> {
    accounts: AccountManager<S>,
    categories: CategoryManager<S>,
    transactions: TransactionManager<S>,
    recurring: RecurringManager<S>,
    transfers: TransferCoordinator<S>,
    aggregator: BalanceAggregator<S>,
    reconciler: ReconciliationEngine<S>,
}

impl<S: LedgerStore + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            accounts: AccountManager::new(storage.clone()),
            categories: CategoryManager::new(storage.clone()),
            transactions: TransactionManager::new(storage.clone()),
            recurring: RecurringManager::new(storage.clone()),
            transfers: TransferCoordinator::new(storage.clone()),
            aggregator: BalanceAggregator::new(storage.clone()),
            reconciler: ReconciliationEngine::new(storage),
        }
    }

    /// Reconcile a category when it exists and is reimbursable. Used as
    /// the post-mutation hook; quietly skips dangling category ids.
    async fn reconcile_if_reimbursable(
        &mut self,
        category_id: Option<&str>,
    ) -> LedgerResult<Option<ReconcileOutcome>> {
        let Some(category_id) = category_id else {
            return Ok(None);
        };
        match self.categories.category(category_id).await? {
            Some(category) if category.is_reimbursable() => {
                Ok(Some(self.reconciler.reconcile(category_id).await?))
            }
            Some(_) => Ok(None),
            None => {
                debug!("category '{}' gone, skipping reconciliation", category_id);
                Ok(None)
            }
        }
    }

    // Account operations

    /// Create a new account
    pub async fn create_account(
        &mut self,
        name: String,
        kind: AccountKind,
        base_balance: BigDecimal,
    ) -> LedgerResult<Account> {
        self.accounts.create_account(name, kind, base_balance).await
    }

    /// Get an account by id
    pub async fn account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.accounts.account(account_id).await
    }

    /// List all accounts
    pub async fn accounts(&self) -> LedgerResult<Vec<Account>> {
        self.accounts.accounts().await
    }

    /// Update an account
    pub async fn update_account(&mut self, account: &Account) -> LedgerResult<()> {
        self.accounts.update_account(account).await
    }

    /// Delete an account without transactions
    pub async fn delete_account(&mut self, account_id: &str) -> LedgerResult<()> {
        self.accounts.delete_account(account_id).await
    }

    // Category operations

    /// Create a new category
    pub async fn create_category(
        &mut self,
        name: String,
        icon: String,
        color: String,
        kind: CategoryKind,
    ) -> LedgerResult<Category> {
        self.categories.create_category(name, icon, color, kind).await
    }

    /// Get a category by id
    pub async fn category(&self, category_id: &str) -> LedgerResult<Option<Category>> {
        self.categories.category(category_id).await
    }

    /// List all categories
    pub async fn categories(&self) -> LedgerResult<Vec<Category>> {
        self.categories.categories().await
    }

    /// Update a category. A kind change moves its expenses in or out of
    /// reconciliation's reach: a now-reimbursable category is reconciled
    /// immediately, a now-personal one has its settled marks released.
    pub async fn update_category(&mut self, category: &Category) -> LedgerResult<()> {
        self.categories.update_category(category).await?;
        match category.kind {
            CategoryKind::Reimbursable => {
                self.reconcile_if_reimbursable(Some(category.id.as_str()))
                    .await?;
            }
            CategoryKind::Personal => {
                self.reconciler.release(&category.id).await?;
            }
        }
        Ok(())
    }

    /// Delete a category
    pub async fn delete_category(&mut self, category_id: &str) -> LedgerResult<()> {
        self.categories.delete_category(category_id).await
    }

    // Transaction operations

    /// Create a transaction, expanding installments into their monthly
    /// rows. Reconciles the category afterwards when it is reimbursable.
    pub async fn create_transaction(
        &mut self,
        draft: &TransactionDraft,
    ) -> LedgerResult<Vec<Transaction>> {
        let rows = self.transactions.create(draft).await?;
        self.reconcile_if_reimbursable(draft.category_id.as_deref())
            .await?;
        Ok(rows)
    }

    /// Get a transaction by id
    pub async fn transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>> {
        self.transactions.transaction(transaction_id).await
    }

    /// List transactions matching a filter
    pub async fn transactions(
        &self,
        filter: &RowFilter,
        order: DateOrder,
    ) -> LedgerResult<Vec<Transaction>> {
        self.transactions.transactions(filter, order).await
    }

    /// Edit a transaction (and, for installment rows, its group).
    /// Reconciles the categories the row moved between.
    pub async fn update_transaction(
        &mut self,
        update: &TransactionUpdate,
    ) -> LedgerResult<Vec<Transaction>> {
        let original = self.transactions.transaction_required(&update.id).await?;
        let rows = self.transactions.apply_update(update).await?;

        self.reconcile_if_reimbursable(original.category_id.as_deref())
            .await?;
        if update.category_id != original.category_id {
            self.reconcile_if_reimbursable(update.category_id.as_deref())
                .await?;
        }
        Ok(rows)
    }

    /// Toggle a row between planned and consolidated. Does not touch
    /// reconciliation: the paid flag is not part of either reconciled
    /// total.
    pub async fn set_paid(
        &mut self,
        transaction_id: &str,
        is_paid: bool,
    ) -> LedgerResult<Transaction> {
        self.transactions.set_paid(transaction_id, is_paid).await
    }

    /// Delete a transaction.
    ///
    /// A transfer row takes its twin with it; `DeleteMode::Group`
    /// removes a whole installment group. Deleting an id that is
    /// already gone is a quiet no-op. Affected reimbursable categories
    /// are reconciled afterwards, since removing reimbursement income
    /// may force previously settled expenses back to unsettled.
    pub async fn delete_transaction(
        &mut self,
        transaction_id: &str,
        mode: DeleteMode,
    ) -> LedgerResult<usize> {
        let Some(row) = self.transactions.transaction(transaction_id).await? else {
            debug!("transaction '{}' already gone", transaction_id);
            return Ok(0);
        };

        let removed = match row.transfer_group {
            Some(ref group) => self.transfers.delete_group(group).await?,
            None => self.transactions.delete(&row, mode).await?.len(),
        };

        self.reconcile_if_reimbursable(row.category_id.as_deref())
            .await?;
        Ok(removed)
    }

    // Reimbursement operations

    /// Register a reimbursement payment against a reimbursable
    /// category: inserts one paid income row, then reconciles. The two
    /// steps are separate atomic commits; if the second is lost, the
    /// next reconciliation of the category settles the same state.
    pub async fn register_reimbursement(
        &mut self,
        category_id: &str,
        account_id: &str,
        amount: &BigDecimal,
        description: &str,
        date: NaiveDate,
    ) -> LedgerResult<(Transaction, ReconcileOutcome)> {
        let category = self
            .categories
            .category(category_id)
            .await?
            .ok_or_else(|| LedgerError::CategoryNotFound(category_id.to_string()))?;
        if !category.is_reimbursable() {
            return Err(LedgerError::Validation(format!(
                "Category '{}' does not track reimbursable expenses",
                category.name
            )));
        }

        let rows = self
            .transactions
            .create(&TransactionDraft {
                description: format!("Reimbursement: {}", description),
                amount: amount.clone(),
                kind: TransactionKind::Income,
                date,
                account_id: account_id.to_string(),
                category_id: Some(category_id.to_string()),
                is_paid: true,
                installments: 1,
            })
            .await?;

        let outcome = self.reconciler.reconcile(category_id).await?;
        let row = rows.into_iter().next().ok_or_else(|| {
            LedgerError::Storage("Reimbursement batch returned no row".to_string())
        })?;
        Ok((row, outcome))
    }

    /// Manually reconcile one category
    pub async fn reconcile_category(&mut self, category_id: &str) -> LedgerResult<ReconcileOutcome> {
        self.reconciler.reconcile(category_id).await
    }

    // Recurring operations

    /// Create a recurring template
    pub async fn create_recurring(
        &mut self,
        description: String,
        amount: BigDecimal,
        kind: TransactionKind,
        day: u32,
        category_id: Option<String>,
        account_id: String,
    ) -> LedgerResult<RecurringExpense> {
        self.recurring
            .create_template(description, amount, kind, day, category_id, account_id)
            .await
    }

    /// Update a recurring template
    pub async fn update_recurring(&mut self, template: &RecurringExpense) -> LedgerResult<()> {
        self.recurring.update_template(template).await
    }

    /// Delete a recurring template
    pub async fn delete_recurring(&mut self, template_id: &str) -> LedgerResult<()> {
        self.recurring.delete_template(template_id).await
    }

    /// List all recurring templates
    pub async fn recurring_templates(&self) -> LedgerResult<Vec<RecurringExpense>> {
        self.recurring.templates().await
    }

    /// Templates with no materialized row in the given month
    pub async fn check_pending_recurring(
        &self,
        month: u32,
        year: i32,
    ) -> LedgerResult<Vec<RecurringExpense>> {
        self.recurring.check_pending(month, year).await
    }

    /// Materialize the selected templates for a month, then reconcile
    /// every reimbursable category that received a row.
    pub async fn materialize_recurring(
        &mut self,
        template_ids: &[String],
        month: u32,
        year: i32,
    ) -> LedgerResult<Vec<Transaction>> {
        let rows = self.recurring.materialize(template_ids, month, year).await?;

        let mut seen = std::collections::HashSet::new();
        for row in &rows {
            if let Some(ref category_id) = row.category_id {
                if seen.insert(category_id.clone()) {
                    self.reconcile_if_reimbursable(Some(category_id.as_str()))
                        .await?;
                }
            }
        }
        Ok(rows)
    }

    // Transfer operations

    /// Move money between two accounts as an atomic twin-row pair
    pub async fn create_transfer(
        &mut self,
        amount: &BigDecimal,
        from_account_id: &str,
        to_account_id: &str,
        date: NaiveDate,
        description: &str,
    ) -> LedgerResult<(Transaction, Transaction)> {
        self.transfers
            .create_transfer(amount, from_account_id, to_account_id, date, description)
            .await
    }

    // Balance and statistics operations

    /// Balance of one account as of a date
    pub async fn account_balance(
        &self,
        account_id: &str,
        as_of: NaiveDate,
    ) -> LedgerResult<BigDecimal> {
        self.aggregator.account_balance(account_id, as_of).await
    }

    /// Sum of all account balances as of a date
    pub async fn portfolio_balance(&self, as_of: NaiveDate) -> LedgerResult<BigDecimal> {
        self.aggregator.portfolio_balance(as_of).await
    }

    /// Per-month statistics for a category
    pub async fn category_stats(
        &self,
        category_id: &str,
        month: u32,
        year: i32,
    ) -> LedgerResult<CategoryStats> {
        self.aggregator.category_stats(category_id, month, year).await
    }
}
