//! Derived balances and category statistics.
//!
//! Nothing here is cached or persisted: every read recomputes from the
//! account's opening balance plus its source rows, so any interrupted
//! multi-step write is visible and correct on the very next read.

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::traits::*;
use crate::types::*;

/// Spending/repayment totals for one calendar month of a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    /// Sum of expense magnitudes in the month
    pub debt: BigDecimal,
    /// Sum of income received in the month
    pub paid: BigDecimal,
    /// debt - paid
    pub balance: BigDecimal,
}

/// On-demand statistics for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category_id: String,
    /// Sum of expense magnitudes over the category's whole history
    pub total_spent: BigDecimal,
    /// Sum of income over the whole history
    pub total_paid: BigDecimal,
    /// Outstanding debt, floored at zero
    pub total_accumulated: BigDecimal,
    /// Net debt of the selected month, floored at zero
    pub month_debt: BigDecimal,
    /// Per-month history, oldest first
    pub months: Vec<MonthBucket>,
}

/// Computes balances and statistics by aggregating ledger rows.
pub struct BalanceAggregator<S: LedgerStore> {
    storage: S,
}

impl<S: LedgerStore> BalanceAggregator<S> {
    /// Create a new aggregator over the given storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Balance of one account as of a date: opening balance plus every
    /// paid row dated up to `as_of`, excluding reimbursed expenses. A
    /// reimbursed expense's cost is absorbed by its reimbursement
    /// income and must stop reducing the paying account's balance.
    pub async fn account_balance(
        &self,
        account_id: &str,
        as_of: NaiveDate,
    ) -> LedgerResult<BigDecimal> {
        let account = self
            .storage
            .account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        let movement = self
            .storage
            .sum_amount(&RowFilter {
                account_id: Some(account_id.to_string()),
                is_paid: Some(true),
                is_reimbursed: Some(false),
                date_to: Some(as_of),
                ..Default::default()
            })
            .await?;

        Ok(account.base_balance + movement)
    }

    /// Sum of all account balances as of a date
    pub async fn portfolio_balance(&self, as_of: NaiveDate) -> LedgerResult<BigDecimal> {
        let mut total = BigDecimal::from(0);
        for account in self.storage.accounts().await? {
            total += self.account_balance(&account.id, as_of).await?;
        }
        Ok(total)
    }

    /// Per-month debt/repayment statistics for a category, plus the net
    /// debt of the selected month. One pass over the category's rows.
    pub async fn category_stats(
        &self,
        category_id: &str,
        month: u32,
        year: i32,
    ) -> LedgerResult<CategoryStats> {
        crate::utils::validation::validate_month(month)?;
        if self.storage.category(category_id).await?.is_none() {
            return Err(LedgerError::CategoryNotFound(category_id.to_string()));
        }

        let rows = self
            .storage
            .transactions(
                &RowFilter {
                    category_id: Some(category_id.to_string()),
                    ..Default::default()
                },
                DateOrder::Oldest,
            )
            .await?;

        let zero = BigDecimal::from(0);
        let mut buckets: BTreeMap<(i32, u32), (BigDecimal, BigDecimal)> = BTreeMap::new();
        let mut total_spent = zero.clone();
        let mut total_paid = zero.clone();
        let mut month_expenses = zero.clone();
        let mut month_incomes = zero.clone();

        for row in &rows {
            let key = (row.date.year(), row.date.month());
            let bucket = buckets.entry(key).or_insert_with(|| (zero.clone(), zero.clone()));
            let in_selected_month = key == (year, month);

            match row.kind {
                TransactionKind::Expense => {
                    let cost = row.cost();
                    total_spent += &cost;
                    bucket.0 += &cost;
                    if in_selected_month {
                        month_expenses += &cost;
                    }
                }
                TransactionKind::Income => {
                    total_paid += &row.amount;
                    bucket.1 += &row.amount;
                    if in_selected_month {
                        month_incomes += &row.amount;
                    }
                }
            }
        }

        let months = buckets
            .into_iter()
            .map(|((year, month), (debt, paid))| {
                let balance = &debt - &paid;
                MonthBucket {
                    year,
                    month,
                    debt,
                    paid,
                    balance,
                }
            })
            .collect();

        let accumulated = &total_spent - &total_paid;
        let month_net = month_expenses - month_incomes;

        Ok(CategoryStats {
            category_id: category_id.to_string(),
            total_spent,
            total_paid,
            total_accumulated: if accumulated > zero { accumulated } else { zero.clone() },
            month_debt: if month_net > zero { month_net } else { zero },
            months,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup() -> (MemoryStore, Account, Category) {
        let mut store = MemoryStore::new();
        let account = Account::new(
            "Checking".to_string(),
            AccountKind::Checking,
            BigDecimal::from(1000),
        );
        store.insert_account(&account).await.unwrap();
        let category = Category::new(
            "Dinners for Alex".to_string(),
            "🍕".to_string(),
            "#a855f7".to_string(),
            CategoryKind::Reimbursable,
        );
        store.insert_category(&category).await.unwrap();
        (store, account, category)
    }

    async fn insert_row(
        store: &mut MemoryStore,
        account_id: &str,
        category_id: Option<&str>,
        amount: i64,
        on: NaiveDate,
        is_paid: bool,
    ) -> Transaction {
        let kind = if amount < 0 {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        };
        let row = Transaction::new(
            format!("row {}", amount),
            kind,
            &BigDecimal::from(amount.abs()),
            on,
            account_id.to_string(),
            category_id.map(|c| c.to_string()),
            is_paid,
        );
        store.insert_transactions(&[row]).await.unwrap()[0].clone()
    }

    #[tokio::test]
    async fn balance_is_base_plus_paid_rows_up_to_date() {
        let (mut store, account, _) = setup().await;
        insert_row(&mut store, &account.id, None, -200, date(2025, 1, 10), true).await;
        insert_row(&mut store, &account.id, None, 500, date(2025, 1, 15), true).await;
        // Planned row and future row are both excluded
        insert_row(&mut store, &account.id, None, -50, date(2025, 1, 20), false).await;
        insert_row(&mut store, &account.id, None, -75, date(2025, 3, 1), true).await;

        let aggregator = BalanceAggregator::new(store);
        let balance = aggregator
            .account_balance(&account.id, date(2025, 1, 31))
            .await
            .unwrap();
        assert_eq!(balance, BigDecimal::from(1300));
    }

    #[tokio::test]
    async fn reimbursed_expense_round_trips_out_and_back_into_balance() {
        let (mut store, account, category) = setup().await;
        let row = insert_row(
            &mut store,
            &account.id,
            Some(&category.id),
            -100,
            date(2025, 1, 10),
            true,
        )
        .await;

        let aggregator = BalanceAggregator::new(store.clone());
        let as_of = date(2025, 1, 31);
        assert_eq!(
            aggregator.account_balance(&account.id, as_of).await.unwrap(),
            BigDecimal::from(900)
        );

        let mut settled = row.clone();
        settled.is_reimbursed = true;
        store.update_transactions(&[settled.clone()]).await.unwrap();
        assert_eq!(
            aggregator.account_balance(&account.id, as_of).await.unwrap(),
            BigDecimal::from(1000)
        );

        settled.is_reimbursed = false;
        store.update_transactions(&[settled]).await.unwrap();
        assert_eq!(
            aggregator.account_balance(&account.id, as_of).await.unwrap(),
            BigDecimal::from(900)
        );
    }

    #[tokio::test]
    async fn portfolio_balance_sums_every_account() {
        let (mut store, first, _) = setup().await;
        let second = Account::new(
            "Wallet".to_string(),
            AccountKind::Wallet,
            BigDecimal::from(50),
        );
        store.insert_account(&second).await.unwrap();
        insert_row(&mut store, &first.id, None, -300, date(2025, 1, 5), true).await;
        insert_row(&mut store, &second.id, None, 25, date(2025, 1, 6), true).await;

        let aggregator = BalanceAggregator::new(store);
        assert_eq!(
            aggregator.portfolio_balance(date(2025, 1, 31)).await.unwrap(),
            BigDecimal::from(775)
        );
    }

    #[tokio::test]
    async fn category_stats_buckets_by_month_and_floors_at_zero() {
        let (mut store, account, category) = setup().await;
        insert_row(&mut store, &account.id, Some(&category.id), -80, date(2025, 1, 10), true).await;
        insert_row(&mut store, &account.id, Some(&category.id), -20, date(2025, 1, 22), true).await;
        insert_row(&mut store, &account.id, Some(&category.id), 60, date(2025, 2, 3), true).await;
        insert_row(&mut store, &account.id, Some(&category.id), -10, date(2025, 2, 14), true).await;

        let aggregator = BalanceAggregator::new(store);
        let stats = aggregator.category_stats(&category.id, 2, 2025).await.unwrap();

        assert_eq!(stats.total_spent, BigDecimal::from(110));
        assert_eq!(stats.total_paid, BigDecimal::from(60));
        assert_eq!(stats.total_accumulated, BigDecimal::from(50));
        // February received more than it spent; net debt floors at zero
        assert_eq!(stats.month_debt, BigDecimal::from(0));

        assert_eq!(stats.months.len(), 2);
        assert_eq!(stats.months[0].year, 2025);
        assert_eq!(stats.months[0].month, 1);
        assert_eq!(stats.months[0].debt, BigDecimal::from(100));
        assert_eq!(stats.months[0].paid, BigDecimal::from(0));
        assert_eq!(stats.months[1].balance, BigDecimal::from(-50));
    }

    #[tokio::test]
    async fn overpaid_category_reports_zero_accumulated_debt() {
        let (mut store, account, category) = setup().await;
        insert_row(&mut store, &account.id, Some(&category.id), -30, date(2025, 1, 10), true).await;
        insert_row(&mut store, &account.id, Some(&category.id), 90, date(2025, 1, 20), true).await;

        let aggregator = BalanceAggregator::new(store);
        let stats = aggregator.category_stats(&category.id, 1, 2025).await.unwrap();
        assert_eq!(stats.total_accumulated, BigDecimal::from(0));
    }

    #[tokio::test]
    async fn unknown_account_or_category_errors() {
        let (store, _, _) = setup().await;
        let aggregator = BalanceAggregator::new(store);
        assert!(matches!(
            aggregator.account_balance("ghost", date(2025, 1, 1)).await,
            Err(LedgerError::AccountNotFound(_))
        ));
        assert!(matches!(
            aggregator.category_stats("ghost", 1, 2025).await,
            Err(LedgerError::CategoryNotFound(_))
        ));
    }
}
