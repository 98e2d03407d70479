//! Core types and data structures for the finance engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of money accounts a ledger row can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Everyday checking account
    Checking,
    /// Physical cash wallet
    Wallet,
    /// Brokerage or long-term investment account
    Investment,
    /// Savings account
    Savings,
}

/// Whether a category tracks personal spending or spending made on behalf
/// of someone else (pending reimbursement).
///
/// Reconciliation only ever runs for `Reimbursable` categories; modeling
/// this as an enum keeps the settle/unsettle path unreachable for
/// personal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Personal,
    Reimbursable,
}

/// Direction of a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Outflow; stored amount is negative
    Expense,
    /// Inflow; stored amount is positive
    Income,
}

impl TransactionKind {
    /// Apply this kind's sign convention to an unsigned magnitude.
    pub fn signed(&self, magnitude: &BigDecimal) -> BigDecimal {
        match self {
            TransactionKind::Expense => -magnitude.abs(),
            TransactionKind::Income => magnitude.abs(),
        }
    }

    /// Whether a stored amount agrees with this kind's sign convention.
    pub fn matches_sign(&self, amount: &BigDecimal) -> bool {
        match self {
            TransactionKind::Expense => *amount <= BigDecimal::from(0),
            TransactionKind::Income => *amount >= BigDecimal::from(0),
        }
    }
}

/// A money account. Accounts never own transactions; rows reference them
/// by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Human-readable account name
    pub name: String,
    /// Kind of account
    pub kind: AccountKind,
    /// Signed opening balance, before any ledger rows
    pub base_balance: BigDecimal,
    /// When the account was created
    pub created_at: NaiveDateTime,
}

impl Account {
    /// Create a new account with a generated id
    pub fn new(name: String, kind: AccountKind, base_balance: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            kind,
            base_balance,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// A spending category, referenced by transactions and recurring
/// templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier for the category
    pub id: String,
    /// Human-readable category name
    pub name: String,
    /// Display icon (emoji)
    pub icon: String,
    /// Display color (hex)
    pub color: String,
    /// Personal spending or reimbursable third-party spending
    pub kind: CategoryKind,
    /// When the category was created
    pub created_at: NaiveDateTime,
}

impl Category {
    /// Create a new category with a generated id
    pub fn new(name: String, icon: String, color: String, kind: CategoryKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            icon,
            color,
            kind,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Whether expenses in this category await reimbursement
    pub fn is_reimbursable(&self) -> bool {
        self.kind == CategoryKind::Reimbursable
    }
}

/// One signed ledger row tied to an account and optionally a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for the row
    pub id: String,
    /// Description shown to the user; installment rows carry a "(k/n)"
    /// suffix
    pub description: String,
    /// Signed amount; negative = expense, positive = income. The sign
    /// always agrees with `kind`.
    pub amount: BigDecimal,
    /// Direction of the row
    pub kind: TransactionKind,
    /// Date the row falls on
    pub date: NaiveDate,
    /// Consolidated (true) vs planned/future (false)
    pub is_paid: bool,
    /// Settled by reimbursement income. Meaningful only on expense rows
    /// in a reimbursable category; owned by the reconciliation engine.
    pub is_reimbursed: bool,
    /// Group key shared by sibling installment rows
    pub installment_id: Option<String>,
    /// "k/n" position within the installment group
    pub installment_label: Option<String>,
    /// Group key linking the two rows of an inter-account transfer
    pub transfer_group: Option<String>,
    /// Id of the recurring template this row was materialized from
    pub recurring_id: Option<String>,
    /// Owning account
    pub account_id: String,
    /// Owning category, if any
    pub category_id: Option<String>,
    /// Insertion stamp, assigned by the store. Strictly increasing per
    /// insertion; used only as an ordering tie-break.
    pub created_at: NaiveDateTime,
}

impl Transaction {
    /// Create a plain row from an unsigned magnitude, signing the amount
    /// by `kind`.
    pub fn new(
        description: String,
        kind: TransactionKind,
        magnitude: &BigDecimal,
        date: NaiveDate,
        account_id: String,
        category_id: Option<String>,
        is_paid: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description,
            amount: kind.signed(magnitude),
            kind,
            date,
            is_paid,
            is_reimbursed: false,
            installment_id: None,
            installment_label: None,
            transfer_group: None,
            recurring_id: None,
            account_id,
            category_id,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Absolute value of the row's amount
    pub fn cost(&self) -> BigDecimal {
        self.amount.abs()
    }
}

/// Template for a monthly recurring obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringExpense {
    /// Unique identifier for the template
    pub id: String,
    /// Description copied onto materialized rows
    pub description: String,
    /// Unsigned magnitude; the sign is applied from `kind` at
    /// materialization time
    pub amount: BigDecimal,
    /// Direction of the materialized rows
    pub kind: TransactionKind,
    /// Due day of month, 1-31. Clamped to the target month's last day
    /// when that day does not exist.
    pub day: u32,
    /// Category for materialized rows, if any
    pub category_id: Option<String>,
    /// Account for materialized rows
    pub account_id: String,
    /// When the template was created
    pub created_at: NaiveDateTime,
}

impl RecurringExpense {
    /// Create a new template with a generated id
    pub fn new(
        description: String,
        amount: BigDecimal,
        kind: TransactionKind,
        day: u32,
        category_id: Option<String>,
        account_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description,
            amount: amount.abs(),
            kind,
            day,
            category_id,
            account_id,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Errors that can occur in the finance engine
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Category not found: {0}")]
    CategoryNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Recurring template not found: {0}")]
    TemplateNotFound(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_signed_by_kind() {
        let magnitude = BigDecimal::from(25);
        assert_eq!(
            TransactionKind::Expense.signed(&magnitude),
            BigDecimal::from(-25)
        );
        assert_eq!(
            TransactionKind::Income.signed(&magnitude),
            BigDecimal::from(25)
        );
        // Already-negative input is treated as a magnitude
        assert_eq!(
            TransactionKind::Income.signed(&BigDecimal::from(-25)),
            BigDecimal::from(25)
        );
    }

    #[test]
    fn rows_always_agree_with_their_kind() {
        let row = Transaction::new(
            "Coffee".to_string(),
            TransactionKind::Expense,
            &BigDecimal::from(5),
            chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            "acc".to_string(),
            None,
            true,
        );
        assert!(row.kind.matches_sign(&row.amount));
        assert!(!TransactionKind::Income.matches_sign(&row.amount));
        assert_eq!(row.cost(), BigDecimal::from(5));
    }
}
