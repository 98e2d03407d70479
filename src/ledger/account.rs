//! Account and category management

use bigdecimal::BigDecimal;
use log::debug;

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_name;

/// Icon used when a category is created without one
pub const DEFAULT_CATEGORY_ICON: &str = "📁";
/// Color used when a category is created without one
pub const DEFAULT_CATEGORY_COLOR: &str = "#64748b";

/// Manager for money accounts
pub struct AccountManager<S: LedgerStore> {
    storage: S,
}

impl<S: LedgerStore> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create a new account
    pub async fn create_account(
        &mut self,
        name: String,
        kind: AccountKind,
        base_balance: BigDecimal,
    ) -> LedgerResult<Account> {
        validate_name(&name)?;
        let account = Account::new(name, kind, base_balance);
        self.storage.insert_account(&account).await?;
        Ok(account)
    }

    /// Get an account by id
    pub async fn account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.storage.account(account_id).await
    }

    /// Get an account by id, erroring when absent
    pub async fn account_required(&self, account_id: &str) -> LedgerResult<Account> {
        self.storage
            .account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// List all accounts
    pub async fn accounts(&self) -> LedgerResult<Vec<Account>> {
        self.storage.accounts().await
    }

    /// Update an account
    pub async fn update_account(&mut self, account: &Account) -> LedgerResult<()> {
        validate_name(&account.name)?;
        self.storage.update_account(account).await
    }

    /// Delete an account. Refused while ledger rows still reference it;
    /// deleting one that is already gone is a no-op.
    pub async fn delete_account(&mut self, account_id: &str) -> LedgerResult<()> {
        if self.storage.account(account_id).await?.is_none() {
            debug!("account '{}' already gone", account_id);
            return Ok(());
        }

        let referencing = self
            .storage
            .transactions(
                &RowFilter {
                    account_id: Some(account_id.to_string()),
                    ..Default::default()
                },
                DateOrder::Oldest,
            )
            .await?;
        if !referencing.is_empty() {
            return Err(LedgerError::Validation(format!(
                "Account '{}' still has {} transactions",
                account_id,
                referencing.len()
            )));
        }

        self.storage.delete_account(account_id).await
    }
}

/// Manager for spending categories
pub struct CategoryManager<S: LedgerStore> {
    storage: S,
}

impl<S: LedgerStore> CategoryManager<S> {
    /// Create a new category manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create a new category. Blank icon or color fall back to the
    /// defaults.
    pub async fn create_category(
        &mut self,
        name: String,
        icon: String,
        color: String,
        kind: CategoryKind,
    ) -> LedgerResult<Category> {
        validate_name(&name)?;
        let icon = if icon.trim().is_empty() {
            DEFAULT_CATEGORY_ICON.to_string()
        } else {
            icon
        };
        let color = if color.trim().is_empty() {
            DEFAULT_CATEGORY_COLOR.to_string()
        } else {
            color
        };

        let category = Category::new(name, icon, color, kind);
        self.storage.insert_category(&category).await?;
        Ok(category)
    }

    /// Get a category by id
    pub async fn category(&self, category_id: &str) -> LedgerResult<Option<Category>> {
        self.storage.category(category_id).await
    }

    /// List all categories
    pub async fn categories(&self) -> LedgerResult<Vec<Category>> {
        self.storage.categories().await
    }

    /// Update a category
    pub async fn update_category(&mut self, category: &Category) -> LedgerResult<()> {
        validate_name(&category.name)?;
        self.storage.update_category(category).await
    }

    /// Delete a category. Rows referencing it keep their (now dangling)
    /// category id; deleting one that is already gone is a no-op.
    pub async fn delete_category(&mut self, category_id: &str) -> LedgerResult<()> {
        if self.storage.category(category_id).await?.is_none() {
            debug!("category '{}' already gone", category_id);
            return Ok(());
        }
        self.storage.delete_category(category_id).await
    }
}
