//! Recurring monthly obligations: templates, pending detection, and
//! materialization into concrete ledger rows.

use bigdecimal::BigDecimal;
use log::debug;
use std::collections::HashSet;

use crate::calendar::{clamped_date, month_bounds};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{
    validate_description, validate_due_day, validate_magnitude, validate_month,
};

/// Manager for recurring expense templates.
pub struct RecurringManager<S: LedgerStore> {
    storage: S,
}

impl<S: LedgerStore> RecurringManager<S> {
    /// Create a new recurring manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create a new template
    pub async fn create_template(
        &mut self,
        description: String,
        amount: BigDecimal,
        kind: TransactionKind,
        day: u32,
        category_id: Option<String>,
        account_id: String,
    ) -> LedgerResult<RecurringExpense> {
        validate_description(&description)?;
        validate_magnitude(&amount)?;
        validate_due_day(day)?;

        if self.storage.account(&account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(account_id));
        }
        if let Some(ref category_id) = category_id {
            if self.storage.category(category_id).await?.is_none() {
                return Err(LedgerError::CategoryNotFound(category_id.clone()));
            }
        }

        let template =
            RecurringExpense::new(description, amount, kind, day, category_id, account_id);
        self.storage.insert_recurring(&template).await?;
        Ok(template)
    }

    /// Update an existing template
    pub async fn update_template(&mut self, template: &RecurringExpense) -> LedgerResult<()> {
        validate_description(&template.description)?;
        validate_magnitude(&template.amount)?;
        validate_due_day(template.day)?;

        if self.storage.account(&template.account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(template.account_id.clone()));
        }
        if let Some(ref category_id) = template.category_id {
            if self.storage.category(category_id).await?.is_none() {
                return Err(LedgerError::CategoryNotFound(category_id.clone()));
            }
        }

        self.storage.update_recurring(template).await
    }

    /// Delete a template. Deleting one that is already gone is a no-op.
    pub async fn delete_template(&mut self, template_id: &str) -> LedgerResult<()> {
        if self.storage.recurring_template(template_id).await?.is_none() {
            debug!("recurring template '{}' already gone", template_id);
            return Ok(());
        }
        self.storage.delete_recurring(template_id).await
    }

    /// Get a template by id
    pub async fn template(&self, template_id: &str) -> LedgerResult<Option<RecurringExpense>> {
        self.storage.recurring_template(template_id).await
    }

    /// List all templates
    pub async fn templates(&self) -> LedgerResult<Vec<RecurringExpense>> {
        self.storage.recurring_templates().await
    }

    /// Templates not yet materialized for a calendar month.
    ///
    /// A template counts as materialized when some transaction dated in
    /// the month links back to it. The result is re-derived on every
    /// call; deleting a materialized row makes its template pending
    /// again.
    pub async fn check_pending(
        &self,
        month: u32,
        year: i32,
    ) -> LedgerResult<Vec<RecurringExpense>> {
        validate_month(month)?;
        let (first, last) = month_bounds(year, month)
            .ok_or_else(|| LedgerError::Validation(format!("Invalid month {}-{}", year, month)))?;

        let templates = self.storage.recurring_templates().await?;
        if templates.is_empty() {
            return Ok(Vec::new());
        }

        let in_month = self
            .storage
            .transactions(
                &RowFilter {
                    date_from: Some(first),
                    date_to: Some(last),
                    ..Default::default()
                },
                DateOrder::Oldest,
            )
            .await?;
        let materialized: HashSet<&str> = in_month
            .iter()
            .filter_map(|row| row.recurring_id.as_deref())
            .collect();

        Ok(templates
            .into_iter()
            .filter(|template| !materialized.contains(template.id.as_str()))
            .collect())
    }

    /// Materialize the selected templates into one unpaid planned row
    /// each, dated by clamping the template's due day into the target
    /// month. All rows are inserted as one atomic batch; an unknown
    /// template id fails the whole call before anything is written.
    pub async fn materialize(
        &mut self,
        template_ids: &[String],
        month: u32,
        year: i32,
    ) -> LedgerResult<Vec<Transaction>> {
        validate_month(month)?;

        let mut rows = Vec::with_capacity(template_ids.len());
        for template_id in template_ids {
            let template = self
                .storage
                .recurring_template(template_id)
                .await?
                .ok_or_else(|| LedgerError::TemplateNotFound(template_id.clone()))?;

            let date = clamped_date(year, month, template.day).ok_or_else(|| {
                LedgerError::Validation(format!("Invalid month {}-{}", year, month))
            })?;

            let mut row = Transaction::new(
                template.description.clone(),
                template.kind,
                &template.amount,
                date,
                template.account_id.clone(),
                template.category_id.clone(),
                false,
            );
            row.recurring_id = Some(template.id.clone());
            rows.push(row);
        }

        self.storage.insert_transactions(&rows).await
    }
}
