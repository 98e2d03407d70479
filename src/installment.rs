//! Installment expansion: one purchase split into N dated rows.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::calendar::add_months_clamped;
use crate::types::*;
use crate::utils::validation::{
    validate_description, validate_installment_count, validate_magnitude,
};

/// Minimum number of installments for a purchase
pub const MIN_INSTALLMENTS: u32 = 1;
/// Maximum number of installments for a purchase
pub const MAX_INSTALLMENTS: u32 = 48;

/// Input for creating a transaction, possibly spread over several months.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub description: String,
    /// Unsigned magnitude; the sign is applied from `kind`
    pub amount: BigDecimal,
    pub kind: TransactionKind,
    /// Date of the purchase; installment i lands i months later
    pub date: NaiveDate,
    pub account_id: String,
    pub category_id: Option<String>,
    /// Paid flag for the first row; later installments always start
    /// planned
    pub is_paid: bool,
    /// Number of monthly rows, 1-48
    pub installments: u32,
}

/// Expand a draft into its ledger rows.
///
/// A single-installment draft yields one plain row. A multi-installment
/// draft yields one row per month sharing a fresh group key, each dated
/// by calendar-safe month addition (a start day that overflows the
/// target month is clamped to that month's last day) and suffixed with
/// its "(k/n)" position. Only the first row inherits the caller's paid
/// flag.
///
/// Referenced account/category existence is the caller's concern; this
/// function validates shape only.
pub fn expand_installments(draft: &TransactionDraft) -> LedgerResult<Vec<Transaction>> {
    validate_description(&draft.description)?;
    validate_magnitude(&draft.amount)?;
    validate_installment_count(draft.installments)?;

    if draft.installments == 1 {
        return Ok(vec![Transaction::new(
            draft.description.clone(),
            draft.kind,
            &draft.amount,
            draft.date,
            draft.account_id.clone(),
            draft.category_id.clone(),
            draft.is_paid,
        )]);
    }

    let group_id = Uuid::new_v4().to_string();
    let mut rows = Vec::with_capacity(draft.installments as usize);

    for i in 0..draft.installments {
        let date = add_months_clamped(draft.date, i).ok_or_else(|| {
            LedgerError::Validation(format!(
                "Installment date out of range: {} + {} months",
                draft.date, i
            ))
        })?;
        let label = format!("{}/{}", i + 1, draft.installments);

        let mut row = Transaction::new(
            format!("{} ({})", draft.description, label),
            draft.kind,
            &draft.amount,
            date,
            draft.account_id.clone(),
            draft.category_id.clone(),
            i == 0 && draft.is_paid,
        );
        row.installment_id = Some(group_id.clone());
        row.installment_label = Some(label);
        rows.push(row);
    }

    Ok(rows)
}

/// Strip an installment suffix from an edited description, recovering
/// the shared base text. "Smart TV (1/10)" with label "1/10" becomes
/// "Smart TV"; a description without the suffix is returned unchanged.
pub fn base_description(description: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => description
            .strip_suffix(&format!(" ({})", label))
            .unwrap_or(description)
            .to_string(),
        None => description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(installments: u32) -> TransactionDraft {
        TransactionDraft {
            description: "PS5".to_string(),
            amount: BigDecimal::from(500),
            kind: TransactionKind::Expense,
            date: date(2025, 1, 31),
            account_id: "acc".to_string(),
            category_id: None,
            is_paid: true,
            installments,
        }
    }

    #[test]
    fn single_installment_is_a_plain_row() {
        let rows = expand_installments(&draft(1)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "PS5");
        assert!(rows[0].installment_id.is_none());
        assert!(rows[0].installment_label.is_none());
        assert!(rows[0].is_paid);
    }

    #[test]
    fn installment_dates_clamp_to_end_of_month() {
        let rows = expand_installments(&draft(3)).unwrap();
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31)]
        );
    }

    #[test]
    fn only_first_installment_inherits_paid_flag() {
        let rows = expand_installments(&draft(3)).unwrap();
        assert!(rows[0].is_paid);
        assert!(!rows[1].is_paid);
        assert!(!rows[2].is_paid);
    }

    #[test]
    fn siblings_share_group_and_carry_unique_labels() {
        let rows = expand_installments(&draft(3)).unwrap();
        let group = rows[0].installment_id.clone().unwrap();
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.installment_id.as_deref(), Some(group.as_str()));
            assert_eq!(
                row.installment_label.as_deref(),
                Some(format!("{}/3", i + 1).as_str())
            );
            assert_eq!(row.description, format!("PS5 ({}/3)", i + 1));
            assert_eq!(row.amount, BigDecimal::from(-500));
        }
    }

    #[test]
    fn rejects_bad_magnitude_and_count() {
        let mut zero = draft(2);
        zero.amount = BigDecimal::from(0);
        assert!(expand_installments(&zero).is_err());

        assert!(expand_installments(&draft(0)).is_err());
        assert!(expand_installments(&draft(49)).is_err());
    }

    #[test]
    fn base_description_strips_only_the_suffix() {
        assert_eq!(base_description("Smart TV (1/10)", Some("1/10")), "Smart TV");
        assert_eq!(base_description("Smart TV", Some("1/10")), "Smart TV");
        assert_eq!(base_description("Groceries", None), "Groceries");
    }
}
