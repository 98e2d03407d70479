//! Validation utilities

use crate::installment::{MAX_INSTALLMENTS, MIN_INSTALLMENTS};
use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that a monetary magnitude is strictly positive
pub fn validate_magnitude(magnitude: &BigDecimal) -> LedgerResult<()> {
    if *magnitude <= BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate an installment count against the supported range
pub fn validate_installment_count(count: u32) -> LedgerResult<()> {
    if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&count) {
        return Err(LedgerError::Validation(format!(
            "Installment count must be between {} and {}, got {}",
            MIN_INSTALLMENTS, MAX_INSTALLMENTS, count
        )));
    }
    Ok(())
}

/// Validate a recurring template's due day of month
pub fn validate_due_day(day: u32) -> LedgerResult<()> {
    if !(1..=31).contains(&day) {
        return Err(LedgerError::Validation(format!(
            "Due day must be between 1 and 31, got {}",
            day
        )));
    }
    Ok(())
}

/// Validate a calendar month number
pub fn validate_month(month: u32) -> LedgerResult<()> {
    if !(1..=12).contains(&month) {
        return Err(LedgerError::Validation(format!(
            "Month must be between 1 and 12, got {}",
            month
        )));
    }
    Ok(())
}

/// Validate that a description is usable
pub fn validate_description(description: &str) -> LedgerResult<()> {
    if description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Description cannot be empty".to_string(),
        ));
    }

    if description.len() > 500 {
        return Err(LedgerError::Validation(
            "Description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a name (account, category) is usable
pub fn validate_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation("Name cannot be empty".to_string()));
    }

    if name.len() > 100 {
        return Err(LedgerError::Validation(
            "Name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}
