//! Error types shared across the engine.
//!
//! Validation failures are reported before any computation takes place.
//! Table errors surface when statutory data fails to parse or breaks one
//! of the structural rules checked on load.

use crate::models::{CarePeriod, ParentId};
use thiserror::Error;

/// The input cannot be assessed as supplied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{parent} adjusted taxable income must be a finite, non-negative amount (got {value})")]
    InvalidIncome { parent: ParentId, value: f64 },
    #[error("at least one child is required")]
    NoChildren,
    #[error("child {index} is aged {age}; only children under 18 can be assessed")]
    ChildTooOld { index: usize, age: u8 },
    #[error("child {index} has a negative or non-finite care amount")]
    InvalidCare { index: usize },
    #[error("child {index} has care amounts totalling {total} but a {period} cycle is {expected}")]
    CareTotal {
        index: usize,
        total: f64,
        expected: f64,
        period: CarePeriod,
    },
    #[error("child {index} has non-parent carer nights but no non-parent carer is involved")]
    UnexpectedCarerCare { index: usize },
    #[error("{nights} nights do not fit a care cycle of {cycle}")]
    CareOutOfRange { nights: f64, cycle: f64 },
    #[error("{parent} lists an other-case child aged {age}; only children under 18 count")]
    OtherCaseChildTooOld { parent: ParentId, age: u8 },
    #[error("no statutory tables are available for assessment year {0}")]
    UnknownYear(String),
}

/// Statutory table data could not be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("failed to parse statutory tables from {source_name}: {message}")]
    Parse { source_name: String, message: String },
    #[error("statutory tables for {year} are invalid: {reason}")]
    Invalid { year: String, reason: String },
}

impl TableError {
    pub(crate) fn invalid(year: &str, reason: impl Into<String>) -> Self {
        TableError::Invalid {
            year: year.to_string(),
            reason: reason.into(),
        }
    }
}

/// Anything that stops `calculate_assessment` from producing an outcome.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Tables(#[from] TableError),
}
