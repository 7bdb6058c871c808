//! Support Engine library crate.
//!
//! This crate exposes an Australian child support assessment engine and a
//! lead scoring classifier as reusable modules.  External applications may
//! depend on the `support_engine` crate and call [`calculate_assessment`]
//! directly, hold an [`engine::Assessor`] over their own statutory tables,
//! or embed the HTTP API via [`api::build_router`].

pub mod models;
pub mod error;
pub mod tables;
pub mod care;
pub mod income;
pub mod jurisdiction;
pub mod rates;
pub mod engine;
pub mod scoring;
pub mod zero_payment;
pub mod config;
pub mod telemetry;
pub mod api;

pub use engine::Assessor;
pub use error::{AssessmentError, TableError, ValidationError};
pub use jurisdiction::{resolve_jurisdiction, JurisdictionStatus};
pub use models::{AssessmentInput, AssessmentOutcome, CalculationResult};
pub use scoring::{classify_lead, LeadScore, LeadScoringInput, ScoringConfig};
pub use zero_payment::ZeroPaymentReason;

/// Assess one case against the statutory tables compiled into the crate.
pub fn calculate_assessment(input: &AssessmentInput) -> Result<AssessmentOutcome, AssessmentError> {
    let tables = tables::builtin()?;
    Ok(Assessor::new(tables).assess(input)?)
}
