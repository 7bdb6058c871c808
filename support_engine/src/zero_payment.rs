//! Reasons an assessment ends with nothing passing between the parents.
//!
//! A zero result can come from very different circumstances, and each one
//! calls for a different explanation.  The checks run from the most
//! fundamental cause to the most common one; the first that matches wins.

use crate::care::{RECEIVING_THRESHOLD, REGULAR_CARE};
use crate::models::{AssessmentInput, CalculationResult, ChildResult, ParentId, RateApplied};
use serde::{Deserialize, Serialize};

/// Child support percentages below this are treated as balanced.
const BALANCED_PERCENT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZeroPaymentReason {
    /// Neither parent has any child support income.
    ZeroIncome,
    /// The parent would pay the Minimum Annual Rate, but their care of a
    /// child keeps them out of it.
    MarPreventedByCare { parent: ParentId },
    /// Neither parent has enough care of any child to receive payment.
    BothLowCare,
    /// Income and care shares cancel out.
    BalancedPercentages,
    /// A parent has a liability but the other parent has too little care
    /// to receive it.
    CareThreshold,
    /// None of the specific causes apply.
    Other,
}

impl ZeroPaymentReason {
    pub fn explanation(&self) -> &'static str {
        match self {
            ZeroPaymentReason::ZeroIncome => {
                "Both parents have no child support income after the self-support amount and any dependent allowances, so there is nothing to assess."
            }
            ZeroPaymentReason::MarPreventedByCare { .. } => {
                "The parent receives income support on a low income, but has 14% or more care of a child, so the Minimum Annual Rate does not apply."
            }
            ZeroPaymentReason::BothLowCare => {
                "Neither parent has 35% or more care of a child, which is needed to receive child support."
            }
            ZeroPaymentReason::BalancedPercentages => {
                "The parents' income and care contributions balance out, leaving neither with a child support percentage."
            }
            ZeroPaymentReason::CareThreshold => {
                "A parent has a child support percentage, but the other parent has less than 35% care and cannot receive payment."
            }
            ZeroPaymentReason::Other => {
                "No payment is required under the current income and care arrangements."
            }
        }
    }
}

fn rounded_care(child: &ChildResult, parent: ParentId) -> u8 {
    match parent {
        ParentId::A => child.rounded_care_a,
        ParentId::B => child.rounded_care_b,
    }
}

/// Why nothing passes between the parents.  `None` when a payment is made.
pub fn zero_payment_reason(
    result: &CalculationResult,
    input: &AssessmentInput,
) -> Option<ZeroPaymentReason> {
    if result.final_payment_amount > 0.0 {
        return None;
    }
    if result.combined_csi <= 0.0 {
        return Some(ZeroPaymentReason::ZeroIncome);
    }

    let children: Vec<&ChildResult> = result.children.iter().filter(|c| c.assessable).collect();

    let mar_prevented = |id: ParentId| {
        let summary = result.parent(id);
        input.parent(id).receives_income_support
            && summary.adjusted_taxable_income < summary.self_support_amount
            && summary.rate_applied != RateApplied::Minimum
            && children.iter().any(|c| rounded_care(c, id) >= REGULAR_CARE)
    };
    if let Some(parent) = [ParentId::A, ParentId::B].into_iter().find(|id| mar_prevented(*id)) {
        return Some(ZeroPaymentReason::MarPreventedByCare { parent });
    }

    if children
        .iter()
        .all(|c| c.rounded_care_a < RECEIVING_THRESHOLD && c.rounded_care_b < RECEIVING_THRESHOLD)
    {
        return Some(ZeroPaymentReason::BothLowCare);
    }

    if children.iter().all(|c| {
        c.child_support_percent_a.abs() < BALANCED_PERCENT
            && c.child_support_percent_b.abs() < BALANCED_PERCENT
    }) {
        return Some(ZeroPaymentReason::BalancedPercentages);
    }

    if children.iter().any(|c| {
        (c.child_support_percent_a > 0.0 && c.rounded_care_b < RECEIVING_THRESHOLD)
            || (c.child_support_percent_b > 0.0 && c.rounded_care_a < RECEIVING_THRESHOLD)
    }) {
        return Some(ZeroPaymentReason::CareThreshold);
    }

    Some(ZeroPaymentReason::Other)
}
