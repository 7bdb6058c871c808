//! Income normalisation.
//!
//! Turns a parent's Adjusted Taxable Income into their Child Support
//! Income by taking away the self-support amount, an allowance for
//! relevant dependents and, when the parent has children in other cases,
//! the multi-case allowance.

use crate::models::{OtherCaseChild, ParentFinancials};
use crate::tables::StatutoryYear;
use serde::{Deserialize, Serialize};

/// Step 1 for a single parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeAssessment {
    pub adjusted_taxable_income: f64,
    pub self_support_amount: f64,
    pub relevant_dependent_allowance: f64,
    /// Income after the self-support amount and relevant dependents, before
    /// any multi-case allowance.
    pub preliminary_csi: f64,
    pub multi_case_allowance: f64,
    pub csi: f64,
}

/// Works out a parent's Child Support Income.
///
/// `case_ages` are the ages of the assessable children in the case being
/// assessed; they size the multi-case allowance when the parent also has
/// children in other cases.
pub fn normalize_income(
    parent: &ParentFinancials,
    case_ages: &[u8],
    year: &StatutoryYear,
) -> IncomeAssessment {
    let ati = parent.adjusted_taxable_income;
    let ssa = year.self_support_amount;
    let relevant_dependent_allowance = relevant_dependent_allowance(parent, year);
    let preliminary_csi = (ati - ssa - relevant_dependent_allowance).max(0.0);
    let multi_case_allowance = multi_case_allowance(
        preliminary_csi,
        case_ages.len(),
        &parent.other_case_children,
        year,
    );
    IncomeAssessment {
        adjusted_taxable_income: ati,
        self_support_amount: ssa,
        relevant_dependent_allowance,
        preliminary_csi,
        multi_case_allowance,
        csi: (preliminary_csi - multi_case_allowance).max(0.0),
    }
}

/// Cost of the parent's relevant dependents at their income above the
/// self-support amount.
pub fn relevant_dependent_allowance(parent: &ParentFinancials, year: &StatutoryYear) -> f64 {
    if parent.relevant_dependents.total() == 0 {
        return 0.0;
    }
    let ages = parent.relevant_dependents.representative_ages();
    let income = (parent.adjusted_taxable_income - year.self_support_amount).max(0.0);
    year.lookup_cost(income, &ages).cost
}

/// Cost of one child when `total_children` children of the same age are
/// costed together at `income`.
pub fn same_age_cost_per_child(
    age: u8,
    total_children: usize,
    income: f64,
    year: &StatutoryYear,
) -> f64 {
    if total_children == 0 {
        return 0.0;
    }
    let ages = vec![age; total_children];
    year.lookup_cost(income, &ages).cost / total_children as f64
}

/// Allowance for children in other cases, using the same-age rule: each
/// other-case child is costed as one of a group of children all of its
/// age, sized to every child the parent has across all cases.
pub fn multi_case_allowance(
    preliminary_csi: f64,
    case_children: usize,
    other_case_children: &[OtherCaseChild],
    year: &StatutoryYear,
) -> f64 {
    let total = case_children + other_case_children.len();
    other_case_children
        .iter()
        .map(|child| same_age_cost_per_child(child.age, total, preliminary_csi, year))
        .sum()
}

/// Each parent's share of the combined child support income, as
/// percentages.  Both are zero when the combined income is zero.
pub fn income_percentages(csi_a: f64, csi_b: f64) -> (f64, f64) {
    let combined = csi_a + csi_b;
    if combined <= 0.0 {
        return (0.0, 0.0);
    }
    (csi_a / combined * 100.0, csi_b / combined * 100.0)
}
