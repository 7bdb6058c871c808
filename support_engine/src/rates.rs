//! Minimum and Fixed Annual Rates.
//!
//! Low-income parents do not pay a formula amount.  A parent on income
//! support with little care pays the Minimum Annual Rate once for the
//! case; a parent with a low income who is not on income support pays the
//! Fixed Annual Rate for each child (up to three) of whom they have less
//! than shared care.

use crate::care::{RECEIVING_THRESHOLD, REGULAR_CARE};
use crate::models::{ParentFinancials, RateApplied};
use crate::tables::StatutoryYear;

/// At most this many children attract the Fixed Annual Rate.
pub const MAX_FIXED_RATE_CHILDREN: usize = 3;

/// At most this many cases attract a full Minimum Annual Rate.
pub const MAX_MINIMUM_RATE_CASES: u32 = 3;

/// A parent's care of one child and whether anyone could be paid for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildRateCare {
    pub care: u8,
    /// True when some other carer holds enough care to receive payment.
    pub payable: bool,
}

/// A special rate replacing a parent's formula liability.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialRate {
    /// Shared evenly across every child in the case.
    Minimum { per_child: f64 },
    /// Paid for each listed child, by index into the case's children.
    Fixed { per_child: f64, children: Vec<usize> },
}

impl SpecialRate {
    pub fn kind(&self) -> RateApplied {
        match self {
            SpecialRate::Minimum { .. } => RateApplied::Minimum,
            SpecialRate::Fixed { .. } => RateApplied::Fixed,
        }
    }

    /// Amount this rate charges for the child at `index`, if any.
    pub fn amount_for(&self, index: usize) -> Option<f64> {
        match self {
            SpecialRate::Minimum { per_child } => Some(*per_child),
            SpecialRate::Fixed {
                per_child,
                children,
            } => children.contains(&index).then_some(*per_child),
        }
    }
}

pub fn minimum_rate_applies(
    parent: &ParentFinancials,
    care: &[ChildRateCare],
    year: &StatutoryYear,
) -> bool {
    parent.receives_income_support
        && parent.adjusted_taxable_income < year.self_support_amount
        && !care.is_empty()
        && care.iter().all(|child| child.care < REGULAR_CARE)
}

/// The Minimum Annual Rate payable for this case.  With more than three
/// cases the parent pays three rates in total, shared across the cases.
pub fn minimum_rate_for_case(parent: &ParentFinancials, year: &StatutoryYear) -> f64 {
    let cases = parent.total_cases();
    if cases > MAX_MINIMUM_RATE_CASES {
        year.minimum_annual_rate * f64::from(MAX_MINIMUM_RATE_CASES) / f64::from(cases)
    } else {
        year.minimum_annual_rate
    }
}

/// Whether the Fixed Annual Rate covers a child.  A combined child
/// support income of zero also qualifies so that a low-care parent never
/// pays nothing merely because neither parent has assessable income.
pub fn fixed_rate_applies(
    parent: &ParentFinancials,
    care: u8,
    combined_csi: f64,
    year: &StatutoryYear,
) -> bool {
    !parent.receives_income_support
        && care < RECEIVING_THRESHOLD
        && (parent.adjusted_taxable_income < year.max_parenting_payment || combined_csi <= 0.0)
}

/// Decides which special rate, if any, replaces a parent's liability.
pub fn special_rate(
    parent: &ParentFinancials,
    care: &[ChildRateCare],
    combined_csi: f64,
    year: &StatutoryYear,
) -> Option<SpecialRate> {
    if minimum_rate_applies(parent, care, year) {
        let per_child = minimum_rate_for_case(parent, year) / care.len() as f64;
        return Some(SpecialRate::Minimum { per_child });
    }
    let children: Vec<usize> = care
        .iter()
        .enumerate()
        .filter(|(_, child)| {
            child.payable && fixed_rate_applies(parent, child.care, combined_csi, year)
        })
        .map(|(index, _)| index)
        .take(MAX_FIXED_RATE_CHILDREN)
        .collect();
    if children.is_empty() {
        return None;
    }
    Some(SpecialRate::Fixed {
        per_child: fixed_rate_per_child(parent, children.len(), year),
        children,
    })
}

/// The Fixed Annual Rate for each child in this case.  When the parent
/// pays it for more than three children across all of their cases, three
/// rates are shared between every child.
pub fn fixed_rate_per_child(
    parent: &ParentFinancials,
    children_in_case: usize,
    year: &StatutoryYear,
) -> f64 {
    let total = children_in_case + parent.other_case_children.len();
    if total > MAX_FIXED_RATE_CHILDREN {
        year.fixed_annual_rate * MAX_FIXED_RATE_CHILDREN as f64 / total as f64
    } else {
        year.fixed_annual_rate
    }
}
