//! Data models for the Support Engine.
//!
//! The `models` module defines the serialisable inputs and outputs of an
//! assessment: each parent's financial position, the children in the case
//! with their care arrangements, and the immutable result the engine
//! produces.  Every type derives `Serialize` and `Deserialize` and holds
//! only plain JSON primitives so that results can be persisted or rendered
//! by downstream collaborators without any hidden state.

use crate::jurisdiction::JurisdictionStatus;
use crate::tables::BracketPosition;
use crate::zero_payment::ZeroPaymentReason;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the two legal parents in a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParentId {
    #[serde(rename = "parent_a")]
    A,
    #[serde(rename = "parent_b")]
    B,
}

impl ParentId {
    pub fn other(self) -> Self {
        match self {
            ParentId::A => ParentId::B,
            ParentId::B => ParentId::A,
        }
    }
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentId::A => f.write_str("Parent A"),
            ParentId::B => f.write_str("Parent B"),
        }
    }
}

const MAX_COSTED_CHILDREN: u32 = 3;

/// Children a parent supports outside this case, by age tier.  They are
/// costed at representative ages (6 and 14) to derive the relevant
/// dependent allowance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevantDependents {
    #[serde(default)]
    pub under_13: u32,
    #[serde(default)]
    pub thirteen_plus: u32,
}

impl RelevantDependents {
    pub fn total(&self) -> u32 {
        self.under_13.saturating_add(self.thirteen_plus)
    }

    /// Ages used to cost the dependents against the cost of children table.
    /// The table stops at three children, so each tier contributes at most
    /// three ages.
    pub fn representative_ages(&self) -> Vec<u8> {
        let tier = |count: u32| count.min(MAX_COSTED_CHILDREN) as usize;
        let mut ages = vec![6; tier(self.under_13)];
        ages.extend(std::iter::repeat(14).take(tier(self.thirteen_plus)));
        ages
    }
}

/// A child of the parent who belongs to a different child support case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherCaseChild {
    pub age: u8,
}

/// Financial position of one parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentFinancials {
    /// Adjusted Taxable Income for the assessment year.
    pub adjusted_taxable_income: f64,
    /// Whether the parent received an income support payment.
    #[serde(default)]
    pub receives_income_support: bool,
    #[serde(default)]
    pub relevant_dependents: RelevantDependents,
    /// Children in other child support cases.  Any entry here selects one
    /// of the multi-case formulas.
    #[serde(default)]
    pub other_case_children: Vec<OtherCaseChild>,
}

impl ParentFinancials {
    pub fn with_income(adjusted_taxable_income: f64) -> Self {
        Self {
            adjusted_taxable_income,
            receives_income_support: false,
            relevant_dependents: RelevantDependents::default(),
            other_case_children: Vec::new(),
        }
    }

    pub fn has_other_cases(&self) -> bool {
        !self.other_case_children.is_empty()
    }

    /// Number of cases the parent is involved in, counting each other-case
    /// child as its own case.
    pub fn total_cases(&self) -> u32 {
        1 + self.other_case_children.len() as u32
    }
}

/// The cycle over which care nights are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarePeriod {
    Week,
    Fortnight,
    Year,
    /// Amounts are already percentages of care.
    Percent,
}

impl CarePeriod {
    pub fn cycle_length(self) -> f64 {
        match self {
            CarePeriod::Week => 7.0,
            CarePeriod::Fortnight => 14.0,
            CarePeriod::Year => 365.0,
            CarePeriod::Percent => 100.0,
        }
    }

    /// Slack allowed when checking that the care amounts cover the cycle.
    pub fn tolerance(self) -> f64 {
        match self {
            CarePeriod::Year => 0.5,
            CarePeriod::Percent => 0.01,
            CarePeriod::Week | CarePeriod::Fortnight => 1e-6,
        }
    }
}

impl Default for CarePeriod {
    fn default() -> Self {
        CarePeriod::Fortnight
    }
}

impl fmt::Display for CarePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CarePeriod::Week => "week",
            CarePeriod::Fortnight => "fortnight",
            CarePeriod::Year => "year",
            CarePeriod::Percent => "percent",
        };
        f.write_str(name)
    }
}

/// Nights of care per cycle for each carer of a child.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CareArrangement {
    #[serde(default)]
    pub period: CarePeriod,
    pub parent_a: f64,
    pub parent_b: f64,
    /// Nights with a non-parent carer.  Only valid when the assessment has
    /// a non-parent carer.
    #[serde(default)]
    pub carer: f64,
    /// Nights with a second non-parent carer.
    #[serde(default)]
    pub second_carer: f64,
}

impl CareArrangement {
    pub fn nights(period: CarePeriod, parent_a: f64, parent_b: f64) -> Self {
        Self {
            period,
            parent_a,
            parent_b,
            carer: 0.0,
            second_carer: 0.0,
        }
    }

    pub fn percent(parent_a: f64, parent_b: f64) -> Self {
        Self::nights(CarePeriod::Percent, parent_a, parent_b)
    }

    pub fn with_carer(mut self, carer: f64) -> Self {
        self.carer = carer;
        self
    }

    pub fn with_second_carer(mut self, second_carer: f64) -> Self {
        self.second_carer = second_carer;
        self
    }

    pub fn total(&self) -> f64 {
        self.parent_a + self.parent_b + self.carer + self.second_carer
    }

    pub fn has_carer_care(&self) -> bool {
        self.carer > 0.0 || self.second_carer > 0.0
    }
}

/// A child in the case being assessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub age: u8,
    pub care: CareArrangement,
    /// Allows an 18 year old to appear in the case.  Such children are
    /// reported but excluded from the assessment itself.
    #[serde(default)]
    pub adult_maintenance_exception: bool,
}

impl Child {
    pub fn new(age: u8, care: CareArrangement) -> Self {
        Self {
            age,
            care,
            adult_maintenance_exception: false,
        }
    }

    pub fn is_assessable(&self) -> bool {
        self.age < 18
    }
}

/// The parent living overseas and the country they live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverseasParent {
    pub parent: ParentId,
    pub country: String,
}

fn default_year() -> String {
    "2025".to_string()
}

/// Everything the engine needs to produce an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentInput {
    /// Assessment year selecting the statutory tables, e.g. `"2025"`.
    #[serde(default = "default_year")]
    pub year: String,
    pub parent_a: ParentFinancials,
    pub parent_b: ParentFinancials,
    pub children: Vec<Child>,
    #[serde(default)]
    pub non_parent_carer: bool,
    #[serde(default)]
    pub overseas_parent: Option<OverseasParent>,
}

impl AssessmentInput {
    pub fn new(
        parent_a: ParentFinancials,
        parent_b: ParentFinancials,
        children: Vec<Child>,
    ) -> Self {
        Self {
            year: default_year(),
            parent_a,
            parent_b,
            children,
            non_parent_carer: false,
            overseas_parent: None,
        }
    }

    pub fn parent(&self, id: ParentId) -> &ParentFinancials {
        match id {
            ParentId::A => &self.parent_a,
            ParentId::B => &self.parent_b,
        }
    }

    pub fn has_multi_case(&self) -> bool {
        self.parent_a.has_other_cases() || self.parent_b.has_other_cases()
    }

    /// Ages of the children that take part in the assessment.
    pub fn assessable_ages(&self) -> Vec<u8> {
        self.children
            .iter()
            .filter(|child| child.is_assessable())
            .map(|child| child.age)
            .collect()
    }
}

/// The statutory calculation path chosen for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaVariant {
    /// Both parents have care of the children.
    Formula1,
    /// One parent has no care of any child, or a non-parent carer is involved.
    Formula2,
    /// A parent has children in other cases.
    Formula3,
    /// Multi-case assessment with a non-parent carer.
    Formula4,
    /// The other parent lives in a non-reciprocating jurisdiction.
    Formula5,
}

impl FormulaVariant {
    pub fn number(self) -> u8 {
        match self {
            FormulaVariant::Formula1 => 1,
            FormulaVariant::Formula2 => 2,
            FormulaVariant::Formula3 => 3,
            FormulaVariant::Formula4 => 4,
            FormulaVariant::Formula5 => 5,
        }
    }

    pub fn is_multi_case(self) -> bool {
        matches!(self, FormulaVariant::Formula3 | FormulaVariant::Formula4)
    }
}

/// Who pays the other parent once liabilities are netted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payer {
    #[serde(rename = "Parent A")]
    ParentA,
    #[serde(rename = "Parent B")]
    ParentB,
    Neither,
}

impl From<ParentId> for Payer {
    fn from(value: ParentId) -> Self {
        match value {
            ParentId::A => Payer::ParentA,
            ParentId::B => Payer::ParentB,
        }
    }
}

/// Special rate that replaced the formula amount, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateApplied {
    #[default]
    None,
    Minimum,
    Fixed,
}

/// Per-parent view of Steps 1–3 and the parent's annual liability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentSummary {
    pub adjusted_taxable_income: f64,
    pub self_support_amount: f64,
    pub relevant_dependent_allowance: f64,
    pub multi_case_allowance: f64,
    pub child_support_income: f64,
    /// Share of the combined child support income, 0–100.
    pub income_percent: f64,
    /// Annual amount owed to all carers before netting, whole dollars.
    pub liability: f64,
    pub rate_applied: RateApplied,
}

/// Per-child breakdown of Steps 5 and 6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildResult {
    pub age: u8,
    /// False for an 18 year old admitted under the adult maintenance exception.
    pub assessable: bool,
    pub cost_per_child: f64,
    pub rounded_care_a: u8,
    pub rounded_care_b: u8,
    pub rounded_care_carer: Option<u8>,
    pub rounded_care_second_carer: Option<u8>,
    pub cost_percent_a: f64,
    pub cost_percent_b: f64,
    pub cost_percent_carer: Option<f64>,
    pub cost_percent_second_carer: Option<f64>,
    pub child_support_percent_a: f64,
    pub child_support_percent_b: f64,
    /// Amount Parent A owes Parent B for this child.
    pub liability_a: f64,
    /// Amount Parent B owes Parent A for this child.
    pub liability_b: f64,
    pub liability_a_to_carer: f64,
    pub liability_b_to_carer: f64,
    pub multi_case_cap_a: Option<f64>,
    pub multi_case_cap_b: Option<f64>,
}

/// Immutable result of a numeric assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub year: String,
    pub formula: FormulaVariant,
    pub parent_a: ParentSummary,
    pub parent_b: ParentSummary,
    pub combined_csi: f64,
    pub total_cost: f64,
    pub cost_bracket: Option<BracketPosition>,
    pub children: Vec<ChildResult>,
    pub payer: Payer,
    pub rate_applied: RateApplied,
    /// Net annual amount paid between the parents, whole dollars.
    pub final_payment_amount: f64,
    /// Annual amount the parents pay non-parent carers, whole dollars.
    pub payment_to_carer: Option<f64>,
    /// How `payment_to_carer` divides when a second carer is involved.
    pub carer_payments: Option<CarerPayments>,
    pub multi_case_cap_applied: bool,
    /// Why nothing passes between the parents, when that is the result.
    pub zero_payment_reason: Option<ZeroPaymentReason>,
}

/// Annual payments to each of two non-parent carers, whole dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarerPayments {
    pub first_carer: f64,
    pub second_carer: f64,
}

impl CalculationResult {
    pub fn parent(&self, id: ParentId) -> &ParentSummary {
        match id {
            ParentId::A => &self.parent_a,
            ParentId::B => &self.parent_b,
        }
    }
}

/// A non-parent carer holds less than the receiving threshold of care, so
/// nothing is payable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroCareThreshold {
    pub formula: FormulaVariant,
    /// Highest rounded care the non-parent carer has of any child.
    pub carer_care_percent: u8,
    pub required_care_percent: u8,
    pub payer: Payer,
    pub final_payment_amount: f64,
}

/// The other parent lives in an excluded jurisdiction; an assessment
/// cannot be made and a court order is needed instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionRefusal {
    pub parent: ParentId,
    pub country: String,
    pub jurisdiction: JurisdictionStatus,
    pub explanation: String,
    pub next_steps: Vec<String>,
}

/// The three ways a valid input can resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssessmentOutcome {
    Assessed(Box<CalculationResult>),
    NoChildSupportPayable(ZeroCareThreshold),
    CourtOrderRequired(JurisdictionRefusal),
}

impl AssessmentOutcome {
    pub fn result(&self) -> Option<&CalculationResult> {
        match self {
            AssessmentOutcome::Assessed(result) => Some(result),
            _ => None,
        }
    }

    pub fn payer(&self) -> Payer {
        match self {
            AssessmentOutcome::Assessed(result) => result.payer,
            AssessmentOutcome::NoChildSupportPayable(zero) => zero.payer,
            AssessmentOutcome::CourtOrderRequired(_) => Payer::Neither,
        }
    }

    /// Net amount between the parents; `None` when no assessment was made.
    pub fn final_payment_amount(&self) -> Option<f64> {
        match self {
            AssessmentOutcome::Assessed(result) => Some(result.final_payment_amount),
            AssessmentOutcome::NoChildSupportPayable(zero) => Some(zero.final_payment_amount),
            AssessmentOutcome::CourtOrderRequired(_) => None,
        }
    }
}
