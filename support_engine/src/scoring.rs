//! Lead scoring and complexity detection.
//!
//! A completed assessment and a handful of case facts (special
//! circumstances, financial tags, an upcoming court date) are scored with
//! additive points.  The total places the lead in a category that tells
//! a practice how much attention the enquiry deserves.  Scoring never
//! fails: missing data simply earns no points.
//!
//! Every special circumstance earns the generic circumstance points, even
//! when it also earns a named bonus.  Circumstances listed in
//! [`ScoringConfig::generic_exclusions`] skip the generic points.

use crate::care::raw_percentage;
use crate::models::{AssessmentInput, AssessmentOutcome};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const INTERNATIONAL_JURISDICTION: &str = "international_jurisdiction";
pub const PROPERTY_SETTLEMENT_PENDING: &str = "property_settlement_pending";
pub const POST_SEPARATION_INCOME: &str = "post_separation_income";

/// Points awarded by each factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPoints {
    pub court_date_urgent: u32,
    pub court_date_future: u32,
    pub income_issues: u32,
    pub high_value_case: u32,
    pub multiple_complexity: u32,
    pub special_circumstance: u32,
    pub shared_care_dispute: u32,
    pub binding_agreement: u32,
}

/// Limits that switch factors on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringThresholds {
    /// Liability strictly above this is a high-value case.
    pub high_value_liability: f64,
    /// A court date at most this many days away is urgent.
    pub court_date_urgency_days: i64,
    pub shared_care_min: f64,
    pub shared_care_max: f64,
    pub multiple_complexity_count: usize,
}

/// Minimum score for each category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    pub premium: u32,
    pub high_value: u32,
    pub standard: u32,
    pub low_value: u32,
}

/// Scoring weights.  Immutable once built; pass a different value to
/// score with different weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub points: ScoringPoints,
    pub thresholds: ScoringThresholds,
    pub categories: CategoryThresholds,
    /// Circumstances that earn their own bonus, keyed by name.
    pub named_circumstances: BTreeMap<String, u32>,
    /// Financial tags that signal income issues.
    pub income_issue_tags: Vec<String>,
    /// Circumstances that earn no generic points.
    #[serde(default)]
    pub generic_exclusions: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            points: ScoringPoints {
                court_date_urgent: 10,
                court_date_future: 5,
                income_issues: 7,
                high_value_case: 6,
                multiple_complexity: 5,
                special_circumstance: 4,
                shared_care_dispute: 6,
                binding_agreement: 2,
            },
            thresholds: ScoringThresholds {
                high_value_liability: 15_000.0,
                court_date_urgency_days: 30,
                shared_care_min: 35.0,
                shared_care_max: 65.0,
                multiple_complexity_count: 3,
            },
            categories: CategoryThresholds {
                premium: 10,
                high_value: 7,
                standard: 4,
                low_value: 2,
            },
            named_circumstances: BTreeMap::from([
                (INTERNATIONAL_JURISDICTION.to_string(), 8),
                (PROPERTY_SETTLEMENT_PENDING.to_string(), 8),
                (POST_SEPARATION_INCOME.to_string(), 5),
            ]),
            income_issue_tags: vec!["Hidden Assets".to_string(), "Cash Business".to_string()],
            generic_exclusions: Vec::new(),
        }
    }
}

impl ScoringConfig {
    /// Weighs upcoming court dates and international matters more heavily.
    pub fn urgency_focused() -> Self {
        let mut config = Self::default();
        config.points.court_date_urgent = 15;
        config.points.court_date_future = 7;
        config.thresholds.court_date_urgency_days = 45;
        config
            .named_circumstances
            .insert(INTERNATIONAL_JURISDICTION.to_string(), 10);
        config
    }

    /// Weighs money: liability, income issues and property.
    pub fn value_focused() -> Self {
        let mut config = Self::default();
        config.points.high_value_case = 10;
        config.points.income_issues = 9;
        config.thresholds.high_value_liability = 12_000.0;
        config
            .named_circumstances
            .insert(PROPERTY_SETTLEMENT_PENDING.to_string(), 10);
        config
    }

    /// Weighs the number of complicating circumstances.
    pub fn complexity_focused() -> Self {
        let mut config = Self::default();
        config.points.multiple_complexity = 8;
        config.points.special_circumstance = 6;
        config
    }

    /// Looks a preset up by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "urgency_focused" => Some(Self::urgency_focused()),
            "value_focused" => Some(Self::value_focused()),
            "complexity_focused" => Some(Self::complexity_focused()),
            _ => None,
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading scoring config {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("parsing scoring config {}", path.display()))
    }
}

/// Care percentages for one child, as entered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CareShare {
    pub care_a: f64,
    pub care_b: f64,
}

/// Facts about a lead that feed the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScoringInput {
    #[serde(default)]
    pub special_circumstances: Vec<String>,
    #[serde(default)]
    pub financial_tags: Vec<String>,
    #[serde(default)]
    pub court_date: Option<NaiveDate>,
    /// The day the lead is scored on; court dates are measured from here.
    pub as_of: NaiveDate,
    #[serde(default)]
    pub liability: f64,
    #[serde(default)]
    pub care: Vec<CareShare>,
    #[serde(default)]
    pub binding_agreement: bool,
}

impl LeadScoringInput {
    /// An input with nothing to score.
    pub fn empty(as_of: NaiveDate) -> Self {
        Self {
            special_circumstances: Vec::new(),
            financial_tags: Vec::new(),
            court_date: None,
            as_of,
            liability: 0.0,
            care: Vec::new(),
            binding_agreement: false,
        }
    }

    /// Builds an input from an assessment.  The liability is the larger of
    /// the payment between the parents and the payment to a carer, and an
    /// overseas parent adds the international circumstance.
    pub fn from_outcome(
        outcome: &AssessmentOutcome,
        input: &AssessmentInput,
        as_of: NaiveDate,
    ) -> Self {
        let mut lead = Self::empty(as_of);
        if let Some(result) = outcome.result() {
            lead.liability = result
                .final_payment_amount
                .max(result.payment_to_carer.unwrap_or(0.0));
        }
        lead.care = input
            .children
            .iter()
            .map(|child| CareShare {
                care_a: raw_percentage(child.care.parent_a, child.care.period),
                care_b: raw_percentage(child.care.parent_b, child.care.period),
            })
            .collect();
        if input.overseas_parent.is_some() {
            lead.special_circumstances
                .push(INTERNATIONAL_JURISDICTION.to_string());
        }
        lead
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LeadCategory {
    Unscored,
    #[serde(rename = "Low-Value")]
    LowValue,
    Standard,
    #[serde(rename = "High-Value")]
    HighValue,
    Premium,
}

impl LeadCategory {
    pub fn for_score(score: u32, thresholds: &CategoryThresholds) -> Self {
        if score >= thresholds.premium {
            LeadCategory::Premium
        } else if score >= thresholds.high_value {
            LeadCategory::HighValue
        } else if score >= thresholds.standard {
            LeadCategory::Standard
        } else if score >= thresholds.low_value {
            LeadCategory::LowValue
        } else {
            LeadCategory::Unscored
        }
    }
}

/// One factor's contribution to the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdownItem {
    pub factor: String,
    pub points: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadScore {
    pub score: u32,
    pub category: LeadCategory,
    pub factors: Vec<String>,
    pub breakdown: Vec<ScoreBreakdownItem>,
}

impl LeadScore {
    fn add(&mut self, factor: &str, points: u32, label: String) {
        self.score += points;
        self.factors.push(factor.to_string());
        self.breakdown.push(ScoreBreakdownItem {
            factor: factor.to_string(),
            points,
            label,
        });
    }
}

/// Scores a lead.
pub fn classify_lead(input: &LeadScoringInput, config: &ScoringConfig) -> LeadScore {
    let mut lead = LeadScore {
        score: 0,
        category: LeadCategory::Unscored,
        factors: Vec::new(),
        breakdown: Vec::new(),
    };
    let thresholds = &config.thresholds;
    let circumstances: BTreeSet<&str> = input
        .special_circumstances
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();

    if let Some(court_date) = input.court_date {
        let days = (court_date - input.as_of).num_days();
        if days > 0 && days <= thresholds.court_date_urgency_days {
            lead.add(
                "court_date_urgent",
                config.points.court_date_urgent,
                format!("Court date in {days} days"),
            );
        } else if days > thresholds.court_date_urgency_days {
            lead.add(
                "court_date_future",
                config.points.court_date_future,
                "Court date scheduled".to_string(),
            );
        }
    }

    for (name, points) in &config.named_circumstances {
        if circumstances.contains(name.as_str()) {
            lead.add(name, *points, format!("Circumstance: {}", name.replace('_', " ")));
        }
    }

    if input
        .financial_tags
        .iter()
        .any(|tag| config.income_issue_tags.contains(tag))
    {
        lead.add(
            "income_issues",
            config.points.income_issues,
            "Income issues".to_string(),
        );
    }

    if input.liability > thresholds.high_value_liability {
        lead.add(
            "high_value_case",
            config.points.high_value_case,
            format!("Liability above {}", thresholds.high_value_liability),
        );
    }

    if circumstances.len() >= thresholds.multiple_complexity_count {
        lead.add(
            "multiple_complexity",
            config.points.multiple_complexity,
            format!("{} special circumstances", circumstances.len()),
        );
    }

    let generic = circumstances
        .iter()
        .filter(|c| !config.generic_exclusions.iter().any(|e| e == *c))
        .count() as u32;
    if generic > 0 {
        lead.add(
            "special_circumstances",
            config.points.special_circumstance * generic,
            format!(
                "{generic} x {} points per circumstance",
                config.points.special_circumstance
            ),
        );
    }

    let shared_range = thresholds.shared_care_min..=thresholds.shared_care_max;
    let shared = |care: f64| shared_range.contains(&care);
    if input
        .care
        .iter()
        .any(|child| shared(child.care_a) || shared(child.care_b))
    {
        lead.add(
            "shared_care_dispute",
            config.points.shared_care_dispute,
            "Shared care arrangement".to_string(),
        );
    }

    if input.binding_agreement {
        lead.add(
            "binding_agreement",
            config.points.binding_agreement,
            "Binding child support agreement".to_string(),
        );
    }

    lead.category = LeadCategory::for_score(lead.score, &config.categories);
    lead
}

/// Features of a case that call for professional advice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityFlags {
    pub high_value: bool,
    pub shared_care_dispute: bool,
    pub international: bool,
    pub multi_case: bool,
    pub non_parent_carer: bool,
    pub court_order_required: bool,
}

impl ComplexityFlags {
    pub fn is_complex(&self) -> bool {
        self.high_value
            || self.shared_care_dispute
            || self.international
            || self.multi_case
            || self.non_parent_carer
            || self.court_order_required
    }
}

/// Flags the complicating features of an assessed case.
pub fn detect_complexity(
    outcome: &AssessmentOutcome,
    input: &AssessmentInput,
    config: &ScoringConfig,
) -> ComplexityFlags {
    let thresholds = &config.thresholds;
    let shared_range = thresholds.shared_care_min..=thresholds.shared_care_max;
    let shared = |care: f64| shared_range.contains(&care);
    ComplexityFlags {
        high_value: outcome
            .final_payment_amount()
            .map_or(false, |amount| amount > thresholds.high_value_liability),
        shared_care_dispute: input.children.iter().any(|child| {
            shared(raw_percentage(child.care.parent_a, child.care.period))
                || shared(raw_percentage(child.care.parent_b, child.care.period))
        }),
        international: input.overseas_parent.is_some(),
        multi_case: input.has_multi_case(),
        non_parent_carer: input.non_parent_carer,
        court_order_required: matches!(outcome, AssessmentOutcome::CourtOrderRequired(_)),
    }
}
