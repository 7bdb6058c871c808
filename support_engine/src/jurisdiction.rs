//! Overseas jurisdiction lookup.
//!
//! When one parent lives overseas, the country they live in decides how
//! the case proceeds.  Reciprocating countries are assessed normally,
//! excluded countries cannot accept an assessment at all, and every other
//! country is assessed on the resident parent's income alone.

use crate::models::FormulaVariant;
use serde::{Deserialize, Serialize};

/// Countries with a child support agreement with Australia.
pub const RECIPROCATING: &[&str] = &[
    "Albania",
    "Algeria",
    "Andorra",
    "Argentina",
    "Austria",
    "Barbados",
    "Belarus",
    "Belgium",
    "Bosnia and Herzegovina",
    "Brazil",
    "Burkina Faso",
    "Canada, except Quebec",
    "Cape Verde",
    "Central African Republic",
    "Chile",
    "Colombia",
    "Croatia",
    "Cyprus",
    "Czech Republic",
    "Denmark",
    "Ecuador",
    "Estonia",
    "Fiji",
    "Finland",
    "France",
    "Germany",
    "Greece",
    "Guatemala",
    "Haiti",
    "Holy See, The",
    "Hong Kong",
    "Hungary",
    "India",
    "Ireland",
    "Italy",
    "Kazakhstan",
    "Kenya",
    "Kyrgyzstan",
    "Liberia",
    "Lithuania",
    "Luxembourg",
    "Malawi",
    "Malaysia",
    "Malta",
    "Mexico",
    "Moldova",
    "Monaco",
    "Montenegro",
    "Morocco",
    "Nauru",
    "Netherlands",
    "New Zealand",
    "Niger",
    "North Macedonia",
    "Norway",
    "Pakistan",
    "Philippines",
    "Poland",
    "Portugal",
    "Romania",
    "Serbia",
    "Seychelles",
    "Sierra Leone",
    "Singapore",
    "Slovakia",
    "Slovenia",
    "South Africa",
    "Spain",
    "Sri Lanka",
    "Suriname",
    "Sweden",
    "Switzerland",
    "Tanzania, except Zanzibar",
    "Trinidad and Tobago",
    "Tunisia",
    "Turkey",
    "Ukraine",
    "United Kingdom, includes Alderney, Gibraltar, Guernsey, Isle of Man, Jersey, Sark",
    "United States of America",
    "Uruguay",
    "Zambia",
    "Zimbabwe",
];

/// Countries that cannot accept an Australian assessment.
pub const EXCLUDED: &[&str] = &[
    "Brunei Darussalam",
    "Cook Islands",
    "Israel",
    "Niue",
    "Papua New Guinea",
    "Samoa",
    "Yukon, in Canada",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JurisdictionStatus {
    Reciprocating,
    Excluded,
    NonReciprocating,
}

impl JurisdictionStatus {
    pub fn explanation(self) -> &'static str {
        match self {
            JurisdictionStatus::Reciprocating => {
                "Australia has a child support agreement with this country, so both parents' incomes are assessed as usual."
            }
            JurisdictionStatus::Excluded => {
                "This country cannot accept an Australian child support assessment. An Australian court order may be needed instead."
            }
            JurisdictionStatus::NonReciprocating => {
                "Australia has no child support agreement with this country. Formula 5 assesses the Australian parent's income only."
            }
        }
    }

    pub fn next_steps(self) -> &'static [&'static str] {
        match self {
            JurisdictionStatus::Reciprocating => &[
                "Both parents' incomes are assessed",
                "A standard formula (1 to 4) applies",
                "The assessment can be enforced in both countries",
            ],
            JurisdictionStatus::Excluded => &[
                "Apply for an Australian court order",
                "The order can be sent to the other country",
                "Get legal advice before proceeding",
            ],
            JurisdictionStatus::NonReciprocating => &[
                "Formula 5 applies",
                "Only the Australian parent's income is assessed",
                "Enforcement overseas may be limited",
                "Get legal advice about enforcement options",
            ],
        }
    }

    /// The formula this status forces, if any.
    pub fn forced_formula(self) -> Option<FormulaVariant> {
        match self {
            JurisdictionStatus::NonReciprocating => Some(FormulaVariant::Formula5),
            _ => None,
        }
    }
}

/// Classifies a country.  Matching ignores case and surrounding
/// whitespace; blank and unknown names are non-reciprocating.
pub fn resolve_jurisdiction(country: &str) -> JurisdictionStatus {
    let country = country.trim();
    let listed = |list: &[&str]| list.iter().any(|name| name.eq_ignore_ascii_case(country));
    if country.is_empty() {
        JurisdictionStatus::NonReciprocating
    } else if listed(RECIPROCATING) {
        JurisdictionStatus::Reciprocating
    } else if listed(EXCLUDED) {
        JurisdictionStatus::Excluded
    } else {
        JurisdictionStatus::NonReciprocating
    }
}

/// Both lists, for callers that render a country picker.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct JurisdictionTable {
    pub reciprocating: &'static [&'static str],
    pub excluded: &'static [&'static str],
}

pub fn jurisdiction_table() -> JurisdictionTable {
    JurisdictionTable {
        reciprocating: RECIPROCATING,
        excluded: EXCLUDED,
    }
}
