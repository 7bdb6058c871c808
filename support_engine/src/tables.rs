//! Statutory tables and helpers for loading them.
//!
//! The `tables` module holds the versioned data that drives an
//! assessment: the self-support amount and special rates for a year, the
//! care bands that map care to a cost percentage, and the cost of
//! children schedules.  Each assessment year lives in its own JSON file
//! under `tables/`.  The 2025 and 2026 years are compiled into the crate;
//! further years can be loaded from a directory at start-up.
//!
//! Every year is validated when it is loaded so that the engine can rely
//! on contiguous care bands and monotonic cost brackets.

use crate::error::TableError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

const EMBEDDED_YEARS: &[(&str, &str)] = &[
    ("tables/2025.json", include_str!("../tables/2025.json")),
    ("tables/2026.json", include_str!("../tables/2026.json")),
];

/// Age grouping used to select a cost of children schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeTier {
    #[serde(rename = "under_13")]
    Under13,
    #[serde(rename = "thirteen_plus")]
    ThirteenPlus,
    #[serde(rename = "mixed")]
    Mixed,
}

impl AgeTier {
    /// Tier for a set of ages: all under 13, all 13 and over, or a mix.
    /// Returns `None` for an empty set.
    pub fn for_ages(ages: &[u8]) -> Option<Self> {
        let younger = ages.iter().any(|age| *age < 13);
        let older = ages.iter().any(|age| *age >= 13);
        match (younger, older) {
            (true, true) => Some(AgeTier::Mixed),
            (true, false) => Some(AgeTier::Under13),
            (false, true) => Some(AgeTier::ThirteenPlus),
            (false, false) => None,
        }
    }
}

/// One income bracket of a cost schedule.  The lower bound is the
/// previous bracket's `up_to` (zero for the first bracket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBracket {
    /// Upper income bound, `None` for the top bracket.
    pub up_to: Option<f64>,
    pub base: f64,
    pub rate: f64,
}

/// Cost of children brackets for one age tier and child count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSchedule {
    pub age_tier: AgeTier,
    pub children: u8,
    pub brackets: Vec<CostBracket>,
}

/// Where an income landed in a cost schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketPosition {
    pub lower: f64,
    pub up_to: Option<f64>,
    pub base: f64,
    pub rate: f64,
    pub income_in_bracket: f64,
}

/// The total annual cost of the children and the bracket it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLookup {
    pub cost: f64,
    pub bracket: Option<BracketPosition>,
}

impl CostLookup {
    pub fn zero() -> Self {
        Self {
            cost: 0.0,
            bracket: None,
        }
    }
}

impl CostSchedule {
    /// The statutory maximum: the base of the open-ended top bracket.
    pub fn cap(&self) -> f64 {
        self.brackets.last().map(|b| b.base).unwrap_or(0.0)
    }

    pub fn cost_at(&self, income: f64) -> CostLookup {
        if income.is_nan() || income <= 0.0 {
            return CostLookup::zero();
        }
        let mut lower = 0.0;
        for bracket in &self.brackets {
            if let Some(upper) = bracket.up_to {
                if income > upper {
                    lower = upper;
                    continue;
                }
            }
            let income_in_bracket = income - lower;
            let cost = (bracket.base + income_in_bracket * bracket.rate).min(self.cap());
            return CostLookup {
                cost,
                bracket: Some(BracketPosition {
                    lower,
                    up_to: bracket.up_to,
                    base: bracket.base,
                    rate: bracket.rate,
                    income_in_bracket,
                }),
            };
        }
        CostLookup::zero()
    }

    fn validate(&self, year: &str) -> Result<(), TableError> {
        let label = format!("{:?} schedule for {} children", self.age_tier, self.children);
        let Some((top, rest)) = self.brackets.split_last() else {
            return Err(TableError::invalid(year, format!("{label} has no brackets")));
        };
        if top.up_to.is_some() || top.rate != 0.0 {
            return Err(TableError::invalid(
                year,
                format!("{label} must end with an open bracket at rate 0"),
            ));
        }
        let mut previous_upper = 0.0;
        let mut previous_base = 0.0;
        for bracket in rest {
            let Some(upper) = bracket.up_to else {
                return Err(TableError::invalid(
                    year,
                    format!("{label} has an open bracket before the top"),
                ));
            };
            if upper.is_nan() || upper <= previous_upper {
                return Err(TableError::invalid(
                    year,
                    format!("{label} thresholds must increase"),
                ));
            }
            previous_upper = upper;
        }
        for bracket in &self.brackets {
            if !bracket.base.is_finite() || !bracket.rate.is_finite() || bracket.rate < 0.0 {
                return Err(TableError::invalid(
                    year,
                    format!("{label} has a negative or non-finite bracket"),
                ));
            }
            if bracket.base < previous_base {
                return Err(TableError::invalid(
                    year,
                    format!("{label} bases must not decrease"),
                ));
            }
            previous_base = bracket.base;
        }
        Ok(())
    }
}

/// Maps a rounded care percentage range to a cost percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareBand {
    pub min_care: u8,
    pub max_care: u8,
    pub cost_base: f64,
    pub cost_step: f64,
}

impl CareBand {
    pub fn contains(&self, care: u8) -> bool {
        (self.min_care..=self.max_care).contains(&care)
    }

    pub fn cost_percent(&self, care: u8) -> f64 {
        self.cost_base + self.cost_step * f64::from(care - self.min_care)
    }
}

/// Statutory data for a single assessment year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatutoryYear {
    pub year: String,
    pub self_support_amount: f64,
    /// Maximum Parenting Payment (single) rate; the income test for the
    /// Fixed Annual Rate.
    pub max_parenting_payment: f64,
    pub minimum_annual_rate: f64,
    pub fixed_annual_rate: f64,
    pub care_bands: Vec<CareBand>,
    pub cost_schedules: Vec<CostSchedule>,
}

impl StatutoryYear {
    /// Parse and validate one year of tables.
    pub fn from_json(source_name: &str, data: &str) -> Result<Self, TableError> {
        let year: StatutoryYear =
            serde_json::from_str(data).map_err(|err| TableError::Parse {
                source_name: source_name.to_string(),
                message: err.to_string(),
            })?;
        year.validate()?;
        Ok(year)
    }

    pub fn validate(&self) -> Result<(), TableError> {
        let amounts = [
            self.self_support_amount,
            self.max_parenting_payment,
            self.minimum_annual_rate,
            self.fixed_annual_rate,
        ];
        if amounts.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(TableError::invalid(
                &self.year,
                "annual amounts must be finite and non-negative",
            ));
        }
        self.validate_care_bands()?;
        for schedule in &self.cost_schedules {
            schedule.validate(&self.year)?;
        }
        let required = [
            (AgeTier::Under13, 1),
            (AgeTier::Under13, 2),
            (AgeTier::Under13, 3),
            (AgeTier::ThirteenPlus, 1),
            (AgeTier::ThirteenPlus, 2),
            (AgeTier::ThirteenPlus, 3),
            (AgeTier::Mixed, 2),
            (AgeTier::Mixed, 3),
        ];
        for (tier, count) in required {
            if self.schedule(tier, count).is_none() {
                return Err(TableError::invalid(
                    &self.year,
                    format!("missing {tier:?} schedule for {count} children"),
                ));
            }
        }
        Ok(())
    }

    fn validate_care_bands(&self) -> Result<(), TableError> {
        let mut next_min: u16 = 0;
        for band in &self.care_bands {
            if u16::from(band.min_care) != next_min || band.max_care < band.min_care {
                return Err(TableError::invalid(
                    &self.year,
                    format!("care bands are not contiguous at {}", band.min_care),
                ));
            }
            if !band.cost_base.is_finite() || band.cost_base < 0.0 || band.cost_step < 0.0 {
                return Err(TableError::invalid(
                    &self.year,
                    "care band costs must be non-negative",
                ));
            }
            next_min = u16::from(band.max_care) + 1;
        }
        if next_min != 101 {
            return Err(TableError::invalid(
                &self.year,
                "care bands must cover 0 to 100",
            ));
        }
        Ok(())
    }

    pub fn schedule(&self, tier: AgeTier, children: u8) -> Option<&CostSchedule> {
        self.cost_schedules
            .iter()
            .find(|s| s.age_tier == tier && s.children == children)
    }

    /// Annual cost of children of the given ages at a combined income.
    /// More than three children are costed as three.
    pub fn lookup_cost(&self, combined_income: f64, ages: &[u8]) -> CostLookup {
        let Some(tier) = AgeTier::for_ages(ages) else {
            return CostLookup::zero();
        };
        let count = ages.len().min(3) as u8;
        match self.schedule(tier, count) {
            Some(schedule) => schedule.cost_at(combined_income),
            None => CostLookup::zero(),
        }
    }
}

/// All assessment years known to the engine, keyed by year.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    years: BTreeMap<String, Arc<StatutoryYear>>,
}

impl TableRegistry {
    /// Registry holding the years compiled into the crate.
    pub fn embedded() -> Result<Self, TableError> {
        let mut registry = TableRegistry::default();
        for (name, data) in EMBEDDED_YEARS {
            registry.insert(StatutoryYear::from_json(name, data)?);
        }
        Ok(registry)
    }

    /// Adds a year, replacing any existing tables for it.
    pub fn insert(&mut self, year: StatutoryYear) {
        self.years.insert(year.year.clone(), Arc::new(year));
    }

    pub fn year(&self, year: &str) -> Option<&StatutoryYear> {
        self.years.get(year).map(|y| y.as_ref())
    }

    pub fn years(&self) -> impl Iterator<Item = &str> {
        self.years.keys().map(String::as_str)
    }

    /// Load every `.json` file in `path` as a statutory year.
    ///
    /// Files that fail to parse or validate are logged and skipped so that
    /// one bad year cannot take the others down.  Returns the number of
    /// years loaded.  A missing directory loads nothing.
    pub fn load_dir(&mut self, path: &Path) -> anyhow::Result<usize> {
        let mut loaded = 0;
        if !path.is_dir() {
            return Ok(loaded);
        }
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file = entry.path();
            if !entry.file_type()?.is_file() || file.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let data = std::fs::read_to_string(&file)?;
            match StatutoryYear::from_json(&file.display().to_string(), &data) {
                Ok(year) => {
                    info!(year = %year.year, file = %file.display(), "loaded statutory tables");
                    self.insert(year);
                    loaded += 1;
                }
                Err(err) => {
                    warn!(file = %file.display(), error = %err, "skipping statutory tables")
                }
            }
        }
        Ok(loaded)
    }
}

/// Shared registry of the embedded years, parsed once on first use.
pub fn builtin() -> Result<&'static TableRegistry, TableError> {
    static REGISTRY: OnceLock<Result<TableRegistry, TableError>> = OnceLock::new();
    REGISTRY
        .get_or_init(TableRegistry::embedded)
        .as_ref()
        .map_err(Clone::clone)
}
