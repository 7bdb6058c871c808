//! Care conversion.
//!
//! Nights of care are turned into a percentage of care, rounded the way the
//! statutory care table expects, and then mapped through the care bands to
//! the cost percentage each carer is taken to bear.

use crate::error::ValidationError;
use crate::models::{CareArrangement, CarePeriod, Child, ParentId};
use crate::tables::CareBand;
use serde::{Deserialize, Serialize};

/// Care a carer needs before child support can be paid to them.
pub const RECEIVING_THRESHOLD: u8 = 35;

/// Below this a parent has less than regular care.
pub const REGULAR_CARE: u8 = 14;

const SNAP: f64 = 1e-9;

/// Care and cost percentages for a two-party split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CareSplit {
    pub care_percent_a: u8,
    pub care_percent_b: u8,
    pub cost_percent_a: f64,
    pub cost_percent_b: f64,
}

/// Percentage of care for an amount of nights.  Multiplies before dividing
/// so that whole splits such as 292 of 365 nights stay exact.
pub fn raw_percentage(amount: f64, period: CarePeriod) -> f64 {
    match period {
        CarePeriod::Percent => amount,
        other => amount * 100.0 / other.cycle_length(),
    }
}

fn snapped(raw: f64) -> f64 {
    let nearest = raw.round();
    if (raw - nearest).abs() < SNAP {
        nearest
    } else {
        raw
    }
}

/// Rounds a set of raw care percentages to whole numbers summing to 100.
///
/// Every party below the largest is rounded down; the party with the most
/// care takes whatever is left.  For two parties this is the same as
/// flooring below 50 and ceiling from 50 up.
pub fn round_shares(raw: &[f64]) -> Vec<u8> {
    let primary = raw
        .iter()
        .enumerate()
        .fold(0, |best, (i, value)| if *value > raw[best] { i } else { best });
    let mut rounded: Vec<u8> = raw
        .iter()
        .map(|value| snapped(*value).floor().clamp(0.0, 100.0) as u8)
        .collect();
    let others: u32 = rounded
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != primary)
        .map(|(_, value)| u32::from(*value))
        .sum();
    if let Some(slot) = rounded.get_mut(primary) {
        *slot = 100u32.saturating_sub(others) as u8;
    }
    rounded
}

/// Cost percentage for a rounded care percentage.  Care above 100 is
/// treated as 100.
pub fn cost_percent(bands: &[CareBand], rounded_care: u8) -> f64 {
    let care = rounded_care.min(100);
    bands
        .iter()
        .find(|band| band.contains(care))
        .map(|band| band.cost_percent(care))
        .unwrap_or(0.0)
}

/// Converts Parent A's nights in a cycle into the care and cost split
/// between both parents.
pub fn convert_care(
    nights_a: f64,
    cycle_length: f64,
    bands: &[CareBand],
) -> Result<CareSplit, ValidationError> {
    let in_range = cycle_length.is_finite()
        && cycle_length > 0.0
        && nights_a.is_finite()
        && (0.0..=cycle_length).contains(&nights_a);
    if !in_range {
        return Err(ValidationError::CareOutOfRange {
            nights: nights_a,
            cycle: cycle_length,
        });
    }
    let raw_a = nights_a * 100.0 / cycle_length;
    let rounded = round_shares(&[raw_a, 100.0 - raw_a]);
    let cost_percent_a = cost_percent(bands, rounded[0]);
    Ok(CareSplit {
        care_percent_a: rounded[0],
        care_percent_b: rounded[1],
        cost_percent_a,
        cost_percent_b: 100.0 - cost_percent_a,
    })
}

/// Care and cost percentages for one child, including any non-parent
/// carers involved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildCare {
    pub rounded_a: u8,
    pub rounded_b: u8,
    pub rounded_carer: Option<u8>,
    pub rounded_second_carer: Option<u8>,
    pub cost_a: f64,
    pub cost_b: f64,
    pub cost_carer: Option<f64>,
    pub cost_second_carer: Option<f64>,
}

impl ChildCare {
    pub fn for_child(child: &Child, with_carer: bool, bands: &[CareBand]) -> Self {
        Self::from_arrangement(&child.care, with_carer, bands)
    }

    pub fn from_arrangement(care: &CareArrangement, with_carer: bool, bands: &[CareBand]) -> Self {
        let raw_a = raw_percentage(care.parent_a, care.period);
        let raw_b = raw_percentage(care.parent_b, care.period);
        if with_carer {
            let mut raw = vec![raw_a, raw_b, raw_percentage(care.carer, care.period)];
            if care.second_carer > 0.0 {
                raw.push(raw_percentage(care.second_carer, care.period));
            }
            let rounded = round_shares(&raw);
            let second = rounded.get(3).copied();
            return Self {
                rounded_a: rounded[0],
                rounded_b: rounded[1],
                rounded_carer: Some(rounded[2]),
                rounded_second_carer: second,
                cost_a: cost_percent(bands, rounded[0]),
                cost_b: cost_percent(bands, rounded[1]),
                cost_carer: Some(cost_percent(bands, rounded[2])),
                cost_second_carer: second.map(|care| cost_percent(bands, care)),
            };
        }
        let rounded = round_shares(&[raw_a, raw_b]);
        let cost_a = cost_percent(bands, rounded[0]);
        Self {
            rounded_a: rounded[0],
            rounded_b: rounded[1],
            rounded_carer: None,
            rounded_second_carer: None,
            cost_a,
            cost_b: 100.0 - cost_a,
            cost_carer: None,
            cost_second_carer: None,
        }
    }

    pub fn rounded(&self, parent: ParentId) -> u8 {
        match parent {
            ParentId::A => self.rounded_a,
            ParentId::B => self.rounded_b,
        }
    }

    pub fn cost(&self, parent: ParentId) -> f64 {
        match parent {
            ParentId::A => self.cost_a,
            ParentId::B => self.cost_b,
        }
    }

    /// Cost percentages of the non-parent carers who hold enough care to
    /// be paid, first carer then second.
    pub fn receiving_carers(&self) -> (Option<f64>, Option<f64>) {
        let receives = |care: Option<u8>, cost: Option<f64>| {
            care.filter(|care| *care >= RECEIVING_THRESHOLD).and(cost)
        };
        (
            receives(self.rounded_carer, self.cost_carer),
            receives(self.rounded_second_carer, self.cost_second_carer),
        )
    }

    /// Combined cost percentage of the carers who can be paid, if any.
    pub fn carer_weight(&self) -> Option<f64> {
        match self.receiving_carers() {
            (None, None) => None,
            (first, second) => Some(first.unwrap_or(0.0) + second.unwrap_or(0.0)),
        }
    }

    /// Highest rounded care held by a non-parent carer.
    pub fn highest_carer_care(&self) -> Option<u8> {
        match (self.rounded_carer, self.rounded_second_carer) {
            (Some(first), Some(second)) => Some(first.max(second)),
            (first, second) => first.or(second),
        }
    }
}
