//! Per-day snapshots: the complete per-region state for one day.
//!
//! Snapshots are immutable once built. The engine produces a new one for
//! every projected day instead of mutating the previous day in place.

use crate::{
    error::{ProjectionError, ProjectionResult},
    types::{Day, RegionName},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCount {
    pub region:   RegionName,
    pub infected: f64,
}

/// Infection counts for every region on one day, in registry order.
/// Counts are not rounded; exponential growth makes them fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfectionSnapshot {
    entries: Vec<RegionCount>,
}

impl InfectionSnapshot {
    /// Build a snapshot, rejecting duplicate regions and counts that are
    /// negative or not finite.
    pub fn new<N, I>(entries: I) -> ProjectionResult<Self>
    where
        N: Into<RegionName>,
        I: IntoIterator<Item = (N, f64)>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (region, infected) in entries {
            let region = region.into();
            if !infected.is_finite() || infected < 0.0 {
                return Err(ProjectionError::InvalidParameter {
                    name:   "initial_infections",
                    reason: format!("count for '{region}' must be a finite value >= 0, got {infected}"),
                });
            }
            if !seen.insert(region.clone()) {
                return Err(ProjectionError::DuplicateRegion { region });
            }
            out.push(RegionCount { region, infected });
        }
        Ok(Self { entries: out })
    }

    /// Entries already validated by the engine.
    pub(crate) fn from_counts(entries: Vec<RegionCount>) -> Self {
        Self { entries }
    }

    pub fn get(&self, region: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.region == region)
            .map(|e| e.infected)
    }

    pub fn contains(&self, region: &str) -> bool {
        self.entries.iter().any(|e| e.region == region)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|e| (e.region.as_str(), e.infected))
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.region.as_str())
    }

    pub fn entries(&self) -> &[RegionCount] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.infected).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPercentage {
    pub region:     RegionName,
    /// `None` when the region's base population is zero.
    pub percentage: Option<f64>,
}

/// Percentage of population infected per region for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageSnapshot {
    pub day: Day,
    entries: Vec<RegionPercentage>,
}

impl PercentageSnapshot {
    pub(crate) fn new(day: Day, entries: Vec<RegionPercentage>) -> Self {
        Self { day, entries }
    }

    /// Percentage for `region`. The outer error means the region is not
    /// tracked at all; the inner `None` is the undefined-percentage
    /// sentinel for a zero population.
    pub fn percentage(&self, region: &str) -> ProjectionResult<Option<f64>> {
        self.entries
            .iter()
            .find(|e| e.region == region)
            .map(|e| e.percentage)
            .ok_or_else(|| ProjectionError::UnknownRegion { region: region.to_string() })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.entries.iter().map(|e| (e.region.as_str(), e.percentage))
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.region.as_str())
    }

    pub fn entries(&self) -> &[RegionPercentage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_count_is_rejected() {
        let err = InfectionSnapshot::new([("A", -1.0)]).unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidParameter { name: "initial_infections", .. }));
    }

    #[test]
    fn nan_count_is_rejected() {
        assert!(InfectionSnapshot::new([("A", f64::NAN)]).is_err());
    }

    #[test]
    fn duplicate_region_is_rejected() {
        let err = InfectionSnapshot::new([("A", 1.0), ("A", 2.0)]).unwrap_err();
        assert!(matches!(err, ProjectionError::DuplicateRegion { .. }));
    }

    #[test]
    fn snapshot_keeps_insertion_order() {
        let snap = InfectionSnapshot::new([("B", 0.0), ("A", 1.0)]).unwrap();
        assert_eq!(snap.regions().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(snap.get("A"), Some(1.0));
        assert_eq!(snap.total(), 1.0);
    }

    #[test]
    fn unknown_region_lookup_is_an_error() {
        let snap = PercentageSnapshot::new(0, vec![RegionPercentage {
            region:     "A".into(),
            percentage: Some(1.0),
        }]);
        assert_eq!(snap.percentage("A").unwrap(), Some(1.0));
        assert!(matches!(snap.percentage("Z"), Err(ProjectionError::UnknownRegion { .. })));
    }
}
