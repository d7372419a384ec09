//! Day-indexed series produced by one projection run.
//!
//! Both series are immutable after construction. A new growth rate or
//! horizon means a new series, never an edit of an existing one.

use crate::{
    error::{ProjectionError, ProjectionResult},
    snapshot::{InfectionSnapshot, PercentageSnapshot},
    types::Day,
};
use serde::{Deserialize, Serialize};

/// Infection counts for day 0 through the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySeries {
    growth_rate: f64,
    snapshots:   Vec<InfectionSnapshot>,
}

impl DaySeries {
    pub(crate) fn new(growth_rate: f64, snapshots: Vec<InfectionSnapshot>) -> Self {
        Self { growth_rate, snapshots }
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    /// Number of days projected beyond day 0.
    pub fn horizon(&self) -> Day {
        self.snapshots.len().saturating_sub(1) as Day
    }

    pub fn get(&self, day: usize) -> Option<&InfectionSnapshot> {
        self.snapshots.get(day)
    }

    pub fn initial(&self) -> Option<&InfectionSnapshot> {
        self.snapshots.first()
    }

    pub fn last(&self) -> Option<&InfectionSnapshot> {
        self.snapshots.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InfectionSnapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Count for `region` on every day, day 0 first.
    pub fn counts_for(&self, region: &str) -> ProjectionResult<Vec<f64>> {
        self.snapshots
            .iter()
            .map(|s| {
                s.get(region)
                    .ok_or_else(|| ProjectionError::UnknownRegion { region: region.to_string() })
            })
            .collect()
    }
}

/// Percentage of population infected, aligned by index with a `DaySeries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageSeries {
    snapshots: Vec<PercentageSnapshot>,
}

impl PercentageSeries {
    pub(crate) fn new(snapshots: Vec<PercentageSnapshot>) -> Self {
        Self { snapshots }
    }

    /// Look up one day. Fails when `day` is past the last projected day.
    pub fn query(&self, day: usize) -> ProjectionResult<&PercentageSnapshot> {
        self.snapshots.get(day).ok_or(ProjectionError::IndexOutOfRange {
            index: i64::try_from(day).unwrap_or(i64::MAX),
            len:   self.snapshots.len(),
        })
    }

    /// Signed lookup for callers (slider positions, JSON input) that may
    /// hand over a negative day.
    pub fn query_signed(&self, day: i64) -> ProjectionResult<&PercentageSnapshot> {
        usize::try_from(day)
            .ok()
            .and_then(|d| self.snapshots.get(d))
            .ok_or(ProjectionError::IndexOutOfRange { index: day, len: self.snapshots.len() })
    }

    /// Percentage for `region` on every day, day 0 first.
    pub fn trajectory(&self, region: &str) -> ProjectionResult<Vec<Option<f64>>> {
        self.snapshots.iter().map(|s| s.percentage(region)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PercentageSnapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Free-function form of [`PercentageSeries::query`].
pub fn query(series: &PercentageSeries, day: usize) -> ProjectionResult<&PercentageSnapshot> {
    series.query(day)
}
