//! The projection engine: the heart of the spread view.
//!
//! GROWTH RULE (per day d >= 1, per region r, delay = delays[r] or 0):
//!   1. d <= delay            -> count carries over unchanged
//!   2. previous count == 0   -> count becomes ONSET_SEED
//!   3. otherwise             -> previous * rate^(d - delay)
//!
//! RULES:
//!   - Step 3 re-bases on the previous day's count every day. It is not
//!     a closed form from day 0 and must not be rewritten as one.
//!   - Every day is a new snapshot appended to the series.
//!   - Snapshot order is registry order, for every day.
//!   - A run either yields a full series or an error. No partial series.

use crate::{
    delay::OnsetDelays,
    error::{ProjectionError, ProjectionResult},
    registry::PopulationRegistry,
    series::{DaySeries, PercentageSeries},
    snapshot::{InfectionSnapshot, PercentageSnapshot, RegionCount, RegionPercentage},
    types::{Day, MAX_HORIZON_DAYS, ONSET_SEED},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Project `initial` forward `horizon` days.
///
/// Returns `horizon + 1` snapshots; snapshot 0 equals `initial`.
/// A delay for a region `initial` does not carry is `MissingRegion`:
/// the snapshot lacks a region the delay table expects.
pub fn project(
    initial: &InfectionSnapshot,
    delays: &OnsetDelays,
    growth_rate: f64,
    horizon: Day,
) -> ProjectionResult<DaySeries> {
    validate_growth_rate(growth_rate)?;
    validate_horizon(horizon)?;
    if let Some(region) = delays.regions().find(|r| !initial.contains(r)) {
        return Err(ProjectionError::MissingRegion { region: region.to_string() });
    }

    let mut snapshots: Vec<InfectionSnapshot> = Vec::with_capacity(horizon as usize + 1);
    snapshots.push(initial.clone());

    for day in 1..=horizon {
        let previous = &snapshots[snapshots.len() - 1];
        let counts = previous
            .entries()
            .iter()
            .map(|e| RegionCount {
                region:   e.region.clone(),
                infected: advance(e.infected, day, delays.delay_for(&e.region), growth_rate),
            })
            .collect();
        let next = InfectionSnapshot::from_counts(counts);
        log::debug!("day={day} projected total={:.2}", next.total());
        snapshots.push(next);
    }

    log::info!(
        "Projected {} regions over {horizon} days at rate {growth_rate}",
        initial.len()
    );
    Ok(DaySeries::new(growth_rate, snapshots))
}

/// One region, one day.
fn advance(previous: f64, day: Day, delay: Day, growth_rate: f64) -> f64 {
    if day <= delay {
        previous
    } else if previous == 0.0 {
        ONSET_SEED
    } else {
        previous * growth_rate.powf((day - delay) as f64)
    }
}

pub(crate) fn validate_horizon(horizon: Day) -> ProjectionResult<()> {
    if horizon > MAX_HORIZON_DAYS {
        return Err(ProjectionError::InvalidParameter {
            name:   "horizon_days",
            reason: format!("must be <= {MAX_HORIZON_DAYS}, got {horizon}"),
        });
    }
    Ok(())
}

fn validate_growth_rate(growth_rate: f64) -> ProjectionResult<()> {
    if !growth_rate.is_finite() || growth_rate <= 0.0 {
        return Err(ProjectionError::InvalidParameter {
            name:   "growth_rate",
            reason: format!("must be a finite value > 0, got {growth_rate}"),
        });
    }
    Ok(())
}

/// Convert every snapshot of `series` into percentages of the registry
/// population.
///
/// A region with population 0 gets `None` (undefined) rather than an
/// infinite or NaN percentage.
pub fn to_percentages(
    series: &DaySeries,
    registry: &PopulationRegistry,
) -> ProjectionResult<PercentageSeries> {
    let mut warned: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(series.len());

    for (day, snapshot) in series.iter().enumerate() {
        let mut entries = Vec::with_capacity(snapshot.len());
        for (region, infected) in snapshot.iter() {
            let population = registry
                .population(region)
                .ok_or_else(|| ProjectionError::UnknownRegion { region: region.to_string() })?;
            let percentage = if population == 0 {
                if warned.insert(region) {
                    log::warn!("Region '{region}' has zero population; percentage undefined");
                }
                None
            } else {
                Some(100.0 * infected / population as f64)
            };
            entries.push(RegionPercentage { region: region.to_string(), percentage });
        }
        if entries.len() != registry.len() {
            return Err(ProjectionError::RegionMismatch {
                expected: registry.len(),
                actual:   entries.len(),
            });
        }
        out.push(PercentageSnapshot::new(day as Day, entries));
    }

    Ok(PercentageSeries::new(out))
}

/// The cached result of one parameterisation: counts and percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub counts:      DaySeries,
    pub percentages: PercentageSeries,
}

impl Projection {
    pub fn growth_rate(&self) -> f64 {
        self.counts.growth_rate()
    }

    pub fn horizon(&self) -> Day {
        self.counts.horizon()
    }
}

/// Registry and delay table bound together, loaded once and read-only.
pub struct ProjectionEngine {
    registry: PopulationRegistry,
    delays:   OnsetDelays,
}

impl ProjectionEngine {
    /// Fails if the delay table names a region the registry does not know.
    pub fn new(registry: PopulationRegistry, delays: OnsetDelays) -> ProjectionResult<Self> {
        if let Some(region) = delays.regions().find(|r| !registry.contains(r)) {
            return Err(ProjectionError::UnknownRegion { region: region.to_string() });
        }
        Ok(Self { registry, delays })
    }

    pub fn registry(&self) -> &PopulationRegistry {
        &self.registry
    }

    pub fn delays(&self) -> &OnsetDelays {
        &self.delays
    }

    /// Project after checking `initial` covers exactly the registry.
    pub fn project(
        &self,
        initial: &InfectionSnapshot,
        growth_rate: f64,
        horizon: Day,
    ) -> ProjectionResult<DaySeries> {
        let ordered = self.align(initial)?;
        project(&ordered, &self.delays, growth_rate, horizon)
    }

    pub fn percentages(&self, series: &DaySeries) -> ProjectionResult<PercentageSeries> {
        to_percentages(series, &self.registry)
    }

    /// Project and convert in one step.
    pub fn run(
        &self,
        initial: &InfectionSnapshot,
        growth_rate: f64,
        horizon: Day,
    ) -> ProjectionResult<Projection> {
        let counts = self.project(initial, growth_rate, horizon)?;
        let percentages = self.percentages(&counts)?;
        Ok(Projection { counts, percentages })
    }

    /// Reorder `initial` into registry order, rejecting missing and
    /// unknown regions.
    fn align(&self, initial: &InfectionSnapshot) -> ProjectionResult<InfectionSnapshot> {
        if let Some(region) = initial.regions().find(|r| !self.registry.contains(r)) {
            return Err(ProjectionError::UnknownRegion { region: region.to_string() });
        }
        let mut counts = Vec::with_capacity(self.registry.len());
        for name in self.registry.names() {
            let infected = initial
                .get(name)
                .ok_or_else(|| ProjectionError::MissingRegion { region: name.to_string() })?;
            counts.push(RegionCount { region: name.to_string(), infected });
        }
        Ok(InfectionSnapshot::from_counts(counts))
    }
}
