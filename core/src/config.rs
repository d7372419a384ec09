//! Projection parameters, loaded once at startup.
//!
//! Every field has a default, so an empty `{}` file (or no file at all)
//! reproduces the Austrian narrative: nine provinces, Niederoesterreich
//! seeded with 5 cases, 20 days at 5% daily growth.

use crate::{
    delay::OnsetDelays,
    engine::{validate_horizon, ProjectionEngine},
    error::{ProjectionError, ProjectionResult},
    registry::PopulationRegistry,
    snapshot::InfectionSnapshot,
    types::{Day, RegionName},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub growth_rate:        f64,
    /// Signed so that a negative value in a file is reported as an
    /// invalid parameter instead of a parse error.
    pub horizon_days:       i64,
    pub onset_delays:       OnsetDelays,
    /// Day-0 counts. Must list every registry region exactly; seed
    /// untouched regions with an explicit 0.
    pub initial_infections: BTreeMap<RegionName, f64>,
    /// CSV population table; the built-in Austrian table when absent.
    pub registry_csv:       Option<PathBuf>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            growth_rate:        1.05,
            horizon_days:       20,
            onset_delays:       OnsetDelays::austria(),
            initial_infections: PopulationRegistry::austria()
                .names()
                .map(|name| {
                    let seed = if name == "Niederoesterreich" { 5.0 } else { 0.0 };
                    (name.to_string(), seed)
                })
                .collect(),
            registry_csv:       None,
        }
    }
}

impl ProjectionConfig {
    /// Load from a JSON file. A relative `registry_csv` is resolved
    /// against the config file's directory.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let mut config: ProjectionConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;

        if let (Some(csv), Some(dir)) = (config.registry_csv.as_ref(), path.parent()) {
            if csv.is_relative() {
                config.registry_csv = Some(dir.join(csv));
            }
        }
        log::debug!("Loaded projection config from {}", path.display());
        Ok(config)
    }

    /// Check the numeric parameters and return the horizon as a day count.
    pub fn validate(&self) -> ProjectionResult<Day> {
        if !self.growth_rate.is_finite() || self.growth_rate <= 0.0 {
            return Err(ProjectionError::InvalidParameter {
                name:   "growth_rate",
                reason: format!("must be a finite value > 0, got {}", self.growth_rate),
            });
        }
        let horizon = Day::try_from(self.horizon_days).map_err(|_| ProjectionError::InvalidParameter {
            name:   "horizon_days",
            reason: format!("must be >= 0, got {}", self.horizon_days),
        })?;
        validate_horizon(horizon)?;
        Ok(horizon)
    }

    pub fn load_registry(&self) -> ProjectionResult<PopulationRegistry> {
        match &self.registry_csv {
            Some(path) => PopulationRegistry::from_csv_path(path),
            None => Ok(PopulationRegistry::austria()),
        }
    }

    /// Day-0 snapshot in registry order. Every registry region must be
    /// listed; an omitted one is `MissingRegion`.
    pub fn initial_snapshot(&self, registry: &PopulationRegistry) -> ProjectionResult<InfectionSnapshot> {
        if let Some(region) = self.initial_infections.keys().find(|r| !registry.contains(r)) {
            return Err(ProjectionError::UnknownRegion { region: region.clone() });
        }
        let mut counts = Vec::with_capacity(registry.len());
        for name in registry.names() {
            let infected = self
                .initial_infections
                .get(name)
                .copied()
                .ok_or_else(|| ProjectionError::MissingRegion { region: name.to_string() })?;
            counts.push((name, infected));
        }
        InfectionSnapshot::new(counts)
    }

    pub fn build_engine(&self) -> ProjectionResult<ProjectionEngine> {
        ProjectionEngine::new(self.load_registry()?, self.onset_delays.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config: ProjectionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ProjectionConfig::default());
        assert_eq!(config.validate().unwrap(), 20);
    }

    #[test]
    fn negative_horizon_is_invalid_parameter() {
        let config: ProjectionConfig = serde_json::from_str(r#"{"horizon_days": -3}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ProjectionError::InvalidParameter { name: "horizon_days", .. })
        ));
    }

    #[test]
    fn zero_growth_rate_is_invalid_parameter() {
        let config = ProjectionConfig { growth_rate: 0.0, ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(ProjectionError::InvalidParameter { name: "growth_rate", .. })
        ));
    }

    #[test]
    fn default_seeds_every_province() {
        let config = ProjectionConfig::default();
        let registry = PopulationRegistry::austria();
        let snap = config.initial_snapshot(&registry).unwrap();
        assert_eq!(snap.len(), 9);
        assert_eq!(snap.get("Niederoesterreich"), Some(5.0));
        assert_eq!(snap.get("Wien"), Some(0.0));
    }

    #[test]
    fn unlisted_registry_region_is_missing() {
        let mut config = ProjectionConfig::default();
        config.initial_infections.remove("Wien");
        let err = config.initial_snapshot(&PopulationRegistry::austria()).unwrap_err();
        assert!(matches!(err, ProjectionError::MissingRegion { ref region } if region == "Wien"));
    }

    #[test]
    fn oversized_horizon_is_invalid_parameter() {
        let config = ProjectionConfig { horizon_days: i64::MAX, ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(ProjectionError::InvalidParameter { name: "horizon_days", .. })
        ));
    }

    #[test]
    fn initial_infection_for_unknown_region_is_rejected() {
        let mut config = ProjectionConfig::default();
        config.initial_infections.insert("Bavaria".into(), 1.0);
        let err = config.initial_snapshot(&PopulationRegistry::austria()).unwrap_err();
        assert!(matches!(err, ProjectionError::UnknownRegion { ref region } if region == "Bavaria"));
    }
}
