//! Severity bands for the choropleth fill.
//!
//! The engine never clamps. The 100% display ceiling lives here, on the
//! presentation side, together with the tier thresholds.

use serde::{Deserialize, Serialize};

pub const DISPLAY_CEILING: f64 = 100.0;
pub const ELEVATED_FROM: f64 = 5.0;
pub const SEVERE_ABOVE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    NoData,
    Low,      // < 5%
    Elevated, // 5% ..= 50%
    Severe,   // > 50%
}

impl SeverityBand {
    /// Band for a percentage; `None` (zero population) maps to `NoData`.
    pub fn classify(percentage: Option<f64>) -> Self {
        match percentage.map(display_percent) {
            None => Self::NoData,
            Some(p) if p < ELEVATED_FROM => Self::Low,
            Some(p) if p <= SEVERE_ABOVE => Self::Elevated,
            Some(_) => Self::Severe,
        }
    }

    /// Fill colour used by the map renderer.
    pub fn colour(&self) -> &'static str {
        match self {
            Self::NoData   => "#cccccc",
            Self::Low      => "#d6e5cf",
            Self::Elevated => "#f3dccf",
            Self::Severe   => "#e1a145",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoData   => "no data",
            Self::Low      => "low",
            Self::Elevated => "elevated",
            Self::Severe   => "severe",
        }
    }
}

/// Clamp a raw percentage into `[0, DISPLAY_CEILING]` for display.
pub fn display_percent(percentage: f64) -> f64 {
    percentage.clamp(0.0, DISPLAY_CEILING)
}
