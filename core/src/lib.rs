//! Epidemic spread projection: delayed exponential growth per region,
//! converted to population percentages and looked up by day.

pub mod band;
pub mod config;
pub mod delay;
pub mod engine;
pub mod error;
pub mod registry;
pub mod series;
pub mod snapshot;
pub mod store;
pub mod types;

pub use engine::{project, to_percentages, Projection, ProjectionEngine};
pub use error::{ProjectionError, ProjectionResult};
pub use series::{query, DaySeries, PercentageSeries};
