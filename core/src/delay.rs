//! Onset delay table: how many days each region waits before its
//! infection count starts to grow. Regions absent from the table have
//! no delay.

use crate::types::{Day, RegionName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OnsetDelays(BTreeMap<RegionName, Day>);

impl OnsetDelays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays used by the Austrian narrative: Niederoesterreich seeds the
    /// outbreak on day 0 and the other provinces follow.
    pub fn austria() -> Self {
        [
            ("Wien", 2),
            ("Burgenland", 3),
            ("Oberoesterreich", 3),
            ("Salzburg", 4),
            ("Steiermark", 4),
            ("Tirol", 5),
            ("Kaernten", 6),
            ("Vorarlberg", 6),
        ]
        .into_iter()
        .collect()
    }

    pub fn with(mut self, region: impl Into<RegionName>, delay: Day) -> Self {
        self.0.insert(region.into(), delay);
        self
    }

    /// Delay for `region`, 0 when the table does not mention it.
    pub fn delay_for(&self, region: &str) -> Day {
        self.0.get(region).copied().unwrap_or(0)
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Day)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<RegionName>> FromIterator<(N, Day)> for OnsetDelays {
    fn from_iter<T: IntoIterator<Item = (N, Day)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
