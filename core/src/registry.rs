//! Population registry: the static region table every projection is
//! measured against.
//!
//! RULE: Registry order is snapshot order. The engine never reorders
//! regions, so the order rows were loaded in is the order a renderer
//! receives them in.

use crate::{
    error::{ProjectionError, ProjectionResult},
    types::{clean_cell, RegionName},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, io::Read, path::Path};

/// Latest-year populations of the nine Austrian provinces.
const AUSTRIA: [(&str, u64); 9] = [
    ("Burgenland",        301_819),
    ("Kaernten",          570_194),
    ("Niederoesterreich", 1_727_759),
    ("Oberoesterreich",   1_535_677),
    ("Salzburg",          572_905),
    ("Steiermark",        1_271_940),
    ("Tirol",             777_773),
    ("Vorarlberg",        411_748),
    ("Wien",              2_028_399),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name:       RegionName,
    pub population: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PopulationRegistry {
    regions: Vec<Region>,
    index:   HashMap<RegionName, usize>,
}

impl PopulationRegistry {
    /// Build a registry from (name, population) pairs, keeping their order.
    pub fn new<N, I>(entries: I) -> ProjectionResult<Self>
    where
        N: Into<RegionName>,
        I: IntoIterator<Item = (N, u64)>,
    {
        let mut registry = Self::default();
        for (name, population) in entries {
            registry.push(Region { name: name.into(), population })?;
        }
        Ok(registry)
    }

    /// The built-in Austrian province table.
    pub fn austria() -> Self {
        let regions: Vec<Region> = AUSTRIA
            .iter()
            .map(|(name, population)| Region { name: name.to_string(), population: *population })
            .collect();
        let index = regions
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Self { regions, index }
    }

    /// Build a registry from raw tabular rows.
    ///
    /// The first cell is the region name and the last cell is the most
    /// recent population; the columns in between are older census years
    /// and are ignored. Cells may carry quotes and trailing `\r`.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> ProjectionResult<Self>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut registry = Self::default();
        for row in rows {
            let cells = row.as_ref();
            let Some(first) = cells.first() else { continue };
            let name = clean_cell(first.as_ref());
            if name.is_empty() {
                continue;
            }
            let raw = match cells.last() {
                Some(last) if cells.len() > 1 => clean_cell(last.as_ref()),
                _ => String::new(),
            };
            let population = raw.parse::<u64>().map_err(|_| ProjectionError::InvalidPopulation {
                region: name.clone(),
                value:  raw.clone(),
            })?;
            registry.push(Region { name, population })?;
        }
        log::debug!("Loaded population registry with {} regions", registry.len());
        Ok(registry)
    }

    /// Read a registry from CSV with a header row. Rows may have any
    /// number of year columns; the last one wins.
    pub fn from_csv_reader<R: Read>(reader: R) -> ProjectionResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Self::from_rows(rows)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> ProjectionResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        Self::from_csv_reader(file)
    }

    fn push(&mut self, region: Region) -> ProjectionResult<()> {
        if self.index.contains_key(&region.name) {
            return Err(ProjectionError::DuplicateRegion { region: region.name });
        }
        self.index.insert(region.name.clone(), self.regions.len());
        self.regions.push(region);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.index.get(name).map(|&i| &self.regions[i])
    }

    pub fn population(&self, name: &str) -> Option<u64> {
        self.get(name).map(|r| r.population)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
