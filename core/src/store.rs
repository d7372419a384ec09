//! SQLite persistence for projection runs.
//!
//! RULE: Only store.rs talks to the database.
//! The engine never touches SQL; the runner hands finished series here.

use crate::{
    engine::Projection,
    error::{ProjectionError, ProjectionResult},
    series::{DaySeries, PercentageSeries},
    snapshot::{InfectionSnapshot, PercentageSnapshot, RegionCount, RegionPercentage},
    types::{Day, RunId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id:       RunId,
    pub growth_rate:  f64,
    pub horizon_days: Day,
    pub version:      String,
    pub created_at:   DateTime<Utc>,
}

impl RunRecord {
    /// A fresh record with a random run id, stamped now.
    pub fn new(growth_rate: f64, horizon_days: Day, version: &str) -> Self {
        Self {
            run_id: format!("run-{}", uuid::Uuid::new_v4()),
            growth_rate,
            horizon_days,
            version: version.to_string(),
            created_at: Utc::now(),
        }
    }
}

pub struct ProjectionStore {
    conn: Connection,
}

impl ProjectionStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> ProjectionResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ProjectionResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ProjectionResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_projection.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn run(&self, run_id: &str) -> ProjectionResult<RunRecord> {
        let row = self
            .conn
            .query_row(
                "SELECT run_id, growth_rate, horizon_days, version, created_at
                 FROM projection_run WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| ProjectionError::RunNotFound { run_id: run_id.to_string() })?;
        run_record(row)
    }

    /// All stored runs, newest first.
    pub fn runs(&self) -> ProjectionResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, growth_rate, horizon_days, version, created_at
             FROM projection_run ORDER BY created_at DESC, run_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(run_record).collect()
    }

    /// Persist a run and its whole projection in one transaction.
    /// Either every row lands or none do.
    pub fn save_run(&self, run: &RunRecord, projection: &Projection) -> ProjectionResult<()> {
        let counts = &projection.counts;
        let percentages = &projection.percentages;
        let expected_days = run.horizon_days.saturating_add(1);
        if counts.len() as u64 != expected_days || percentages.len() as u64 != expected_days {
            return Err(ProjectionError::CorruptRun {
                run_id: run.run_id.clone(),
                reason: format!(
                    "expected {expected_days} days, got {} count days and {} percentage days",
                    counts.len(),
                    percentages.len()
                ),
            });
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO projection_run (run_id, growth_rate, horizon_days, version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run.run_id,
                run.growth_rate,
                run.horizon_days as i64,
                run.version,
                run.created_at.to_rfc3339(),
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO projection_day (run_id, day, position, region, infected, percentage)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (day, (snap, pct)) in counts.iter().zip(percentages.iter()).enumerate() {
                if snap.len() != pct.len() {
                    return Err(ProjectionError::RegionMismatch {
                        expected: snap.len(),
                        actual:   pct.len(),
                    });
                }
                for (position, ((region, infected), (_, percentage))) in
                    snap.iter().zip(pct.iter()).enumerate()
                {
                    stmt.execute(params![
                        run.run_id,
                        day as i64,
                        position as i64,
                        region,
                        infected,
                        percentage,
                    ])?;
                }
            }
        }
        tx.commit()?;
        log::debug!("Saved {} days for run {}", counts.len(), run.run_id);
        Ok(())
    }

    /// Rebuild the cached projection of a stored run.
    pub fn load_projection(&self, run_id: &str) -> ProjectionResult<Projection> {
        let run = self.run(run_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT day, region, infected, percentage FROM projection_day
             WHERE run_id = ?1 ORDER BY day ASC, position ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, i64>(0)? as Day,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let corrupt = |reason: String| ProjectionError::CorruptRun {
            run_id: run_id.to_string(),
            reason,
        };
        let expected_days = run.horizon_days.saturating_add(1);

        let mut count_days: Vec<Vec<RegionCount>> = Vec::new();
        let mut pct_days: Vec<Vec<RegionPercentage>> = Vec::new();
        for (day, region, infected, percentage) in rows {
            if day >= expected_days {
                return Err(corrupt(format!("row for day {day} beyond horizon {}", run.horizon_days)));
            }
            let day = day as usize;
            while count_days.len() <= day {
                count_days.push(Vec::new());
                pct_days.push(Vec::new());
            }
            count_days[day].push(RegionCount { region: region.clone(), infected });
            pct_days[day].push(RegionPercentage { region, percentage });
        }

        if count_days.len() as u64 != expected_days {
            return Err(corrupt(format!(
                "expected {expected_days} days, found {}",
                count_days.len()
            )));
        }
        let regions = count_days[0].len();
        if let Some((day, rows)) = count_days
            .iter()
            .enumerate()
            .find(|(_, rows)| rows.is_empty() || rows.len() != regions)
        {
            return Err(corrupt(format!(
                "day {day} has {} regions, day 0 has {regions}",
                rows.len()
            )));
        }

        let counts = DaySeries::new(
            run.growth_rate,
            count_days.into_iter().map(InfectionSnapshot::from_counts).collect(),
        );
        let percentages = PercentageSeries::new(
            pct_days
                .into_iter()
                .enumerate()
                .map(|(day, entries)| PercentageSnapshot::new(day as Day, entries))
                .collect(),
        );
        Ok(Projection { counts, percentages })
    }

    pub fn load_percentages(&self, run_id: &str) -> ProjectionResult<PercentageSeries> {
        Ok(self.load_projection(run_id)?.percentages)
    }
}

fn run_record(
    (run_id, growth_rate, horizon, version, created_at): (String, f64, i64, String, String),
) -> ProjectionResult<RunRecord> {
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| anyhow::anyhow!("Bad created_at for run {run_id}: {e}"))?
        .with_timezone(&Utc);
    Ok(RunRecord {
        run_id,
        growth_rate,
        horizon_days: horizon as Day,
        version,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{delay::OnsetDelays, engine::ProjectionEngine, registry::PopulationRegistry};

    #[test]
    fn unknown_run_is_reported() {
        let store = ProjectionStore::in_memory().unwrap();
        store.migrate().unwrap();
        assert!(matches!(
            store.load_percentages("run-missing"),
            Err(ProjectionError::RunNotFound { .. })
        ));
    }

    #[test]
    fn run_row_without_days_does_not_load() {
        let store = ProjectionStore::in_memory().unwrap();
        store.migrate().unwrap();
        let run = RunRecord::new(1.05, 20, "0.1.0-test");
        store
            .conn
            .execute(
                "INSERT INTO projection_run (run_id, growth_rate, horizon_days, version, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![run.run_id, run.growth_rate, 20i64, run.version, run.created_at.to_rfc3339()],
            )
            .unwrap();
        assert!(matches!(
            store.load_projection(&run.run_id),
            Err(ProjectionError::CorruptRun { .. })
        ));
    }

    #[test]
    fn truncated_day_rows_do_not_load() {
        let store = ProjectionStore::in_memory().unwrap();
        store.migrate().unwrap();
        let registry = PopulationRegistry::new([("A", 100), ("B", 1000)]).unwrap();
        let engine = ProjectionEngine::new(registry, OnsetDelays::new()).unwrap();
        let initial = InfectionSnapshot::new([("A", 1.0), ("B", 0.0)]).unwrap();
        let projection = engine.run(&initial, 2.0, 3).unwrap();
        let run = RunRecord::new(2.0, 3, "0.1.0-test");
        store.save_run(&run, &projection).unwrap();

        // Drop the last day entirely, then one region of day 1.
        store
            .conn
            .execute("DELETE FROM projection_day WHERE run_id = ?1 AND day = 3", params![run.run_id])
            .unwrap();
        assert!(matches!(
            store.load_projection(&run.run_id),
            Err(ProjectionError::CorruptRun { .. })
        ));

        let run = RunRecord::new(2.0, 3, "0.1.0-test");
        store.save_run(&run, &projection).unwrap();
        store
            .conn
            .execute(
                "DELETE FROM projection_day WHERE run_id = ?1 AND day = 1 AND position = 1",
                params![run.run_id],
            )
            .unwrap();
        assert!(matches!(
            store.load_projection(&run.run_id),
            Err(ProjectionError::CorruptRun { .. })
        ));
    }

    #[test]
    fn horizon_disagreeing_with_series_is_not_saved() {
        let store = ProjectionStore::in_memory().unwrap();
        store.migrate().unwrap();
        let registry = PopulationRegistry::new([("A", 100)]).unwrap();
        let engine = ProjectionEngine::new(registry, OnsetDelays::new()).unwrap();
        let initial = InfectionSnapshot::new([("A", 1.0)]).unwrap();
        let projection = engine.run(&initial, 2.0, 3).unwrap();

        let run = RunRecord::new(2.0, 5, "0.1.0-test");
        assert!(matches!(
            store.save_run(&run, &projection),
            Err(ProjectionError::CorruptRun { .. })
        ));
        assert!(store.runs().unwrap().is_empty(), "rejected run must leave no row behind");
    }

    #[test]
    fn migrate_is_idempotent() {
        let store = ProjectionStore::in_memory().unwrap();
        store.migrate().unwrap();
        store.migrate().unwrap();
        assert!(store.runs().unwrap().is_empty());
    }
}
