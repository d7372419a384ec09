//! Run persistence round trips through SQLite.

use spread_core::{
    config::ProjectionConfig,
    delay::OnsetDelays,
    engine::{Projection, ProjectionEngine},
    error::ProjectionError,
    registry::PopulationRegistry,
    snapshot::InfectionSnapshot,
    store::{ProjectionStore, RunRecord},
};

fn fresh_store() -> ProjectionStore {
    let store = ProjectionStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn default_projection(horizon: u64) -> Projection {
    let config = ProjectionConfig::default();
    let engine = config.build_engine().unwrap();
    let initial = config.initial_snapshot(engine.registry()).unwrap();
    engine.run(&initial, 1.05, horizon).unwrap()
}

#[test]
fn saved_projection_loads_back_identically() {
    let store = fresh_store();
    let projection = default_projection(20);

    let run = RunRecord::new(1.05, 20, "0.1.0-test");
    store.save_run(&run, &projection).unwrap();

    let loaded = store.load_projection(&run.run_id).unwrap();
    assert_eq!(loaded, projection);
    assert_eq!(store.run(&run.run_id).unwrap(), run);
}

#[test]
fn undefined_percentage_survives_as_null() {
    let store = fresh_store();
    let registry = PopulationRegistry::new([("Empty", 0), ("A", 100)]).unwrap();
    let engine = ProjectionEngine::new(registry, OnsetDelays::new()).unwrap();
    let initial = InfectionSnapshot::new([("Empty", 1.0), ("A", 1.0)]).unwrap();
    let projection = engine.run(&initial, 2.0, 3).unwrap();

    let run = RunRecord::new(2.0, 3, "0.1.0-test");
    store.save_run(&run, &projection).unwrap();

    let loaded = store.load_percentages(&run.run_id).unwrap();
    assert_eq!(loaded.len(), 4);
    for snap in loaded.iter() {
        assert_eq!(snap.percentage("Empty").unwrap(), None);
        assert!(snap.percentage("A").unwrap().is_some());
    }
}

#[test]
fn runs_are_listed_with_their_parameters() {
    let store = fresh_store();
    let a = RunRecord::new(1.05, 20, "0.1.0-test");
    let b = RunRecord::new(1.05, 10, "0.1.0-test");
    store.save_run(&a, &default_projection(20)).unwrap();
    store.save_run(&b, &default_projection(10)).unwrap();

    let runs = store.runs().unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().any(|r| r.run_id == b.run_id && r.horizon_days == 10));
    for run in &runs {
        let loaded = store.load_projection(&run.run_id).unwrap();
        assert_eq!(loaded.horizon(), run.horizon_days);
    }
}

#[test]
fn failed_save_leaves_no_run_behind() {
    let store = fresh_store();
    let projection = default_projection(2);
    let run = RunRecord::new(1.05, 2, "0.1.0-test");
    store.save_run(&run, &projection).unwrap();

    // Same run id again: the insert collides and nothing of the second
    // save may remain.
    let again = RunRecord { run_id: run.run_id.clone(), ..RunRecord::new(1.05, 2, "0.1.0-test") };
    let err = store.save_run(&again, &projection).unwrap_err();
    assert!(matches!(err, ProjectionError::Database(_)));
    assert_eq!(store.runs().unwrap().len(), 1);
    assert_eq!(store.load_projection(&run.run_id).unwrap(), projection);
}

#[test]
fn file_backed_store_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs.db");
    let path = path.to_str().unwrap();
    let run = RunRecord::new(1.05, 5, "0.1.0-test");
    let projection = default_projection(5);

    {
        let store = ProjectionStore::open(path).unwrap();
        store.migrate().unwrap();
        store.save_run(&run, &projection).unwrap();
    }

    let store = ProjectionStore::open(path).unwrap();
    store.migrate().unwrap();
    assert_eq!(store.run(&run.run_id).unwrap().horizon_days, 5);
    assert_eq!(store.load_projection(&run.run_id).unwrap(), projection);
}
