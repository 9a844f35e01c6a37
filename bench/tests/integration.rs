//! Integration tests: seed a temporary SQLite file and drive every mode
//! through the public API.

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use nh_performance::modes::{build_configuration, common, RunMode};
use nh_performance::runner::{run, run_all, SQL_MODE_QUERY};
use nh_performance::seed::{populate, seed, seed_configuration};
use nh_performance::store::{
    Configuration, LoadEventListener, SchemaAction, SessionFactory, SqlValue,
};
use perf_core::constants::{NUMBER_OF_ENTITIES, REPEAT_TIMES, SEED_DEVICE_NAME};
use perf_core::mapping::{compile_mapping, MappingMode};
use perf_core::types::{Device, Measure, Value};
use std::cell::Cell;
use std::rc::Rc;
use tempfile::TempDir;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

fn database() -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("perf.db").to_string_lossy().into_owned();
    (dir, path)
}

fn seeded_database() -> (TempDir, String) {
    let (dir, path) = database();
    seed(&seed_configuration(&path), base_time()).expect("seed");
    (dir, path)
}

fn all_configurations(path: &str) -> Vec<(RunMode, Configuration)> {
    RunMode::ALL
        .iter()
        .map(|&mode| (mode, build_configuration(mode, path)))
        .collect()
}

fn is_report_line(line: &str) -> bool {
    let Some((mode, rest)) = line.split_once(": ") else {
        return false;
    };
    let Some(ms) = rest.strip_suffix(" milliseconds") else {
        return false;
    };
    RunMode::ALL.iter().any(|m| m.name() == mode)
        && !ms.is_empty()
        && ms.chars().all(|c| c.is_ascii_digit())
}

// ── Seeding ─────────────────────────────────────────────────────────

#[test]
fn seed_writes_one_device_one_measure_and_the_values() {
    let (_dir, path) = seeded_database();
    let factory = SessionFactory::build(&build_configuration(RunMode::Stateless, &path)).unwrap();
    let mut session = factory.open_stateless_session();

    let devices: Vec<Device> = session.query().unwrap();
    let measures: Vec<Measure> = session.query().unwrap();
    let mut values: Vec<Value> = session.query().unwrap();
    values.sort_by_key(|v| v.value_id);

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, SEED_DEVICE_NAME);
    assert_eq!(measures.len(), 1);
    assert_eq!(values.len(), NUMBER_OF_ENTITIES);

    for (i, value) in values.iter().enumerate() {
        assert_eq!(value.timestamp, base_time() + Duration::seconds(i as i64));
        assert_eq!(value.val, i as f64);
        assert_eq!(value.device, devices[0]);
        assert_eq!(value.measure, measures[0]);
    }
}

#[test]
fn seeding_twice_recreates_the_schema() {
    let (_dir, path) = seeded_database();
    seed(&seed_configuration(&path), base_time()).unwrap();

    let factory = SessionFactory::build(&build_configuration(RunMode::Sql, &path)).unwrap();
    let rows = factory
        .open_stateless_session()
        .create_sql_query(SQL_MODE_QUERY)
        .list()
        .unwrap();
    assert_eq!(rows.len(), NUMBER_OF_ENTITIES);
}

fn populate_then_fail(factory: &SessionFactory) -> Result<()> {
    let mut session = factory.open_session();
    let _tx = session.begin_transaction()?;
    populate(&mut session, base_time(), 10)?;
    anyhow::bail!("interrupted before commit")
}

#[test]
fn failure_before_commit_leaves_no_rows() {
    let (_dir, path) = database();
    let factory = SessionFactory::build(&seed_configuration(&path)).unwrap();

    assert!(populate_then_fail(&factory).is_err());

    let mut session = factory.open_stateless_session();
    assert!(session.query::<Value>().unwrap().is_empty());
    assert!(session.query::<Device>().unwrap().is_empty());
    assert_eq!(factory.open_sessions(), 1);
}

#[test]
fn unsaved_references_are_rejected() {
    let (_dir, path) = database();
    let factory = SessionFactory::build(&seed_configuration(&path)).unwrap();
    let mut session = factory.open_session();

    let mut value = Value::new(&Device::new("d"), &Measure::new("m"), base_time(), 1.0);
    let err = session.save(&mut value).unwrap_err();
    assert!(err.to_string().contains("unsaved"));
}

// ── Modes ───────────────────────────────────────────────────────────

#[test]
fn every_mode_builds_and_reports() {
    let (_dir, path) = seeded_database();
    let mut out = Vec::new();

    let results = run_all(&all_configurations(&path), 2, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|l| is_report_line(l)), "{text}");
    assert_eq!(
        results.iter().map(|r| r.mode).collect::<Vec<_>>(),
        RunMode::ALL
    );
    assert!(lines[0].starts_with("Normal: "));
    assert!(lines[3].starts_with("Sql: "));
}

#[test]
fn empty_value_table_runs_in_every_mode() {
    let (_dir, path) = database();
    let create = common(&path).tune(|s| s.schema_action = SchemaAction::Create);
    drop(SessionFactory::build(&create).unwrap());

    let mut out = Vec::new();
    let results = run_all(&all_configurations(&path), REPEAT_TIMES, &mut out).unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.repetitions == REPEAT_TIMES));
}

#[test]
fn missing_schema_fails_the_normal_build() {
    let (_dir, path) = database();

    let err = SessionFactory::build(&build_configuration(RunMode::Normal, &path))
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("startup check failed"));

    // Without startup checking the build succeeds and the first query fails.
    let factory = SessionFactory::build(&build_configuration(RunMode::Optimized, &path)).unwrap();
    assert!(run(&factory, RunMode::Optimized).is_err());
    assert_eq!(factory.open_sessions(), 0);
}

#[test]
fn sessions_are_released_after_every_repetition() {
    let (_dir, path) = seeded_database();
    let factory = SessionFactory::build(&build_configuration(RunMode::Normal, &path)).unwrap();

    for mode in RunMode::ALL {
        for _ in 0..REPEAT_TIMES {
            run(&factory, mode).unwrap();
            assert_eq!(factory.open_sessions(), 0);
        }
    }

    let stats = factory.statistics().unwrap();
    assert_eq!(stats.sessions_opened, (4 * REPEAT_TIMES) as u64);
    assert_eq!(stats.sessions_closed, stats.sessions_opened);
}

/// Create and populate the schema through `mode`'s mapping.
fn database_created_by(mode: MappingMode) -> (TempDir, String) {
    let (dir, path) = database();
    let cfg = Configuration::new(path.as_str())
        .add_mapping(compile_mapping(mode))
        .tune(|s| s.schema_action = SchemaAction::Create);
    let factory = SessionFactory::build(&cfg).unwrap();
    {
        let mut session = factory.open_session();
        let tx = session.begin_transaction().unwrap();
        populate(&mut session, base_time(), NUMBER_OF_ENTITIES).unwrap();
        tx.commit().unwrap();
    }
    (dir, path)
}

const VALUE_ROWS: &str =
    "SELECT ValueId, Timestamp, Val, Device, Measure FROM Value ORDER BY ValueId";

/// Raw rows and materialized values, read through `mode`'s mapping.
fn read_with(mode: MappingMode, path: &str) -> (Vec<Vec<SqlValue>>, Vec<Value>) {
    let cfg = Configuration::new(path).add_mapping(compile_mapping(mode));
    let factory = SessionFactory::build(&cfg).unwrap();
    let raw = factory
        .open_stateless_session()
        .create_sql_query(VALUE_ROWS)
        .list()
        .unwrap();
    let mut values: Vec<Value> = factory.open_session().query().unwrap();
    values.sort_by_key(|v| v.value_id);
    (raw, values)
}

#[test]
fn mapping_strategies_read_the_same_rows() {
    let (_dir, path) = seeded_database();

    let conventional = read_with(MappingMode::Conventional, &path);
    let explicit = read_with(MappingMode::Static, &path);
    assert_eq!(conventional, explicit);
    assert_eq!(conventional.1.len(), NUMBER_OF_ENTITIES);
}

#[test]
fn schemas_created_by_either_strategy_hold_the_same_data() {
    let (_conventional_dir, conventional_path) = database_created_by(MappingMode::Conventional);
    let (_static_dir, static_path) = database_created_by(MappingMode::Static);

    let expected = read_with(MappingMode::Conventional, &conventional_path);
    for mode in [MappingMode::Conventional, MappingMode::Static] {
        assert_eq!(read_with(mode, &static_path), expected);
    }

    // Every benchmark mode runs against the static schema.
    let configurations = all_configurations(&static_path);
    let mut out = Vec::new();
    let results = run_all(&configurations, 2, &mut out).unwrap();
    assert_eq!(results.len(), RunMode::ALL.len());
}

// ── Load listeners ──────────────────────────────────────────────────

struct CountingListener(Rc<Cell<usize>>);

impl LoadEventListener for CountingListener {
    fn on_post_load(&self, _entity: &'static str, _id: i64) {
        self.0.set(self.0.get() + 1);
    }
}

fn count_loads(mode: RunMode, path: &str) -> usize {
    let loads = Rc::new(Cell::new(0));
    let mut factory = SessionFactory::build(&build_configuration(mode, path)).unwrap();
    factory.register_load_listener(Box::new(CountingListener(loads.clone())));
    run(&factory, mode).unwrap();
    loads.get()
}

#[test]
fn load_listeners_fire_only_when_enabled() {
    let (_dir, path) = seeded_database();

    // every value plus the shared device and measure
    assert_eq!(count_loads(RunMode::Normal, &path), NUMBER_OF_ENTITIES + 2);
    assert_eq!(count_loads(RunMode::Optimized, &path), 0);
}
