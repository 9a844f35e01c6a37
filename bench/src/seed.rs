//! Seed routine: recreates the schema and writes one Device, one Measure and
//! a run of Values, all in a single transaction.

use crate::modes::common;
use crate::store::{Configuration, SchemaAction, Session, SessionFactory};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use perf_core::constants::{NUMBER_OF_ENTITIES, SEED_DEVICE_NAME, SEED_MEASURE_NAME};
use perf_core::mapping::{compile_mapping, MappingMode};
use perf_core::types::{Device, Measure, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub devices: usize,
    pub measures: usize,
    pub values: usize,
}

/// Common configuration with the schema dropped and recreated on build.
pub fn seed_configuration(connection_string: &str) -> Configuration {
    common(connection_string)
        .add_mapping(compile_mapping(MappingMode::Conventional))
        .tune(|s| s.schema_action = SchemaAction::Create)
}

/// Seed `NUMBER_OF_ENTITIES` values timestamped from `base`.
pub fn seed(cfg: &Configuration, base: DateTime<Utc>) -> Result<SeedSummary> {
    let factory = SessionFactory::build(cfg).context("failed to build seed session factory")?;
    let mut session = factory.open_session();
    let tx = session.begin_transaction()?;

    let summary = populate(&mut session, base, NUMBER_OF_ENTITIES)?;

    tx.commit()?;
    log::info!(
        "seeded {} device, {} measure, {} values",
        summary.devices,
        summary.measures,
        summary.values
    );
    Ok(summary)
}

/// Save the seed entities through `session`. Value `i` is stamped
/// `base + i` seconds with reading `i`.
pub fn populate(
    session: &mut Session<'_>,
    base: DateTime<Utc>,
    count: usize,
) -> Result<SeedSummary> {
    let mut device = Device::new(SEED_DEVICE_NAME);
    let mut measure = Measure::new(SEED_MEASURE_NAME);
    session.save(&mut device)?;
    session.save(&mut measure)?;

    for i in 0..count {
        let mut value = Value::new(
            &device,
            &measure,
            base + Duration::seconds(i as i64),
            i as f64,
        );
        session
            .save(&mut value)
            .with_context(|| format!("failed to save value {i}"))?;
    }

    Ok(SeedSummary {
        devices: 1,
        measures: 1,
        values: count,
    })
}
