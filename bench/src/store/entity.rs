//! Bridges the plain entity structs to the store.
//!
//! Entity state travels as a vector of SQLite values in descriptor order (the
//! order `EntityDescriptor::properties` lists them), the id kept apart.
//! References are stored as the referenced id and resolved through an
//! [`EntityLoader`] when the entity is assembled.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use perf_core::types::{Device, EntityDescriptor, Measure, Value};
use rusqlite::types::Value as SqlValue;

/// Hydrated row: id plus property values in descriptor order.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    pub id: i64,
    pub values: Vec<SqlValue>,
}

/// Something that can hand out a fully loaded entity by id.
pub trait EntityLoader {
    fn load<E: Entity>(&mut self, id: i64) -> Result<E>;
}

pub trait Entity: Clone + 'static {
    fn descriptor() -> &'static EntityDescriptor;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    /// Property values in descriptor order, without the id.
    fn dehydrate(&self) -> Result<Vec<SqlValue>>;

    fn assemble<L: EntityLoader>(state: EntityState, loader: &mut L) -> Result<Self>;
}

fn unpack<const N: usize>(entity: &str, values: Vec<SqlValue>) -> Result<[SqlValue; N]> {
    values
        .try_into()
        .map_err(|v: Vec<SqlValue>| anyhow!("{entity}: expected {N} values, got {}", v.len()))
}

pub fn as_integer(value: &SqlValue, what: &str) -> Result<i64> {
    match value {
        SqlValue::Integer(i) => Ok(*i),
        SqlValue::Null => bail!("{what} is null"),
        other => bail!("{what}: expected integer, got {:?}", other.data_type()),
    }
}

pub fn as_real(value: &SqlValue, what: &str) -> Result<f64> {
    match value {
        SqlValue::Real(f) => Ok(*f),
        SqlValue::Integer(i) => Ok(*i as f64),
        SqlValue::Null => bail!("{what} is null"),
        other => bail!("{what}: expected real, got {:?}", other.data_type()),
    }
}

pub fn as_text(value: SqlValue, what: &str) -> Result<String> {
    match value {
        SqlValue::Text(s) => Ok(s),
        SqlValue::Null => bail!("{what} is null"),
        other => bail!("{what}: expected text, got {:?}", other.data_type()),
    }
}

pub fn as_timestamp(value: SqlValue, what: &str) -> Result<DateTime<Utc>> {
    let text = as_text(value, what)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| anyhow!("{what}: invalid timestamp {text:?}: {e}"))
}

pub fn timestamp_value(ts: &DateTime<Utc>) -> SqlValue {
    SqlValue::Text(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Id to store for a reference; unsaved targets are rejected.
fn reference_id(owner: &str, property: &str, id: i64) -> Result<SqlValue> {
    if id <= 0 {
        bail!("{owner}.{property} references an unsaved entity");
    }
    Ok(SqlValue::Integer(id))
}

impl Entity for Device {
    fn descriptor() -> &'static EntityDescriptor {
        Device::descriptor()
    }

    fn id(&self) -> i64 {
        self.device_id
    }

    fn set_id(&mut self, id: i64) {
        self.device_id = id;
    }

    fn dehydrate(&self) -> Result<Vec<SqlValue>> {
        Ok(vec![SqlValue::Text(self.name.clone())])
    }

    fn assemble<L: EntityLoader>(state: EntityState, _loader: &mut L) -> Result<Self> {
        let [name] = unpack::<1>("Device", state.values)?;
        Ok(Device {
            device_id: state.id,
            name: as_text(name, "Device.Name")?,
        })
    }
}

impl Entity for Measure {
    fn descriptor() -> &'static EntityDescriptor {
        Measure::descriptor()
    }

    fn id(&self) -> i64 {
        self.measure_id
    }

    fn set_id(&mut self, id: i64) {
        self.measure_id = id;
    }

    fn dehydrate(&self) -> Result<Vec<SqlValue>> {
        Ok(vec![SqlValue::Text(self.name.clone())])
    }

    fn assemble<L: EntityLoader>(state: EntityState, _loader: &mut L) -> Result<Self> {
        let [name] = unpack::<1>("Measure", state.values)?;
        Ok(Measure {
            measure_id: state.id,
            name: as_text(name, "Measure.Name")?,
        })
    }
}

impl Entity for Value {
    fn descriptor() -> &'static EntityDescriptor {
        Value::descriptor()
    }

    fn id(&self) -> i64 {
        self.value_id
    }

    fn set_id(&mut self, id: i64) {
        self.value_id = id;
    }

    fn dehydrate(&self) -> Result<Vec<SqlValue>> {
        Ok(vec![
            timestamp_value(&self.timestamp),
            reference_id("Value", "Device", self.device.device_id)?,
            reference_id("Value", "Measure", self.measure.measure_id)?,
            SqlValue::Real(self.val),
        ])
    }

    fn assemble<L: EntityLoader>(state: EntityState, loader: &mut L) -> Result<Self> {
        let [timestamp, device, measure, val] = unpack::<4>("Value", state.values)?;
        Ok(Value {
            value_id: state.id,
            timestamp: as_timestamp(timestamp, "Value.Timestamp")?,
            device: loader.load(as_integer(&device, "Value.Device")?)?,
            measure: loader.load(as_integer(&measure, "Value.Measure")?)?,
            val: as_real(&val, "Value.Val")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FixedLoader;

    impl EntityLoader for FixedLoader {
        fn load<E: Entity>(&mut self, id: i64) -> Result<E> {
            let state = EntityState {
                id,
                values: vec![SqlValue::Text(format!("{} {id}", E::descriptor().name))],
            };
            E::assemble(state, self)
        }
    }

    #[test]
    fn value_dehydrates_in_descriptor_order() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let device = Device {
            device_id: 4,
            name: "d".into(),
        };
        let measure = Measure {
            measure_id: 9,
            name: "m".into(),
        };
        let values = Value::new(&device, &measure, ts, 2.5).dehydrate().unwrap();

        assert_eq!(values[1], SqlValue::Integer(4));
        assert_eq!(values[2], SqlValue::Integer(9));
        assert_eq!(values[3], SqlValue::Real(2.5));
        assert_eq!(as_timestamp(values[0].clone(), "ts").unwrap(), ts);
    }

    #[test]
    fn unsaved_reference_is_rejected() {
        let value = Value::new(&Device::new("d"), &Measure::new("m"), Utc::now(), 1.0);
        assert!(value.dehydrate().is_err());
    }

    #[test]
    fn assemble_resolves_references_through_loader() {
        let state = EntityState {
            id: 7,
            values: vec![
                timestamp_value(&Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 5).unwrap()),
                SqlValue::Integer(2),
                SqlValue::Integer(3),
                SqlValue::Integer(5),
            ],
        };
        let value = Value::assemble(state, &mut FixedLoader).unwrap();

        assert_eq!(value.value_id, 7);
        assert_eq!(value.device.name, "Device 2");
        assert_eq!(value.measure.measure_id, 3);
        assert_eq!(value.val, 5.0);
    }
}
