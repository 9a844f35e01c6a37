use chrono::{DateTime, Utc};

use super::{Device, EntityDescriptor, Measure, PropertyDescriptor, PropertyKind};

pub(super) static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    name: "Value",
    id: "ValueId",
    properties: &[
        PropertyDescriptor {
            name: "Timestamp",
            kind: PropertyKind::Timestamp,
        },
        PropertyDescriptor {
            name: "Device",
            kind: PropertyKind::Reference("Device"),
        },
        PropertyDescriptor {
            name: "Measure",
            kind: PropertyKind::Reference("Measure"),
        },
        PropertyDescriptor {
            name: "Val",
            kind: PropertyKind::Real,
        },
    ],
};

/// One reading. The referenced device and measure are loaded together with
/// the value; there is no deferred loading.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub value_id: i64,
    pub timestamp: DateTime<Utc>,
    pub device: Device,
    pub measure: Measure,
    pub val: f64,
}

impl Value {
    pub fn new(device: &Device, measure: &Measure, timestamp: DateTime<Utc>, val: f64) -> Self {
        Self {
            value_id: 0,
            timestamp,
            device: device.clone(),
            measure: measure.clone(),
            val,
        }
    }

    pub fn descriptor() -> &'static EntityDescriptor {
        &DESCRIPTOR
    }
}
