use super::{EntityDescriptor, PropertyDescriptor, PropertyKind};

pub(super) static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    name: "Measure",
    id: "MeasureId",
    properties: &[PropertyDescriptor {
        name: "Name",
        kind: PropertyKind::Text,
    }],
};

/// The quantity a value measures (temperature, humidity, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measure {
    pub measure_id: i64,
    pub name: String,
}

impl Measure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            measure_id: 0,
            name: name.into(),
        }
    }

    pub fn descriptor() -> &'static EntityDescriptor {
        &DESCRIPTOR
    }
}
