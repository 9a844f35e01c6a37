use super::{EntityDescriptor, PropertyDescriptor, PropertyKind};

pub(super) static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    name: "Device",
    id: "DeviceId",
    properties: &[PropertyDescriptor {
        name: "Name",
        kind: PropertyKind::Text,
    }],
};

/// A measuring device. `device_id` is 0 until the store assigns one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Device {
    pub device_id: i64,
    pub name: String,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            device_id: 0,
            name: name.into(),
        }
    }

    pub fn descriptor() -> &'static EntityDescriptor {
        &DESCRIPTOR
    }
}
