//! Entity record types and the static registry the conventional mapping scans.

mod device;
mod measure;
mod value;

pub use device::Device;
pub use measure::Measure;
pub use value::Value;

/// Storage shape of a single entity property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Integer,
    Real,
    Text,
    Timestamp,
    /// Many-to-one reference to the named entity.
    Reference(&'static str),
}

#[derive(Debug, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub kind: PropertyKind,
}

/// Compile-time description of an entity: its name, identity property and
/// the remaining properties in declaration order.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub name: &'static str,
    pub id: &'static str,
    pub properties: &'static [PropertyDescriptor],
}

impl EntityDescriptor {
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Every entity the harness knows about. Adding a type here is the only way
/// the conventional mapping picks it up.
pub static ENTITY_REGISTRY: [&EntityDescriptor; 3] = [
    &device::DESCRIPTOR,
    &measure::DESCRIPTOR,
    &value::DESCRIPTOR,
];

pub fn find_descriptor(name: &str) -> Option<&'static EntityDescriptor> {
    ENTITY_REGISTRY.iter().copied().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_references_resolve() {
        for descriptor in ENTITY_REGISTRY.iter() {
            for property in descriptor.properties {
                if let PropertyKind::Reference(target) = property.kind {
                    assert!(
                        find_descriptor(target).is_some(),
                        "{}.{} points at unknown entity {target}",
                        descriptor.name,
                        property.name
                    );
                }
            }
        }
    }

    #[test]
    fn value_declares_both_references() {
        let value = find_descriptor("Value").unwrap();
        assert_eq!(value.id, "ValueId");
        assert_eq!(
            value.property("Device").map(|p| p.kind),
            Some(PropertyKind::Reference("Device"))
        );
        assert_eq!(
            value.property("Measure").map(|p| p.kind),
            Some(PropertyKind::Reference("Measure"))
        );
    }
}
