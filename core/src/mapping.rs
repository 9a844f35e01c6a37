//! Mapping rules: how entities become tables and columns.
//!
//! Two strategies produce the same schema shape:
//! - [`conventional`] walks [`ENTITY_REGISTRY`] and applies naming conventions
//! - [`static_mapping`] spells the three entities out by hand, adding
//!   not-null constraints on every required member

use crate::types::{Device, EntityDescriptor, Measure, PropertyKind, Value, ENTITY_REGISTRY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    Conventional,
    Static,
}

/// Identity generation strategy. Only store-assigned auto-increment exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMapping {
    pub property: &'static str,
    pub column: String,
    pub generator: Generator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMapping {
    pub property: &'static str,
    pub column: String,
    pub column_type: ColumnType,
    pub not_null: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManyToOneMapping {
    pub property: &'static str,
    pub column: String,
    pub target: &'static str,
    pub not_null: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMapping {
    pub entity: &'static str,
    pub table: String,
    pub lazy: bool,
    pub id: IdMapping,
    pub properties: Vec<PropertyMapping>,
    pub many_to_one: Vec<ManyToOneMapping>,
}

impl ClassMapping {
    fn new(descriptor: &EntityDescriptor) -> Self {
        Self {
            entity: descriptor.name,
            table: descriptor.name.to_string(),
            lazy: false,
            id: IdMapping {
                property: descriptor.id,
                column: descriptor.id.to_string(),
                generator: Generator::Identity,
            },
            properties: Vec::new(),
            many_to_one: Vec::new(),
        }
    }

    fn property(
        mut self,
        descriptor: &EntityDescriptor,
        name: &'static str,
        not_null: bool,
    ) -> Self {
        let column_type = match descriptor.property(name).map(|p| p.kind) {
            Some(PropertyKind::Integer) => ColumnType::Integer,
            Some(PropertyKind::Real) => ColumnType::Real,
            Some(PropertyKind::Timestamp) => ColumnType::Timestamp,
            _ => ColumnType::Text,
        };
        self.properties.push(PropertyMapping {
            property: name,
            column: name.to_string(),
            column_type,
            not_null,
        });
        self
    }

    fn many_to_one(mut self, name: &'static str, target: &'static str, not_null: bool) -> Self {
        self.many_to_one.push(ManyToOneMapping {
            property: name,
            column: name.to_string(),
            target,
            not_null,
        });
        self
    }

    /// Entities this class must be able to load before it can be materialized.
    pub fn dependencies(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.many_to_one.iter().map(|m| m.target)
    }
}

/// Compiled set of class mappings, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mappings {
    classes: Vec<ClassMapping>,
}

impl Mappings {
    pub fn get(&self, entity: &str) -> Option<&ClassMapping> {
        self.classes.iter().find(|c| c.entity == entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassMapping> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Add `other`'s classes; a class mapped twice keeps the later definition.
    pub fn merge(&mut self, other: Mappings) {
        for class in other.classes {
            match self.classes.iter_mut().find(|c| c.entity == class.entity) {
                Some(existing) => *existing = class,
                None => self.classes.push(class),
            }
        }
    }

    /// Classes ordered so every many-to-one target precedes its owner.
    /// Used for table creation and drop ordering.
    pub fn dependency_order(&self) -> Vec<&ClassMapping> {
        let mut ordered: Vec<&ClassMapping> = Vec::with_capacity(self.classes.len());
        let mut pending: Vec<&ClassMapping> = self.classes.iter().collect();

        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|class| {
                let ready = class
                    .dependencies()
                    .all(|dep| dep == class.entity || ordered.iter().any(|o| o.entity == dep));
                if ready {
                    ordered.push(class);
                }
                !ready
            });
            if pending.len() == before {
                // Unresolvable reference; keep declaration order for the rest.
                ordered.append(&mut pending);
            }
        }

        ordered
    }
}

pub fn compile_mapping(mode: MappingMode) -> Mappings {
    match mode {
        MappingMode::Conventional => conventional(&ENTITY_REGISTRY),
        MappingMode::Static => static_mapping(),
    }
}

/// Map every registered entity by convention: identity generator, eager
/// loading, column named after its property, no nullability constraints.
pub fn conventional(registry: &[&EntityDescriptor]) -> Mappings {
    let classes = registry.iter().copied().map(by_convention).collect();

    Mappings { classes }
}

fn by_convention(descriptor: &EntityDescriptor) -> ClassMapping {
    let mut class = ClassMapping::new(descriptor);
    for property in descriptor.properties {
        class = match property.kind {
            PropertyKind::Reference(target) => class.many_to_one(property.name, target, false),
            _ => class.property(descriptor, property.name, false),
        };
    }
    class
}

/// Hand-written mapping of Device, Measure and Value.
pub fn static_mapping() -> Mappings {
    let device = Device::descriptor();
    let measure = Measure::descriptor();
    let value = Value::descriptor();

    let classes = vec![
        ClassMapping::new(device).property(device, "Name", true),
        ClassMapping::new(measure).property(measure, "Name", true),
        ClassMapping::new(value)
            .property(value, "Val", true)
            .property(value, "Timestamp", true)
            .many_to_one("Measure", measure.name, true)
            .many_to_one("Device", device.name, true),
    ];

    Mappings { classes }
}
