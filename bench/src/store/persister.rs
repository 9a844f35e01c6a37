//! Per-entity persister: the SQL generated for one class mapping plus the
//! row-to-state hydration paths selected by the tuning flags.

use super::configuration::Settings;
use super::dialect::Dialect;
use super::entity::{as_integer, EntityState};
use super::factory::{incr, SessionFactory};
use anyhow::{anyhow, Context, Result};
use perf_core::mapping::ClassMapping;
use perf_core::types::{find_descriptor, EntityDescriptor};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Params, Row, Statement};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct ColumnBinding {
    property: &'static str,
    column: String,
}

#[derive(Debug)]
pub struct EntityPersister {
    entity: &'static str,
    descriptor: &'static EntityDescriptor,
    /// Select-list order: id, properties, many-to-one columns.
    columns: Vec<ColumnBinding>,
    /// For each descriptor property, its position in `columns`.
    descriptor_slots: Vec<usize>,
    /// For each inserted column (all but the id), its descriptor position.
    insert_slots: Vec<usize>,
    select_all: String,
    select_by_id: String,
    insert: String,
}

impl EntityPersister {
    pub fn new(class: &ClassMapping, dialect: &Dialect, settings: &Settings) -> Result<Self> {
        let descriptor = find_descriptor(class.entity)
            .with_context(|| format!("no entity type registered for mapping {}", class.entity))?;

        let mut columns = vec![ColumnBinding {
            property: class.id.property,
            column: class.id.column.clone(),
        }];
        columns.extend(class.properties.iter().map(|p| ColumnBinding {
            property: p.property,
            column: p.column.clone(),
        }));
        columns.extend(class.many_to_one.iter().map(|m| ColumnBinding {
            property: m.property,
            column: m.column.clone(),
        }));

        let descriptor_slots = descriptor
            .properties
            .iter()
            .map(|p| {
                columns
                    .iter()
                    .position(|c| c.property == p.name)
                    .ok_or_else(|| anyhow!("{}.{} is not mapped", class.entity, p.name))
            })
            .collect::<Result<Vec<_>>>()?;

        let insert_slots = columns[1..]
            .iter()
            .map(|c| {
                descriptor
                    .properties
                    .iter()
                    .position(|p| p.name == c.property)
                    .ok_or_else(|| {
                        anyhow!("{}.{} has no such property", class.entity, c.property)
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let table = dialect.quote(&class.table);
        let select_list = columns
            .iter()
            .map(|c| dialect.quote(&c.column))
            .collect::<Vec<_>>()
            .join(", ");
        let comment = |verb: &str| {
            if settings.use_sql_comments {
                format!("/* {verb} {} */ ", class.entity)
            } else {
                String::new()
            }
        };

        let select_all = format!("{}SELECT {select_list} FROM {table}", comment("load"));
        let select_by_id = format!(
            "{}SELECT {select_list} FROM {table} WHERE {} = ?1",
            comment("load"),
            dialect.quote(&class.id.column)
        );
        let insert = format!(
            "{}INSERT INTO {table} ({}) VALUES ({})",
            comment("insert"),
            columns[1..]
                .iter()
                .map(|c| dialect.quote(&c.column))
                .collect::<Vec<_>>()
                .join(", "),
            (1..columns.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            entity: class.entity,
            descriptor,
            columns,
            descriptor_slots,
            insert_slots,
            select_all,
            select_by_id,
            insert,
        })
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn select_all_sql(&self) -> &str {
        &self.select_all
    }

    pub fn select_by_id_sql(&self) -> &str {
        &self.select_by_id
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert
    }

    /// Run a select produced by this persister and hydrate every row.
    pub fn load_states<P: Params>(
        &self,
        factory: &SessionFactory,
        sql: &str,
        params: P,
    ) -> Result<Vec<EntityState>> {
        let settings = factory.settings();
        let states = factory.with_statement(sql, |stmt| {
            let ordinals = if settings.wrap_result_sets {
                Some(self.resolve_ordinals(stmt)?)
            } else {
                None
            };

            let mut states = Vec::with_capacity(settings.fetch_size.unwrap_or(0));
            let mut rows = stmt.query(params)?;
            while let Some(row) = rows.next()? {
                states.push(self.hydrate(
                    row,
                    ordinals.as_deref(),
                    settings.use_reflection_optimizer,
                )?);
            }
            Ok(states)
        })?;

        factory.record(|s| incr(&s.queries_executed));
        Ok(states)
    }

    /// Insert `values` (descriptor order) and return the store-assigned id.
    pub fn insert(&self, factory: &SessionFactory, values: &[SqlValue]) -> Result<i64> {
        let id = factory.with_statement(&self.insert, |stmt| {
            let params = self.insert_slots.iter().map(|&d| &values[d]);
            stmt.execute(params_from_iter(params))?;
            Ok(factory.connection().last_insert_rowid())
        })?;

        factory.record(|s| incr(&s.entities_inserted));
        Ok(id)
    }

    /// Column ordinals looked up once for the whole result set.
    fn resolve_ordinals(&self, stmt: &Statement<'_>) -> Result<Vec<usize>> {
        self.columns
            .iter()
            .map(|c| {
                stmt.column_index(&c.column)
                    .with_context(|| format!("result set has no column {}", c.column))
            })
            .collect()
    }

    fn hydrate(
        &self,
        row: &Row<'_>,
        ordinals: Option<&[usize]>,
        optimized: bool,
    ) -> Result<EntityState> {
        let read = |i: usize| -> rusqlite::Result<SqlValue> {
            match ordinals {
                Some(ordinals) => row.get(ordinals[i]),
                None => row.get(self.columns[i].column.as_str()),
            }
        };

        if optimized {
            let id = as_integer(&read(0)?, self.descriptor.id)?;
            let values = self
                .descriptor_slots
                .iter()
                .map(|&slot| read(slot))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            return Ok(EntityState { id, values });
        }

        // Property-bag path: every column goes through its property name.
        let mut bag: HashMap<&'static str, SqlValue> = HashMap::with_capacity(self.columns.len());
        for (i, column) in self.columns.iter().enumerate() {
            bag.insert(column.property, read(i)?);
        }
        let id = bag
            .remove(self.descriptor.id)
            .ok_or_else(|| anyhow!("{} row has no id", self.entity))?;
        let values = self
            .descriptor
            .properties
            .iter()
            .map(|p| bag.remove(p.name).unwrap_or(SqlValue::Null))
            .collect();

        Ok(EntityState {
            id: as_integer(&id, self.descriptor.id)?,
            values,
        })
    }
}
