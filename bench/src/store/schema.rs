//! Schema export: DDL generation and the create/update/validate actions run
//! while a factory is being built.

use super::configuration::SchemaAction;
use super::dialect::Dialect;
use anyhow::{bail, Context, Result};
use perf_core::mapping::{ClassMapping, Mappings};
use rusqlite::Connection;

pub fn create_table_sql(
    class: &ClassMapping,
    mappings: &Mappings,
    dialect: &Dialect,
    if_not_exists: bool,
) -> Result<String> {
    let mut columns = vec![format!(
        "{} INTEGER PRIMARY KEY AUTOINCREMENT",
        dialect.quote(&class.id.column)
    )];

    for property in &class.properties {
        columns.push(format!(
            "{} {}{}",
            dialect.quote(&property.column),
            dialect.column_type(property.column_type),
            if property.not_null { " NOT NULL" } else { "" }
        ));
    }

    for reference in &class.many_to_one {
        let target = mappings.get(reference.target).with_context(|| {
            format!(
                "{}.{} references unmapped entity {}",
                class.entity, reference.property, reference.target
            )
        })?;
        columns.push(format!(
            "{} INTEGER{} REFERENCES {}({})",
            dialect.quote(&reference.column),
            if reference.not_null { " NOT NULL" } else { "" },
            dialect.quote(&target.table),
            dialect.quote(&target.id.column)
        ));
    }

    Ok(format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        dialect.quote(&class.table),
        columns.join(", ")
    ))
}

pub fn drop_table_sql(class: &ClassMapping, dialect: &Dialect) -> String {
    format!("DROP TABLE IF EXISTS {}", dialect.quote(&class.table))
}

/// Run `action` against `conn`. Tables are created in dependency order and
/// dropped in reverse.
pub fn apply(
    conn: &Connection,
    mappings: &Mappings,
    dialect: &Dialect,
    action: SchemaAction,
) -> Result<()> {
    let ordered = mappings.dependency_order();

    match action {
        SchemaAction::None => {}
        SchemaAction::Create => {
            for class in ordered.iter().rev() {
                execute_ddl(conn, &drop_table_sql(class, dialect))?;
            }
            for class in &ordered {
                execute_ddl(conn, &create_table_sql(class, mappings, dialect, false)?)?;
            }
        }
        SchemaAction::Update => {
            for class in &ordered {
                execute_ddl(conn, &create_table_sql(class, mappings, dialect, true)?)?;
            }
        }
        SchemaAction::Validate => {
            for class in &ordered {
                validate_table(conn, class)?;
            }
        }
    }

    Ok(())
}

fn execute_ddl(conn: &Connection, sql: &str) -> Result<()> {
    log::debug!(target: "sql", "{sql}");
    conn.execute_batch(sql)
        .with_context(|| format!("schema statement failed: {sql}"))
}

fn validate_table(conn: &Connection, class: &ClassMapping) -> Result<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let existing: Vec<String> = stmt
        .query_map([&class.table], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    if existing.is_empty() {
        bail!("missing table {} for entity {}", class.table, class.entity);
    }

    let expected = std::iter::once(&class.id.column)
        .chain(class.properties.iter().map(|p| &p.column))
        .chain(class.many_to_one.iter().map(|m| &m.column));
    for column in expected {
        if !existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            bail!("missing column {}.{}", class.table, column);
        }
    }

    Ok(())
}
