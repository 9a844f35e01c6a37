//! SQLite dialect: identifier quoting, column types, connection pragmas and
//! the SQL pretty-printer used when statement formatting is on.

use super::configuration::Keywords;
use anyhow::{Context, Result};
use perf_core::mapping::ColumnType;
use rusqlite::Connection;

/// Identifiers that are reserved in standard SQL. Quoting is case-insensitive.
const RESERVED_WORDS: &[&str] = &[
    "ALL",
    "AND",
    "AS",
    "BY",
    "CHECK",
    "COLUMN",
    "CREATE",
    "DATE",
    "DEFAULT",
    "DELETE",
    "DISTINCT",
    "DROP",
    "FROM",
    "GROUP",
    "INDEX",
    "INSERT",
    "KEY",
    "NULL",
    "ORDER",
    "SELECT",
    "SET",
    "TABLE",
    "TIME",
    "TIMESTAMP",
    "UPDATE",
    "USER",
    "VALUE",
    "VALUES",
    "WHERE",
];

/// Clauses the formatter starts on a new line.
const CLAUSES: &[&str] = &["FROM", "WHERE", "VALUES", "ORDER", "GROUP", "JOIN"];

#[derive(Debug, Clone, Copy)]
pub struct Dialect {
    keywords: Keywords,
}

impl Dialect {
    pub fn new(keywords: Keywords) -> Self {
        Self { keywords }
    }

    pub fn is_reserved(identifier: &str) -> bool {
        RESERVED_WORDS
            .iter()
            .any(|word| word.eq_ignore_ascii_case(identifier))
    }

    pub fn quote(&self, identifier: &str) -> String {
        match self.keywords {
            Keywords::AutoQuote if Self::is_reserved(identifier) => {
                format!("\"{}\"", identifier.replace('"', "\"\""))
            }
            _ => identifier.to_string(),
        }
    }

    pub fn column_type(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            // RFC 3339 text keeps timestamps sortable and lossless.
            ColumnType::Text | ColumnType::Timestamp => "TEXT",
        }
    }

    /// Pragmas applied to every connection the factory opens.
    pub fn configure_connection(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA cache_size = -16384;",
        )
        .context("failed to configure SQLite connection")
    }

    /// One clause per line, one select-list item per line.
    pub fn format(sql: &str) -> String {
        let mut out = String::with_capacity(sql.len() + 32);
        for word in sql.split_whitespace() {
            let upper = word.to_ascii_uppercase();
            if !out.is_empty() {
                if CLAUSES.contains(&upper.as_str()) {
                    out.push('\n');
                } else if !out.ends_with('\n') && !out.ends_with("    ") {
                    out.push(' ');
                }
            }
            out.push_str(word);
            if upper == "SELECT" || word.ends_with(',') {
                out.push_str("\n    ");
            }
        }
        out
    }
}
