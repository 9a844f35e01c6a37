//! Store configuration: connection, mappings and tuning flags.
//!
//! Building a [`Configuration`] never touches the database. Connectivity and
//! schema problems surface in [`SessionFactory::build`](super::SessionFactory::build)
//! or when a query runs.

use perf_core::mapping::Mappings;

/// How identifiers that collide with SQL keywords are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keywords {
    /// Quote reserved identifiers in generated SQL.
    AutoQuote,
    /// Emit identifiers as written.
    None,
}

/// Schema work performed when a factory is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAction {
    None,
    /// Drop and recreate every mapped table.
    Create,
    /// Create tables that do not exist yet.
    Update,
    /// Fail unless every mapped table and column exists.
    Validate,
}

/// Tuning flags consulted by the factory and its sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub show_sql: bool,
    pub format_sql: bool,
    pub use_sql_comments: bool,
    pub generate_statistics: bool,
    pub keywords: Keywords,
    pub prepare_sql: bool,
    pub use_reflection_optimizer: bool,
    pub query_startup_checking: bool,
    pub use_proxy_validator: bool,
    /// Recorded only; there is no cache provider.
    pub use_second_level_cache: bool,
    /// Recorded only; no query is cacheable.
    pub use_query_cache: bool,
    pub fetch_size: Option<usize>,
    pub wrap_result_sets: bool,
    /// Fire pre-load/post-load listeners for every materialized entity.
    pub load_event_listeners: bool,
    pub schema_action: SchemaAction,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_sql: true,
            format_sql: true,
            use_sql_comments: true,
            generate_statistics: true,
            keywords: Keywords::AutoQuote,
            prepare_sql: false,
            use_reflection_optimizer: false,
            query_startup_checking: true,
            use_proxy_validator: true,
            use_second_level_cache: true,
            use_query_cache: false,
            fetch_size: None,
            wrap_result_sets: false,
            load_event_listeners: true,
            schema_action: SchemaAction::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub connection_string: String,
    pub mappings: Mappings,
    pub settings: Settings,
}

impl Configuration {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            mappings: Mappings::default(),
            settings: Settings::default(),
        }
    }

    pub fn add_mapping(mut self, mappings: Mappings) -> Self {
        self.mappings.merge(mappings);
        self
    }

    /// Adjust tuning flags in place, builder style.
    pub fn tune(mut self, adjust: impl FnOnce(&mut Settings)) -> Self {
        adjust(&mut self.settings);
        self
    }
}
