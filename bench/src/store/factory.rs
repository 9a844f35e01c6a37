//! Session factory: owns the SQLite connection, the compiled persisters and
//! the runtime counters shared by every session it opens.

use super::configuration::{Configuration, Settings};
use super::dialect::Dialect;
use super::persister::EntityPersister;
use super::schema;
use super::session::{Session, StatelessSession};
use anyhow::{bail, Context, Result};
use log::Level;
use perf_core::mapping::Mappings;
use perf_core::types::find_descriptor;
use rusqlite::{Connection, Statement};
use std::cell::Cell;
use std::collections::HashMap;

/// Connection string that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

pub(crate) fn incr(counter: &Cell<u64>) {
    counter.set(counter.get() + 1);
}

/// Runtime counters, kept only when statistics generation is on.
#[derive(Debug, Default)]
pub struct Statistics {
    pub(crate) sessions_opened: Cell<u64>,
    pub(crate) sessions_closed: Cell<u64>,
    pub(crate) statements_prepared: Cell<u64>,
    pub(crate) queries_executed: Cell<u64>,
    pub(crate) entities_loaded: Cell<u64>,
    pub(crate) entities_inserted: Cell<u64>,
    pub(crate) flushes: Cell<u64>,
    pub(crate) transactions: Cell<u64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub statements_prepared: u64,
    pub queries_executed: u64,
    pub entities_loaded: u64,
    pub entities_inserted: u64,
    pub flushes: u64,
    pub transactions: u64,
}

impl Statistics {
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            sessions_opened: self.sessions_opened.get(),
            sessions_closed: self.sessions_closed.get(),
            statements_prepared: self.statements_prepared.get(),
            queries_executed: self.queries_executed.get(),
            entities_loaded: self.entities_loaded.get(),
            entities_inserted: self.entities_inserted.get(),
            flushes: self.flushes.get(),
            transactions: self.transactions.get(),
        }
    }
}

/// Hooks around entity materialization in stateful sessions.
pub trait LoadEventListener {
    fn on_pre_load(&self, _entity: &'static str, _id: i64) {}

    fn on_post_load(&self, _entity: &'static str, _id: i64) {}
}

/// Installed by default whenever load listeners are enabled.
pub struct TraceLoadListener;

impl LoadEventListener for TraceLoadListener {
    fn on_post_load(&self, entity: &'static str, id: i64) {
        log::trace!("loaded {entity}#{id}");
    }
}

pub struct SessionFactory {
    conn: Connection,
    settings: Settings,
    persisters: HashMap<&'static str, EntityPersister>,
    statistics: Option<Statistics>,
    open_sessions: Cell<usize>,
    listeners: Vec<Box<dyn LoadEventListener>>,
}

impl SessionFactory {
    pub fn build(cfg: &Configuration) -> Result<Self> {
        let settings = cfg.settings.clone();
        let dialect = Dialect::new(settings.keywords);

        if cfg.mappings.is_empty() {
            bail!("configuration has no mapped entities");
        }
        if settings.use_proxy_validator {
            validate_mappings(&cfg.mappings)?;
        }

        let conn = if cfg.connection_string == IN_MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(&cfg.connection_string)
        }
        .with_context(|| format!("failed to open SQLite database {}", cfg.connection_string))?;
        dialect.configure_connection(&conn)?;

        let persisters = cfg
            .mappings
            .iter()
            .map(|class| -> Result<_> {
                let persister = EntityPersister::new(class, &dialect, &settings)?;
                Ok((class.entity, persister))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        schema::apply(&conn, &cfg.mappings, &dialect, settings.schema_action)?;

        if settings.query_startup_checking {
            for persister in persisters.values() {
                for sql in [persister.select_all_sql(), persister.select_by_id_sql()] {
                    conn.prepare(sql).with_context(|| {
                        format!("startup check failed for {}: {sql}", persister.entity())
                    })?;
                }
            }
        }

        if settings.use_second_level_cache {
            log::warn!("second-level cache requested but no cache provider is available");
        }
        if settings.use_query_cache {
            log::debug!("query cache enabled; no query is marked cacheable");
        }

        let listeners: Vec<Box<dyn LoadEventListener>> = if settings.load_event_listeners {
            vec![Box::new(TraceLoadListener)]
        } else {
            Vec::new()
        };

        log::debug!(
            "session factory built for {} ({} entities)",
            cfg.connection_string,
            persisters.len()
        );

        Ok(Self {
            conn,
            statistics: settings.generate_statistics.then(Statistics::default),
            settings,
            persisters,
            open_sessions: Cell::new(0),
            listeners,
        })
    }

    pub fn open_session(&self) -> Session<'_> {
        self.session_opened();
        Session::new(self)
    }

    pub fn open_stateless_session(&self) -> StatelessSession<'_> {
        self.session_opened();
        StatelessSession::new(self)
    }

    /// Sessions opened and not yet dropped.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.get()
    }

    pub fn statistics(&self) -> Option<StatisticsSnapshot> {
        self.statistics.as_ref().map(Statistics::snapshot)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Add a listener. Ignored when load listeners are disabled.
    pub fn register_load_listener(&mut self, listener: Box<dyn LoadEventListener>) {
        if self.settings.load_event_listeners {
            self.listeners.push(listener);
        } else {
            log::debug!("load event listeners are disabled; listener not registered");
        }
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn persister(&self, entity: &str) -> Result<&EntityPersister> {
        self.persisters
            .get(entity)
            .with_context(|| format!("unknown entity {entity}"))
    }

    pub(crate) fn record(&self, update: impl FnOnce(&Statistics)) {
        if let Some(stats) = &self.statistics {
            update(stats);
        }
    }

    pub(crate) fn fire_pre_load(&self, entity: &'static str, id: i64) {
        for listener in &self.listeners {
            listener.on_pre_load(entity, id);
        }
    }

    pub(crate) fn fire_post_load(&self, entity: &'static str, id: i64) {
        for listener in &self.listeners {
            listener.on_post_load(entity, id);
        }
    }

    /// Prepare `sql` (through the statement cache when `prepare_sql` is on)
    /// and hand the statement to `f`.
    pub(crate) fn with_statement<T>(
        &self,
        sql: &str,
        f: impl FnOnce(&mut Statement<'_>) -> Result<T>,
    ) -> Result<T> {
        self.log_sql(sql);
        self.record(|s| incr(&s.statements_prepared));

        if self.settings.prepare_sql {
            let mut stmt = self
                .conn
                .prepare_cached(sql)
                .with_context(|| format!("failed to prepare: {sql}"))?;
            f(&mut stmt)
        } else {
            let mut stmt = self
                .conn
                .prepare(sql)
                .with_context(|| format!("failed to prepare: {sql}"))?;
            f(&mut stmt)
        }
    }

    pub(crate) fn log_sql(&self, sql: &str) {
        if !self.settings.show_sql || !log::log_enabled!(target: "sql", Level::Debug) {
            return;
        }
        if self.settings.format_sql {
            log::debug!(target: "sql", "\n{}", Dialect::format(sql));
        } else {
            log::debug!(target: "sql", "{sql}");
        }
    }

    fn session_opened(&self) {
        self.open_sessions.set(self.open_sessions.get() + 1);
        self.record(|s| incr(&s.sessions_opened));
    }

    pub(crate) fn session_closed(&self) {
        let open = self.open_sessions.get();
        self.open_sessions.set(open.saturating_sub(1));
        self.record(|s| incr(&s.sessions_closed));
    }
}

impl Drop for SessionFactory {
    fn drop(&mut self) {
        let open = self.open_sessions.get();
        if open > 0 {
            log::warn!("session factory closed with {open} open session(s)");
        }
        if let Some(stats) = self.statistics() {
            log::debug!("session factory closed: {stats:?}");
        }
    }
}

/// Check every class against its registered entity type and every
/// association against the mapped classes.
fn validate_mappings(mappings: &Mappings) -> Result<()> {
    for class in mappings.iter() {
        let descriptor = find_descriptor(class.entity)
            .with_context(|| format!("mapped class {} has no entity type", class.entity))?;

        if class.id.property != descriptor.id {
            bail!(
                "{}: id mapped to {} but the entity id is {}",
                class.entity,
                class.id.property,
                descriptor.id
            );
        }
        for reference in &class.many_to_one {
            if mappings.get(reference.target).is_none() {
                bail!(
                    "{}.{} references unmapped entity {}",
                    class.entity,
                    reference.property,
                    reference.target
                );
            }
        }
        for property in descriptor.properties {
            let name = property.name;
            let mapped = class.properties.iter().any(|p| p.property == name)
                || class.many_to_one.iter().any(|m| m.property == name);
            if !mapped {
                bail!("{}.{} is not mapped", class.entity, property.name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::configuration::SchemaAction;
    use perf_core::mapping::{compile_mapping, conventional, MappingMode};
    use perf_core::types::Value;

    fn configuration() -> Configuration {
        Configuration::new(IN_MEMORY)
            .add_mapping(compile_mapping(MappingMode::Conventional))
            .tune(|s| s.schema_action = SchemaAction::Create)
    }

    #[test]
    fn sessions_are_counted_until_dropped() {
        let factory = SessionFactory::build(&configuration()).unwrap();
        {
            let _a = factory.open_session();
            let _b = factory.open_stateless_session();
            assert_eq!(factory.open_sessions(), 2);
        }
        assert_eq!(factory.open_sessions(), 0);

        let stats = factory.statistics().unwrap();
        assert_eq!(stats.sessions_opened, 2);
        assert_eq!(stats.sessions_closed, 2);
    }

    #[test]
    fn statistics_are_off_when_not_generated() {
        let cfg = configuration().tune(|s| s.generate_statistics = false);
        let factory = SessionFactory::build(&cfg).unwrap();
        assert!(factory.statistics().is_none());
    }

    #[test]
    fn empty_configuration_is_rejected() {
        assert!(SessionFactory::build(&Configuration::new(IN_MEMORY)).is_err());
    }

    #[test]
    fn dangling_association_fails_validation() {
        let value_only = conventional(&[Value::descriptor()]);
        let cfg = Configuration::new(IN_MEMORY).add_mapping(value_only);
        let err = SessionFactory::build(&cfg).err().unwrap();
        assert!(err.to_string().contains("unmapped entity"));
    }
}
