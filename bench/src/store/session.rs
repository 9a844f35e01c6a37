//! Units of work opened from a [`SessionFactory`].
//!
//! A [`Session`] keeps a persistence context: every entity it materializes is
//! registered by `(entity, id)` so repeated references (the Device and
//! Measure behind each Value) load once per session. A [`StatelessSession`]
//! keeps nothing and fires no load events. Both release their slot in the
//! factory when dropped.

use super::entity::{Entity, EntityLoader, EntityState};
use super::factory::{incr, SessionFactory};
use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use std::any::Any;
use std::collections::HashMap;

/// Interaction with the second-level cache. No provider exists, so the mode
/// is recorded and reported only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Normal,
    Ignore,
}

/// When the persistence context is synchronized with the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Before every query.
    #[default]
    Auto,
    /// Only on an explicit [`Session::flush`].
    Never,
}

type EntityKey = (&'static str, i64);

struct ManagedEntry {
    entity: Box<dyn Any>,
    read_only: bool,
}

#[derive(Default)]
struct PersistenceContext {
    entries: HashMap<EntityKey, ManagedEntry>,
}

impl PersistenceContext {
    fn get<E: Entity>(&self, id: i64) -> Option<E> {
        self.entries
            .get(&(E::descriptor().name, id))
            .and_then(|entry| entry.entity.downcast_ref::<E>())
            .cloned()
    }

    fn put<E: Entity>(&mut self, entity: &E, read_only: bool) {
        self.entries.insert(
            (E::descriptor().name, entity.id()),
            ManagedEntry {
                entity: Box::new(entity.clone()),
                read_only,
            },
        );
    }
}

pub struct Session<'f> {
    factory: &'f SessionFactory,
    cache_mode: CacheMode,
    flush_mode: FlushMode,
    default_read_only: bool,
    context: PersistenceContext,
}

impl<'f> Session<'f> {
    pub(crate) fn new(factory: &'f SessionFactory) -> Self {
        Self {
            factory,
            cache_mode: CacheMode::default(),
            flush_mode: FlushMode::default(),
            default_read_only: false,
            context: PersistenceContext::default(),
        }
    }

    pub fn set_cache_mode(&mut self, mode: CacheMode) {
        self.cache_mode = mode;
    }

    pub fn set_flush_mode(&mut self, mode: FlushMode) {
        self.flush_mode = mode;
    }

    /// Entities loaded from now on are registered read-only.
    pub fn set_default_read_only(&mut self, read_only: bool) {
        self.default_read_only = read_only;
    }

    /// Number of entities held in the persistence context.
    pub fn managed(&self) -> usize {
        self.context.entries.len()
    }

    pub fn is_read_only<E: Entity>(&self, id: i64) -> Option<bool> {
        self.context
            .entries
            .get(&(E::descriptor().name, id))
            .map(|entry| entry.read_only)
    }

    /// Every persisted `E`, associations fetched eagerly.
    pub fn query<E: Entity>(&mut self) -> Result<Vec<E>> {
        if self.flush_mode == FlushMode::Auto {
            self.flush()?;
        }

        log::trace!(
            "query {} (cache mode {:?}, read-only {})",
            E::descriptor().name,
            self.cache_mode,
            self.default_read_only
        );
        let factory = self.factory;
        let persister = factory.persister(E::descriptor().name)?;
        let sql = persister.select_all_sql();
        let states = persister.load_states(factory, sql, [])?;

        let mut entities = Vec::with_capacity(states.len());
        for state in states {
            entities.push(self.materialize::<E>(state)?);
        }
        Ok(entities)
    }

    /// Load one `E` by id, from the persistence context when already present.
    pub fn get<E: Entity>(&mut self, id: i64) -> Result<Option<E>> {
        if let Some(entity) = self.context.get::<E>(id) {
            return Ok(Some(entity));
        }

        let factory = self.factory;
        let persister = factory.persister(E::descriptor().name)?;
        match persister
            .load_states(factory, persister.select_by_id_sql(), [id])?
            .into_iter()
            .next()
        {
            Some(state) => self.materialize(state).map(Some),
            None => Ok(None),
        }
    }

    /// Insert `entity` and assign its store-generated id.
    pub fn save<E: Entity>(&mut self, entity: &mut E) -> Result<i64> {
        let persister = self.factory.persister(E::descriptor().name)?;
        let id = persister.insert(self.factory, &entity.dehydrate()?)?;
        entity.set_id(id);
        self.context.put(entity, false);
        Ok(id)
    }

    /// Synchronize the persistence context. Inserts are issued eagerly by
    /// [`save`](Self::save), so there is never pending work to write.
    pub fn flush(&mut self) -> Result<()> {
        self.factory.record(|s| incr(&s.flushes));
        log::trace!("flushed session ({} managed entities)", self.managed());
        Ok(())
    }

    pub fn begin_transaction(&mut self) -> Result<Transaction<'f>> {
        Transaction::begin(self.factory)
    }

    pub fn create_sql_query(&self, sql: impl Into<String>) -> SqlQuery<'f> {
        SqlQuery::new(self.factory, sql.into())
    }

    fn materialize<E: Entity>(&mut self, state: EntityState) -> Result<E> {
        if let Some(entity) = self.context.get::<E>(state.id) {
            return Ok(entity);
        }

        let name = E::descriptor().name;
        let id = state.id;
        self.factory.fire_pre_load(name, id);
        let entity = E::assemble(state, self)?;
        self.context.put(&entity, self.default_read_only);
        self.factory.fire_post_load(name, id);
        self.factory.record(|s| incr(&s.entities_loaded));

        Ok(entity)
    }
}

impl EntityLoader for Session<'_> {
    fn load<E: Entity>(&mut self, id: i64) -> Result<E> {
        self.get::<E>(id)?
            .with_context(|| format!("no {} with id {id}", E::descriptor().name))
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.factory.session_closed();
    }
}

/// Session without a persistence context: every reference is fetched with
/// its own select and nothing is remembered between calls.
pub struct StatelessSession<'f> {
    factory: &'f SessionFactory,
}

impl<'f> StatelessSession<'f> {
    pub(crate) fn new(factory: &'f SessionFactory) -> Self {
        Self { factory }
    }

    pub fn query<E: Entity>(&mut self) -> Result<Vec<E>> {
        let factory = self.factory;
        let persister = factory.persister(E::descriptor().name)?;
        persister
            .load_states(factory, persister.select_all_sql(), [])?
            .into_iter()
            .map(|state| self.assemble::<E>(state))
            .collect()
    }

    pub fn get<E: Entity>(&mut self, id: i64) -> Result<Option<E>> {
        let factory = self.factory;
        let persister = factory.persister(E::descriptor().name)?;
        persister
            .load_states(factory, persister.select_by_id_sql(), [id])?
            .into_iter()
            .next()
            .map(|state| self.assemble::<E>(state))
            .transpose()
    }

    pub fn begin_transaction(&mut self) -> Result<Transaction<'f>> {
        Transaction::begin(self.factory)
    }

    pub fn create_sql_query(&self, sql: impl Into<String>) -> SqlQuery<'f> {
        SqlQuery::new(self.factory, sql.into())
    }

    fn assemble<E: Entity>(&mut self, state: EntityState) -> Result<E> {
        let entity = E::assemble(state, self)?;
        self.factory.record(|s| incr(&s.entities_loaded));
        Ok(entity)
    }
}

impl EntityLoader for StatelessSession<'_> {
    fn load<E: Entity>(&mut self, id: i64) -> Result<E> {
        self.get::<E>(id)?
            .with_context(|| format!("no {} with id {id}", E::descriptor().name))
    }
}

impl Drop for StatelessSession<'_> {
    fn drop(&mut self) {
        self.factory.session_closed();
    }
}

/// Raw SQL returning untyped rows; no entity is materialized.
pub struct SqlQuery<'f> {
    factory: &'f SessionFactory,
    sql: String,
}

impl<'f> SqlQuery<'f> {
    fn new(factory: &'f SessionFactory, sql: String) -> Self {
        Self { factory, sql }
    }

    pub fn list(&self) -> Result<Vec<Vec<SqlValue>>> {
        let fetch_size = self.factory.settings().fetch_size.unwrap_or(0);
        let rows = self.factory.with_statement(&self.sql, |stmt| {
            let width = stmt.column_count();
            let mut rows = Vec::with_capacity(fetch_size);
            let mut cursor = stmt.query([])?;
            while let Some(row) = cursor.next()? {
                let values = (0..width)
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows.push(values);
            }
            Ok(rows)
        })?;

        self.factory.record(|s| incr(&s.queries_executed));
        Ok(rows)
    }
}

/// Database transaction; rolled back on drop unless committed.
pub struct Transaction<'f> {
    factory: &'f SessionFactory,
    inner: rusqlite::Transaction<'f>,
}

impl<'f> Transaction<'f> {
    fn begin(factory: &'f SessionFactory) -> Result<Self> {
        let inner = factory
            .connection()
            .unchecked_transaction()
            .context("failed to begin transaction")?;
        Ok(Self { factory, inner })
    }

    pub fn commit(self) -> Result<()> {
        self.inner
            .commit()
            .context("failed to commit transaction")?;
        self.factory.record(|s| incr(&s.transactions));
        Ok(())
    }
}
