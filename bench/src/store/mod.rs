//! Data-access layer over SQLite.
//!
//! A [`Configuration`] collects the connection string, the compiled mappings
//! and the tuning flags; [`SessionFactory::build`] turns it into a live
//! factory that opens [`Session`]s, [`StatelessSession`]s and raw
//! [`SqlQuery`]s.

pub mod configuration;
pub mod dialect;
pub mod entity;
pub mod factory;
pub mod persister;
pub mod schema;
pub mod session;

pub use configuration::{Configuration, Keywords, SchemaAction, Settings};
pub use entity::{Entity, EntityLoader, EntityState};
pub use factory::{LoadEventListener, SessionFactory, StatisticsSnapshot, IN_MEMORY};
pub use rusqlite::types::Value as SqlValue;
pub use session::{CacheMode, FlushMode, Session, SqlQuery, StatelessSession, Transaction};
