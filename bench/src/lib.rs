//! NHPerformance: read-path latency benchmark over SQLite
//!
//! Times how long it takes to read every `Value` row, twenty times over,
//! through four data-access strategies:
//! - **Normal**: stateful session with the default (chatty) tuning
//! - **Optimized**: stateful session with logging, statistics, validation and
//!   load listeners off, prepared statements and positional hydration on
//! - **Stateless**: stateless session on the optimized configuration
//! - **Sql**: raw `SELECT` through a stateless session, no materialization
//!
//! Seed the database: `cargo run --release -- seed`
//! Run benchmarks: `cargo run --release` or `cargo bench`
//! Run tests: `cargo test`

pub mod environment;
pub mod modes;
pub mod report;
pub mod runner;
pub mod seed;
pub mod store;
