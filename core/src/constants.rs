//! Constants shared by the harness crates.

/// How many times each mode's read operation runs inside the stopwatch.
pub const REPEAT_TIMES: usize = 20;

/// Number of `Value` rows written by the seed routine.
pub const NUMBER_OF_ENTITIES: usize = 100;

/// Name of the connection the harness runs against.
pub const CONNECTION_NAME: &str = "NHPerformance";

/// Used when no connection string is configured for [`CONNECTION_NAME`].
pub const DEFAULT_CONNECTION_STRING: &str = "nhperformance.db";

pub const SEED_DEVICE_NAME: &str = "Device A";
pub const SEED_MEASURE_NAME: &str = "Measure A";

/// Fetch size applied by the optimized configuration.
pub const OPTIMIZED_FETCH_SIZE: usize = 100;
