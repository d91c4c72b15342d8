// Library surface for headless/integration tests and embedding.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod clock;
pub mod config;
pub mod controller;
pub mod metrics;
pub mod policy;
pub mod runtime;
pub mod session;
pub mod time_series;

/// Cadence of the periodic tick delivered to the controller, in milliseconds.
pub const TICK_RATE_MS: u64 = 100;
