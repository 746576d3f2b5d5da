// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod bank;
pub mod config;
pub mod question;
pub mod quiz;
pub mod result;
pub mod runtime;
pub mod sampler;
pub mod scoring;
pub mod ui;
pub mod util;

/// Event-loop tick interval; the per-question timeout poll runs at least
/// this often.
pub const TICK_RATE_MS: u64 = 100;
