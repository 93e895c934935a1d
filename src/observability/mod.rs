//! Observability: structured logging via `tracing`.
//!
//! Log format and level come from `[observability.logging]`; `RUST_LOG`
//! overrides both when set.

mod tracing_init;

pub use tracing_init::*;
