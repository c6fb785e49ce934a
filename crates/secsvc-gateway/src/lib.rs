//! secsvc gateway library entry.
//!
//! Wires configuration, logging, the dual-backend request metrics and the
//! operational endpoints into an axum stack. Consumed by the binary
//! (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod config;
pub mod logging;
pub mod obs;
pub mod ops;
pub mod router;
