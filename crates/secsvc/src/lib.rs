//! Top-level facade crate for the security service.
//!
//! Re-exports the core primitives and the gateway library so users can depend on a single crate.

pub mod core {
    pub use secsvc_core::*;
}

pub mod gateway {
    pub use secsvc_gateway::*;
}
