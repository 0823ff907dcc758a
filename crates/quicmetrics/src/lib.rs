//! Top-level facade crate for quicmetrics.
//!
//! Re-exports the core parsing types and the server library so users can depend on a single crate.

pub mod core {
    pub use quicmetrics_core::*;
}

pub mod server {
    pub use quicmetrics_server::*;
}
