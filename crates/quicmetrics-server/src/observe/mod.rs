//! Observer sinks notified after every successful merge.
//!
//! Re-exports the observer trait, the registry, and the built-in sinks.

pub mod observers;
pub mod registry;

pub use observers::{ChannelObserver, LogObserver};
pub use registry::{Observer, ObserverSet};
