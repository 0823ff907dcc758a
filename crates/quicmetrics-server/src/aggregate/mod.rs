//! Aggregate Store: the only shared mutable state in the server.
//!
//! Every ingestion task merges into the same store through a shared handle;
//! all mutation goes through [`AggregateStore::merge`].

mod store;

pub use store::{AggregateSnapshot, AggregateStore};
