//! GraphQL gateway over a Vehicle Signal Specification data store.
//!
//! Signals are kept as flat `dotted.path -> value` pairs and served as a
//! nested GraphQL tree, with every leaf gated by a per-signal read
//! permission carried in the caller's JWT.

pub mod authz;
pub mod catalog;
pub mod errors;
pub mod graphql;
pub mod settings;
pub mod signal;
pub mod storage;
pub mod web;
