//! Dotted signal paths and the flat <-> nested mapping between a key-value
//! signal store and the tree walked by the GraphQL resolvers.

pub mod path;
pub mod tree;
pub mod value;

pub use path::{MalformedPathError, SignalPath};
pub use tree::{FlatStore, SignalNode, SignalTree, TreeError};
pub use value::ScalarValue;
