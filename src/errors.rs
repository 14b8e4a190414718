use miette::Diagnostic;
use thiserror::Error;

use crate::authz::AuthError;
use crate::signal::MalformedPathError;
use crate::storage::StorageError;

/// Failures while assembling the service at startup.
#[derive(Debug, Error, Diagnostic)]
pub enum VssError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] MalformedPathError),

    #[error("GraphQL schema error: {0}")]
    #[diagnostic(code(vss::schema))]
    Schema(String),
}

impl From<async_graphql::dynamic::SchemaError> for VssError {
    fn from(value: async_graphql::dynamic::SchemaError) -> Self {
        VssError::Schema(value.to_string())
    }
}
