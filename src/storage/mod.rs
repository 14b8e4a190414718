//! Interchangeable signal stores. Every backend yields a [`FlatStore`]; the
//! GraphQL layer only ever sees the [`SignalTree`] built from it.

pub mod json;
pub mod mock;
pub mod sqlite;

use async_graphql::ErrorExtensions;
use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::Catalog;
use crate::settings::{Backend, Storage};
use crate::signal::{FlatStore, SignalTree};

pub use json::JsonBackend;
pub use mock::MockBackend;
pub use sqlite::SqliteBackend;

#[derive(Debug, Error, Diagnostic)]
pub enum StorageError {
    #[error("Database error: {0}")]
    #[diagnostic(code(vss::storage::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Failed to read `{path}`")]
    #[diagnostic(code(vss::storage::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON signal document: {0}")]
    #[diagnostic(code(vss::storage::json))]
    Json(#[from] serde_json::Error),

    #[error("Invalid signal document: {0}")]
    #[diagnostic(
        code(vss::storage::document),
        help("The document must be a JSON object of nested objects or dotted keys")
    )]
    InvalidDocument(String),

    #[error("Signal store read timed out after {0:?}")]
    #[diagnostic(code(vss::storage::timeout))]
    Timeout(Duration),
}

impl StorageError {
    pub const CODE: &'static str = "STORAGE_ERROR";
}

impl ErrorExtensions for StorageError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", Self::CODE))
    }
}

#[derive(Debug, Clone)]
pub enum SignalBackend {
    Mock(MockBackend),
    Sqlite(SqliteBackend),
    Json(JsonBackend),
}

impl SignalBackend {
    pub fn name(&self) -> &'static str {
        match self {
            SignalBackend::Mock(_) => "mock",
            SignalBackend::Sqlite(_) => "sqlite",
            SignalBackend::Json(_) => "json",
        }
    }

    pub async fn load(&self) -> Result<FlatStore, StorageError> {
        match self {
            SignalBackend::Mock(b) => Ok(b.load()),
            SignalBackend::Sqlite(b) => b.load().await,
            SignalBackend::Json(b) => b.load().await,
        }
    }
}

/// The configured backend plus the per-read timeout.
#[derive(Debug, Clone)]
pub struct SignalSource {
    backend: SignalBackend,
    read_timeout: Duration,
}

impl SignalSource {
    pub fn new(backend: SignalBackend, read_timeout: Duration) -> Self {
        Self {
            backend,
            read_timeout,
        }
    }

    pub async fn from_settings(cfg: &Storage, catalog: &Catalog) -> Result<Self, StorageError> {
        let backend = match cfg.backend {
            Backend::Mock => SignalBackend::Mock(MockBackend::from_catalog(catalog)),
            Backend::Sqlite => SignalBackend::Sqlite(
                SqliteBackend::connect(&cfg.database_url, cfg.run_migrations).await?,
            ),
            Backend::Json => SignalBackend::Json(JsonBackend::new(cfg.json_path.clone())),
        };
        tracing::info!(backend = backend.name(), "Initialized signal store");
        Ok(Self::new(backend, cfg.read_timeout()))
    }

    pub fn backend(&self) -> &SignalBackend {
        &self.backend
    }

    /// Read the flat store, bounded by the read timeout.
    pub async fn load(&self) -> Result<FlatStore, StorageError> {
        tokio::time::timeout(self.read_timeout, self.backend.load())
            .await
            .map_err(|_| StorageError::Timeout(self.read_timeout))?
    }

    /// Read the store and build the tree fresh for this request.
    pub async fn load_tree(&self) -> Result<SignalTree, StorageError> {
        let store = self.load().await?;
        Ok(SignalTree::build_lenient(&store))
    }
}
