use tempfile::NamedTempFile;
use vss_graphql::signal::{FlatStore, ScalarValue};
use vss_graphql::storage::SqliteBackend;

/// Test database with automatic cleanup
pub struct TestDb {
    backend: SqliteBackend,
    url: String,
    _temp_file: NamedTempFile,
}

impl TestDb {
    /// Create a new test database with the `vss_data` table in place
    pub async fn new() -> Self {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_str().expect("Invalid temp file path");
        let url = format!("sqlite://{}?mode=rwc", db_path);

        let backend = SqliteBackend::connect(&url, true)
            .await
            .expect("Failed to connect to test database");

        Self {
            backend,
            url,
            _temp_file: temp_file,
        }
    }

    pub fn backend(&self) -> &SqliteBackend {
        &self.backend
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn seed(&self, rows: &[(&str, ScalarValue)]) {
        let store: FlatStore = rows.iter().cloned().collect();
        self.backend
            .put_store(&store)
            .await
            .expect("Failed to seed vss_data");
    }
}
