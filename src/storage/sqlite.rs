use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};

use crate::signal::{FlatStore, ScalarValue};
use crate::storage::StorageError;

const SELECT_SIGNALS: &str = "SELECT key, value, typeof(value) AS kind FROM vss_data";

const UPSERT_SIGNAL: &str = "INSERT INTO vss_data (key, value) VALUES (?, ?) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value";

/// `vss_data(key, value)` table in an SQLite database. Values keep the
/// storage class they were written with.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    db: DatabaseConnection,
}

impl SqliteBackend {
    pub async fn connect(url: &str, run_migrations: bool) -> Result<Self, StorageError> {
        let db = Database::connect(url).await?;
        if run_migrations {
            Migrator::up(&db, None).await?;
        }
        Ok(Self { db })
    }

    pub async fn load(&self) -> Result<FlatStore, StorageError> {
        let rows = self
            .db
            .query_all(Statement::from_string(DbBackend::Sqlite, SELECT_SIGNALS))
            .await?;

        let mut store = FlatStore::new();
        for row in rows {
            let key: String = row.try_get("", "key")?;
            let kind: String = row.try_get("", "kind")?;
            let value = match kind.as_str() {
                "integer" => ScalarValue::Int(row.try_get("", "value")?),
                "real" => ScalarValue::Float(row.try_get("", "value")?),
                "text" => ScalarValue::String(row.try_get("", "value")?),
                "null" => ScalarValue::Null,
                other => {
                    tracing::warn!(key = %key, kind = %other, "Skipping signal with unsupported storage class");
                    continue;
                }
            };
            store.insert(key, value);
        }
        Ok(store)
    }

    /// Insert or replace one signal value.
    pub async fn put_signal(&self, key: &str, value: &ScalarValue) -> Result<(), StorageError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Sqlite,
            UPSERT_SIGNAL,
            [sea_orm::Value::from(key.to_string()), db_value(value)],
        );
        self.db.execute(stmt).await?;
        Ok(())
    }

    pub async fn put_store(&self, store: &FlatStore) -> Result<(), StorageError> {
        for (key, value) in store {
            self.put_signal(key, value).await?;
        }
        Ok(())
    }
}

fn db_value(value: &ScalarValue) -> sea_orm::Value {
    match value {
        ScalarValue::Null => Option::<i64>::None.into(),
        ScalarValue::Bool(b) => (*b).into(),
        ScalarValue::Int(i) => (*i).into(),
        ScalarValue::Float(f) => (*f).into(),
        ScalarValue::String(s) => s.clone().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    /// Test database helper that keeps temp file alive
    struct TestDb {
        backend: SqliteBackend,
        _temp_file: NamedTempFile,
    }

    impl TestDb {
        async fn new() -> Self {
            let temp_file = NamedTempFile::new().expect("Failed to create temp file");
            let db_path = temp_file.path().to_str().expect("Invalid temp file path");
            let db_url = format!("sqlite://{}?mode=rwc", db_path);

            let backend = SqliteBackend::connect(&db_url, true)
                .await
                .expect("Failed to connect to test database");

            Self {
                backend,
                _temp_file: temp_file,
            }
        }
    }

    #[tokio::test]
    async fn test_empty_table() {
        let test_db = TestDb::new().await;
        let store = test_db.backend.load().await.expect("Failed to load");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_values_keep_their_type() {
        let test_db = TestDb::new().await;
        let db = &test_db.backend;

        db.put_signal("Vehicle.Drivetrain.Transmission.Gear", &ScalarValue::Int(3))
            .await
            .unwrap();
        db.put_signal(
            "Vehicle.Drivetrain.FuelSystem.InstantConsumption",
            &ScalarValue::Float(6.5),
        )
        .await
        .unwrap();
        db.put_signal("Vehicle.VersionVSS.Label", &ScalarValue::String("rc1".into()))
            .await
            .unwrap();
        db.put_signal("Vehicle.Drivetrain.FuelSystem.Level", &ScalarValue::Null)
            .await
            .unwrap();

        let store = db.load().await.unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(
            store.get("Vehicle.Drivetrain.Transmission.Gear"),
            Some(&ScalarValue::Int(3))
        );
        assert_eq!(
            store.get("Vehicle.Drivetrain.FuelSystem.InstantConsumption"),
            Some(&ScalarValue::Float(6.5))
        );
        assert_eq!(
            store.get("Vehicle.VersionVSS.Label"),
            Some(&ScalarValue::String("rc1".into()))
        );
        assert_eq!(
            store.get("Vehicle.Drivetrain.FuelSystem.Level"),
            Some(&ScalarValue::Null)
        );
    }

    #[tokio::test]
    async fn test_put_signal_replaces() {
        let test_db = TestDb::new().await;
        let db = &test_db.backend;

        db.put_signal("Vehicle.Drivetrain.Transmission.Gear", &ScalarValue::Int(1))
            .await
            .unwrap();
        db.put_signal("Vehicle.Drivetrain.Transmission.Gear", &ScalarValue::Int(-1))
            .await
            .unwrap();

        let store = db.load().await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("Vehicle.Drivetrain.Transmission.Gear"),
            Some(&ScalarValue::Int(-1))
        );
    }

    #[tokio::test]
    async fn test_booleans_stored_as_integers() {
        let test_db = TestDb::new().await;
        let db = &test_db.backend;
        db.put_signal("Vehicle.IsMoving", &ScalarValue::Bool(true))
            .await
            .unwrap();
        let store = db.load().await.unwrap();
        assert_eq!(store.get("Vehicle.IsMoving"), Some(&ScalarValue::Int(1)));
    }
}
