// End-to-end query tests against a real SQLite `vss_data` table and a JSON
// document, going through the same schema the server runs.

mod helpers;

use std::io::Write;
use std::time::Duration;

use async_graphql::Request;
use serde_json::json;
use vss_graphql::authz::AuthContext;
use vss_graphql::catalog::Catalog;
use vss_graphql::graphql::build_schema;
use vss_graphql::settings::{Backend, Storage};
use vss_graphql::signal::ScalarValue;
use vss_graphql::storage::{SignalBackend, SignalSource};

use helpers::TestDb;

const FUEL_QUERY: &str = r#"
{
  vehicle {
    drivetrain {
      fuelSystem { instantConsumption level tankCapacity }
      internalCombustionEngine { engine { speed } }
    }
  }
}"#;

fn full_access() -> AuthContext {
    let catalog = Catalog::vehicle().unwrap();
    let permissions = catalog
        .signals()
        .into_iter()
        .flat_map(|s| s.required.iter().map(str::to_string).collect::<Vec<_>>())
        .collect();
    AuthContext {
        uid: 1,
        permissions,
    }
}

async fn sqlite_source(db: &TestDb) -> SignalSource {
    let cfg = Storage {
        backend: Backend::Sqlite,
        database_url: db.url().to_string(),
        ..Storage::default()
    };
    SignalSource::from_settings(&cfg, &Catalog::vehicle().unwrap())
        .await
        .expect("Failed to open sqlite source")
}

#[tokio::test]
async fn test_sqlite_rows_become_nested_fields() {
    let db = TestDb::new().await;
    db.seed(&[
        ("Vehicle.Drivetrain.FuelSystem.InstantConsumption", ScalarValue::Float(5.5)),
        ("Vehicle.Drivetrain.FuelSystem.Level", ScalarValue::Int(63)),
        ("Vehicle.Drivetrain.FuelSystem.TankCapacity", ScalarValue::Int(50)),
        ("Vehicle.Drivetrain.InternalCombustionEngine.Engine.Speed", ScalarValue::Int(2100)),
    ])
    .await;

    let catalog = Catalog::vehicle().unwrap();
    let schema = build_schema(&catalog, sqlite_source(&db).await).unwrap();
    let response = schema
        .execute(Request::new(FUEL_QUERY).data(full_access()))
        .await;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({"vehicle": {"drivetrain": {
            "fuelSystem": {"instantConsumption": 5.5, "level": 63, "tankCapacity": 50},
            "internalCombustionEngine": {"engine": {"speed": 2100}}
        }}})
    );
}

#[tokio::test]
async fn test_each_request_reads_fresh_rows() {
    let db = TestDb::new().await;
    db.seed(&[("Vehicle.Drivetrain.Transmission.Gear", ScalarValue::Int(1))])
        .await;

    let catalog = Catalog::vehicle().unwrap();
    let schema = build_schema(&catalog, sqlite_source(&db).await).unwrap();
    let query = "{ vehicle { drivetrain { transmission { gear } } } }";

    let first = schema.execute(Request::new(query).data(full_access())).await;
    assert_eq!(
        first.data.into_json().unwrap()["vehicle"]["drivetrain"]["transmission"]["gear"],
        json!(1)
    );

    db.backend()
        .put_signal("Vehicle.Drivetrain.Transmission.Gear", &ScalarValue::Int(4))
        .await
        .unwrap();

    let second = schema.execute(Request::new(query).data(full_access())).await;
    assert_eq!(
        second.data.into_json().unwrap()["vehicle"]["drivetrain"]["transmission"]["gear"],
        json!(4)
    );
}

#[tokio::test]
async fn test_stray_branch_rows_do_not_hide_signals() {
    let db = TestDb::new().await;
    db.seed(&[
        ("Vehicle", ScalarValue::Int(0)),
        ("Vehicle.Drivetrain", ScalarValue::Int(1)),
        ("Vehicle.Drivetrain.Transmission.Gear", ScalarValue::Int(2)),
        ("Vehicle.VersionVSS.Major", ScalarValue::Int(4)),
    ])
    .await;

    let catalog = Catalog::vehicle().unwrap();
    let schema = build_schema(&catalog, sqlite_source(&db).await).unwrap();
    let response = schema
        .execute(
            Request::new(
                "{ vehicle { versionVSS { major } drivetrain { transmission { gear } } } }",
            )
            .data(full_access()),
        )
        .await;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({"vehicle": {
            "versionVSS": {"major": 4},
            "drivetrain": {"transmission": {"gear": 2}}
        }})
    );
}

#[tokio::test]
async fn test_json_document_backend() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!({
            "Vehicle": {
                "VersionVSS": {"Major": 4, "Minor": 0, "Label": "rc0"},
                "Drivetrain.Transmission.Gear": -1
            }
        })
    )
    .unwrap();

    let cfg = Storage {
        backend: Backend::Json,
        json_path: file.path().to_path_buf(),
        ..Storage::default()
    };
    let catalog = Catalog::vehicle().unwrap();
    let source = SignalSource::from_settings(&cfg, &catalog).await.unwrap();
    assert_eq!(source.backend().name(), "json");

    let schema = build_schema(&catalog, source).unwrap();
    let response = schema
        .execute(
            Request::new(
                "{ vehicle { versionVSS { major minor patch label } drivetrain { transmission { gear } } } }",
            )
            .data(full_access()),
        )
        .await;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({"vehicle": {
            "versionVSS": {"major": 4, "minor": 0, "patch": null, "label": "rc0"},
            "drivetrain": {"transmission": {"gear": -1}}
        }})
    );
}

#[tokio::test]
async fn test_missing_json_document_is_storage_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let cfg = Storage {
        backend: Backend::Json,
        json_path: dir.path().join("absent.json"),
        ..Storage::default()
    };
    let catalog = Catalog::vehicle().unwrap();
    let source = SignalSource::from_settings(&cfg, &catalog).await.unwrap();
    let schema = build_schema(&catalog, source).unwrap();

    let response = schema.execute("{ vehicle { versionVSS { major } } }").await;
    assert_eq!(response.data.into_json().unwrap(), json!({"vehicle": null}));
    assert_eq!(response.errors.len(), 1);
    let code = response.errors[0]
        .extensions
        .as_ref()
        .and_then(|e| e.get("code"))
        .cloned();
    assert_eq!(code, Some(async_graphql::Value::String("STORAGE_ERROR".into())));
}

#[tokio::test]
async fn test_mock_backend_serves_placeholders() {
    let catalog = Catalog::vehicle().unwrap();
    let source = SignalSource::from_settings(&Storage::default(), &catalog)
        .await
        .unwrap();
    assert!(matches!(source.backend(), SignalBackend::Mock(_)));

    let schema = build_schema(&catalog, source).unwrap();
    let response = schema
        .execute(Request::new(FUEL_QUERY).data(full_access()))
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({"vehicle": {"drivetrain": {
            "fuelSystem": {"instantConsumption": 4.2, "level": 42, "tankCapacity": 42},
            "internalCombustionEngine": {"engine": {"speed": 42}}
        }}})
    );
}

#[tokio::test]
async fn test_mock_source_loads_every_signal() {
    let catalog = Catalog::vehicle().unwrap();
    let source = SignalSource::new(
        SignalBackend::Mock(vss_graphql::storage::MockBackend::from_catalog(&catalog)),
        Duration::from_secs(5),
    );
    assert_eq!(source.load().await.unwrap().len(), catalog.signals().len());
}
