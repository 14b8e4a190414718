use crate::catalog::Catalog;
use crate::signal::FlatStore;

/// Placeholder values for every catalog signal, for running the schema
/// without a real data source.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    store: FlatStore,
}

impl MockBackend {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let store = catalog
            .signals()
            .into_iter()
            .map(|signal| (signal.path.to_string(), signal.kind.mock_value()))
            .collect();
        Self { store }
    }

    pub fn with_store(store: FlatStore) -> Self {
        Self { store }
    }

    pub fn load(&self) -> FlatStore {
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ScalarValue;

    #[test]
    fn test_mock_values_per_kind() {
        let store = MockBackend::from_catalog(&Catalog::vehicle().unwrap()).load();
        assert_eq!(store.len(), 9);
        assert_eq!(
            store.get("Vehicle.Drivetrain.FuelSystem.InstantConsumption"),
            Some(&ScalarValue::Float(4.2))
        );
        assert_eq!(
            store.get("Vehicle.VersionVSS.Label"),
            Some(&ScalarValue::String("Hello World".into()))
        );
    }
}
