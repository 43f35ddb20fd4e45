//! Event store factory
//!
//! This module provides the factory function that creates the configured
//! event store backend.

use crate::adapters::memory::MemoryStore;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::store::traits::EventStore;
use crate::config::schema::{PaceMetricsConfig, StoreTarget};
use crate::domain::{AnalyticsError, Result};
use std::sync::Arc;

/// Create an event store based on the configuration
///
/// This factory function examines the `store_target` in the configuration
/// and creates the matching backend.
///
/// # Errors
///
/// Returns a `Configuration` error if the selected section is missing, or
/// a store error if the backend cannot be initialized
pub async fn create_event_store(
    config: &PaceMetricsConfig,
) -> Result<Arc<dyn EventStore + Send + Sync>> {
    match config.store_target {
        StoreTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                AnalyticsError::Configuration(
                    "store_target is postgresql but [postgresql] is missing".to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL event store");
            let client = PostgreSQLClient::new(pg_config.clone())?;
            let adapter = PostgreSQLAdapter::new(client);

            Ok(Arc::new(adapter) as Arc<dyn EventStore + Send + Sync>)
        }
        StoreTarget::Fixture => {
            let fixture = config.fixture.as_ref().ok_or_else(|| {
                AnalyticsError::Configuration(
                    "store_target is fixture but [fixture] is missing".to_string(),
                )
            })?;

            tracing::info!(path = %fixture.path, "Creating fixture event store");
            let store = MemoryStore::from_file(&fixture.path)?;

            Ok(Arc::new(store) as Arc<dyn EventStore + Send + Sync>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_creates_fixture_store() {
        let mut fixture = NamedTempFile::new().unwrap();
        fixture
            .write_all(br#"{"enrollment": [], "events": []}"#)
            .unwrap();
        fixture.flush().unwrap();

        let toml = format!(
            "store_target = \"fixture\"\n\n[fixture]\npath = \"{}\"\n",
            fixture.path().display()
        );
        let config = parse_config(&toml).unwrap();

        let store = create_event_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "fixture");
        assert!(store.test_connection().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_fixture_file() {
        let config = parse_config(
            "store_target = \"fixture\"\n\n[fixture]\npath = \"/nonexistent/roster.json\"\n",
        )
        .unwrap();
        assert!(create_event_store(&config).await.is_err());
    }
}
