//! Integration tests for logging functionality
//!
//! The global subscriber can only be installed once per process, so a
//! single test exercises `init_logging` end to end.

use pacemetrics::adapters::memory::MemoryStore;
use pacemetrics::config::{parse_config, LoggingConfig};
use pacemetrics::core::aggregate::AggregateRequest;
use pacemetrics::core::service::{AnalyticsService, VisitRateRequest};
use pacemetrics::domain::{DateRange, EventCategory, Granularity};
use pacemetrics::logging::init_logging;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_path, "./logs");
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_logging_rotation_types() {
    for rotation in ["daily", "hourly", "never"] {
        let toml = format!(
            "store_target = \"fixture\"\n[fixture]\npath = \"f.json\"\n[logging]\nlocal_rotation = \"{rotation}\"\n"
        );
        let config = parse_config(&toml).unwrap();
        assert_eq!(config.logging.local_rotation, rotation);
    }

    let toml = "store_target = \"fixture\"\n[fixture]\npath = \"f.json\"\n[logging]\nlocal_rotation = \"size\"\n";
    assert!(parse_config(toml).is_err());
}

#[tokio::test]
async fn test_file_logging_writes_json() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };
    assert!(!log_path.exists());

    let guard = init_logging("info", &config).unwrap();
    assert!(guard.has_file_writer());
    assert!(log_path.exists());

    // A second install is rejected rather than silently replacing the first
    assert!(init_logging("info", &LoggingConfig::default()).is_err());

    let service = AnalyticsService::with_defaults(Arc::new(MemoryStore::default()));
    let range = DateRange::parse("01/01/2023", "03/31/2023").unwrap();
    service
        .visit_rate(&VisitRateRequest::new(AggregateRequest::new(
            EventCategory::Falls,
            range,
            Granularity::Month,
        )))
        .await
        .unwrap();
    drop(guard);

    let contents = std::fs::read_to_string(log_path.join("pacemetrics.log")).unwrap();
    assert!(contents.contains("Computed visit chart"));
    assert!(contents.lines().all(|line| line.starts_with('{')));
}
