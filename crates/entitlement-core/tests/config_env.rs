//! Config file loading plus `ENTITLEMENT_*` environment overrides.

use entitlement_core::config::{ENV_CALL_TIMEOUT_MS, ENV_GRAPHQL_ENDPOINT, ENV_RECONCILE_POLICY};
use entitlement_core::{
    Backend, BackendConfig, EntitlementService, PermissionRequest, ReconcilePolicy,
    ServiceConfig, BACKEND_HINT_KEY,
};
use serial_test::serial;
use std::io::Write;
use std::time::Duration;

const CONFIG: &str = r#"
comparison:
  policy: primary_wins
backends:
  spicedb:
    kind: static
    grants:
      - { actor: david, resource: acc123, permission: can_download_statement }
  neo4j:
    kind: static
    fail_with: "connection refused"
"#;

fn write_config(raw: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(raw.as_bytes()).unwrap();
    file
}

fn clear_env() {
    for key in [ENV_RECONCILE_POLICY, ENV_CALL_TIMEOUT_MS, ENV_GRAPHQL_ENDPOINT] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn file_values_survive_without_env() {
    clear_env();
    let file = write_config(CONFIG);
    let mut cfg = ServiceConfig::load(file.path()).unwrap();
    cfg.apply_env().unwrap();

    assert_eq!(cfg.comparison.policy, ReconcilePolicy::PrimaryWins);
    assert_eq!(cfg.call_timeout(), None);
    assert_eq!(cfg.backends.len(), 2);
}

#[test]
#[serial]
fn env_overrides_file() {
    clear_env();
    std::env::set_var(ENV_RECONCILE_POLICY, "strict");
    std::env::set_var(ENV_CALL_TIMEOUT_MS, "250");
    std::env::set_var(ENV_GRAPHQL_ENDPOINT, "http://127.0.0.1:4000/graphql");

    let file = write_config(CONFIG);
    let mut cfg = ServiceConfig::load(file.path()).unwrap();
    let result = cfg.apply_env();
    clear_env();
    result.unwrap();

    assert_eq!(cfg.comparison.policy, ReconcilePolicy::Strict);
    assert_eq!(cfg.call_timeout(), Some(Duration::from_millis(250)));
    assert!(matches!(
        cfg.backends.get(&Backend::Relational),
        Some(BackendConfig::Graphql { timeout_ms: 10_000, .. })
    ));
}

#[test]
#[serial]
fn invalid_env_policy_is_an_error() {
    clear_env();
    std::env::set_var(ENV_RECONCILE_POLICY, "majority");
    let mut cfg = ServiceConfig::default();
    let result = cfg.apply_env();
    clear_env();

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains(ENV_RECONCILE_POLICY), "{err:#}");
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ServiceConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config"), "{err}");
}

#[tokio::test]
async fn configured_service_checks_permissions() {
    let file = write_config(CONFIG);
    let cfg = ServiceConfig::load(file.path()).unwrap();
    let service = EntitlementService::from_config(&cfg).unwrap();

    let req = PermissionRequest::new("david", "acc123", "can_download_statement");
    assert!(service.check_permission(&req).await.allowed);

    // The failing neo4j side is skipped; SpiceDB still decides.
    let dual = service
        .check_permission(&req.clone().with_context(BACKEND_HINT_KEY, "both"))
        .await;
    assert!(dual.allowed);
    assert_eq!(dual.backend, Backend::Both);
    assert!(dual
        .message
        .as_deref()
        .unwrap_or_default()
        .contains("connection refused"));

    let graph = service
        .check_permission(&req.with_context(BACKEND_HINT_KEY, "neo4j"))
        .await;
    assert!(!graph.allowed);
    assert_eq!(graph.backend, Backend::PropertyGraph);
}
