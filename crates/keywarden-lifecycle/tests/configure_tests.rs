//! Reconciler dispatcher tests: section ordering, token hygiene, and the
//! auth/audit/startup/identity sections

mod common;

use common::MockVaultApi;
use keywarden_client::{AuditInfo, AuthMount};
use keywarden_core::ExternalConfig;
use keywarden_kv::{InMemoryKv, KvStore};
use keywarden_lifecycle::{InitConfig, LifecycleManager};
use serde_json::json;
use std::sync::Arc;

fn doc(yaml: &str) -> ExternalConfig {
    serde_yaml_ng::from_str(yaml).unwrap()
}

async fn store_with_root() -> Arc<InMemoryKv> {
    let store = Arc::new(InMemoryKv::new());
    store.set("vault-root", b"s.root").await.unwrap();
    store
}

fn manager(store: Arc<InMemoryKv>, api: Arc<MockVaultApi>) -> LifecycleManager {
    LifecycleManager::new(store, api, InitConfig::default()).unwrap()
}

#[tokio::test]
async fn sections_run_in_their_fixed_order() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());

    let external = doc(
        r#"
auth:
  - type: approle
    roles:
      - name: app
        policies: default
policies:
  - name: allow
    rules: path "secret/*" { capabilities = ["read"] }
plugins:
  - plugin_name: my-plugin
    type: secret
    command: my-plugin
    sha256: abc123
secrets:
  - type: kv
    path: secret
audit:
  - type: file
    options:
      file_path: /var/log/vault_audit.log
startupSecrets:
  - type: kv
    path: secret/startup
    data:
      seeded: "yes"
groups:
  - name: admins
    type: external
"#,
    );

    manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap();

    let auth = api.position(|c| c.op == "enable_auth").unwrap();
    let policies = api.position(|c| c.op == "put_policy").unwrap();
    let plugins = api.position(|c| c.op == "register_plugin").unwrap();
    let secrets = api.position(|c| c.op == "mount").unwrap();
    let audit = api.position(|c| c.op == "enable_audit").unwrap();
    let startup = api
        .position(|c| c.op == "write" && c.path == "secret/startup")
        .unwrap();
    let groups = api
        .position(|c| c.op == "write" && c.path == "identity/group")
        .unwrap();

    assert!(auth < policies);
    assert!(policies < plugins);
    assert!(plugins < secrets);
    assert!(secrets < audit);
    assert!(audit < startup);
    assert!(startup < groups);
}

#[tokio::test]
async fn the_token_is_scrubbed_after_a_successful_run() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());

    manager(store, api.clone())
        .configure(&ExternalConfig::default())
        .await
        .unwrap();

    assert!(api.installed_token().is_none());
}

#[tokio::test]
async fn the_token_is_scrubbed_after_a_failed_run() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());

    // Unparseable policy rules fail the policies section.
    let external = doc(
        r#"
policies:
  - name: broken
    rules: "path { {"
"#,
    );

    let err = manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("error configuring policies"));
    assert!(api.installed_token().is_none());
}

#[tokio::test]
async fn kubernetes_auth_with_an_explicit_host_skips_in_cluster_synthesis() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());

    let external = doc(
        r#"
auth:
  - type: kubernetes
    config:
      kubernetes_host: "https://x"
"#,
    );

    manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap();

    // The service-account files were not read: the body is exactly the
    // configured block.
    let writes = api.writes_to("auth/kubernetes/config");
    assert_eq!(writes.len(), 1);
    assert_eq!(
        writes[0].body.as_ref().unwrap(),
        &json!({ "kubernetes_host": "https://x" })
    );
}

#[tokio::test]
async fn github_mappings_are_written_per_team() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());

    let external = doc(
        r#"
auth:
  - type: github
    config:
      organization: o
    map:
      teams:
        t1: p1
"#,
    );

    manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap();

    let config_writes = api.writes_to("auth/github/config");
    assert_eq!(
        config_writes[0].body.as_ref().unwrap(),
        &json!({ "organization": "o" })
    );

    let mapping_writes = api.writes_to("auth/github/map/teams/t1");
    assert_eq!(
        mapping_writes[0].body.as_ref().unwrap(),
        &json!({ "value": "p1" })
    );
}

#[tokio::test]
async fn an_existing_auth_mount_of_the_same_type_is_not_re_enabled() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());
    api.auth_mounts.lock().unwrap().insert(
        "github/".to_string(),
        AuthMount {
            method_type: "github".to_string(),
            accessor: "auth_github_1".to_string(),
            description: String::new(),
        },
    );

    let external = doc(
        r#"
auth:
  - type: github
    config:
      organization: o
"#,
    );

    manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap();

    assert!(api.calls_of("enable_auth").is_empty());
    assert_eq!(api.writes_to("auth/github/config").len(), 1);
}

#[tokio::test]
async fn missing_auth_config_is_fatal() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());

    let external = doc("auth:\n  - type: ldap\n");

    let err = manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("error configuring auth methods"));
}

#[tokio::test]
async fn audit_devices_are_enabled_once_and_never_tuned() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());
    api.audit_devices.lock().unwrap().insert(
        "file/".to_string(),
        AuditInfo {
            device_type: "file".to_string(),
            description: String::new(),
        },
    );

    let external = doc(
        r#"
audit:
  - type: file
    options:
      file_path: /var/log/vault_audit.log
  - type: syslog
"#,
    );

    manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap();

    let enables = api.calls_of("enable_audit");
    assert_eq!(enables.len(), 1);
    assert_eq!(enables[0].path, "syslog");
}

#[tokio::test]
async fn startup_secrets_of_unknown_type_abort_the_run() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());

    let external = doc(
        r#"
startupSecrets:
  - type: pki
    path: pki/issue/default
    data: {}
"#,
    );

    let err = manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("error writing startup secrets"));
}

#[tokio::test]
async fn group_aliases_resolve_accessor_and_canonical_id() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());
    api.auth_mounts.lock().unwrap().insert(
        "github/".to_string(),
        AuthMount {
            method_type: "github".to_string(),
            accessor: "auth_github_1".to_string(),
            description: String::new(),
        },
    );
    api.read_responses.lock().unwrap().insert(
        "identity/group/name/admins".to_string(),
        json!({ "id": "group-id-1", "name": "admins" }),
    );

    let external = doc(
        r#"
groups:
  - name: admins
    type: external
    policies: [allow]
group-aliases:
  - name: gh-admins
    mountpath: github
    group: admins
"#,
    );

    manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap();

    // The group already exists, so it is tuned by name.
    assert_eq!(api.writes_to("identity/group/name/admins").len(), 1);

    // No existing alias: created at the collection endpoint.
    let alias_writes = api.writes_to("identity/group-alias");
    assert_eq!(alias_writes.len(), 1);
    assert_eq!(
        alias_writes[0].body.as_ref().unwrap(),
        &json!({
            "name": "gh-admins",
            "mount_accessor": "auth_github_1",
            "canonical_id": "group-id-1",
        })
    );
}

#[tokio::test]
async fn an_existing_alias_is_tuned_by_its_id() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());
    api.auth_mounts.lock().unwrap().insert(
        "github/".to_string(),
        AuthMount {
            method_type: "github".to_string(),
            accessor: "auth_github_1".to_string(),
            description: String::new(),
        },
    );
    api.read_responses.lock().unwrap().insert(
        "identity/group/name/admins".to_string(),
        json!({ "id": "group-id-1" }),
    );
    api.list_responses.lock().unwrap().insert(
        "identity/group-alias/id".to_string(),
        vec!["alias-1".to_string(), "alias-2".to_string()],
    );
    api.read_responses.lock().unwrap().insert(
        "identity/group-alias/id/alias-1".to_string(),
        json!({ "name": "other" }),
    );
    api.read_responses.lock().unwrap().insert(
        "identity/group-alias/id/alias-2".to_string(),
        json!({ "name": "gh-admins" }),
    );

    let external = doc(
        r#"
group-aliases:
  - name: gh-admins
    mountpath: github
    group: admins
"#,
    );

    manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap();

    assert_eq!(api.writes_to("identity/group-alias/id/alias-2").len(), 1);
    assert!(api.writes_to("identity/group-alias").is_empty());
}

#[tokio::test]
async fn non_external_groups_are_rejected() {
    let store = store_with_root().await;
    let api = Arc::new(MockVaultApi::new());

    let external = doc(
        r#"
groups:
  - name: internal-team
    type: internal
"#,
    );

    let err = manager(store, api.clone())
        .configure(&external)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("error configuring identity groups"));
}
