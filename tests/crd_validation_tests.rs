//! # CRD Validation Tests
//!
//! Tests that full FeatureStore manifests deserialize correctly and that
//! the generated schema keeps its field names stable.

use feast_operator::crd::FeatureStore;
use kube::core::CustomResourceExt;

#[test]
fn test_full_feature_store_manifest() {
    let yaml = r#"
apiVersion: feast.dev/v1alpha1
kind: FeatureStore
metadata:
  name: example
  namespace: default
spec:
  feastProject: my_project
  services:
    offlineStore:
      replicas: 2
      persistence:
        dbPersistence:
          type: snowflake.offline
          secretRef:
            name: offline-store-secret
    onlineStore:
      image: docker.io/feastdev/feature-server:0.40.0
      imagePullPolicy: IfNotPresent
      resources:
        limits:
          cpu: 500m
          memory: 512Mi
        requests:
          cpu: 100m
          memory: 128Mi
      persistence:
        dbPersistence:
          type: cassandra
          secretRef:
            name: online-store-secret
    registry:
      local:
        persistence:
          dbPersistence:
            type: sql
            secretRef:
              name: registry-store-secret
            secretKeyName: sql_custom_registry_key
"#;

    let fs: FeatureStore = serde_yaml::from_str(yaml).expect("manifest should deserialize");

    assert_eq!(fs.spec.feast_project, "my_project");

    let offline = fs.spec.services.offline_store.as_ref().unwrap();
    assert_eq!(offline.service.replicas, Some(2));
    let offline_db = offline
        .persistence
        .as_ref()
        .unwrap()
        .db_persistence
        .as_ref()
        .unwrap();
    assert_eq!(offline_db.r#type, "snowflake.offline");
    assert_eq!(offline_db.secret_ref.name, "offline-store-secret");
    assert_eq!(offline_db.secret_key(), "snowflake.offline");

    let online = fs.spec.services.online_store.as_ref().unwrap();
    assert_eq!(online.service.image_pull_policy.as_deref(), Some("IfNotPresent"));
    let resources = online.service.resources.as_ref().unwrap();
    assert_eq!(resources.limits.cpu.as_deref(), Some("500m"));
    assert_eq!(resources.requests.memory.as_deref(), Some("128Mi"));

    let registry = fs.spec.services.registry.as_ref().unwrap();
    let registry_db = registry
        .local
        .as_ref()
        .unwrap()
        .persistence
        .as_ref()
        .unwrap()
        .db_persistence
        .as_ref()
        .unwrap();
    assert_eq!(registry_db.secret_key(), "sql_custom_registry_key");
    assert!(registry.remote.is_none());
}

#[test]
fn test_remote_registry_manifest() {
    let yaml = r#"
apiVersion: feast.dev/v1alpha1
kind: FeatureStore
metadata:
  name: consumer
  namespace: default
spec:
  feastProject: my_project
  services:
    registry:
      remote:
        hostname: registry.shared.svc.cluster.local:80
"#;

    let fs: FeatureStore = serde_yaml::from_str(yaml).expect("manifest should deserialize");
    let registry = fs.spec.services.registry.as_ref().unwrap();
    assert!(registry.local.is_none());
    assert_eq!(
        registry.remote.as_ref().unwrap().hostname,
        "registry.shared.svc.cluster.local:80"
    );
}

#[test]
fn test_minimal_manifest_defaults_all_services() {
    let yaml = r#"
apiVersion: feast.dev/v1alpha1
kind: FeatureStore
metadata:
  name: minimal
spec:
  feastProject: my_project
"#;

    let fs: FeatureStore = serde_yaml::from_str(yaml).expect("manifest should deserialize");
    assert!(fs.spec.services.offline_store.is_none());
    assert!(fs.spec.services.online_store.is_none());
    assert!(fs.spec.services.registry.is_none());
}

#[test]
fn test_generated_crd_identity() {
    let crd = FeatureStore::crd();
    assert_eq!(crd.spec.group, "feast.dev");
    assert_eq!(crd.spec.names.kind, "FeatureStore");
    assert_eq!(crd.spec.names.short_names, Some(vec!["feast".to_string()]));

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1alpha1");
    assert!(version.subresources.as_ref().unwrap().status.is_some());
}
