//! FeatureStore spec types
//!
//! A `FeatureStore` resource declares a Feast project and up to three
//! deployed services (registry, offline store, online store). Each service
//! can attach a database backend by referencing a Kubernetes Secret whose
//! payload holds the backend connection parameters as YAML.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: feast.dev/v1alpha1
//! kind: FeatureStore
//! metadata:
//!   name: sample
//! spec:
//!   feastProject: my_project
//!   services:
//!     onlineStore:
//!       persistence:
//!         dbPersistence:
//!           type: cassandra
//!           secretRef:
//!             name: online-store-secret
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::status::FeatureStoreStatus;

/// FeatureStore is the Schema for the featurestores API
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "feast.dev",
    version = "v1alpha1",
    kind = "FeatureStore",
    namespaced,
    status = "FeatureStoreStatus",
    shortname = "feast",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStoreSpec {
    /// Feast project name written into every rendered config
    pub feast_project: String,

    /// Services to deploy for this feature store
    #[serde(default)]
    pub services: ServicesSpec,
}

/// Per-service deployment specs. A service without an entry is still
/// deployed with package defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServicesSpec {
    /// Offline (historical) store service
    #[serde(default)]
    pub offline_store: Option<OfflineStoreSpec>,

    /// Online (serving) store service
    #[serde(default)]
    pub online_store: Option<OnlineStoreSpec>,

    /// Registry service, either deployed locally or delegated to a remote one
    #[serde(default)]
    pub registry: Option<RegistrySpec>,
}

/// Offline store service configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct OfflineStoreSpec {
    #[serde(flatten)]
    pub service: ServiceConfigs,

    /// Backend persistence for the offline store
    #[serde(default)]
    pub persistence: Option<StorePersistence>,
}

/// Online store service configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct OnlineStoreSpec {
    #[serde(flatten)]
    pub service: ServiceConfigs,

    /// Backend persistence for the online store
    #[serde(default)]
    pub persistence: Option<StorePersistence>,
}

/// Registry configuration: exactly one of `local` or `remote` is expected.
/// When both are absent a local registry with package defaults is deployed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySpec {
    /// Deploy a registry service owned by this resource
    #[serde(default)]
    pub local: Option<LocalRegistrySpec>,

    /// Point every rendered config at an externally managed registry
    #[serde(default)]
    pub remote: Option<RemoteRegistrySpec>,
}

/// Locally deployed registry service
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct LocalRegistrySpec {
    #[serde(flatten)]
    pub service: ServiceConfigs,

    /// Backend persistence for the registry
    #[serde(default)]
    pub persistence: Option<StorePersistence>,
}

/// Remote registry reference; no registry Deployment is created
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRegistrySpec {
    /// Hostname of the remote registry service
    pub hostname: String,
}

/// Container settings shared by every deployed service
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfigs {
    /// Container image (defaults to the bundled feature-server image)
    #[serde(default)]
    pub image: Option<String>,

    /// Image pull policy
    #[serde(default)]
    pub image_pull_policy: Option<String>,

    /// Replica count (defaults to 1)
    #[serde(default)]
    pub replicas: Option<i32>,

    /// Resource requests and limits for the container
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}

/// Persistence configuration for a service backend
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorePersistence {
    /// Database-backed persistence resolved from a Secret
    #[serde(default)]
    pub db_persistence: Option<DbStorePersistence>,
}

/// Database backend attached via a credential Secret.
///
/// The Secret field holding the connection parameters defaults to the
/// backend type tag and can be overridden with `secretKeyName`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DbStorePersistence {
    /// Backend type tag (e.g. `snowflake`, `cassandra`, `sql`)
    pub r#type: String,

    /// Secret holding the backend connection parameters
    pub secret_ref: SecretReference,

    /// Secret data key to read; defaults to the backend type tag
    #[serde(default)]
    pub secret_key_name: Option<String>,
}

impl DbStorePersistence {
    /// Secret data key this persistence reads its parameters from.
    pub fn secret_key(&self) -> &str {
        match self.secret_key_name.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => &self.r#type,
        }
    }
}

/// Reference to a Secret in the resource's namespace
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SecretReference {
    /// Name of the Secret
    pub name: String,
}

/// Resource requirements for a service container
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    /// Resource limits
    #[serde(default)]
    pub limits: ResourceList,
    /// Resource requests
    #[serde(default)]
    pub requests: ResourceList,
}

/// Resource quantities
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct ResourceList {
    /// CPU limit/request (e.g. "500m", "2")
    #[serde(default)]
    pub cpu: Option<String>,
    /// Memory limit/request (e.g. "512Mi", "2Gi")
    #[serde(default)]
    pub memory: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_spec_deserializes() {
        let spec: FeatureStoreSpec =
            serde_json::from_str(r#"{"feastProject": "my_project"}"#).unwrap();
        assert_eq!(spec.feast_project, "my_project");
        assert!(spec.services.offline_store.is_none());
        assert!(spec.services.online_store.is_none());
        assert!(spec.services.registry.is_none());
    }

    #[test]
    fn test_db_persistence_secret_key_defaults_to_type() {
        let persistence = DbStorePersistence {
            r#type: "cassandra".to_string(),
            secret_ref: SecretReference {
                name: "online-store-secret".to_string(),
            },
            secret_key_name: None,
        };
        assert_eq!(persistence.secret_key(), "cassandra");
    }

    #[test]
    fn test_db_persistence_empty_secret_key_falls_back_to_type() {
        let persistence = DbStorePersistence {
            r#type: "sql".to_string(),
            secret_ref: SecretReference {
                name: "registry-store-secret".to_string(),
            },
            secret_key_name: Some(String::new()),
        };
        assert_eq!(persistence.secret_key(), "sql");
    }

    #[test]
    fn test_db_persistence_explicit_secret_key() {
        let persistence = DbStorePersistence {
            r#type: "sql".to_string(),
            secret_ref: SecretReference {
                name: "registry-store-secret".to_string(),
            },
            secret_key_name: Some("sql_custom_registry_key".to_string()),
        };
        assert_eq!(persistence.secret_key(), "sql_custom_registry_key");
    }

    #[test]
    fn test_service_configs_flatten() {
        let json = r#"{
            "image": "docker.io/feastdev/feature-server:0.40.0",
            "replicas": 2,
            "persistence": {
                "dbPersistence": {
                    "type": "snowflake",
                    "secretRef": {"name": "offline-store-secret"}
                }
            }
        }"#;
        let spec: OfflineStoreSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.service.replicas, Some(2));
        let db = spec.persistence.unwrap().db_persistence.unwrap();
        assert_eq!(db.r#type, "snowflake");
        assert_eq!(db.secret_ref.name, "offline-store-secret");
    }
}
