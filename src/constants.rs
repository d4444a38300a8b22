//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! Service ports and object-name conventions match what the deployed Feast
//! feature servers expect; requeue intervals are reasonable defaults.

/// Feast release the operator deploys by default
pub const FEAST_VERSION: &str = "0.40.0";

/// Default container image for all feature store services
pub const DEFAULT_IMAGE: &str = "docker.io/feastdev/feature-server:0.40.0";

/// Default replica count for service Deployments
pub const DEFAULT_REPLICAS: i32 = 1;

/// Port every feature store Service listens on
pub const HTTP_PORT: i32 = 80;

/// Container port of the registry server
pub const REGISTRY_TARGET_PORT: i32 = 6570;

/// Container port of the offline feature server
pub const OFFLINE_TARGET_PORT: i32 = 8815;

/// Container port of the online feature server
pub const ONLINE_TARGET_PORT: i32 = 6566;

/// Cluster DNS suffix appended to `<service>.<namespace>`
pub const CLUSTER_DOMAIN: &str = ".svc.cluster.local";

/// Environment variable carrying the base64-encoded feature_store.yaml
pub const FEATURE_STORE_YAML_ENV_VAR: &str = "FEATURE_STORE_YAML_BASE64";

/// ConfigMap key under which the client feature_store.yaml is published
pub const FEATURE_STORE_YAML_CM_KEY: &str = "feature_store.yaml";

/// Provider written into every rendered repo config
pub const LOCAL_PROVIDER: &str = "local";

/// Entity key serialization version written into every rendered repo config
pub const ENTITY_KEY_SERIALIZATION_VERSION: i64 = 3;

/// Reserved structural tag inside offline/online store credential payloads
pub const TYPE_TAG: &str = "type";

/// Reserved structural tag inside registry credential payloads
pub const REGISTRY_TYPE_TAG: &str = "registry_type";

/// Backend tag used for configs that delegate to a sibling service
pub const REMOTE_CONFIG_TYPE: &str = "remote";

/// Default offline store backend when no persistence is configured
pub const DEFAULT_OFFLINE_STORE_TYPE: &str = "dask";

/// Default online store backend when no persistence is configured
pub const DEFAULT_ONLINE_STORE_TYPE: &str = "sqlite";

/// Default registry backend when no persistence is configured
pub const DEFAULT_REGISTRY_TYPE: &str = "file";

/// Registry backend whose connection string is lifted out of the parameter
/// map into `registry.path`
pub const SQL_REGISTRY_TYPE: &str = "sql";

/// Field manager name used for server-side apply patches
pub const FIELD_MANAGER: &str = "feast-operator";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Requeue interval after a successful reconcile (drift detection), seconds
pub const DEFAULT_REQUEUE_SECS: u64 = 300;

/// Requeue interval after a reconciliation error, seconds
pub const DEFAULT_ERROR_REQUEUE_SECS: u64 = 60;
