//! FeatureStore custom resource definition
//!
//! Spec types describe the desired feature store topology; status types
//! track per-service readiness conditions and the aggregate phase.

pub mod spec;
pub mod status;

pub use spec::{
    DbStorePersistence, FeatureStore, FeatureStoreSpec, LocalRegistrySpec, OfflineStoreSpec,
    OnlineStoreSpec, RegistrySpec, RemoteRegistrySpec, ResourceList, ResourceRequirements,
    SecretReference, ServiceConfigs, ServicesSpec, StorePersistence,
};
pub use status::{
    build_condition, compute_phase, set_condition, Condition, FeatureStorePhase,
    FeatureStoreStatus, ServiceHostnames, CLIENT_READY_TYPE, CONDITION_FALSE, CONDITION_TRUE,
    CONDITION_UNKNOWN, OFFLINE_STORE_READY_TYPE, ONLINE_STORE_READY_TYPE, READY_TYPE,
    REGISTRY_READY_TYPE, TRACKED_CONDITION_TYPES,
};
