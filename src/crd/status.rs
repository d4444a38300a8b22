//! FeatureStore status types and condition helpers
//!
//! Conditions follow the Kubernetes API conventions: one entry per type,
//! upserted in place, with `lastTransitionTime` touched only when the
//! status value actually flips. The aggregate phase is a pure function of
//! the condition set.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::spec::FeatureStoreSpec;

// Condition status values
pub const CONDITION_TRUE: &str = "True";
pub const CONDITION_FALSE: &str = "False";
pub const CONDITION_UNKNOWN: &str = "Unknown";

// FeatureStore condition types
pub const READY_TYPE: &str = "Ready";
pub const REGISTRY_READY_TYPE: &str = "RegistryReady";
pub const CLIENT_READY_TYPE: &str = "ClientReady";
pub const OFFLINE_STORE_READY_TYPE: &str = "OfflineStoreReady";
pub const ONLINE_STORE_READY_TYPE: &str = "OnlineStoreReady";

/// Every condition type that participates in phase aggregation
pub const TRACKED_CONDITION_TYPES: [&str; 5] = [
    READY_TYPE,
    REGISTRY_READY_TYPE,
    CLIENT_READY_TYPE,
    OFFLINE_STORE_READY_TYPE,
    ONLINE_STORE_READY_TYPE,
];

/// Status of the FeatureStore resource
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStoreStatus {
    /// Aggregate lifecycle phase derived from the conditions
    #[serde(default)]
    pub phase: FeatureStorePhase,

    /// Per-service readiness conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// In-cluster hostnames of the deployed services
    #[serde(default)]
    pub service_hostnames: ServiceHostnames,

    /// Name of the ConfigMap holding the client feature_store.yaml
    #[serde(default)]
    pub client_config_map: Option<String>,

    /// Spec snapshot from the last fully successful reconcile
    #[serde(default)]
    pub applied: Option<FeatureStoreSpec>,

    /// Last observed generation
    #[serde(default)]
    pub observed_generation: Option<i64>,

    /// Last reconciliation time
    #[serde(default)]
    pub last_reconcile_time: Option<String>,

    /// Feast release deployed by the operator
    #[serde(default)]
    pub operator_version: Option<String>,
}

/// Aggregate lifecycle phase
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum FeatureStorePhase {
    /// Some services are not yet reconciled
    #[default]
    Pending,
    /// All services are deployed and their configs rendered
    Ready,
    /// At least one service failed to reconcile
    Failed,
}

/// Hostnames under which the deployed services are reachable in-cluster
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHostnames {
    #[serde(default)]
    pub offline_store: Option<String>,
    #[serde(default)]
    pub online_store: Option<String>,
    #[serde(default)]
    pub registry: Option<String>,
}

/// Condition of the FeatureStore
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last time the condition status flipped
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Machine-readable reason
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

/// Build a condition stamped with the current time.
pub fn build_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        last_transition_time: Some(Utc::now().to_rfc3339()),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
    }
}

/// Upsert a condition by type.
///
/// `lastTransitionTime` is preserved when the status value is unchanged,
/// and the relative order of unrelated conditions is never altered.
pub fn set_condition(conditions: &mut Vec<Condition>, new: Condition) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == new.r#type) {
        if existing.status != new.status {
            *existing = new;
        } else {
            existing.reason = new.reason;
            existing.message = new.message;
        }
    } else {
        conditions.push(new);
    }
}

/// Derive the aggregate phase from the condition set.
///
/// `Ready` requires every tracked condition type to be present and `True`;
/// any `False` condition yields `Failed`; anything else is `Pending`.
pub fn compute_phase(conditions: &[Condition]) -> FeatureStorePhase {
    if conditions.iter().any(|c| c.status == CONDITION_FALSE) {
        return FeatureStorePhase::Failed;
    }
    let all_ready = TRACKED_CONDITION_TYPES.iter().all(|t| {
        conditions
            .iter()
            .any(|c| c.r#type == *t && c.status == CONDITION_TRUE)
    });
    if all_ready {
        FeatureStorePhase::Ready
    } else {
        FeatureStorePhase::Pending
    }
}
