//! FeatureStore reconciliation
//!
//! One pass walks the four service slots in a fixed order (registry,
//! offline store, online store, client). A failing slot records a False
//! condition and the pass moves on to the remaining slots, so one broken
//! backend never blocks the others from converging. The first error is
//! returned at the end to drive the error requeue.

pub mod repo_config;
pub mod resources;
pub mod secrets;

use std::sync::Arc;
use std::time::{Duration, Instant};

use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::constants::{
    DEFAULT_ERROR_REQUEUE_SECS, DEFAULT_REQUEUE_SECS, FEAST_VERSION, REGISTRY_TYPE_TAG, TYPE_TAG,
};
use crate::crd::{
    build_condition, compute_phase, set_condition, Condition, FeatureStore, FeatureStoreStatus,
    ServiceHostnames, StorePersistence, CLIENT_READY_TYPE, CONDITION_FALSE, CONDITION_TRUE,
    OFFLINE_STORE_READY_TYPE, ONLINE_STORE_READY_TYPE, READY_TYPE, REGISTRY_READY_TYPE,
};
use crate::metrics;

use repo_config::{
    build_repo_config, service_hostname, FeastServiceType, LocalBackend, RepoConfigContext,
};
use resources::{
    apply_config_map, apply_deployment, apply_service, build_client_config_map, build_deployment,
    build_service,
};

const REASON_READY: &str = "Ready";
const REASON_FAILED: &str = "DeploymentFailed";
const REASON_REMOTE_REGISTRY: &str = "RemoteRegistry";

/// Errors surfaced by a reconciliation pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error("secret key {key} doesn't exist in secret {secret}")]
    MissingSecretKey { key: String, secret: String },

    #[error("secret key {key} in secret {secret} contains invalid tag named {tag}")]
    InvalidSecretTag {
        key: String,
        secret: String,
        tag: String,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("resource has no {0}")]
    MissingMetadata(&'static str),
}

/// Shared context handed to every reconciliation
#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

/// Reconcile one FeatureStore resource.
pub async fn reconcile(
    feature_store: Arc<FeatureStore>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    metrics::increment_reconciliations();

    if feature_store.meta().deletion_timestamp.is_some() {
        // Children are garbage collected through their owner references.
        return Ok(Action::await_change());
    }

    let name = feature_store
        .meta()
        .name
        .clone()
        .ok_or(ReconcileError::MissingMetadata("name"))?;
    let namespace = feature_store
        .namespace()
        .ok_or(ReconcileError::MissingMetadata("namespace"))?;

    info!(%name, %namespace, "reconciling feature store");

    let services = &feature_store.spec.services;
    let remote_registry_hostname = services
        .registry
        .as_ref()
        .and_then(|r| r.remote.as_ref())
        .map(|r| r.hostname.clone());

    let config_ctx = RepoConfigContext {
        resource_name: name.clone(),
        namespace: namespace.clone(),
        project: feature_store.spec.feast_project.clone(),
        remote_registry_hostname: remote_registry_hostname.clone(),
    };

    let mut conditions = feature_store
        .status
        .as_ref()
        .map(|s| s.conditions.clone())
        .unwrap_or_default();
    let mut first_err: Option<ReconcileError> = None;

    // Registry slot. A remote registry is only referenced, never deployed.
    if let Some(hostname) = &remote_registry_hostname {
        set_condition(
            &mut conditions,
            build_condition(
                REGISTRY_READY_TYPE,
                CONDITION_TRUE,
                REASON_REMOTE_REGISTRY,
                &format!("Using remote registry at {hostname}"),
            ),
        );
    } else {
        let registry_persistence = services
            .registry
            .as_ref()
            .and_then(|r| r.local.as_ref())
            .and_then(|l| l.persistence.as_ref());
        let registry_configs = services
            .registry
            .as_ref()
            .and_then(|r| r.local.as_ref())
            .map(|l| l.service.clone())
            .unwrap_or_default();
        let outcome = deploy_slot(
            &ctx,
            &feature_store,
            &config_ctx,
            FeastServiceType::Registry,
            registry_persistence,
            REGISTRY_TYPE_TAG,
            &registry_configs,
        )
        .await;
        record_outcome(
            &mut conditions,
            &mut first_err,
            REGISTRY_READY_TYPE,
            "Registry installation complete",
            outcome,
        );
    }

    // Offline store slot.
    let offline_configs = services
        .offline_store
        .as_ref()
        .map(|s| s.service.clone())
        .unwrap_or_default();
    let outcome = deploy_slot(
        &ctx,
        &feature_store,
        &config_ctx,
        FeastServiceType::OfflineStore,
        services
            .offline_store
            .as_ref()
            .and_then(|s| s.persistence.as_ref()),
        TYPE_TAG,
        &offline_configs,
    )
    .await;
    record_outcome(
        &mut conditions,
        &mut first_err,
        OFFLINE_STORE_READY_TYPE,
        "Offline store installation complete",
        outcome,
    );

    // Online store slot.
    let online_configs = services
        .online_store
        .as_ref()
        .map(|s| s.service.clone())
        .unwrap_or_default();
    let outcome = deploy_slot(
        &ctx,
        &feature_store,
        &config_ctx,
        FeastServiceType::OnlineStore,
        services
            .online_store
            .as_ref()
            .and_then(|s| s.persistence.as_ref()),
        TYPE_TAG,
        &online_configs,
    )
    .await;
    record_outcome(
        &mut conditions,
        &mut first_err,
        ONLINE_STORE_READY_TYPE,
        "Online store installation complete",
        outcome,
    );

    // Client slot publishes a ConfigMap instead of a Deployment.
    let outcome = deploy_client(&ctx, &feature_store, &config_ctx).await;
    record_outcome(
        &mut conditions,
        &mut first_err,
        CLIENT_READY_TYPE,
        "Client configuration deployed",
        outcome,
    );

    // Aggregate condition and phase.
    match &first_err {
        None => set_condition(
            &mut conditions,
            build_condition(
                READY_TYPE,
                CONDITION_TRUE,
                REASON_READY,
                "FeatureStore installation complete",
            ),
        ),
        Some(err) => set_condition(
            &mut conditions,
            build_condition(READY_TYPE, CONDITION_FALSE, REASON_FAILED, &err.to_string()),
        ),
    }
    let phase = compute_phase(&conditions);

    let registry_host = match &remote_registry_hostname {
        Some(hostname) => hostname.clone(),
        None => service_hostname(&name, FeastServiceType::Registry, &namespace),
    };
    let status = FeatureStoreStatus {
        phase,
        conditions,
        service_hostnames: ServiceHostnames {
            offline_store: Some(service_hostname(
                &name,
                FeastServiceType::OfflineStore,
                &namespace,
            )),
            online_store: Some(service_hostname(
                &name,
                FeastServiceType::OnlineStore,
                &namespace,
            )),
            registry: Some(registry_host),
        },
        client_config_map: Some(repo_config::service_name(&name, FeastServiceType::Client)),
        // The applied snapshot only advances on a fully successful pass.
        applied: if first_err.is_none() {
            Some(feature_store.spec.clone())
        } else {
            feature_store.status.as_ref().and_then(|s| s.applied.clone())
        },
        observed_generation: feature_store.meta().generation,
        last_reconcile_time: Some(chrono::Utc::now().to_rfc3339()),
        operator_version: Some(FEAST_VERSION.to_string()),
    };

    let api: Api<FeatureStore> = Api::namespaced(ctx.client.clone(), &namespace);
    api.patch_status(
        &name,
        &PatchParams::default(),
        &Patch::Merge(json!({ "status": status })),
    )
    .await?;

    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    match first_err {
        Some(err) => {
            warn!(%name, %namespace, error = %err, "reconciliation finished with errors");
            Err(err)
        }
        None => {
            info!(%name, %namespace, "reconciliation complete");
            Ok(Action::requeue(Duration::from_secs(DEFAULT_REQUEUE_SECS)))
        }
    }
}

/// Resolve, render, and apply one deployed slot (Deployment + Service).
async fn deploy_slot(
    ctx: &Reconciler,
    feature_store: &FeatureStore,
    config_ctx: &RepoConfigContext,
    slot: FeastServiceType,
    persistence: Option<&StorePersistence>,
    reserved_key: &str,
    configs: &crate::crd::ServiceConfigs,
) -> Result<(), ReconcileError> {
    let namespace = &config_ctx.namespace;

    let local = match persistence.and_then(|p| p.db_persistence.as_ref()) {
        Some(db) => {
            let parameters =
                secrets::resolve_db_parameters(ctx.client.clone(), namespace, db, reserved_key)
                    .await?;
            Some(LocalBackend {
                backend_type: Some(db.r#type.clone()),
                parameters,
            })
        }
        None => None,
    };

    let repo_config = build_repo_config(slot, config_ctx, local);
    let yaml = repo_config.to_yaml()?;

    let deployment = build_deployment(feature_store, slot, namespace, configs, &yaml);
    apply_deployment(ctx.client.clone(), namespace, deployment).await?;

    let service = build_service(feature_store, slot, namespace);
    apply_service(ctx.client.clone(), namespace, service).await?;

    Ok(())
}

/// Render and publish the client ConfigMap.
async fn deploy_client(
    ctx: &Reconciler,
    feature_store: &FeatureStore,
    config_ctx: &RepoConfigContext,
) -> Result<(), ReconcileError> {
    let repo_config = build_repo_config(FeastServiceType::Client, config_ctx, None);
    let yaml = repo_config.to_yaml()?;
    let config_map = build_client_config_map(feature_store, &config_ctx.namespace, &yaml);
    apply_config_map(ctx.client.clone(), &config_ctx.namespace, config_map).await
}

/// Fold one slot outcome into the condition set, keeping the first error.
fn record_outcome(
    conditions: &mut Vec<Condition>,
    first_err: &mut Option<ReconcileError>,
    condition_type: &str,
    success_message: &str,
    outcome: Result<(), ReconcileError>,
) {
    match outcome {
        Ok(()) => set_condition(
            conditions,
            build_condition(condition_type, CONDITION_TRUE, REASON_READY, success_message),
        ),
        Err(err) => {
            set_condition(
                conditions,
                build_condition(
                    condition_type,
                    CONDITION_FALSE,
                    REASON_FAILED,
                    &err.to_string(),
                ),
            );
            if first_err.is_none() {
                *first_err = Some(err);
            }
        }
    }
}

/// Requeue policy for failed reconciliations.
pub fn error_policy(
    feature_store: Arc<FeatureStore>,
    err: &ReconcileError,
    _ctx: Arc<Reconciler>,
) -> Action {
    metrics::increment_reconciliation_errors();
    error!(
        name = %feature_store.name_any(),
        error = %err,
        "reconciliation failed"
    );
    Action::requeue(Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS))
}
