//! Kubernetes child objects for the feature store services
//!
//! Each deployed slot gets a Deployment plus a Service named
//! `feast-<resource>-<slot>`; the client slot gets a ConfigMap instead.
//! Every child carries a controller owner reference so deletion cascades,
//! and upserts go through server-side apply keyed by object name.

use std::collections::BTreeMap;

use base64::Engine;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
    Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};

use crate::constants::{
    DEFAULT_IMAGE, DEFAULT_REPLICAS, FEATURE_STORE_YAML_CM_KEY, FEATURE_STORE_YAML_ENV_VAR,
    FIELD_MANAGER, HTTP_PORT,
};
use crate::crd::{FeatureStore, ServiceConfigs};

use super::repo_config::{service_name, FeastServiceType};
use super::ReconcileError;

/// Controller owner reference pointing back at the FeatureStore
pub fn owner_reference(feature_store: &FeatureStore) -> OwnerReference {
    OwnerReference {
        api_version: FeatureStore::api_version(&()).to_string(),
        kind: FeatureStore::kind(&()).to_string(),
        name: feature_store.meta().name.clone().unwrap_or_default(),
        uid: feature_store.meta().uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

fn labels(resource_name: &str, service: FeastServiceType) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app.kubernetes.io/name".to_string(), "feast".to_string()),
        (
            "app.kubernetes.io/instance".to_string(),
            resource_name.to_string(),
        ),
        (
            "app.kubernetes.io/managed-by".to_string(),
            FIELD_MANAGER.to_string(),
        ),
        (
            "feast.dev/service-type".to_string(),
            service.suffix().to_string(),
        ),
    ])
}

fn object_meta(
    feature_store: &FeatureStore,
    service: FeastServiceType,
    namespace: &str,
) -> ObjectMeta {
    let resource_name = feature_store.meta().name.clone().unwrap_or_default();
    ObjectMeta {
        name: Some(service_name(&resource_name, service)),
        namespace: Some(namespace.to_string()),
        labels: Some(labels(&resource_name, service)),
        owner_references: Some(vec![owner_reference(feature_store)]),
        ..Default::default()
    }
}

fn resource_requirements(configs: &ServiceConfigs) -> Option<ResourceRequirements> {
    let resources = configs.resources.as_ref()?;
    let quantities = |list: &crate::crd::ResourceList| {
        let mut out = BTreeMap::new();
        if let Some(cpu) = &list.cpu {
            out.insert("cpu".to_string(), Quantity(cpu.clone()));
        }
        if let Some(memory) = &list.memory {
            out.insert("memory".to_string(), Quantity(memory.clone()));
        }
        (!out.is_empty()).then_some(out)
    };
    Some(ResourceRequirements {
        limits: quantities(&resources.limits),
        requests: quantities(&resources.requests),
        ..Default::default()
    })
}

/// Build the Deployment for one service slot.
///
/// The rendered feature_store.yaml travels to the container base64-encoded
/// in the FEATURE_STORE_YAML_BASE64 environment variable.
pub fn build_deployment(
    feature_store: &FeatureStore,
    service: FeastServiceType,
    namespace: &str,
    configs: &ServiceConfigs,
    repo_config_yaml: &str,
) -> Deployment {
    let resource_name = feature_store.meta().name.clone().unwrap_or_default();
    let encoded = base64::engine::general_purpose::STANDARD.encode(repo_config_yaml);
    let selector = labels(&resource_name, service);

    let container = Container {
        name: service.suffix().to_string(),
        image: Some(
            configs
                .image
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
        ),
        image_pull_policy: configs.image_pull_policy.clone(),
        env: Some(vec![EnvVar {
            name: FEATURE_STORE_YAML_ENV_VAR.to_string(),
            value: Some(encoded),
            value_from: None,
        }]),
        ports: Some(vec![ContainerPort {
            container_port: service.target_port(),
            name: Some(service.suffix().to_string()),
            ..Default::default()
        }]),
        resources: resource_requirements(configs),
        ..Default::default()
    };

    Deployment {
        metadata: object_meta(feature_store, service, namespace),
        spec: Some(DeploymentSpec {
            replicas: Some(configs.replicas.unwrap_or(DEFAULT_REPLICAS)),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the Service exposing one slot on port 80.
pub fn build_service(
    feature_store: &FeatureStore,
    service: FeastServiceType,
    namespace: &str,
) -> Service {
    let resource_name = feature_store.meta().name.clone().unwrap_or_default();
    Service {
        metadata: object_meta(feature_store, service, namespace),
        spec: Some(ServiceSpec {
            selector: Some(labels(&resource_name, service)),
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                port: HTTP_PORT,
                target_port: Some(IntOrString::Int(service.target_port())),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the client ConfigMap carrying the feature_store.yaml verbatim.
pub fn build_client_config_map(
    feature_store: &FeatureStore,
    namespace: &str,
    repo_config_yaml: &str,
) -> ConfigMap {
    ConfigMap {
        metadata: object_meta(feature_store, FeastServiceType::Client, namespace),
        data: Some(BTreeMap::from([(
            FEATURE_STORE_YAML_CM_KEY.to_string(),
            repo_config_yaml.to_string(),
        )])),
        ..Default::default()
    }
}

/// Upsert a Deployment by name.
pub async fn apply_deployment(
    client: Client,
    namespace: &str,
    deployment: Deployment,
) -> Result<(), ReconcileError> {
    let api: Api<Deployment> = Api::namespaced(client, namespace);
    apply(&api, deployment).await?;
    crate::metrics::increment_resources_applied("Deployment");
    Ok(())
}

/// Upsert a Service by name.
pub async fn apply_service(
    client: Client,
    namespace: &str,
    service: Service,
) -> Result<(), ReconcileError> {
    let api: Api<Service> = Api::namespaced(client, namespace);
    apply(&api, service).await?;
    crate::metrics::increment_resources_applied("Service");
    Ok(())
}

/// Upsert a ConfigMap by name.
pub async fn apply_config_map(
    client: Client,
    namespace: &str,
    config_map: ConfigMap,
) -> Result<(), ReconcileError> {
    let api: Api<ConfigMap> = Api::namespaced(client, namespace);
    apply(&api, config_map).await?;
    crate::metrics::increment_resources_applied("ConfigMap");
    Ok(())
}

async fn apply<K>(api: &Api<K>, object: K) -> Result<(), ReconcileError>
where
    K: Resource + Clone + std::fmt::Debug + serde::Serialize + serde::de::DeserializeOwned,
{
    let name = object.meta().name.clone().unwrap_or_default();
    match api.get(&name).await {
        Ok(_) => {
            let params = PatchParams::apply(FIELD_MANAGER).force();
            api.patch(&name, &params, &Patch::Apply(&object)).await?;
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            api.create(&PostParams::default(), &object).await?;
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use kube::core::ObjectMeta as KubeObjectMeta;

    use crate::crd::{FeatureStoreSpec, ResourceList};

    use super::*;

    fn feature_store() -> FeatureStore {
        let mut fs = FeatureStore::new(
            "example",
            FeatureStoreSpec {
                feast_project: "my_project".to_string(),
                services: Default::default(),
            },
        );
        fs.metadata = KubeObjectMeta {
            name: Some("example".to_string()),
            namespace: Some("default".to_string()),
            uid: Some("1234-uid".to_string()),
            ..Default::default()
        };
        fs
    }

    #[test]
    fn test_deployment_carries_base64_repo_config() {
        let yaml = "project: my_project\nprovider: local\n";
        let deployment = build_deployment(
            &feature_store(),
            FeastServiceType::OnlineStore,
            "default",
            &ServiceConfigs::default(),
            yaml,
        );

        let container = &deployment.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0];
        let env = container.env.as_ref().unwrap();
        assert_eq!(env[0].name, "FEATURE_STORE_YAML_BASE64");

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(env[0].value.as_deref().unwrap())
            .unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), yaml);
    }

    #[test]
    fn test_deployment_defaults_image_and_replicas() {
        let deployment = build_deployment(
            &feature_store(),
            FeastServiceType::Registry,
            "default",
            &ServiceConfigs::default(),
            "",
        );
        let spec = deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        let container = &spec.template.spec.unwrap().containers[0];
        assert_eq!(
            container.image.as_deref(),
            Some("docker.io/feastdev/feature-server:0.40.0")
        );
        assert_eq!(deployment.metadata.name.as_deref(), Some("feast-example-registry"));
    }

    #[test]
    fn test_deployment_resource_requirements() {
        let configs = ServiceConfigs {
            resources: Some(crate::crd::ResourceRequirements {
                limits: ResourceList {
                    cpu: Some("500m".to_string()),
                    memory: Some("512Mi".to_string()),
                },
                requests: ResourceList::default(),
            }),
            ..Default::default()
        };
        let deployment = build_deployment(
            &feature_store(),
            FeastServiceType::OfflineStore,
            "default",
            &configs,
            "",
        );
        let container = deployment.spec.unwrap().template.spec.unwrap().containers[0].clone();
        let limits = container.resources.unwrap().limits.unwrap();
        assert_eq!(limits.get("cpu"), Some(&Quantity("500m".to_string())));
        assert_eq!(limits.get("memory"), Some(&Quantity("512Mi".to_string())));
    }

    #[test]
    fn test_service_maps_port_80_to_target_port() {
        let service = build_service(&feature_store(), FeastServiceType::OfflineStore, "default");
        assert_eq!(service.metadata.name.as_deref(), Some("feast-example-offline"));
        let port = &service.spec.unwrap().ports.unwrap()[0];
        assert_eq!(port.port, 80);
        assert_eq!(port.target_port, Some(IntOrString::Int(8815)));
    }

    #[test]
    fn test_client_config_map_key_and_name() {
        let yaml = "project: my_project\n";
        let config_map = build_client_config_map(&feature_store(), "default", yaml);
        assert_eq!(config_map.metadata.name.as_deref(), Some("feast-example-client"));
        assert_eq!(
            config_map.data.unwrap().get("feature_store.yaml").map(String::as_str),
            Some(yaml)
        );
    }

    #[test]
    fn test_children_carry_controller_owner_reference() {
        let service = build_service(&feature_store(), FeastServiceType::Registry, "default");
        let owner = &service.metadata.owner_references.unwrap()[0];
        assert_eq!(owner.kind, "FeatureStore");
        assert_eq!(owner.api_version, "feast.dev/v1alpha1");
        assert_eq!(owner.name, "example");
        assert_eq!(owner.controller, Some(true));
        assert_eq!(owner.block_owner_deletion, Some(true));
    }
}
