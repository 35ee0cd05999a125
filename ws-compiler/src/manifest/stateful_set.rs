//! The stateful workload: one replica running the author's containers with
//! system environment, shared memory and one persistent claim per mounted
//! volume.

use std::collections::{BTreeMap, HashSet};

use k8s_openapi::api::core::v1::{Container, EnvVar, VolumeMount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use serde::Serialize;

use super::{assembly_error, named_metadata, ManifestDocument, PeerService, APP_LABEL};
use crate::references::{
    is_reserved_volume, uid, volume_size_request, workflow_parameter, NAMESPACE,
    SYS_DSHM_VOLUME, SYS_NAMESPACE_CONFIG_VOLUME, SYS_NODE_POOL, SYS_NODE_POOL_LABEL,
};
use crate::spec::{claim_name, explicit_storage, WorkspaceSpec};
use ws_config::SystemConfig;
use ws_core::error::Result;

const API_VERSION: &str = "apps/v1";
const DEFAULT_STORAGE_CLASS: &str = "onepanel";
const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";
const NAMESPACE_CONFIG_SOURCE: &str = "onepanel";
const DSHM_MOUNT_PATH: &str = "/dev/shm";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSetDocument {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: StatefulSetSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSetSpec {
    pub replicas: i32,
    pub service_name: String,
    pub selector: LabelSelector,
    pub template: PodTemplate,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_claim_templates: Vec<ClaimTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodTemplate {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    pub node_selector: BTreeMap<String, String>,
    pub containers: Vec<Container>,
    pub volumes: Vec<PodVolume>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodVolume {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected: Option<ProjectedSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyDirSource {
    pub medium: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedSource {
    pub sources: Vec<ProjectionSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_map: Option<NamedSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<NamedSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSource {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimTemplate {
    pub metadata: ObjectMeta,
    pub spec: ClaimSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSpec {
    pub access_modes: Vec<String>,
    pub storage_class_name: String,
    pub resources: ClaimResources,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimResources {
    pub requests: BTreeMap<String, String>,
}

impl ClaimTemplate {
    fn new(name: &str, access_modes: Vec<String>, storage_class: String, storage: String) -> Self {
        Self {
            metadata: named_metadata(name.to_string()),
            spec: ClaimSpec {
                access_modes,
                storage_class_name: storage_class,
                resources: ClaimResources {
                    requests: BTreeMap::from([("storage".to_string(), storage)]),
                },
            },
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn storage(&self) -> Option<&str> {
        self.spec.resources.requests.get("storage").map(String::as_str)
    }
}

impl StatefulSetDocument {
    pub fn build(
        spec: &WorkspaceSpec,
        config: &dyn SystemConfig,
        services: &[PeerService],
    ) -> Self {
        let system_env = system_env(config, services);
        let containers = spec
            .containers
            .iter()
            .map(|c| workspace_container(c, &system_env))
            .collect();

        let labels = BTreeMap::from([(APP_LABEL.to_string(), uid())]);

        Self {
            api_version: API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata: named_metadata(uid()),
            spec: StatefulSetSpec {
                replicas: 1,
                service_name: uid(),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                template: PodTemplate {
                    metadata: ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    },
                    spec: PodSpec {
                        node_selector: BTreeMap::from([(
                            workflow_parameter(SYS_NODE_POOL_LABEL),
                            workflow_parameter(SYS_NODE_POOL),
                        )]),
                        containers,
                        volumes: system_volumes(),
                    },
                },
                volume_claim_templates: claim_templates(spec),
            },
        }
    }

    pub fn containers(&self) -> &[Container] {
        &self.spec.template.spec.containers
    }

    pub fn claim(&self, name: &str) -> Option<&ClaimTemplate> {
        self.spec
            .volume_claim_templates
            .iter()
            .find(|c| c.name() == name)
    }
}

impl ManifestDocument for StatefulSetDocument {
    const KIND: &'static str = "StatefulSet";

    fn validate(&self) -> Result<()> {
        if self.spec.replicas != 1 {
            return Err(assembly_error(Self::KIND, "exactly one replica is supported"));
        }

        let mut container_names = HashSet::new();
        for container in self.containers() {
            if container.name.is_empty() || !container_names.insert(container.name.as_str()) {
                return Err(assembly_error(
                    Self::KIND,
                    format!("container name '{}' is empty or duplicated", container.name),
                ));
            }
        }

        let mut sources = HashSet::new();
        let claims = self.spec.volume_claim_templates.iter().map(ClaimTemplate::name);
        let volumes = self.spec.template.spec.volumes.iter().map(|v| v.name.as_str());
        for name in claims.chain(volumes) {
            if !sources.insert(name) {
                return Err(assembly_error(
                    Self::KIND,
                    format!("volume '{}' is defined more than once", name),
                ));
            }
        }

        for mount in self.containers().iter().flat_map(|c| c.volume_mounts.iter().flatten()) {
            if !sources.contains(mount.name.as_str()) {
                return Err(assembly_error(
                    Self::KIND,
                    format!("volume mount '{}' has no backing volume", mount.name),
                ));
            }
        }

        Ok(())
    }
}

/// Environment every container receives, ahead of its own variables.
fn system_env(config: &dyn SystemConfig, services: &[PeerService]) -> Vec<EnvVar> {
    let setting = |value: Option<&str>| value.unwrap_or_default().to_string();

    let mut env = vec![
        env_var("ONEPANEL_API_URL", setting(config.api_url())),
        env_var("ONEPANEL_FQDN", setting(config.fqdn())),
        env_var("ONEPANEL_DOMAIN", setting(config.domain())),
        env_var("ONEPANEL_PROVIDER", setting(config.provider())),
        env_var("ONEPANEL_RESOURCE_NAMESPACE", NAMESPACE.to_string()),
        env_var("ONEPANEL_RESOURCE_UID", uid()),
    ];

    env.extend(services.iter().map(|service| {
        env_var(
            &format!("ONEPANEL_SERVICES_{}_API_URL", service_env_key(&service.name)),
            service.url.clone(),
        )
    }));

    env
}

fn service_env_key(name: &str) -> String {
    name.to_uppercase().replace(['-', '.'], "_")
}

fn env_var(name: &str, value: String) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value),
        value_from: None,
    }
}

/// User variables that shadow a system variable are dropped.
fn workspace_container(container: &Container, system_env: &[EnvVar]) -> Container {
    let mut container = container.clone();

    let reserved: HashSet<&str> = system_env.iter().map(|e| e.name.as_str()).collect();
    let mut env = system_env.to_vec();
    env.extend(
        container
            .env
            .take()
            .unwrap_or_default()
            .into_iter()
            .filter(|e| !reserved.contains(e.name.as_str())),
    );
    container.env = Some(env);

    let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
    if !mounts.iter().any(|m| m.name == SYS_DSHM_VOLUME) {
        mounts.push(VolumeMount {
            name: SYS_DSHM_VOLUME.to_string(),
            mount_path: DSHM_MOUNT_PATH.to_string(),
            ..Default::default()
        });
    }

    container
}

fn system_volumes() -> Vec<PodVolume> {
    vec![
        PodVolume {
            name: SYS_DSHM_VOLUME.to_string(),
            empty_dir: Some(EmptyDirSource {
                medium: "Memory".to_string(),
            }),
            projected: None,
        },
        PodVolume {
            name: SYS_NAMESPACE_CONFIG_VOLUME.to_string(),
            empty_dir: None,
            projected: Some(ProjectedSource {
                sources: vec![
                    ProjectionSource {
                        config_map: Some(NamedSource {
                            name: NAMESPACE_CONFIG_SOURCE.to_string(),
                        }),
                        secret: None,
                    },
                    ProjectionSource {
                        config_map: None,
                        secret: Some(NamedSource {
                            name: NAMESPACE_CONFIG_SOURCE.to_string(),
                        }),
                    },
                ],
            }),
        },
    ]
}

/// Declared claims first, then one synthesized claim for every other
/// mounted volume. Each volume name yields exactly one claim.
fn claim_templates(spec: &WorkspaceSpec) -> Vec<ClaimTemplate> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut claims = Vec::new();

    for declared in &spec.volume_claim_templates {
        let name = claim_name(declared);
        if is_reserved_volume(name) || !seen.insert(name) {
            continue;
        }

        let claim_spec = declared.spec.as_ref();
        let access_modes = claim_spec
            .and_then(|s| s.access_modes.clone())
            .filter(|modes| !modes.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_ACCESS_MODE.to_string()]);
        let storage_class = claim_spec
            .and_then(|s| s.storage_class_name.clone())
            .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string());
        let storage = explicit_storage(declared)
            .map(str::to_string)
            .unwrap_or_else(|| volume_size_request(name));

        claims.push(ClaimTemplate::new(name, access_modes, storage_class, storage));
    }

    for mount in spec.claim_volumes() {
        if seen.insert(mount.name.as_str()) {
            claims.push(ClaimTemplate::new(
                &mount.name,
                vec![DEFAULT_ACCESS_MODE.to_string()],
                DEFAULT_STORAGE_CLASS.to_string(),
                volume_size_request(&mount.name),
            ));
        }
    }

    claims
}
