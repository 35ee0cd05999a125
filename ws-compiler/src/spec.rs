//! Workspace spec model and strict parser.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use k8s_openapi::api::core::v1::{Container, PersistentVolumeClaim, ServicePort, VolumeMount};
use serde::{Deserialize, Serialize};
use serde_yaml_ng as serde_yaml;
use tracing::debug;

use crate::parameter::Parameter;
use crate::references::is_reserved_volume;
use crate::workflow::{Arguments, Template};
use ws_core::error::{Result, WsError};

/// User-declared shape of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkspaceSpec {
    #[serde(default)]
    pub containers: Vec<Container>,

    #[serde(default)]
    pub ports: Vec<ServicePort>,

    #[serde(default)]
    pub routes: Vec<HttpRoute>,

    #[serde(default)]
    pub volume_claim_templates: Vec<PersistentVolumeClaim>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_execution_workflow: Option<PostExecutionWorkflow>,
}

/// Follow-up task graph spliced in after the lifecycle tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostExecutionWorkflow {
    pub entrypoint: String,
    #[serde(default)]
    pub templates: Vec<Template>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, rename = "match", skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<HttpMatchRequest>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<HttpRouteDestination>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<HttpRewrite>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<HttpRetry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpMatchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<StringMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<StringMatch>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, StringMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_uri_case: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpRouteDestination {
    pub destination: Destination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Destination {
    /// Always replaced by the workspace's deferred unique id.
    #[serde(default)]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<PortSelector>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortSelector {
    pub number: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpRewrite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpRetry {
    pub attempts: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_try_timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_on: Option<String>,
}

/// Decodes raw spec text. Unknown fields are rejected at any depth,
/// including inside the Kubernetes types, which would otherwise drop them.
pub fn parse_workspace_spec(manifest: &str) -> Result<WorkspaceSpec> {
    if manifest.trim().is_empty() {
        return Err(WsError::Validation(
            "Workspace template manifest is required".to_string(),
        ));
    }

    let mut ignored = Vec::new();
    let spec: WorkspaceSpec = serde_ignored::deserialize(
        serde_yaml::Deserializer::from_str(manifest),
        |path| ignored.push(path.to_string()),
    )
    .map_err(|e| WsError::Validation(e.to_string()))?;
    if let Some(path) = ignored.first() {
        return Err(WsError::Validation(format!("unknown field `{}`", path)));
    }
    spec.validate()?;

    debug!(
        containers = spec.containers.len(),
        ports = spec.ports.len(),
        routes = spec.routes.len(),
        "parsed workspace spec"
    );
    Ok(spec)
}

impl WorkspaceSpec {
    /// Structural checks serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.containers.is_empty() {
            return Err(WsError::Validation(
                "at least one container is required".to_string(),
            ));
        }

        let mounted: HashSet<&str> = self
            .mounted_volumes()
            .into_iter()
            .map(|m| m.name.as_str())
            .collect();
        for claim in &self.volume_claim_templates {
            let name = claim_name(claim);
            if name.is_empty() {
                return Err(WsError::Validation(
                    "volumeClaimTemplates entries must have metadata.name".to_string(),
                ));
            }
            if is_reserved_volume(name) {
                return Err(WsError::Validation(format!(
                    "volume name '{}' is reserved",
                    name
                )));
            }
            // Unmounted claims are still provisioned, but nothing would
            // supply their size.
            if !mounted.contains(name) && explicit_storage(claim).is_none() {
                return Err(WsError::Validation(format!(
                    "volumeClaimTemplate '{}' is not mounted by any container and requests no storage",
                    name
                )));
            }
        }

        if let Some(workflow) = &self.post_execution_workflow {
            if !workflow.templates.iter().any(|t| t.name == workflow.entrypoint) {
                return Err(WsError::Validation(format!(
                    "postExecutionWorkflow entrypoint '{}' has no matching template",
                    workflow.entrypoint
                )));
            }
        }

        Ok(())
    }

    /// Distinct volume mounts across all containers, in declaration order.
    /// The first container to mount a name wins.
    pub fn mounted_volumes(&self) -> Vec<&VolumeMount> {
        let mut mounts: IndexMap<&str, &VolumeMount> = IndexMap::new();
        for mount in self
            .containers
            .iter()
            .flat_map(|c| c.volume_mounts.iter().flatten())
        {
            mounts.entry(mount.name.as_str()).or_insert(mount);
        }
        mounts.into_values().collect()
    }

    /// Mounted volumes that are backed by a persistent claim.
    pub fn claim_volumes(&self) -> Vec<&VolumeMount> {
        self.mounted_volumes()
            .into_iter()
            .filter(|m| !is_reserved_volume(&m.name))
            .collect()
    }

    pub fn claim_template(&self, name: &str) -> Option<&PersistentVolumeClaim> {
        self.volume_claim_templates
            .iter()
            .find(|c| claim_name(c) == name)
    }

    /// Whether a declared claim template already fixes the storage size.
    pub fn has_explicit_storage(&self, name: &str) -> bool {
        self.claim_template(name)
            .and_then(explicit_storage)
            .is_some()
    }

    pub fn user_parameters(&self) -> &[Parameter] {
        self.arguments
            .as_ref()
            .map(|a| a.parameters.as_slice())
            .unwrap_or_default()
    }
}

pub(crate) fn claim_name(claim: &PersistentVolumeClaim) -> &str {
    claim.metadata.name.as_deref().unwrap_or_default()
}

/// The `storage` request of a claim, if the author set one.
pub(crate) fn explicit_storage(claim: &PersistentVolumeClaim) -> Option<&str> {
    claim
        .spec
        .as_ref()?
        .resources
        .as_ref()?
        .requests
        .as_ref()?
        .get("storage")
        .map(|q| q.0.as_str())
}
