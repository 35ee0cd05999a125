//! Typed workflow definition documents.
//!
//! These mirror the orchestrator's workflow-template schema closely enough
//! to round-trip what the compiler emits and what authors put in a
//! post-provision workflow. Fields the compiler never reads (`steps`,
//! `retryStrategy`, `withItems`, artifacts, ...) are carried in `extra`
//! untouched.

use k8s_openapi::api::core::v1::{Container, EnvVar};
use serde::{Deserialize, Serialize};
use serde_yaml_ng as serde_yaml;
use serde_yaml_ng::Mapping;

use crate::parameter::Parameter;
use crate::scope;
use ws_core::error::{Result, WsError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Arguments {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Arguments {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inputs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl Inputs {
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Self {
            parameters,
            extra: Mapping::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl Outputs {
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Self {
            parameters,
            extra: Mapping::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.extra.is_empty()
    }
}

/// Applies, gets or deletes a Kubernetes object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub action: String,
    pub manifest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_condition: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptTemplate {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagTask {
    pub name: String,
    pub template: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Arguments::is_empty")]
    pub arguments: Arguments,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
    pub tasks: Vec<DagTask>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl DagTemplate {
    pub fn task(&self, name: &str) -> Option<&DagTask> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// One named template. The compiler emits `dag`, `resource` and
/// `container` templates; hook templates may use any other kind through
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    #[serde(default, skip_serializing_if = "Inputs::is_empty")]
    pub inputs: Inputs,
    #[serde(default, skip_serializing_if = "Outputs::is_empty")]
    pub outputs: Outputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dag: Option<DagTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptTemplate>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl Template {
    pub fn resource(name: impl Into<String>, resource: ResourceTemplate) -> Self {
        Self {
            name: name.into(),
            resource: Some(resource),
            ..Default::default()
        }
    }
}

/// Output of the DAG compiler: what gets registered with the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompiledWorkflowDefinition {
    pub entrypoint: String,
    pub arguments: Arguments,
    pub templates: Vec<Template>,
}

impl CompiledWorkflowDefinition {
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// The DAG of the entrypoint template.
    pub fn dag(&self) -> Option<&DagTemplate> {
        self.template(&self.entrypoint)?.dag.as_ref()
    }

    pub fn task(&self, name: &str) -> Option<&DagTask> {
        self.dag()?.task(name)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.arguments.parameters
    }

    /// Serializes the definition and rewrites authoring references into
    /// execution references. This is the document sent to the orchestrator.
    pub fn to_manifest(&self) -> Result<String> {
        let serialized =
            serde_yaml::to_string(self).map_err(|e| WsError::Assembly(e.to_string()))?;
        Ok(scope::to_execution_scope(&serialized))
    }

    pub fn from_manifest(manifest: &str) -> Result<Self> {
        serde_yaml::from_str(manifest).map_err(|e| WsError::Validation(e.to_string()))
    }
}
