//! Resource documents for one workspace instance.
//!
//! Each document kind has a typed builder whose output is validated before
//! it is serialized. All four documents are named after the deferred unique
//! id so the orchestrator can correlate them.

pub mod service;
pub mod stateful_set;
pub mod virtual_service;
pub mod workspace;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_yaml_ng as serde_yaml;
use tracing::debug;

use crate::spec::WorkspaceSpec;
use ws_config::SystemConfig;
use ws_core::error::{Result, WsError};

pub use service::ServiceDocument;
pub use stateful_set::StatefulSetDocument;
pub use virtual_service::VirtualServiceDocument;
pub use workspace::WorkspaceDocument;

/// Label key used to select the workspace's pods.
pub const APP_LABEL: &str = "app";

/// A platform service reachable from workspace containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerService {
    pub name: String,
    pub url: String,
}

/// A resource document that validates itself before serialization.
pub trait ManifestDocument: Serialize {
    const KIND: &'static str;

    fn validate(&self) -> Result<()>;

    fn to_manifest(&self) -> Result<String> {
        self.validate()?;
        serde_yaml::to_string(self).map_err(|e| assembly_error(Self::KIND, e))
    }
}

pub(crate) fn assembly_error(kind: &str, err: impl std::fmt::Display) -> WsError {
    WsError::Assembly(format!("{}: {}", kind, err))
}

pub(crate) fn named_metadata(name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        ..Default::default()
    }
}

/// The four serialized documents the DAG compiler wires together.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestSet {
    pub service: String,
    pub virtual_service: String,
    pub stateful_set: String,
    pub workspace: String,
}

/// Builds and serializes all resource documents. Any failure aborts the
/// whole compile.
pub fn assemble(
    spec: &WorkspaceSpec,
    config: &dyn SystemConfig,
    services: &[PeerService],
) -> Result<ManifestSet> {
    let set = ManifestSet {
        service: ServiceDocument::build(spec).to_manifest()?,
        virtual_service: VirtualServiceDocument::build(spec).to_manifest()?,
        stateful_set: StatefulSetDocument::build(spec, config, services).to_manifest()?,
        workspace: WorkspaceDocument::build().to_manifest()?,
    };

    debug!(
        stateful_set_bytes = set.stateful_set.len(),
        "assembled workspace manifests"
    );
    Ok(set)
}
