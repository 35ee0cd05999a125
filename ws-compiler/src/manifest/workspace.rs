use serde::Serialize;

use super::{assembly_error, ManifestDocument};
use crate::references::uid;
use ws_core::error::Result;

const API_VERSION: &str = "onepanel.io/v1alpha1";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceMetadata {
    pub name: String,
}

/// Record resource tracking the instance inside the cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDocument {
    pub api_version: String,
    pub kind: String,
    pub metadata: WorkspaceMetadata,
}

impl WorkspaceDocument {
    pub fn build() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata: WorkspaceMetadata { name: uid() },
        }
    }
}

impl ManifestDocument for WorkspaceDocument {
    const KIND: &'static str = "Workspace";

    fn validate(&self) -> Result<()> {
        if self.metadata.name.is_empty() {
            return Err(assembly_error(Self::KIND, "metadata.name is required"));
        }
        Ok(())
    }
}
