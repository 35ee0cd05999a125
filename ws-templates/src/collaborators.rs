//! Interfaces to the systems the store coordinates with but does not own.
//!
//! Collaborators report failures as `anyhow::Error`. A collaborator that
//! rejects a definition on structural grounds should return a
//! [`ws_core::WsError::Validation`] so the manager can surface it verbatim.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{Labels, WorkflowTemplateRef};
use ws_compiler::PeerService;

/// Resource kind recorded on definitions owned by a workspace template.
pub const WORKSPACE_TEMPLATE_RESOURCE: &str = "WorkspaceTemplate";

/// A compiled definition ready to hand to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplateDraft {
    pub name: String,
    pub manifest: String,
    pub labels: Labels,
    /// Definitions generated for workspaces are system-owned.
    pub is_system: bool,
    pub resource: String,
    pub resource_uid: String,
}

/// Orchestrator-side workflow template registry.
#[async_trait]
pub trait WorkflowTemplates: Send + Sync {
    /// Structural validation only; nothing is registered.
    async fn validate(&self, namespace: &str, draft: &WorkflowTemplateDraft) -> anyhow::Result<()>;

    async fn create(
        &self,
        namespace: &str,
        draft: &WorkflowTemplateDraft,
    ) -> anyhow::Result<WorkflowTemplateRef>;

    /// Appends a version to an existing definition and returns its number.
    async fn create_version(
        &self,
        namespace: &str,
        template: &WorkflowTemplateRef,
        draft: &WorkflowTemplateDraft,
    ) -> anyhow::Result<i64>;

    /// Returns whether an archival state transition happened.
    async fn archive(&self, namespace: &str, uid: &str) -> anyhow::Result<bool>;
}

/// A running or stopped workspace created from a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInstance {
    pub uid: String,
    pub name: String,
    pub phase: String,
}

impl WorkspaceInstance {
    pub const TERMINATED: &'static str = "Terminated";

    pub fn is_terminated(&self) -> bool {
        self.phase == Self::TERMINATED
    }
}

/// Instance lifecycle management.
#[async_trait]
pub trait WorkspaceInstances: Send + Sync {
    /// Live instances created from any version of the template.
    async fn list_by_template(
        &self,
        namespace: &str,
        template_uid: &str,
    ) -> anyhow::Result<Vec<WorkspaceInstance>>;

    async fn archive(&self, namespace: &str, uid: &str) -> anyhow::Result<()>;
}

/// Lookup of platform services exposed to workspace containers.
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn list_services(&self, namespace: &str) -> anyhow::Result<Vec<PeerService>>;
}
