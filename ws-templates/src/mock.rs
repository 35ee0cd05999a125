//! In-memory collaborators for tests.
//!
//! Each double records what it was asked to do and can be told to fail a
//! specific call.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use uuid::Uuid;

use crate::collaborators::{
    ServiceDirectory, WorkflowTemplateDraft, WorkflowTemplates, WorkspaceInstance,
    WorkspaceInstances,
};
use crate::models::WorkflowTemplateRef;
use ws_compiler::PeerService;
use ws_core::WsError;

#[derive(Debug, Default)]
struct WorkflowTemplateState {
    created: Vec<(WorkflowTemplateRef, WorkflowTemplateDraft)>,
    versions: HashMap<String, Vec<String>>,
    archived: Vec<String>,
    reject_with: Option<String>,
    fail_create: bool,
    fail_archive: bool,
}

/// Workflow template registry that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MockWorkflowTemplates {
    state: Mutex<WorkflowTemplateState>,
}

impl MockWorkflowTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `validate` reject every draft with this message.
    pub fn reject_with(&self, message: impl Into<String>) {
        self.lock().reject_with = Some(message.into());
    }

    pub fn fail_create(&self) {
        self.lock().fail_create = true;
    }

    pub fn fail_archive(&self) {
        self.lock().fail_archive = true;
    }

    pub fn created(&self) -> Vec<WorkflowTemplateRef> {
        self.lock().created.iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn last_draft(&self) -> Option<WorkflowTemplateDraft> {
        self.lock().created.last().map(|(_, d)| d.clone())
    }

    /// Manifests appended through `create_version`, per definition uid.
    pub fn versions(&self, uid: &str) -> Vec<String> {
        self.lock().versions.get(uid).cloned().unwrap_or_default()
    }

    pub fn archived(&self) -> Vec<String> {
        self.lock().archived.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WorkflowTemplateState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl WorkflowTemplates for MockWorkflowTemplates {
    async fn validate(&self, _namespace: &str, _draft: &WorkflowTemplateDraft) -> anyhow::Result<()> {
        match &self.lock().reject_with {
            Some(message) => Err(WsError::Validation(message.clone()).into()),
            None => Ok(()),
        }
    }

    async fn create(
        &self,
        _namespace: &str,
        draft: &WorkflowTemplateDraft,
    ) -> anyhow::Result<WorkflowTemplateRef> {
        let mut state = self.lock();
        if state.fail_create {
            bail!("workflow template registry unavailable");
        }

        let reference = WorkflowTemplateRef {
            id: Uuid::new_v4().to_string(),
            uid: draft.name.clone(),
        };
        state
            .versions
            .insert(reference.uid.clone(), vec![draft.manifest.clone()]);
        state.created.push((reference.clone(), draft.clone()));
        Ok(reference)
    }

    async fn create_version(
        &self,
        _namespace: &str,
        template: &WorkflowTemplateRef,
        draft: &WorkflowTemplateDraft,
    ) -> anyhow::Result<i64> {
        let mut state = self.lock();
        let versions = state
            .versions
            .get_mut(&template.uid)
            .ok_or_else(|| anyhow!("workflow template '{}' not found", template.uid))?;
        versions.push(draft.manifest.clone());
        Ok(versions.len() as i64)
    }

    async fn archive(&self, _namespace: &str, uid: &str) -> anyhow::Result<bool> {
        let mut state = self.lock();
        if state.fail_archive {
            bail!("workflow template registry unavailable");
        }
        if state.archived.iter().any(|archived| archived == uid) {
            return Ok(false);
        }
        state.archived.push(uid.to_string());
        Ok(true)
    }
}

#[derive(Debug, Default)]
struct InstanceState {
    by_template: HashMap<String, Vec<WorkspaceInstance>>,
    archived: Vec<String>,
    fail_archive_for: Option<String>,
}

/// Instance registry keyed by template uid.
#[derive(Debug, Default)]
pub struct MockWorkspaceInstances {
    state: Mutex<InstanceState>,
}

impl MockWorkspaceInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, template_uid: &str, uid: &str, phase: &str) {
        self.lock()
            .by_template
            .entry(template_uid.to_string())
            .or_default()
            .push(WorkspaceInstance {
                uid: uid.to_string(),
                name: uid.to_string(),
                phase: phase.to_string(),
            });
    }

    /// Makes archiving this instance fail.
    pub fn fail_archive_for(&self, uid: &str) {
        self.lock().fail_archive_for = Some(uid.to_string());
    }

    pub fn archived(&self) -> Vec<String> {
        self.lock().archived.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InstanceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl WorkspaceInstances for MockWorkspaceInstances {
    async fn list_by_template(
        &self,
        _namespace: &str,
        template_uid: &str,
    ) -> anyhow::Result<Vec<WorkspaceInstance>> {
        let state = self.lock();
        let archived = &state.archived;
        Ok(state
            .by_template
            .get(template_uid)
            .map(|instances| {
                instances
                    .iter()
                    .filter(|i| !archived.contains(&i.uid))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn archive(&self, _namespace: &str, uid: &str) -> anyhow::Result<()> {
        let mut state = self.lock();
        if state.fail_archive_for.as_deref() == Some(uid) {
            bail!("could not archive workspace '{}'", uid);
        }
        state.archived.push(uid.to_string());
        Ok(())
    }
}

/// Fixed list of platform services.
#[derive(Debug, Default)]
pub struct MockServiceDirectory {
    services: Vec<PeerService>,
}

impl MockServiceDirectory {
    pub fn new(services: Vec<PeerService>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ServiceDirectory for MockServiceDirectory {
    async fn list_services(&self, _namespace: &str) -> anyhow::Result<Vec<PeerService>> {
        Ok(self.services.clone())
    }
}
