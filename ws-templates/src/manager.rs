//! Template lifecycle: compile, register with the orchestrator, persist.
//!
//! Creation is a two-step saga. The compiled definition is registered with
//! the orchestrator first and then persisted locally; if the local write
//! fails, the registered definition is archived as the single compensating
//! step. A crash between the two steps leaves an orphaned orchestrator
//! definition behind, which only an external reconciliation sweep can find.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, instrument, warn};

use crate::collaborators::{
    ServiceDirectory, WorkflowTemplateDraft, WorkflowTemplates, WorkspaceInstances,
    WORKSPACE_TEMPLATE_RESOURCE,
};
use crate::error::{Result, TemplateError};
use crate::models::{
    CreateTemplateRequest, Labels, PaginationRequest, UpdateTemplateRequest, WorkflowTemplateRef,
    WorkspaceTemplate,
};
use crate::repository::{NewTemplate, TemplateRepository};
use crate::uid::{generate_uid, validate_name};
use ws_compiler::scope::to_authoring_scope;
use ws_compiler::{compile, CompiledTemplate};
use ws_config::SystemConfig;
use ws_core::WsError;

const ARCHIVE_FAILED: &str = "Unable to archive workspace template.";
const NOT_FOUND: &str = "Workspace template not found.";

pub struct TemplateManager {
    repository: TemplateRepository,
    config: Arc<dyn SystemConfig>,
    workflow_templates: Arc<dyn WorkflowTemplates>,
    instances: Arc<dyn WorkspaceInstances>,
    services: Arc<dyn ServiceDirectory>,
}

impl TemplateManager {
    pub fn new(
        repository: TemplateRepository,
        config: Arc<dyn SystemConfig>,
        workflow_templates: Arc<dyn WorkflowTemplates>,
        instances: Arc<dyn WorkspaceInstances>,
        services: Arc<dyn ServiceDirectory>,
    ) -> Self {
        Self {
            repository,
            config,
            workflow_templates,
            instances,
            services,
        }
    }

    pub fn repository(&self) -> &TemplateRepository {
        &self.repository
    }

    /// Compiles a spec exactly as create would, without registering or
    /// persisting anything.
    #[instrument(skip(self, manifest))]
    pub async fn generate_workflow_template(
        &self,
        namespace: &str,
        manifest: &str,
    ) -> Result<CompiledTemplate> {
        let services = self
            .services
            .list_services(namespace)
            .await
            .context("Listing platform services")
            .map_err(WsError::Other)?;

        Ok(compile(manifest, self.config.as_ref(), &services)?)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        namespace: &str,
        request: CreateTemplateRequest,
    ) -> Result<WorkspaceTemplate> {
        validate_name(&request.name)?;
        let uid = generate_uid(&request.name)?;

        if let Some(existing) = self
            .repository
            .find_by_name(namespace, &request.name, &uid)
            .await?
        {
            let message = if existing.is_archived {
                format!(
                    "An archived workspace template with the name '{}' already exists",
                    request.name
                )
            } else {
                format!(
                    "Workspace template with the name '{}' already exists",
                    request.name
                )
            };
            return Err(WsError::AlreadyExists(message).into());
        }

        let compiled = self
            .generate_workflow_template(namespace, &request.manifest)
            .await?;
        let draft = workflow_template_draft(&uid, &uid, compiled, &request.labels);

        self.workflow_templates
            .validate(namespace, &draft)
            .await
            .map_err(rejected)?;

        let registered = self
            .workflow_templates
            .create(namespace, &draft)
            .await
            .map_err(|err| {
                error!(namespace, uid = %uid, error = %err, "could not create workflow template for workspace");
                WsError::Other(err.context("Workflow template"))
            })?;

        let inserted = self
            .repository
            .insert(NewTemplate {
                uid: &uid,
                name: &request.name,
                namespace,
                description: &request.description,
                manifest: &request.manifest,
                labels: &request.labels,
                workflow_template: &registered,
            })
            .await;

        match inserted {
            Ok(template) => Ok(template),
            Err(err) => Err(self.compensate(namespace, &registered, err).await),
        }
    }

    /// Archives the registered definition after a failed local write. The
    /// original error is always returned; a cleanup failure is appended.
    async fn compensate(
        &self,
        namespace: &str,
        registered: &WorkflowTemplateRef,
        err: TemplateError,
    ) -> TemplateError {
        warn!(
            namespace,
            workflow_template_uid = %registered.uid,
            error = %err,
            "persisting workspace template failed, archiving workflow template"
        );

        let compensation = match self.workflow_templates.archive(namespace, &registered.uid).await {
            Ok(_) => None,
            Err(cleanup) => {
                error!(
                    namespace,
                    workflow_template_uid = %registered.uid,
                    error = %cleanup,
                    "could not archive orphaned workflow template"
                );
                Some(cleanup.to_string())
            }
        };

        TemplateError::Compensated {
            source: Box::new(err),
            compensation,
        }
    }

    /// Recompiles the spec and appends a new version. The orchestrator-side
    /// version is not rolled back if the local write fails.
    #[instrument(skip(self, request), fields(version = request.version))]
    pub async fn update(
        &self,
        namespace: &str,
        uid: &str,
        request: UpdateTemplateRequest,
    ) -> Result<WorkspaceTemplate> {
        let existing = self
            .repository
            .get(namespace, uid, request.version)
            .await?
            .ok_or_else(|| TemplateError::not_found(NOT_FOUND))?;

        let compiled = self
            .generate_workflow_template(namespace, &request.manifest)
            .await?;
        let draft =
            workflow_template_draft(&existing.uid, &existing.uid, compiled, &request.labels);

        self.workflow_templates
            .validate(namespace, &draft)
            .await
            .map_err(rejected)?;

        let version = self
            .workflow_templates
            .create_version(namespace, &existing.workflow_template, &draft)
            .await
            .map_err(rejected_or_failed)?;
        info!(workflow_template_version = version, "workflow template version created");

        self.repository
            .append_version(&existing, &request.manifest, &request.description, &request.labels)
            .await
    }

    /// A template at `version`, or its latest version when `version` is 0.
    pub async fn get(&self, namespace: &str, uid: &str, version: i64) -> Result<WorkspaceTemplate> {
        self.repository
            .get(namespace, uid, version)
            .await?
            .ok_or_else(|| TemplateError::not_found(NOT_FOUND))
    }

    pub async fn list(
        &self,
        namespace: &str,
        page: PaginationRequest,
    ) -> Result<Vec<WorkspaceTemplate>> {
        self.repository.list(namespace, page).await
    }

    pub async fn list_versions(&self, namespace: &str, uid: &str) -> Result<Vec<WorkspaceTemplate>> {
        self.repository.list_versions(namespace, uid).await
    }

    pub async fn count(&self, namespace: &str) -> Result<i64> {
        self.repository.count(namespace).await
    }

    /// Whether any instance created from the template is not terminated.
    #[instrument(skip(self))]
    pub async fn has_running_instances(&self, namespace: &str, uid: &str) -> Result<bool> {
        let instances = self
            .instances
            .list_by_template(namespace, uid)
            .await
            .map_err(WsError::Other)?;

        Ok(instances.iter().any(|instance| !instance.is_terminated()))
    }

    /// Archives every instance, then the template row, then the registered
    /// definition. Any failure aborts with `Unknown`; nothing is retried.
    ///
    /// Returns `false` when the template was already archived.
    #[instrument(skip(self))]
    pub async fn archive(&self, namespace: &str, uid: &str) -> Result<bool> {
        let template = self
            .repository
            .get_including_archived(namespace, uid)
            .await
            .map_err(|err| archive_failed(namespace, uid, "get workspace template", err))?
            .ok_or_else(|| TemplateError::not_found(NOT_FOUND))?;

        if template.is_archived {
            info!("workspace template already archived");
            return Ok(false);
        }

        let instances = self
            .instances
            .list_by_template(namespace, uid)
            .await
            .map_err(|err| archive_failed(namespace, uid, "list workspaces", err))?;

        for instance in &instances {
            self.instances
                .archive(namespace, &instance.uid)
                .await
                .map_err(|err| archive_failed(namespace, uid, "archive workspace", err))?;
        }

        let archived = self
            .repository
            .archive(namespace, uid)
            .await
            .map_err(|err| archive_failed(namespace, uid, "archive workspace template", err))?;

        self.workflow_templates
            .archive(namespace, &template.workflow_template.uid)
            .await
            .map_err(|err| archive_failed(namespace, uid, "archive workflow template", err))?;

        info!(instances = instances.len(), "workspace template archived");
        Ok(archived)
    }
}

fn workflow_template_draft(
    name: &str,
    resource_uid: &str,
    compiled: CompiledTemplate,
    labels: &Labels,
) -> WorkflowTemplateDraft {
    WorkflowTemplateDraft {
        name: name.to_string(),
        manifest: compiled.manifest,
        labels: labels.clone(),
        is_system: true,
        resource: WORKSPACE_TEMPLATE_RESOURCE.to_string(),
        resource_uid: resource_uid.to_string(),
    }
}

fn validation_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<WsError>() {
        Some(WsError::Validation(message)) => message.clone(),
        _ => err.to_string(),
    }
}

/// The orchestrator rejected the definition. Its message speaks the
/// execution vocabulary; authors wrote the authoring one.
fn rejected(err: anyhow::Error) -> TemplateError {
    WsError::Validation(to_authoring_scope(&validation_message(&err))).into()
}

fn rejected_or_failed(err: anyhow::Error) -> TemplateError {
    match err.downcast_ref::<WsError>() {
        Some(WsError::Validation(_)) => rejected(err),
        _ => WsError::Other(err).into(),
    }
}

fn archive_failed(
    namespace: &str,
    uid: &str,
    step: &str,
    err: impl std::fmt::Display,
) -> TemplateError {
    error!(namespace, uid, step, error = %err, "archiving workspace template failed");
    TemplateError::unknown(ARCHIVE_FAILED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_uses_authoring_scope() {
        let err = anyhow::Error::new(WsError::Validation(
            "invalid reference {{workflow.parameters.missing}}".to_string(),
        ));
        match rejected(err) {
            TemplateError::Workspace(WsError::Validation(message)) => {
                assert_eq!(message, "invalid reference {{workspace.parameters.missing}}")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_validation_version_failure_is_not_rewritten() {
        let err = anyhow::anyhow!("connection reset");
        assert!(matches!(
            rejected_or_failed(err),
            TemplateError::Workspace(WsError::Other(_))
        ));
    }
}
