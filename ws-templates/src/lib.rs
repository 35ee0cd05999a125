//! Workspace template version store
//!
//! Persists compiled workspace templates with monotonic versioning and a
//! single latest version per template. [`TemplateManager`] drives the
//! create / update / archive flows across the compiler, the orchestrator
//! collaborators and the database.

pub mod collaborators;
pub mod config;
pub mod db;
pub mod error;
pub mod manager;
pub mod models;
pub mod repository;
pub mod uid;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use collaborators::{
    ServiceDirectory, WorkflowTemplateDraft, WorkflowTemplates, WorkspaceInstance,
    WorkspaceInstances,
};
pub use config::StoreConfig;
pub use error::{Result, TemplateError};
pub use manager::TemplateManager;
pub use models::{
    CreateTemplateRequest, Labels, PaginationRequest, UpdateTemplateRequest, WorkflowTemplateRef,
    WorkspaceTemplate,
};
pub use repository::TemplateRepository;
