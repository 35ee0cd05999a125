//! Workspace template compiler.
//!
//! Turns a declarative workspace spec into a workflow definition whose tasks
//! create, update, pause or delete a running workspace. The pipeline is
//! strictly staged:
//!
//! 1. [`spec`] decodes the raw manifest,
//! 2. [`params`] computes the system and volume-size parameters,
//! 3. [`manifest`] assembles the four resource documents,
//! 4. [`dag`] wires them into a guarded task graph,
//! 5. [`scope`] rewrites authoring references into execution references.
//!
//! [`pipeline::compile`] runs all of them.

pub mod dag;
pub mod manifest;
pub mod parameter;
pub mod params;
pub mod pipeline;
pub mod references;
pub mod scope;
pub mod spec;
pub mod workflow;

pub use dag::{ActionGuard, WorkspaceAction, WorkspacePhase};
pub use manifest::{ManifestSet, PeerService};
pub use parameter::{Parameter, ParameterOption, ParameterType};
pub use pipeline::{compile, CompiledTemplate};
pub use spec::{parse_workspace_spec, WorkspaceSpec};
pub use workflow::CompiledWorkflowDefinition;
