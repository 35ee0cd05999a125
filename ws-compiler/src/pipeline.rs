//! End-to-end compile: spec text in, orchestrator-ready definition out.

use tracing::{debug, instrument};

use crate::dag::compile_dag;
use crate::manifest::{assemble, PeerService};
use crate::params::{colliding_parameters, inject_arguments};
use crate::spec::parse_workspace_spec;
use crate::workflow::CompiledWorkflowDefinition;
use ws_config::SystemConfig;
use ws_core::error::Result;

/// A compiled definition together with its serialized, execution-scoped
/// form. `definition` is parsed back from `manifest` so both agree.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub definition: CompiledWorkflowDefinition,
    pub manifest: String,
}

/// Runs every compiler stage. Each stage is pure; the first failure aborts.
#[instrument(skip_all, fields(services = services.len()))]
pub fn compile(
    manifest: &str,
    config: &dyn SystemConfig,
    services: &[PeerService],
) -> Result<CompiledTemplate> {
    let spec = parse_workspace_spec(manifest)?;

    let arguments = inject_arguments(&spec, config)?;
    let user = spec.user_parameters();
    let collisions = colliding_parameters(&arguments[..arguments.len() - user.len()], user);
    if !collisions.is_empty() {
        debug!(?collisions, "user parameters shadow system parameters");
    }

    let manifests = assemble(&spec, config, services)?;
    let definition = compile_dag(&spec, arguments, &manifests, config)?;

    let manifest = definition.to_manifest()?;
    let definition = CompiledWorkflowDefinition::from_manifest(&manifest)?;

    debug!(bytes = manifest.len(), "compiled workspace template");
    Ok(CompiledTemplate {
        definition,
        manifest,
    })
}
