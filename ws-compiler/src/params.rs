//! Parameter injection.
//!
//! Final argument order is load-bearing: system parameters in a fixed order,
//! then one disk-size parameter per claim-backed volume, then whatever the
//! author declared.

use tracing::debug;

use crate::parameter::{Parameter, ParameterOption, ParameterType};
use crate::references::{
    volume_size_parameter, SYS_HOST, SYS_NAME, SYS_NODE_POOL, SYS_NODE_POOL_LABEL,
    SYS_RESOURCE_ACTION, SYS_UID, SYS_WORKSPACE_ACTION,
};
use crate::spec::WorkspaceSpec;
use ws_config::SystemConfig;
use ws_core::error::{Result, WsError};

/// Default synthesized disk size, in MiB.
pub const DEFAULT_VOLUME_SIZE_MIB: u32 = 20480;

/// Parameters derived from cluster configuration, in their fixed order.
pub fn runtime_parameters(config: &dyn SystemConfig) -> Result<Vec<Parameter>> {
    let domain = config.domain().ok_or_else(|| {
        WsError::InvalidConfiguration("no domain in system config".to_string())
    })?;
    let label = config.node_pool_label().ok_or_else(|| {
        WsError::InvalidConfiguration("no node pool label in system config".to_string())
    })?;

    let options: Vec<ParameterOption> = config
        .node_pool_options()?
        .into_iter()
        .map(|o| ParameterOption {
            name: o.name,
            value: o.value,
        })
        .collect();
    let default_pool = options
        .first()
        .map(|o| o.value.clone())
        .ok_or_else(|| {
            WsError::InvalidConfiguration("no node pool options in config".to_string())
        })?;

    Ok(vec![
        Parameter::hidden(SYS_HOST, domain),
        Parameter::hidden(SYS_NODE_POOL_LABEL, label),
        Parameter {
            name: SYS_NODE_POOL.to_string(),
            value: Some(default_pool),
            param_type: Some(ParameterType::Select),
            display_name: Some("Node pool".to_string()),
            hint: Some("Name of node pool or group".to_string()),
            options,
            required: true,
            ..Default::default()
        },
    ])
}

/// All system parameters: runtime ones followed by the hidden placeholders
/// the orchestrator fills in per execution.
pub fn system_parameters(config: &dyn SystemConfig) -> Result<Vec<Parameter>> {
    let mut parameters = runtime_parameters(config)?;
    parameters.extend([
        Parameter::hidden(SYS_NAME, "name"),
        Parameter::hidden(SYS_RESOURCE_ACTION, "apply"),
        Parameter::hidden(SYS_WORKSPACE_ACTION, "create"),
        Parameter::hidden(SYS_UID, "uid"),
    ]);
    Ok(parameters)
}

/// One disk-size parameter per mounted, claim-backed volume whose claim does
/// not already fix its storage size.
pub fn volume_size_parameters(spec: &WorkspaceSpec) -> Vec<Parameter> {
    spec.claim_volumes()
        .into_iter()
        .filter(|mount| !spec.has_explicit_storage(&mount.name))
        .map(|mount| Parameter {
            name: volume_size_parameter(&mount.name),
            value: Some(DEFAULT_VOLUME_SIZE_MIB.to_string()),
            param_type: Some(ParameterType::Number),
            display_name: Some(format!("Disk size for \"{}\"", mount.name)),
            hint: Some(format!(
                "Disk size in MB for volume mounted at `{}`",
                mount.mount_path
            )),
            required: true,
            ..Default::default()
        })
        .collect()
}

/// Merges system, volume-size and user parameters.
///
/// User parameters that reuse a system name are kept as-is; the consumer
/// decides how to treat the duplicate.
pub fn inject_arguments(spec: &WorkspaceSpec, config: &dyn SystemConfig) -> Result<Vec<Parameter>> {
    let mut parameters = system_parameters(config)?;
    let volume_parameters = volume_size_parameters(spec);
    let system_count = parameters.len();

    parameters.extend(volume_parameters);
    parameters.extend(spec.user_parameters().iter().cloned());

    debug!(
        system = system_count,
        total = parameters.len(),
        "injected workspace parameters"
    );
    Ok(parameters)
}

/// Names of user parameters that collide with injected ones.
pub fn colliding_parameters<'a>(
    injected: &[Parameter],
    user: &'a [Parameter],
) -> Vec<&'a str> {
    user.iter()
        .filter(|u| injected.iter().any(|p| p.name == u.name))
        .map(|u| u.name.as_str())
        .collect()
}
