//! Deferred references and the reserved names the compiler emits.
//!
//! Everything here is resolved by the orchestrator at execution time.

pub const SYS_HOST: &str = "sys-host";
pub const SYS_NODE_POOL_LABEL: &str = "sys-node-pool-label";
pub const SYS_NODE_POOL: &str = "sys-node-pool";
pub const SYS_NAME: &str = "sys-name";
pub const SYS_RESOURCE_ACTION: &str = "sys-resource-action";
pub const SYS_WORKSPACE_ACTION: &str = "sys-workspace-action";
pub const SYS_UID: &str = "sys-uid";

/// Input of the claim-deletion template.
pub const SYS_PVC_NAME: &str = "sys-pvc-name";
/// Input of the status callback template.
pub const SYS_WORKSPACE_PHASE: &str = "sys-workspace-phase";
/// Output of the workload apply step, input of the readiness wait.
pub const UPDATE_REVISION: &str = "update-revision";

/// Memory-backed shared memory volume mounted into every container.
pub const SYS_DSHM_VOLUME: &str = "sys-dshm";
/// Projected config/secret volume available to every pod.
pub const SYS_NAMESPACE_CONFIG_VOLUME: &str = "sys-namespace-config";
/// Volume names that never get a persistent claim.
pub const RESERVED_VOLUMES: [&str; 2] = [SYS_DSHM_VOLUME, SYS_NAMESPACE_CONFIG_VOLUME];

pub const NAMESPACE: &str = "{{workflow.namespace}}";

/// `{{workflow.parameters.<name>}}`
pub fn workflow_parameter(name: &str) -> String {
    format!("{{{{workflow.parameters.{}}}}}", name)
}

/// `{{inputs.parameters.<name>}}`
pub fn input_parameter(name: &str) -> String {
    format!("{{{{inputs.parameters.{}}}}}", name)
}

/// `{{tasks.<task>.outputs.parameters.<name>}}`
pub fn task_output(task: &str, name: &str) -> String {
    format!("{{{{tasks.{}.outputs.parameters.{}}}}}", task, name)
}

/// Name of the synthesized disk size parameter for a volume.
pub fn volume_size_parameter(volume: &str) -> String {
    format!("sys-{}-volume-size", volume)
}

/// Deferred storage request for a volume, in MiB.
pub fn volume_size_request(volume: &str) -> String {
    format!("{}Mi", workflow_parameter(&volume_size_parameter(volume)))
}

pub fn is_reserved_volume(name: &str) -> bool {
    RESERVED_VOLUMES.contains(&name)
}

/// The deferred unique id every generated resource is named after.
pub fn uid() -> String {
    workflow_parameter(SYS_UID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_syntax() {
        assert_eq!(uid(), "{{workflow.parameters.sys-uid}}");
        assert_eq!(input_parameter("a"), "{{inputs.parameters.a}}");
        assert_eq!(
            task_output("create-stateful-set", UPDATE_REVISION),
            "{{tasks.create-stateful-set.outputs.parameters.update-revision}}"
        );
    }

    #[test]
    fn test_volume_size_names() {
        assert_eq!(volume_size_parameter("data"), "sys-data-volume-size");
        assert_eq!(
            volume_size_request("data"),
            "{{workflow.parameters.sys-data-volume-size}}Mi"
        );
    }

    #[test]
    fn test_reserved() {
        assert!(is_reserved_volume("sys-dshm"));
        assert!(is_reserved_volume("sys-namespace-config"));
        assert!(!is_reserved_volume("data"));
    }
}
