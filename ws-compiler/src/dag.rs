//! Lifecycle task graph.
//!
//! The graph encodes create, update, pause and delete as data: every task
//! carries dependency edges and a guard over the deferred workspace action,
//! so a single definition drives all four lifecycle transitions.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::core::v1::Container;
use tracing::debug;

use crate::manifest::ManifestSet;
use crate::parameter::{Parameter, ValueFrom};
use crate::references::{
    input_parameter, task_output, uid, workflow_parameter, NAMESPACE, SYS_PVC_NAME,
    SYS_RESOURCE_ACTION, SYS_WORKSPACE_ACTION, SYS_WORKSPACE_PHASE, UPDATE_REVISION,
};
use crate::spec::WorkspaceSpec;
use crate::workflow::{
    Arguments, CompiledWorkflowDefinition, DagTask, DagTemplate, Inputs, Outputs,
    ResourceTemplate, Template,
};
use ws_config::SystemConfig;
use ws_core::error::{Result, WsError};

pub const ENTRYPOINT: &str = "workspace";

// Task names.
pub const SERVICE_TASK: &str = "service";
pub const VIRTUAL_SERVICE_TASK: &str = "virtual-service";
pub const CREATE_STATEFUL_SET_TASK: &str = "create-stateful-set";
pub const GET_STATEFUL_SET_TASK: &str = "get-stateful-set";
pub const CREATE_WORKSPACE_TASK: &str = "create-workspace";
pub const DELETE_STATEFUL_SET_TASK: &str = "delete-stateful-set";
pub const DELETE_WORKSPACE_TASK: &str = "delete-workspace";
pub const SET_PHASE_RUNNING_TASK: &str = "sys-set-phase-running";
pub const SET_PHASE_PAUSED_TASK: &str = "sys-set-phase-paused";
pub const SET_PHASE_TERMINATED_TASK: &str = "sys-set-phase-terminated";

// Template names.
const SERVICE_RESOURCE: &str = "service-resource";
const VIRTUAL_SERVICE_RESOURCE: &str = "virtual-service-resource";
const STATEFUL_SET_RESOURCE: &str = "stateful-set-resource";
const GET_STATEFUL_SET_RESOURCE: &str = "get-stateful-set-resource";
const DELETE_STATEFUL_SET_RESOURCE: &str = "delete-stateful-set-resource";
const WORKSPACE_RESOURCE: &str = "workspace-resource";
const DELETE_WORKSPACE_RESOURCE: &str = "delete-workspace-resource";
const DELETE_PVC_RESOURCE: &str = "delete-pvc-resource";
const UPDATE_STATUS: &str = "sys-update-status";

const STATUS_IMAGE: &str = "curlimages/curl";
const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Name of the claim-deletion task for one volume.
pub fn delete_pvc_task(volume: &str) -> String {
    format!("delete-pvc-{}", volume)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceAction {
    Create,
    Update,
    Pause,
    Delete,
}

impl WorkspaceAction {
    pub const ALL: [WorkspaceAction; 4] = [
        WorkspaceAction::Create,
        WorkspaceAction::Update,
        WorkspaceAction::Pause,
        WorkspaceAction::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceAction::Create => "create",
            WorkspaceAction::Update => "update",
            WorkspaceAction::Pause => "pause",
            WorkspaceAction::Delete => "delete",
        }
    }
}

impl fmt::Display for WorkspaceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspaceAction {
    type Err = WsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| WsError::Validation(format!("unknown workspace action '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspacePhase {
    Running,
    Paused,
    Terminated,
}

impl WorkspacePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspacePhase::Running => "Running",
            WorkspacePhase::Paused => "Paused",
            WorkspacePhase::Terminated => "Terminated",
        }
    }
}

/// Condition under which a task executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionGuard {
    Any,
    Only(Vec<WorkspaceAction>),
}

impl ActionGuard {
    pub fn only(actions: &[WorkspaceAction]) -> Self {
        ActionGuard::Only(actions.to_vec())
    }

    /// The `when` expression, or `None` for an unconditional task.
    pub fn expression(&self) -> Option<String> {
        match self {
            ActionGuard::Any => None,
            ActionGuard::Only(actions) => {
                let action = workflow_parameter(SYS_WORKSPACE_ACTION);
                let clauses: Vec<String> = actions
                    .iter()
                    .map(|a| format!("{} == {}", action, a))
                    .collect();
                Some(clauses.join(" || "))
            }
        }
    }

    /// Reads back an expression produced by [`ActionGuard::expression`].
    pub fn parse(when: Option<&str>) -> Result<Self> {
        let Some(when) = when else {
            return Ok(ActionGuard::Any);
        };

        let prefix = format!("{} ==", workflow_parameter(SYS_WORKSPACE_ACTION));
        let actions = when
            .split("||")
            .map(|clause| {
                clause
                    .trim()
                    .strip_prefix(&prefix)
                    .ok_or_else(|| {
                        WsError::Validation(format!("unsupported guard clause '{}'", clause.trim()))
                    })
                    .and_then(|action| action.trim().parse())
            })
            .collect::<Result<Vec<WorkspaceAction>>>()?;

        Ok(ActionGuard::Only(actions))
    }

    pub fn allows(&self, action: WorkspaceAction) -> bool {
        match self {
            ActionGuard::Any => true,
            ActionGuard::Only(actions) => actions.contains(&action),
        }
    }
}

const CREATE_OR_UPDATE: [WorkspaceAction; 2] = [WorkspaceAction::Create, WorkspaceAction::Update];
const PAUSE_OR_DELETE: [WorkspaceAction; 2] = [WorkspaceAction::Pause, WorkspaceAction::Delete];

fn task(name: &str, template: &str, dependencies: &[&str], guard: ActionGuard) -> DagTask {
    DagTask {
        name: name.to_string(),
        template: template.to_string(),
        dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        arguments: Arguments::default(),
        when: guard.expression(),
        ..Default::default()
    }
}

fn with_argument(mut task: DagTask, name: &str, value: String) -> DagTask {
    task.arguments.parameters.push(Parameter::with_value(name, value));
    task
}

fn set_phase_task(name: &str, dependencies: &[&str], phase: WorkspacePhase, guard: ActionGuard) -> DagTask {
    with_argument(
        task(name, UPDATE_STATUS, dependencies, guard),
        SYS_WORKSPACE_PHASE,
        phase.as_str().to_string(),
    )
}

fn lifecycle_tasks(spec: &WorkspaceSpec) -> Vec<DagTask> {
    let volumes: Vec<String> = spec
        .claim_volumes()
        .into_iter()
        .map(|m| m.name.clone())
        .collect();
    let delete_pvc_tasks: Vec<String> = volumes.iter().map(|v| delete_pvc_task(v)).collect();

    let mut tasks = vec![
        task(SERVICE_TASK, SERVICE_RESOURCE, &[], ActionGuard::Any),
        task(VIRTUAL_SERVICE_TASK, VIRTUAL_SERVICE_RESOURCE, &[SERVICE_TASK], ActionGuard::Any),
        task(
            CREATE_STATEFUL_SET_TASK,
            STATEFUL_SET_RESOURCE,
            &[VIRTUAL_SERVICE_TASK],
            ActionGuard::only(&CREATE_OR_UPDATE),
        ),
        with_argument(
            task(
                GET_STATEFUL_SET_TASK,
                GET_STATEFUL_SET_RESOURCE,
                &[CREATE_STATEFUL_SET_TASK],
                ActionGuard::only(&CREATE_OR_UPDATE),
            ),
            UPDATE_REVISION,
            task_output(CREATE_STATEFUL_SET_TASK, UPDATE_REVISION),
        ),
        task(
            CREATE_WORKSPACE_TASK,
            WORKSPACE_RESOURCE,
            &[GET_STATEFUL_SET_TASK],
            ActionGuard::only(&CREATE_OR_UPDATE),
        ),
        task(
            DELETE_STATEFUL_SET_TASK,
            DELETE_STATEFUL_SET_RESOURCE,
            &[VIRTUAL_SERVICE_TASK],
            ActionGuard::only(&PAUSE_OR_DELETE),
        ),
        task(
            DELETE_WORKSPACE_TASK,
            DELETE_WORKSPACE_RESOURCE,
            &[DELETE_STATEFUL_SET_TASK],
            ActionGuard::only(&PAUSE_OR_DELETE),
        ),
    ];

    for (volume, name) in volumes.iter().zip(&delete_pvc_tasks) {
        tasks.push(with_argument(
            task(
                name,
                DELETE_PVC_RESOURCE,
                &[DELETE_WORKSPACE_TASK],
                ActionGuard::only(&[WorkspaceAction::Delete]),
            ),
            SYS_PVC_NAME,
            volume.clone(),
        ));
    }

    let terminated_dependencies: Vec<&str> = if delete_pvc_tasks.is_empty() {
        vec![DELETE_WORKSPACE_TASK]
    } else {
        delete_pvc_tasks.iter().map(String::as_str).collect()
    };

    tasks.push(set_phase_task(
        SET_PHASE_RUNNING_TASK,
        &[CREATE_WORKSPACE_TASK],
        WorkspacePhase::Running,
        ActionGuard::only(&CREATE_OR_UPDATE),
    ));
    tasks.push(set_phase_task(
        SET_PHASE_PAUSED_TASK,
        &[DELETE_WORKSPACE_TASK],
        WorkspacePhase::Paused,
        ActionGuard::only(&[WorkspaceAction::Pause]),
    ));
    tasks.push(set_phase_task(
        SET_PHASE_TERMINATED_TASK,
        &terminated_dependencies,
        WorkspacePhase::Terminated,
        ActionGuard::only(&[WorkspaceAction::Delete]),
    ));

    tasks
}

fn resource(action: String, manifest: &str, success_condition: Option<String>) -> ResourceTemplate {
    ResourceTemplate {
        action,
        manifest: manifest.to_string(),
        success_condition,
        ..Default::default()
    }
}

fn deferred_action() -> String {
    workflow_parameter(SYS_RESOURCE_ACTION)
}

fn object_reference(api_version: &str, kind: &str, name: &str) -> String {
    format!(
        "apiVersion: {}\nkind: {}\nmetadata:\n  name: {}\n",
        api_version, kind, name
    )
}

fn resource_templates(manifests: &ManifestSet) -> Vec<Template> {
    let apply_stateful_set = Template {
        outputs: Outputs::new(vec![Parameter {
            value_from: Some(ValueFrom {
                json_path: "{.status.updateRevision}".to_string(),
            }),
            ..Parameter::named(UPDATE_REVISION)
        }]),
        ..Template::resource(
            STATEFUL_SET_RESOURCE,
            resource(
                deferred_action(),
                &manifests.stateful_set,
                Some("status.readyReplicas > 0".to_string()),
            ),
        )
    };

    let wait_for_ready = Template {
        inputs: Inputs::new(vec![Parameter::named(UPDATE_REVISION)]),
        ..Template::resource(
            GET_STATEFUL_SET_RESOURCE,
            resource(
                "get".to_string(),
                &object_reference("apps/v1", "StatefulSet", &uid()),
                Some(format!(
                    "status.readyReplicas > 0, status.currentRevision == {}",
                    input_parameter(UPDATE_REVISION)
                )),
            ),
        )
    };

    let delete_pvc = Template {
        inputs: Inputs::new(vec![Parameter::named(SYS_PVC_NAME)]),
        ..Template::resource(
            DELETE_PVC_RESOURCE,
            resource(
                "delete".to_string(),
                &object_reference(
                    "v1",
                    "PersistentVolumeClaim",
                    &format!("{}-{}-0", input_parameter(SYS_PVC_NAME), uid()),
                ),
                None,
            ),
        )
    };

    vec![
        Template::resource(
            SERVICE_RESOURCE,
            resource(deferred_action(), &manifests.service, None),
        ),
        Template::resource(
            VIRTUAL_SERVICE_RESOURCE,
            resource(deferred_action(), &manifests.virtual_service, None),
        ),
        apply_stateful_set,
        wait_for_ready,
        Template::resource(
            DELETE_STATEFUL_SET_RESOURCE,
            resource("delete".to_string(), &manifests.stateful_set, None),
        ),
        Template::resource(
            WORKSPACE_RESOURCE,
            resource(deferred_action(), &manifests.workspace, None),
        ),
        Template::resource(
            DELETE_WORKSPACE_RESOURCE,
            resource("delete".to_string(), &manifests.workspace, None),
        ),
        delete_pvc,
    ]
}

/// Status callback reporting the new phase to the platform API.
fn status_template(config: &dyn SystemConfig) -> Result<Template> {
    let api_url = config
        .api_url()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            WsError::InvalidConfiguration("apiUrl is required for status updates".to_string())
        })?;

    let url = format!(
        "{}/apis/v1beta1/{}/workspaces/{}/status",
        api_url.trim_end_matches('/'),
        NAMESPACE,
        uid()
    );
    let body = serde_json::json!({ "phase": input_parameter(SYS_WORKSPACE_PHASE) }).to_string();
    let script = format!(
        "SERVICE_ACCOUNT_TOKEN=$(cat {}); curl -s -o /dev/null -w '%{{http_code}}' '{}' \
         -H 'Content-Type: application/json' \
         -H \"onepanel-auth-token: $SERVICE_ACCOUNT_TOKEN\" \
         -X PUT -d '{}'",
        SERVICE_ACCOUNT_TOKEN, url, body
    );

    Ok(Template {
        name: UPDATE_STATUS.to_string(),
        inputs: Inputs::new(vec![Parameter::named(SYS_WORKSPACE_PHASE)]),
        container: Some(Container {
            name: "curl".to_string(),
            image: Some(STATUS_IMAGE.to_string()),
            command: Some(vec!["sh".to_string(), "-c".to_string()]),
            args: Some(vec![script]),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Builds the guarded lifecycle graph around the assembled manifests.
///
/// `arguments` becomes the definition's parameter list unchanged. An
/// optional post-provision hook is spliced in after the three phase tasks;
/// its template names must not collide with the generated ones.
pub fn compile_dag(
    spec: &WorkspaceSpec,
    arguments: Vec<Parameter>,
    manifests: &ManifestSet,
    config: &dyn SystemConfig,
) -> Result<CompiledWorkflowDefinition> {
    let mut tasks = lifecycle_tasks(spec);

    let mut templates = vec![Template {
        name: ENTRYPOINT.to_string(),
        ..Default::default()
    }];
    templates.extend(resource_templates(manifests));
    templates.push(status_template(config)?);

    if let Some(hook) = &spec.post_execution_workflow {
        let generated: HashSet<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        if let Some(clash) = hook.templates.iter().find(|t| generated.contains(t.name.as_str())) {
            return Err(WsError::Validation(format!(
                "postExecutionWorkflow template '{}' collides with a generated template",
                clash.name
            )));
        }
        if tasks.iter().any(|t| t.name == hook.entrypoint) {
            return Err(WsError::Validation(format!(
                "postExecutionWorkflow entrypoint '{}' collides with a generated task",
                hook.entrypoint
            )));
        }

        tasks.push(task(
            &hook.entrypoint,
            &hook.entrypoint,
            &[SET_PHASE_RUNNING_TASK, SET_PHASE_PAUSED_TASK, SET_PHASE_TERMINATED_TASK],
            ActionGuard::Any,
        ));
        templates.extend(hook.templates.iter().cloned());
    }

    debug!(
        tasks = tasks.len(),
        templates = templates.len(),
        "compiled workspace task graph"
    );

    templates[0].dag = Some(DagTemplate {
        fail_fast: Some(false),
        tasks,
        ..Default::default()
    });

    Ok(CompiledWorkflowDefinition {
        entrypoint: ENTRYPOINT.to_string(),
        arguments: Arguments {
            parameters: arguments,
        },
        templates,
    })
}

/// Tasks that execute for a given action, in graph order.
pub fn tasks_for(
    definition: &CompiledWorkflowDefinition,
    action: WorkspaceAction,
) -> Result<Vec<&DagTask>> {
    let Some(dag) = definition.dag() else {
        return Ok(Vec::new());
    };

    let mut selected = Vec::new();
    for task in &dag.tasks {
        if ActionGuard::parse(task.when.as_deref())?.allows(action) {
            selected.push(task);
        }
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::assemble;
    use crate::spec::parse_workspace_spec;
    use ws_config::{NodePoolOption, SystemSettings};

    fn settings() -> SystemSettings {
        SystemSettings {
            domain: Some("example.com".to_string()),
            api_url: Some("https://app.example.com/api/".to_string()),
            node_pool_label: Some("node.kubernetes.io/instance-type".to_string()),
            node_pool_options: vec![NodePoolOption::new("CPU", "n1-standard-2")],
            ..Default::default()
        }
    }

    fn compile_spec(manifest: &str) -> Result<CompiledWorkflowDefinition> {
        let spec = parse_workspace_spec(manifest)?;
        let config = settings();
        let manifests = assemble(&spec, &config, &[])?;
        compile_dag(&spec, Vec::new(), &manifests, &config)
    }

    const TWO_VOLUMES: &str = r#"
containers:
  - name: main
    image: busybox
    volumeMounts:
      - name: data
        mountPath: /data
      - name: models
        mountPath: /models
      - name: sys-dshm
        mountPath: /dev/shm
"#;

    fn names(tasks: &[&DagTask]) -> Vec<String> {
        tasks.iter().map(|t| t.name.clone()).collect()
    }

    #[test]
    fn test_guard_expression_roundtrip() {
        let guard = ActionGuard::only(&CREATE_OR_UPDATE);
        let expression = guard.expression().unwrap();
        assert_eq!(
            expression,
            "{{workflow.parameters.sys-workspace-action}} == create || {{workflow.parameters.sys-workspace-action}} == update"
        );
        assert_eq!(ActionGuard::parse(Some(&expression)).unwrap(), guard);
        assert_eq!(ActionGuard::parse(None).unwrap(), ActionGuard::Any);
        assert!(ActionGuard::parse(Some("1 == 1")).is_err());
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("pause".parse::<WorkspaceAction>().unwrap(), WorkspaceAction::Pause);
        assert!(matches!(
            "restart".parse::<WorkspaceAction>(),
            Err(WsError::Validation(_))
        ));
    }

    #[test]
    fn test_delete_fans_out_per_volume() {
        let definition = compile_spec(TWO_VOLUMES).unwrap();

        for volume in ["data", "models"] {
            let task = definition.task(&delete_pvc_task(volume)).unwrap();
            assert_eq!(task.dependencies, vec![DELETE_WORKSPACE_TASK]);
            assert_eq!(
                task.arguments.get(SYS_PVC_NAME).and_then(|p| p.value.as_deref()),
                Some(volume)
            );
        }
        assert!(definition.task(&delete_pvc_task("sys-dshm")).is_none());

        let terminated = definition.task(SET_PHASE_TERMINATED_TASK).unwrap();
        assert_eq!(
            terminated.dependencies,
            vec!["delete-pvc-data", "delete-pvc-models"]
        );
    }

    #[test]
    fn test_tasks_per_action() {
        let definition = compile_spec(TWO_VOLUMES).unwrap();

        let create = tasks_for(&definition, WorkspaceAction::Create).unwrap();
        assert_eq!(
            names(&create),
            vec![
                SERVICE_TASK,
                VIRTUAL_SERVICE_TASK,
                CREATE_STATEFUL_SET_TASK,
                GET_STATEFUL_SET_TASK,
                CREATE_WORKSPACE_TASK,
                SET_PHASE_RUNNING_TASK,
            ]
        );

        let pause = tasks_for(&definition, WorkspaceAction::Pause).unwrap();
        assert_eq!(
            names(&pause),
            vec![
                SERVICE_TASK,
                VIRTUAL_SERVICE_TASK,
                DELETE_STATEFUL_SET_TASK,
                DELETE_WORKSPACE_TASK,
                SET_PHASE_PAUSED_TASK,
            ]
        );

        let delete = tasks_for(&definition, WorkspaceAction::Delete).unwrap();
        assert_eq!(delete.len(), 7);
        assert!(names(&delete).contains(&"delete-pvc-models".to_string()));
    }

    #[test]
    fn test_no_volumes_terminates_after_record_delete() {
        let definition =
            compile_spec("containers:\n  - name: main\n    image: busybox\n").unwrap();
        let terminated = definition.task(SET_PHASE_TERMINATED_TASK).unwrap();
        assert_eq!(terminated.dependencies, vec![DELETE_WORKSPACE_TASK]);
    }

    #[test]
    fn test_wait_for_ready_checks_revision() {
        let definition = compile_spec(TWO_VOLUMES).unwrap();

        let get = definition.task(GET_STATEFUL_SET_TASK).unwrap();
        assert_eq!(
            get.arguments.get(UPDATE_REVISION).and_then(|p| p.value.as_deref()),
            Some("{{tasks.create-stateful-set.outputs.parameters.update-revision}}")
        );

        let template = definition.template(GET_STATEFUL_SET_RESOURCE).unwrap();
        let resource = template.resource.as_ref().unwrap();
        assert_eq!(resource.action, "get");
        assert_eq!(
            resource.success_condition.as_deref(),
            Some("status.readyReplicas > 0, status.currentRevision == {{inputs.parameters.update-revision}}")
        );

        let apply = definition.template(STATEFUL_SET_RESOURCE).unwrap();
        assert_eq!(
            apply.outputs.parameters[0].value_from.as_ref().map(|v| v.json_path.as_str()),
            Some("{.status.updateRevision}")
        );
    }

    #[test]
    fn test_status_callback() {
        let definition = compile_spec(TWO_VOLUMES).unwrap();
        let status = definition.template(UPDATE_STATUS).unwrap();
        let args = status.container.as_ref().unwrap().args.as_ref().unwrap();

        assert!(args[0].contains(
            "'https://app.example.com/api/apis/v1beta1/{{workflow.namespace}}/workspaces/{{workflow.parameters.sys-uid}}/status'"
        ));
        assert!(args[0].contains(r#"{"phase":"{{inputs.parameters.sys-workspace-phase}}"}"#));
        assert!(args[0].contains("-X PUT"));
    }

    #[test]
    fn test_missing_api_url_is_configuration_error() {
        let spec = parse_workspace_spec("containers:\n  - name: main\n    image: busybox\n").unwrap();
        let config = SystemSettings {
            api_url: None,
            ..settings()
        };
        let manifests = assemble(&spec, &config, &[]).unwrap();
        assert!(matches!(
            compile_dag(&spec, Vec::new(), &manifests, &config),
            Err(WsError::InvalidConfiguration(_))
        ));
    }

    const WITH_HOOK: &str = r#"
containers:
  - name: main
    image: busybox
postExecutionWorkflow:
  entrypoint: notify
  templates:
    - name: notify
      container:
        name: notify
        image: curlimages/curl
"#;

    #[test]
    fn test_hook_runs_after_every_phase() {
        let definition = compile_spec(WITH_HOOK).unwrap();
        let hook = definition.task("notify").unwrap();
        assert_eq!(
            hook.dependencies,
            vec![SET_PHASE_RUNNING_TASK, SET_PHASE_PAUSED_TASK, SET_PHASE_TERMINATED_TASK]
        );
        assert!(hook.when.is_none());
        assert!(definition.template("notify").is_some());
        assert_eq!(definition.templates.last().map(|t| t.name.as_str()), Some("notify"));
    }

    #[test]
    fn test_hook_template_collision_rejected() {
        let manifest = WITH_HOOK.replace("entrypoint: notify", "entrypoint: service-resource")
            .replace("- name: notify\n      container", "- name: service-resource\n      container");
        assert!(matches!(compile_spec(&manifest), Err(WsError::Validation(_))));
    }

    #[test]
    fn test_hook_with_steps_template_is_spliced() {
        let manifest = r#"
containers:
  - name: main
    image: busybox
postExecutionWorkflow:
  entrypoint: notify
  templates:
    - name: notify
      retryStrategy:
        limit: 2
      steps:
        - - name: ping
            template: ping
            withItems: [a, b]
    - name: ping
      container:
        name: ping
        image: curlimages/curl
"#;
        let definition = compile_spec(manifest).unwrap();
        assert!(definition.task("notify").is_some());

        let notify = definition.template("notify").unwrap();
        assert!(notify.container.is_none());
        assert!(notify.extra.contains_key("steps"));
        assert!(notify.extra.contains_key("retryStrategy"));
        assert!(definition.template("ping").is_some());

        let reparsed = CompiledWorkflowDefinition::from_manifest(&definition.to_manifest().unwrap()).unwrap();
        assert_eq!(reparsed.template("notify"), Some(notify));
    }
}
