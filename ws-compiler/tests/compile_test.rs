use ws_compiler::dag::{delete_pvc_task, tasks_for, DELETE_WORKSPACE_TASK, SET_PHASE_TERMINATED_TASK};
use ws_compiler::{compile, PeerService, WorkspaceAction};
use ws_config::{NodePoolOption, SystemSettings};
use ws_core::error::WsError;

const JUPYTER: &str = r#"
containers:
  - name: jupyterlab
    image: onepanel/jupyterlab:1.0.1
    command: ["/bin/bash", "-c", "start.sh jupyter lab --LabApp.token='' --LabApp.base_url={{workspace.parameters.sys-name}}"]
    ports:
      - containerPort: 8888
        name: jupyterlab
    volumeMounts:
      - name: data
        mountPath: /data
  - name: tensorboard
    image: tensorflow/tensorflow:2.3.0
    volumeMounts:
      - name: data
        mountPath: /data
ports:
  - name: jupyterlab
    port: 80
    protocol: TCP
    targetPort: 8888
  - name: tensorboard
    port: 6006
    protocol: TCP
    targetPort: 6006
routes:
  - match:
      - uri:
          prefix: /tensorboard
    route:
      - destination:
          port:
            number: 6006
  - match:
      - uri:
          prefix: /
    route:
      - destination:
          port:
            number: 80
arguments:
  parameters:
    - name: notebook-theme
      value: dark
      type: select.select
      options:
        - name: Dark
          value: dark
        - name: Light
          value: light
"#;

fn settings() -> SystemSettings {
    SystemSettings {
        domain: Some("example.com".to_string()),
        fqdn: Some("app.example.com".to_string()),
        api_url: Some("https://app.example.com/api".to_string()),
        provider: Some("gcp".to_string()),
        node_pool_label: Some("node.kubernetes.io/instance-type".to_string()),
        node_pool_options: vec![
            NodePoolOption::new("CPU: 2, RAM: 8GB", "n1-standard-2"),
            NodePoolOption::new("GPU: 1xK80", "n1-standard-4-k80"),
        ],
    }
}

#[test]
fn test_shared_volume_compiles_to_one_claim_and_one_parameter() {
    ws_common::tracing_init::init_for_testing();

    let compiled = compile(JUPYTER, &settings(), &[]).unwrap();
    let definition = &compiled.definition;

    let size_params: Vec<_> = definition
        .parameters()
        .iter()
        .filter(|p| p.name.ends_with("-volume-size"))
        .collect();
    assert_eq!(size_params.len(), 1);
    assert_eq!(size_params[0].name, "sys-data-volume-size");
    assert_eq!(size_params[0].value.as_deref(), Some("20480"));

    let stateful_set = definition
        .template("stateful-set-resource")
        .and_then(|t| t.resource.as_ref())
        .unwrap();
    let workload: serde_yaml_ng::Value = serde_yaml_ng::from_str(&stateful_set.manifest).unwrap();
    let claims = workload["spec"]["volumeClaimTemplates"].as_sequence().unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0]["metadata"]["name"].as_str(), Some("data"));
}

#[test]
fn test_parameter_order_is_system_volume_user() {
    let compiled = compile(JUPYTER, &settings(), &[]).unwrap();
    let names: Vec<&str> = compiled
        .definition
        .parameters()
        .iter()
        .map(|p| p.name.as_str())
        .collect();

    assert_eq!(
        names,
        vec![
            "sys-host",
            "sys-node-pool-label",
            "sys-node-pool",
            "sys-name",
            "sys-resource-action",
            "sys-workspace-action",
            "sys-uid",
            "sys-data-volume-size",
            "notebook-theme",
        ]
    );

    let pool = &compiled.definition.parameters()[2];
    assert_eq!(pool.value.as_deref(), Some("n1-standard-2"));
    assert_eq!(pool.options.len(), 2);
}

#[test]
fn test_authoring_references_rewritten() {
    let compiled = compile(JUPYTER, &settings(), &[]).unwrap();

    assert!(!compiled.manifest.contains("{{workspace."));
    assert!(compiled
        .manifest
        .contains("--LabApp.base_url={{workflow.parameters.sys-name}}"));
}

#[test]
fn test_every_port_is_exposed() {
    let compiled = compile(JUPYTER, &settings(), &[]).unwrap();
    let service = compiled
        .definition
        .template("service-resource")
        .and_then(|t| t.resource.as_ref())
        .unwrap();
    let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(&service.manifest).unwrap();

    let ports = value["spec"]["ports"].as_sequence().unwrap();
    assert_eq!(ports.len(), 2);
    assert_eq!(
        value["spec"]["selector"]["app"].as_str(),
        Some("{{workflow.parameters.sys-uid}}")
    );
}

#[test]
fn test_peer_services_reach_every_container() {
    let services = vec![PeerService {
        name: "feature-store".to_string(),
        url: "http://feature-store.onepanel:8080".to_string(),
    }];
    let compiled = compile(JUPYTER, &settings(), &services).unwrap();
    let stateful_set = compiled
        .definition
        .template("stateful-set-resource")
        .and_then(|t| t.resource.as_ref())
        .unwrap();

    assert_eq!(
        stateful_set
            .manifest
            .matches("ONEPANEL_SERVICES_FEATURE_STORE_API_URL")
            .count(),
        2
    );
}

#[test]
fn test_two_volumes_delete_path() {
    let manifest = r#"
containers:
  - name: main
    image: busybox
    volumeMounts:
      - name: data
        mountPath: /data
  - name: worker
    image: busybox
    volumeMounts:
      - name: scratch
        mountPath: /scratch
"#;
    let compiled = compile(manifest, &settings(), &[]).unwrap();
    let definition = &compiled.definition;

    let delete = tasks_for(definition, WorkspaceAction::Delete).unwrap();
    let pvc_tasks: Vec<_> = delete
        .iter()
        .filter(|t| t.template == "delete-pvc-resource")
        .collect();
    assert_eq!(pvc_tasks.len(), 2);
    for task in &pvc_tasks {
        assert_eq!(task.dependencies, vec![DELETE_WORKSPACE_TASK]);
    }

    let terminated = definition.task(SET_PHASE_TERMINATED_TASK).unwrap();
    assert_eq!(
        terminated.dependencies,
        vec![delete_pvc_task("data"), delete_pvc_task("scratch")]
    );
}

#[test]
fn test_no_node_pools_is_configuration_error() {
    let config = SystemSettings {
        node_pool_options: Vec::new(),
        ..settings()
    };
    match compile(JUPYTER, &config, &[]) {
        Err(WsError::InvalidConfiguration(message)) => {
            assert!(message.contains("no node pool options in config"))
        }
        other => panic!("expected configuration error, got {:?}", other),
    }
}

#[test]
fn test_malformed_spec_is_validation_error() {
    let result = compile("containers: [\n", &settings(), &[]);
    assert!(matches!(result, Err(WsError::Validation(_))));

    let result = compile("containers: []\nunknownField: 1\n", &settings(), &[]);
    assert!(matches!(result, Err(WsError::Validation(_))));
}

#[test]
fn test_compile_is_deterministic() {
    ws_common::tracing_init::init_for_testing();

    let first = compile(JUPYTER, &settings(), &[]).unwrap();
    let second = compile(JUPYTER, &settings(), &[]).unwrap();
    assert_eq!(first.manifest, second.manifest);
}
