use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

const SPEC: &str = r#"
containers:
  - name: jupyterlab
    image: onepanel/jupyterlab:1.0.1
    ports:
      - containerPort: 8888
        name: jupyterlab
    volumeMounts:
      - name: data
        mountPath: /data
ports:
  - name: jupyterlab
    port: 80
    protocol: TCP
    targetPort: 8888
routes:
  - match:
      - uri:
          prefix: /
    route:
      - destination:
          port:
            number: 80
"#;

const SETTINGS: &str = r#"
domain: example.com
fqdn: app.example.com
apiUrl: https://app.example.com/api
provider: gcp
nodePoolLabel: node.kubernetes.io/instance-type
nodePoolOptions:
  - name: CPU, 2 vCPU
    value: n1-standard-2
"#;

fn write_inputs(spec: &str) -> Result<(TempDir, PathBuf, PathBuf), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let spec_path = dir.path().join("workspace.yaml");
    let settings_path = dir.path().join("settings.yaml");
    fs::write(&spec_path, spec)?;
    fs::write(&settings_path, SETTINGS)?;
    Ok((dir, spec_path, settings_path))
}

fn wstpl() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("wstpl")?;
    for key in ["WS_DOMAIN", "WS_FQDN", "WS_API_URL", "WS_PROVIDER", "WS_NODE_POOL_LABEL"] {
        cmd.env_remove(key);
    }
    Ok(cmd)
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap_or_default()
}

#[test]
fn test_compile_prints_workflow_template() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, spec, settings) = write_inputs(SPEC)?;

    wstpl()?
        .args(["compile", arg(&spec), "--settings", arg(&settings)])
        .args(["--service", "model-registry=http://registry:8080"])
        .assert()
        .success()
        .stdout(predicate::str::contains("entrypoint: workspace"))
        .stdout(predicate::str::contains("delete-pvc-data"))
        .stdout(predicate::str::contains("ONEPANEL_SERVICES_MODEL_REGISTRY_API_URL"))
        .stdout(predicate::str::contains("{{workflow.parameters.sys-uid}}"));
    Ok(())
}

#[test]
fn test_compile_rejects_malformed_service() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, spec, settings) = write_inputs(SPEC)?;

    wstpl()?
        .args(["compile", arg(&spec), "--settings", arg(&settings)])
        .args(["--service", "registry"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=URL"));
    Ok(())
}

#[test]
fn test_validate_summarizes_spec() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, spec, _settings) = write_inputs(SPEC)?;

    wstpl()?
        .args(["validate", arg(&spec)])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 container(s)"))
        .stdout(predicate::str::contains("1 volume(s)"));
    Ok(())
}

#[test]
fn test_validate_fails_on_malformed_spec() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, spec, _settings) = write_inputs("containers: [oops")?;

    wstpl()?
        .args(["validate", arg(&spec)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
    Ok(())
}

#[test]
fn test_params_lists_system_parameters_first() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, spec, settings) = write_inputs(SPEC)?;

    let output = wstpl()?
        .args(["params", arg(&spec), "--settings", arg(&settings)])
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let host = stdout.find("sys-host").ok_or("sys-host missing")?;
    let volume = stdout.find("data-volume-size").ok_or("volume size missing")?;
    assert!(host < volume);
    Ok(())
}

#[test]
fn test_missing_spec_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    wstpl()?
        .args(["validate", "/nonexistent/workspace.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
    Ok(())
}
