// Command handlers

use std::fs;
use std::path::Path;

use serde_yaml_ng as serde_yaml;
use tracing::debug;

use crate::cli::{Args, Command};
use ws_compiler::params::{colliding_parameters, inject_arguments};
use ws_compiler::{compile, parse_workspace_spec, PeerService};
use ws_config::SystemSettings;
use ws_core::{Result, WsError};

/// Main command dispatcher
pub fn execute_command(args: Args) -> Result<()> {
    match args.command {
        Command::Compile {
            spec,
            settings,
            services,
        } => {
            debug!("Handling compile command");
            handle_compile(&spec, &settings, &services)
        }
        Command::Validate { spec } => {
            debug!("Handling validate command");
            handle_validate(&spec)
        }
        Command::Params { spec, settings } => {
            debug!("Handling params command");
            handle_params(&spec, &settings)
        }
    }
}

fn read_spec(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| WsError::Validation(format!("cannot read {}: {}", path.display(), e)))
}

fn parse_service(raw: &str) -> Result<PeerService> {
    match raw.split_once('=') {
        Some((name, url)) if !name.is_empty() && !url.is_empty() => Ok(PeerService {
            name: name.to_string(),
            url: url.to_string(),
        }),
        _ => Err(WsError::Validation(format!(
            "service '{}' must be written as NAME=URL",
            raw
        ))),
    }
}

fn handle_compile(spec: &Path, settings: &Path, services: &[String]) -> Result<()> {
    let manifest = read_spec(spec)?;
    let settings = SystemSettings::load(settings)?;
    let services = services
        .iter()
        .map(|s| parse_service(s))
        .collect::<Result<Vec<_>>>()?;

    let compiled = compile(&manifest, &settings, &services)?;
    print!("{}", compiled.manifest);
    Ok(())
}

fn handle_validate(spec: &Path) -> Result<()> {
    let spec = parse_workspace_spec(&read_spec(spec)?)?;

    println!(
        "Spec is valid: {} container(s), {} port(s), {} route(s), {} volume(s)",
        spec.containers.len(),
        spec.ports.len(),
        spec.routes.len(),
        spec.claim_volumes().len()
    );
    Ok(())
}

fn handle_params(spec: &Path, settings: &Path) -> Result<()> {
    let spec = parse_workspace_spec(&read_spec(spec)?)?;
    let settings = SystemSettings::load(settings)?;

    let parameters = inject_arguments(&spec, &settings)?;
    let user = spec.user_parameters();
    for name in colliding_parameters(&parameters[..parameters.len() - user.len()], user) {
        eprintln!("warning: parameter '{}' shadows a system parameter", name);
    }

    print!("{}", serde_yaml::to_string(&parameters)?);
    Ok(())
}
