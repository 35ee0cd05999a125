use std::collections::{BTreeMap, HashSet};

use k8s_openapi::api::core::v1::{Service, ServiceSpec};
use serde::Serialize;

use super::{assembly_error, named_metadata, ManifestDocument, APP_LABEL};
use crate::references::uid;
use crate::spec::WorkspaceSpec;
use ws_core::error::Result;

/// Network endpoint exposing the declared ports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ServiceDocument(pub Service);

impl ServiceDocument {
    pub fn build(spec: &WorkspaceSpec) -> Self {
        Self(Service {
            metadata: named_metadata(uid()),
            spec: Some(ServiceSpec {
                ports: Some(spec.ports.clone()),
                selector: Some(BTreeMap::from([(APP_LABEL.to_string(), uid())])),
                ..Default::default()
            }),
            status: None,
        })
    }

    pub fn ports(&self) -> &[k8s_openapi::api::core::v1::ServicePort] {
        self.0
            .spec
            .as_ref()
            .and_then(|s| s.ports.as_deref())
            .unwrap_or_default()
    }
}

impl ManifestDocument for ServiceDocument {
    const KIND: &'static str = "Service";

    fn validate(&self) -> Result<()> {
        let ports = self.ports();
        let mut names = HashSet::new();

        for port in ports {
            if !(1..=65535).contains(&port.port) {
                return Err(assembly_error(
                    Self::KIND,
                    format!("port {} is out of range", port.port),
                ));
            }
            if ports.len() > 1 {
                let name = port.name.as_deref().unwrap_or_default();
                if name.is_empty() {
                    return Err(assembly_error(
                        Self::KIND,
                        "ports must be named when more than one is declared",
                    ));
                }
                if !names.insert(name) {
                    return Err(assembly_error(
                        Self::KIND,
                        format!("duplicate port name '{}'", name),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::parse_workspace_spec;
    use ws_core::error::WsError;

    fn spec_with_ports(ports: &str) -> WorkspaceSpec {
        parse_workspace_spec(&format!(
            "containers:\n  - name: main\n    image: busybox\nports:\n{}",
            ports
        ))
        .unwrap()
    }

    #[test]
    fn test_every_port_exposed_with_same_selector() {
        let spec = spec_with_ports(
            "  - name: http\n    port: 80\n  - name: tensorboard\n    port: 6006\n  - name: ssh\n    port: 22\n",
        );
        let doc = ServiceDocument::build(&spec);
        assert_eq!(doc.ports().len(), 3);

        let manifest = doc.to_manifest().unwrap();
        let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(&manifest).unwrap();
        assert_eq!(value["apiVersion"].as_str(), Some("v1"));
        assert_eq!(value["kind"].as_str(), Some("Service"));
        assert_eq!(
            value["metadata"]["name"].as_str(),
            Some("{{workflow.parameters.sys-uid}}")
        );
        assert_eq!(
            value["spec"]["selector"]["app"].as_str(),
            Some("{{workflow.parameters.sys-uid}}")
        );
        assert_eq!(value["spec"]["ports"].as_sequence().map(|s| s.len()), Some(3));
    }

    #[test]
    fn test_unnamed_ports_rejected_when_several() {
        let spec = spec_with_ports("  - port: 80\n  - port: 443\n");
        assert!(matches!(
            ServiceDocument::build(&spec).to_manifest(),
            Err(WsError::Assembly(_))
        ));
    }

    #[test]
    fn test_single_unnamed_port_allowed() {
        let spec = spec_with_ports("  - port: 8888\n");
        assert!(ServiceDocument::build(&spec).to_manifest().is_ok());
    }

    #[test]
    fn test_out_of_range_port_rejected() {
        let spec = spec_with_ports("  - port: 70000\n");
        assert!(ServiceDocument::build(&spec).validate().is_err());
    }
}
