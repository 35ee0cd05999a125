use serde::Serialize;

use super::{assembly_error, ManifestDocument};
use crate::references::{uid, workflow_parameter, SYS_HOST};
use crate::spec::{HttpRoute, WorkspaceSpec};
use ws_core::error::Result;

const API_VERSION: &str = "networking.istio.io/v1alpha3";
const INGRESS_GATEWAY: &str = "istio-system/ingressgateway";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualServiceMetadata {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualServiceSpec {
    pub http: Vec<HttpRoute>,
    pub gateways: Vec<String>,
    pub hosts: Vec<String>,
}

/// HTTP routing rules bound to the ingress gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServiceDocument {
    pub api_version: String,
    pub kind: String,
    pub metadata: VirtualServiceMetadata,
    pub spec: VirtualServiceSpec,
}

impl VirtualServiceDocument {
    /// Every route destination is pointed at the workspace's own service.
    pub fn build(spec: &WorkspaceSpec) -> Self {
        let mut http = spec.routes.clone();
        for route in &mut http {
            for destination in &mut route.route {
                destination.destination.host = uid();
            }
        }

        Self {
            api_version: API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata: VirtualServiceMetadata { name: uid() },
            spec: VirtualServiceSpec {
                http,
                gateways: vec![INGRESS_GATEWAY.to_string()],
                hosts: vec![workflow_parameter(SYS_HOST)],
            },
        }
    }
}

impl ManifestDocument for VirtualServiceDocument {
    const KIND: &'static str = "VirtualService";

    fn validate(&self) -> Result<()> {
        for (index, route) in self.spec.http.iter().enumerate() {
            if route.route.is_empty() {
                let name = route.name.clone().unwrap_or_else(|| index.to_string());
                return Err(assembly_error(
                    Self::KIND,
                    format!("route '{}' has no destination", name),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::parse_workspace_spec;

    const SPEC: &str = r#"
containers:
  - name: jupyter
    image: jupyter/tensorflow-notebook
ports:
  - name: jupyterlab
    port: 80
routes:
  - match:
      - uri:
          prefix: /
    route:
      - destination:
          host: anything-the-author-wrote
          port:
            number: 80
"#;

    #[test]
    fn test_destinations_rewritten_to_uid() {
        let spec = parse_workspace_spec(SPEC).unwrap();
        let doc = VirtualServiceDocument::build(&spec);

        assert_eq!(
            doc.spec.http[0].route[0].destination.host,
            "{{workflow.parameters.sys-uid}}"
        );
        assert_eq!(doc.spec.hosts, vec!["{{workflow.parameters.sys-host}}"]);
        assert_eq!(doc.spec.gateways, vec!["istio-system/ingressgateway"]);
    }

    #[test]
    fn test_serialized_shape() {
        let spec = parse_workspace_spec(SPEC).unwrap();
        let manifest = VirtualServiceDocument::build(&spec).to_manifest().unwrap();
        let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(&manifest).unwrap();

        assert_eq!(value["apiVersion"].as_str(), Some(API_VERSION));
        assert_eq!(value["kind"].as_str(), Some("VirtualService"));
        assert_eq!(
            value["spec"]["http"][0]["match"][0]["uri"]["prefix"].as_str(),
            Some("/")
        );
        assert_eq!(
            value["spec"]["http"][0]["route"][0]["destination"]["port"]["number"].as_u64(),
            Some(80)
        );
    }

    #[test]
    fn test_route_without_destination_rejected() {
        let spec = parse_workspace_spec(
            "containers:\n  - name: main\n    image: busybox\nroutes:\n  - name: empty\n",
        )
        .unwrap();
        assert!(VirtualServiceDocument::build(&spec).to_manifest().is_err());
    }
}
