// Standard library imports
use std::fs;
use std::path::Path;

// External crate imports
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_yaml_ng as serde_yaml;
use tracing::debug;

// Internal imports
use crate::{NodePoolOption, SystemConfig};
use ws_core::error::{Result, WsError};

/// File-backed system configuration.
///
/// ```yaml
/// domain: example.com
/// fqdn: app.example.com
/// apiUrl: https://app.example.com/api
/// provider: gcp
/// nodePoolLabel: node.kubernetes.io/instance-type
/// nodePoolOptions:
///   - name: CPU, 2 vCPU
///     value: n1-standard-2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SystemSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_pool_label: Option<String>,

    #[serde(default)]
    pub node_pool_options: Vec<NodePoolOption>,
}

impl SystemSettings {
    /// Loads settings from a YAML file, then applies `WS_*` environment
    /// overrides.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading system settings from: {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut settings = Self::from_yaml(&content)?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| WsError::InvalidConfiguration(format!("system settings: {}", e)))
    }

    /// Applies overrides from a key lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut Option<String>); 5] = [
            ("WS_DOMAIN", &mut self.domain),
            ("WS_FQDN", &mut self.fqdn),
            ("WS_API_URL", &mut self.api_url),
            ("WS_PROVIDER", &mut self.provider),
            ("WS_NODE_POOL_LABEL", &mut self.node_pool_label),
        ];

        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                debug!(key, "system setting overridden from environment");
                *field = Some(value);
            }
        }
    }
}

impl SystemConfig for SystemSettings {
    fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    fn fqdn(&self) -> Option<&str> {
        self.fqdn.as_deref()
    }

    fn api_url(&self) -> Option<&str> {
        self.api_url.as_deref()
    }

    fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    fn node_pool_label(&self) -> Option<&str> {
        self.node_pool_label.as_deref()
    }

    fn node_pool_options(&self) -> Result<Vec<NodePoolOption>> {
        Ok(self.node_pool_options.clone())
    }
}
