//! System configuration for the template compiler.
//!
//! The compiler only sees the [`SystemConfig`] capability; [`SystemSettings`]
//! is the file-backed implementation used by the CLI and the tests.

pub mod settings;

use serde::{Deserialize, Serialize};
use ws_core::error::Result;

pub use settings::SystemSettings;

/// One selectable node pool: `name` is shown to users, `value` is matched
/// against the node-pool label on cluster nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePoolOption {
    pub name: String,
    pub value: String,
}

impl NodePoolOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Cluster-level settings the compiler bakes into every template.
pub trait SystemConfig: Send + Sync {
    /// Cluster domain used as the externally reachable host.
    fn domain(&self) -> Option<&str>;

    /// Fully qualified domain exposed to workspace containers.
    fn fqdn(&self) -> Option<&str>;

    /// Base URL of the platform API, used by the status callback.
    fn api_url(&self) -> Option<&str>;

    /// Cloud provider identifier exposed to workspace containers.
    fn provider(&self) -> Option<&str>;

    /// Node label key used to pin workloads to a node pool.
    fn node_pool_label(&self) -> Option<&str>;

    /// Ordered node pool options. The first one is the default selection.
    fn node_pool_options(&self) -> Result<Vec<NodePoolOption>>;
}
