use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("WS_TEMPLATES_DB_PATH") {
        return PathBuf::from(path);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ws")
        .join("templates.db")
}

fn default_max_connections() -> u32 {
    std::env::var("WS_TEMPLATES_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_db_path_env_override() {
        std::env::set_var("WS_TEMPLATES_DB_PATH", "/tmp/ws-test/templates.db");
        let config = StoreConfig::default();
        std::env::remove_var("WS_TEMPLATES_DB_PATH");

        assert_eq!(config.db_path, PathBuf::from("/tmp/ws-test/templates.db"));
    }

    #[test]
    #[serial]
    fn test_default_db_path() {
        std::env::remove_var("WS_TEMPLATES_DB_PATH");
        let config = StoreConfig::default();
        assert!(config.db_path.ends_with(".ws/templates.db"));
    }

    #[test]
    #[serial]
    fn test_max_connections_ignores_garbage() {
        std::env::set_var("WS_TEMPLATES_MAX_CONNECTIONS", "lots");
        let config = StoreConfig::default();
        std::env::remove_var("WS_TEMPLATES_MAX_CONNECTIONS");

        assert_eq!(config.max_connections, 5);
    }
}
