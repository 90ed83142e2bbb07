//! Configuration for hanotexd

use hanotex_adapters::DispatcherConfig;
use hanotex_core::confirmation::{ConfirmationProfile, DEFAULT_MAX_WRITE_ATTEMPTS};
use hanotex_core::error::ProfileError;
use hanotex_core::notify::NotificationTemplates;
use hanotex_core::storage::StorageConfig;
use hanotex_core::types::ContractStatus;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Apply a permissive CORS layer
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// Notification delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Batches that may wait for the outbox worker
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

/// Confirmation workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Version-checked write attempts per confirmation
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,

    #[serde(default = "ProfileConfig::contract")]
    pub contract: ProfileConfig,

    #[serde(default = "ProfileConfig::technology_propose")]
    pub technology_propose: ProfileConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_write_attempts: default_max_write_attempts(),
            contract: ProfileConfig::contract(),
            technology_propose: ProfileConfig::technology_propose(),
        }
    }
}

/// Terminal status and wording for one accept-contract route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub terminal_status: ContractStatus,
    pub templates: NotificationTemplates,
}

impl ProfileConfig {
    fn contract() -> Self {
        Self {
            terminal_status: ContractStatus::Signed,
            templates: NotificationTemplates::contract(),
        }
    }

    fn technology_propose() -> Self {
        Self {
            terminal_status: ContractStatus::Completed,
            templates: NotificationTemplates::technology_propose(),
        }
    }

    pub fn to_profile(&self, name: &str) -> Result<ConfirmationProfile, ProfileError> {
        ConfirmationProfile::new(name, self.terminal_status, self.templates.clone())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8092))
}

fn default_outbox_capacity() -> usize {
    1024
}

fn default_max_write_attempts() -> u32 {
    DEFAULT_MAX_WRITE_ATTEMPTS
}

fn default_log_level() -> String {
    "hanotex_service=info,info".to_string()
}

impl ServiceConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `HANOTEX_`-prefixed environment variables (`__` between sections).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&ServiceConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("HANOTEX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8092);
        assert!(config.server.enable_cors);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert!(matches!(
            config.notifications.dispatcher,
            DispatcherConfig::Log
        ));
        assert_eq!(config.notifications.outbox_capacity, 1024);
        assert_eq!(config.workflow.max_write_attempts, 5);
    }

    #[test]
    fn test_profile_defaults_keep_route_terminal_statuses() {
        let workflow = WorkflowConfig::default();
        assert_eq!(workflow.contract.terminal_status, ContractStatus::Signed);
        assert_eq!(
            workflow.technology_propose.terminal_status,
            ContractStatus::Completed
        );
        assert!(workflow.contract.to_profile("contract").is_ok());
    }

    #[test]
    fn test_non_terminal_profile_is_rejected() {
        let profile = ProfileConfig {
            terminal_status: ContractStatus::Draft,
            templates: NotificationTemplates::contract(),
        };
        assert!(profile.to_profile("contract").is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = ServiceConfig::load(None).unwrap();
        assert_eq!(config.server.listen_addr, default_listen_addr());
        assert_eq!(
            config.workflow.technology_propose,
            ProfileConfig::technology_propose()
        );
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ServiceConfig = serde_json::from_value(serde_json::json!({
            "storage": { "type": "postgres", "url": "postgres://db/hanotex" },
            "workflow": { "max_write_attempts": 2 }
        }))
        .unwrap();

        assert_eq!(config.storage.label(), "postgres");
        assert_eq!(config.workflow.max_write_attempts, 2);
        assert_eq!(config.workflow.contract, ProfileConfig::contract());
    }
}
