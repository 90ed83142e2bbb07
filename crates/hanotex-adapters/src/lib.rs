//! Notification dispatchers for HANOTEX.

#![deny(unsafe_code)]

use async_trait::async_trait;
use hanotex_core::notify::{Notification, NotificationDispatcher, NotifyError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// Dispatcher selection for the service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DispatcherConfig {
    /// Write notifications to the log.
    #[default]
    Log,
    /// Keep notifications in memory.
    Memory,
    /// POST each notification as JSON to `url`.
    Webhook {
        url: String,
        #[serde(default = "default_webhook_timeout")]
        timeout_secs: u64,
    },
}

fn default_webhook_timeout() -> u64 {
    5
}

impl DispatcherConfig {
    pub fn build(&self) -> Result<Arc<dyn NotificationDispatcher>, NotifyError> {
        match self {
            Self::Log => Ok(Arc::new(LogDispatcher)),
            Self::Memory => Ok(Arc::new(RecordingDispatcher::new())),
            Self::Webhook { url, timeout_secs } => Ok(Arc::new(WebhookDispatcher::new(
                url,
                Duration::from_secs(*timeout_secs),
            )?)),
        }
    }
}

/// Logs every notification at info level.
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            user_id = %notification.user,
            kind = ?notification.kind,
            priority = ?notification.priority,
            action_url = %notification.action_url,
            title = %notification.title,
            "notification"
        );
        Ok(())
    }
}

/// Records notifications in memory; clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    recorded: Arc<RwLock<Vec<Notification>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self) -> Vec<Notification> {
        self.recorded.read().await.clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.recorded.write().await.push(notification.clone());
        Ok(())
    }
}

/// Delivers notifications to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
    url: String,
}

impl WebhookDispatcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                dispatcher: self.name(),
                reason: format!("endpoint answered {status}"),
            })
        }
    }
}

/// Deterministic failing dispatcher useful for chaos testing.
#[derive(Debug, Clone)]
pub struct AlwaysFailDispatcher {
    reason: String,
}

impl AlwaysFailDispatcher {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for AlwaysFailDispatcher {
    fn name(&self) -> &'static str {
        "always-fail"
    }

    async fn dispatch(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected {
            dispatcher: self.name(),
            reason: self.reason.clone(),
        })
    }
}
