//! Best-effort notifications for contract confirmations.
//!
//! Delivery goes through a pluggable [`NotificationDispatcher`]. Nothing in
//! this module can fail a confirmation: plans are pure, and dispatch errors
//! are reported in a [`BatchReport`] for logging only.

use crate::ids::UserId;
use crate::types::Contract;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category tag shown by the notification UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
    Contract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Urgent,
}

/// A single notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user: UserId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub action_url: String,
    pub priority: NotificationPriority,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("dispatcher '{dispatcher}' rejected notification: {reason}")]
    Rejected {
        dispatcher: &'static str,
        reason: String,
    },

    #[error("notification transport failed: {0}")]
    Transport(String),
}

/// Per-item failure inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemError {
    pub index: usize,
    pub user: UserId,
    pub reason: String,
}

/// Aggregate result of a batch dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub created: usize,
    pub failed: usize,
    pub errors: Vec<BatchItemError>,
}

impl BatchReport {
    pub fn record(
        &mut self,
        index: usize,
        notification: &Notification,
        result: Result<(), NotifyError>,
    ) {
        match result {
            Ok(()) => self.created += 1,
            Err(err) => {
                self.failed += 1;
                self.errors.push(BatchItemError {
                    index,
                    user: notification.user.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
}

/// Pluggable notification delivery.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Deliver every item independently; one failure does not stop the rest.
    async fn dispatch_batch(&self, notifications: &[Notification]) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, notification) in notifications.iter().enumerate() {
            let result = self.dispatch(notification).await;
            report.record(index, notification, result);
        }
        report
    }
}

/// Wording for one confirmation route.
///
/// `{contract_id}`, `{user_id}` (the confirming user) and `{status}` are
/// substituted in every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTemplates {
    pub partial_title: String,
    pub partial_message: String,
    pub complete_title: String,
    pub complete_message: String,
    pub action_url: String,
}

impl NotificationTemplates {
    pub fn contract() -> Self {
        Self {
            partial_title: "Contract accepted by the other party".to_string(),
            partial_message: "User {user_id} has accepted contract {contract_id}. \
                              Please review and confirm to complete signing."
                .to_string(),
            complete_title: "Contract signed".to_string(),
            complete_message: "Contract {contract_id} has been confirmed by both parties \
                               and is now {status}."
                .to_string(),
            action_url: "/contracts/{contract_id}".to_string(),
        }
    }

    pub fn technology_propose() -> Self {
        Self {
            partial_title: "Technology proposal contract accepted".to_string(),
            partial_message: "User {user_id} accepted the contract for your technology \
                              proposal ({contract_id}). Your confirmation is needed."
                .to_string(),
            complete_title: "Technology transfer contract completed".to_string(),
            complete_message: "Both parties confirmed contract {contract_id}; \
                               the contract is now {status}."
                .to_string(),
            action_url: "/technology-propose/contracts/{contract_id}".to_string(),
        }
    }
}

struct RenderContext<'a> {
    contract: &'a Contract,
    confirming_user: &'a UserId,
}

impl RenderContext<'_> {
    fn value(&self, placeholder: &str) -> Option<&str> {
        match placeholder {
            "contract_id" => Some(self.contract.id.as_str()),
            "user_id" => Some(self.confirming_user.as_str()),
            "status" => Some(self.contract.status.as_str()),
            _ => None,
        }
    }

    /// Single pass over `template`; substituted values are never rescanned.
    fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let substituted = tail
                .find('}')
                .and_then(|close| Some((close, self.value(&tail[1..close])?)));

            match substituted {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Decide who hears about a confirmation.
///
/// Partial confirmation notifies only the other party; completion notifies
/// both parties. `contract` is the post-confirmation state.
pub fn plan_notifications(
    contract: &Contract,
    confirming_user: &UserId,
    both_accepted: bool,
    templates: &NotificationTemplates,
) -> Vec<Notification> {
    let ctx = RenderContext {
        contract,
        confirming_user,
    };
    let action_url = ctx.render(&templates.action_url);

    if both_accepted {
        contract
            .parties()
            .into_iter()
            .map(|party| Notification {
                user: party.clone(),
                title: ctx.render(&templates.complete_title),
                message: ctx.render(&templates.complete_message),
                kind: NotificationType::Success,
                action_url: action_url.clone(),
                priority: NotificationPriority::High,
            })
            .collect()
    } else {
        contract
            .counterparty(confirming_user)
            .map(|other| Notification {
                user: other.clone(),
                title: ctx.render(&templates.partial_title),
                message: ctx.render(&templates.partial_message),
                kind: NotificationType::Contract,
                action_url,
                priority: NotificationPriority::High,
            })
            .into_iter()
            .collect()
    }
}
