//! Two-party contract confirmation.
//!
//! [`ConfirmationHandler::confirm`] validates a request, applies the
//! transition from [`crate::flow`] and persists it with a version-checked
//! write. Proposal cascade and notifications run only after the write has
//! committed and never change the outcome.

use crate::cascade::{CascadeOutcome, ProposalCascader};
use crate::error::{ConfirmError, ProfileError, StoreError};
use crate::flow::{apply_confirmation, ConfirmationRejection};
use crate::ids::{ContractId, UserId};
use crate::notify::{plan_notifications, NotificationTemplates};
use crate::outbox::NotificationOutbox;
use crate::storage::Storage;
use crate::types::{Contract, ContractStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;

/// Per-route confirmation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationProfile {
    name: String,
    terminal_status: ContractStatus,
    templates: NotificationTemplates,
}

impl ConfirmationProfile {
    pub fn new(
        name: impl Into<String>,
        terminal_status: ContractStatus,
        templates: NotificationTemplates,
    ) -> Result<Self, ProfileError> {
        let name = name.into();
        if !terminal_status.is_terminal() {
            return Err(ProfileError::NonTerminalStatus {
                profile: name,
                status: terminal_status.to_string(),
            });
        }
        Ok(Self {
            name,
            terminal_status,
            templates,
        })
    }

    /// `/contract/accept-contract`: ends in `signed`.
    pub fn contract() -> Self {
        Self {
            name: "contract".to_string(),
            terminal_status: ContractStatus::Signed,
            templates: NotificationTemplates::contract(),
        }
    }

    /// `/technology-propose/accept-contract`: ends in `completed`.
    pub fn technology_propose() -> Self {
        Self {
            name: "technology_propose".to_string(),
            terminal_status: ContractStatus::Completed,
            templates: NotificationTemplates::technology_propose(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn terminal_status(&self) -> ContractStatus {
        self.terminal_status
    }

    pub fn templates(&self) -> &NotificationTemplates {
        &self.templates
    }
}

/// Result of a successful confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOutcome {
    pub contract: Contract,
    pub both_accepted: bool,
    pub cascade: CascadeOutcome,
    pub notifications_enqueued: usize,
}

impl ConfirmOutcome {
    pub fn message(&self) -> &'static str {
        if self.both_accepted {
            "Contract has been accepted by both parties"
        } else {
            "Contract accepted, waiting for the other party"
        }
    }
}

#[derive(Clone)]
pub struct ConfirmationHandler {
    storage: Arc<dyn Storage>,
    cascader: ProposalCascader,
    outbox: NotificationOutbox,
    max_write_attempts: u32,
}

impl ConfirmationHandler {
    pub fn new(storage: Arc<dyn Storage>, outbox: NotificationOutbox) -> Self {
        Self {
            cascader: ProposalCascader::new(storage.clone()),
            storage,
            outbox,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }

    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts.max(1);
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn outbox(&self) -> &NotificationOutbox {
        &self.outbox
    }

    /// Record `user_id`'s confirmation of `contract_id`.
    pub async fn confirm(
        &self,
        profile: &ConfirmationProfile,
        contract_id: &str,
        user_id: &str,
    ) -> Result<ConfirmOutcome, ConfirmError> {
        let (Ok(contract_id), Ok(user_id)) = (ContractId::parse(contract_id), UserId::parse(user_id))
        else {
            return Err(ConfirmError::missing_fields());
        };

        let (contract, both_accepted) = self
            .write_confirmation(profile, &contract_id, &user_id)
            .await?;

        info!(
            profile = profile.name(),
            contract_id = %contract_id,
            user_id = %user_id,
            both_accepted,
            version = contract.version,
            "contract confirmation recorded"
        );

        let cascade = if both_accepted {
            self.cascader.cascade_if_completed(&contract).await
        } else {
            CascadeOutcome::Skipped
        };

        let plan = plan_notifications(&contract, &user_id, both_accepted, profile.templates());
        let planned = plan.len();
        let notifications_enqueued = match self.outbox.enqueue(contract_id.clone(), plan) {
            Ok(batch_id) => {
                debug!(contract_id = %contract_id, %batch_id, planned, "notifications enqueued");
                planned
            }
            Err(err) => {
                warn!(contract_id = %contract_id, planned, error = %err, "notifications dropped");
                0
            }
        };

        Ok(ConfirmOutcome {
            contract,
            both_accepted,
            cascade,
            notifications_enqueued,
        })
    }

    async fn write_confirmation(
        &self,
        profile: &ConfirmationProfile,
        contract_id: &ContractId,
        user_id: &UserId,
    ) -> Result<(Contract, bool), ConfirmError> {
        for attempt in 1..=self.max_write_attempts {
            let current = match self.storage.get_contract(contract_id).await {
                Ok(Some(contract)) => contract,
                Ok(None) | Err(StoreError::NotFound(_)) => {
                    return Err(ConfirmError::NotFound(contract_id.clone()))
                }
                Err(err) => return Err(internal(contract_id, err)),
            };

            let transition = apply_confirmation(&current, user_id, profile.terminal_status())
                .map_err(|rejection| match rejection {
                    ConfirmationRejection::NotAParty => ConfirmError::Forbidden {
                        contract_id: contract_id.clone(),
                        user_id: user_id.clone(),
                    },
                    ConfirmationRejection::AlreadyConfirmed => ConfirmError::AlreadyConfirmed {
                        contract_id: contract_id.clone(),
                        user_id: user_id.clone(),
                    },
                })?;

            match self
                .storage
                .compare_and_swap_contract(transition.contract, current.version)
                .await
            {
                Ok(stored) => return Ok((stored, transition.both_accepted)),
                Err(err) if err.is_version_conflict() => {
                    debug!(
                        contract_id = %contract_id,
                        attempt,
                        expected = current.version,
                        "contract changed concurrently; retrying"
                    );
                }
                Err(StoreError::NotFound(_)) => {
                    return Err(ConfirmError::NotFound(contract_id.clone()))
                }
                Err(err) => return Err(internal(contract_id, err)),
            }
        }

        error!(
            contract_id = %contract_id,
            attempts = self.max_write_attempts,
            "gave up confirming contract after repeated version conflicts"
        );
        Err(ConfirmError::Internal(format!(
            "contract '{contract_id}' kept changing during confirmation"
        )))
    }
}

fn internal(contract_id: &ContractId, err: StoreError) -> ConfirmError {
    error!(contract_id = %contract_id, error = %err, "storage failure during confirmation");
    ConfirmError::Internal(err.to_string())
}
