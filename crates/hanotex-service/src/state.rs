//! Shared application state

use crate::config::{ServiceConfig, WorkflowConfig};
use crate::error::ServiceResult;
use hanotex_core::confirmation::{ConfirmationHandler, ConfirmationProfile};
use hanotex_core::notify::NotificationDispatcher;
use hanotex_core::outbox::NotificationOutbox;
use hanotex_core::storage::Storage;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ServiceState {
    pub confirmations: ConfirmationHandler,
    pub contract_profile: Arc<ConfirmationProfile>,
    pub technology_profile: Arc<ConfirmationProfile>,
}

impl ServiceState {
    /// Connect storage, start the outbox worker and build both profiles.
    pub async fn bootstrap(config: &ServiceConfig) -> ServiceResult<Self> {
        let storage = config.storage.bootstrap().await?;
        let dispatcher = config.notifications.dispatcher.build()?;

        info!(
            storage_backend = storage.backend_label(),
            dispatcher = dispatcher.name(),
            "service state ready"
        );

        Self::new(
            storage,
            dispatcher,
            &config.workflow,
            config.notifications.outbox_capacity,
        )
    }

    /// Must be called inside a tokio runtime; spawns the outbox worker.
    pub fn new(
        storage: Arc<dyn Storage>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        workflow: &WorkflowConfig,
        outbox_capacity: usize,
    ) -> ServiceResult<Self> {
        let outbox = NotificationOutbox::spawn(dispatcher, outbox_capacity);
        let confirmations = ConfirmationHandler::new(storage, outbox)
            .with_max_write_attempts(workflow.max_write_attempts);

        Ok(Self {
            confirmations,
            contract_profile: Arc::new(workflow.contract.to_profile("contract")?),
            technology_profile: Arc::new(
                workflow
                    .technology_propose
                    .to_profile("technology_propose")?,
            ),
        })
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        self.confirmations.storage()
    }

    pub fn outbox(&self) -> &NotificationOutbox {
        self.confirmations.outbox()
    }
}
