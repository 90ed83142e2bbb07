//! Notification outbox.
//!
//! Confirmations enqueue their notification plan after the contract write
//! has committed; a background worker delivers batches in order. Enqueueing
//! never blocks the request path and delivery problems never reach it.

use crate::ids::ContractId;
use crate::notify::{Notification, NotificationDispatcher};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("notification outbox is full")]
    Full,

    #[error("notification outbox worker has stopped")]
    Closed,
}

/// Notifications produced by one confirmation.
#[derive(Debug, Clone)]
pub struct OutboxBatch {
    pub batch_id: Uuid,
    pub contract_id: ContractId,
    pub notifications: Vec<Notification>,
}

enum OutboxMessage {
    Deliver(OutboxBatch),
    Flush(oneshot::Sender<()>),
}

/// Handle to the outbox worker. Cloning shares the same queue.
#[derive(Clone)]
pub struct NotificationOutbox {
    tx: mpsc::Sender<OutboxMessage>,
    dispatcher_name: &'static str,
}

impl NotificationOutbox {
    /// Spawn the delivery worker on the current tokio runtime.
    pub fn spawn(dispatcher: Arc<dyn NotificationDispatcher>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let dispatcher_name = dispatcher.name();
        tokio::spawn(run_worker(dispatcher, rx));
        Self {
            tx,
            dispatcher_name,
        }
    }

    pub fn dispatcher_name(&self) -> &'static str {
        self.dispatcher_name
    }

    /// Queue a batch for delivery. Empty batches are accepted and skipped.
    pub fn enqueue(
        &self,
        contract_id: ContractId,
        notifications: Vec<Notification>,
    ) -> Result<Uuid, OutboxError> {
        let batch_id = Uuid::new_v4();
        if notifications.is_empty() {
            return Ok(batch_id);
        }

        self.tx
            .try_send(OutboxMessage::Deliver(OutboxBatch {
                batch_id,
                contract_id,
                notifications,
            }))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => OutboxError::Full,
                mpsc::error::TrySendError::Closed(_) => OutboxError::Closed,
            })?;

        Ok(batch_id)
    }

    /// Wait until every batch queued before this call has been handled.
    pub async fn flush(&self) -> Result<(), OutboxError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(OutboxMessage::Flush(ack_tx))
            .await
            .map_err(|_| OutboxError::Closed)?;
        ack_rx.await.map_err(|_| OutboxError::Closed)
    }
}

async fn run_worker(
    dispatcher: Arc<dyn NotificationDispatcher>,
    mut rx: mpsc::Receiver<OutboxMessage>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            OutboxMessage::Deliver(batch) => deliver(dispatcher.as_ref(), batch).await,
            OutboxMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("notification outbox closed");
}

async fn deliver(dispatcher: &dyn NotificationDispatcher, batch: OutboxBatch) {
    let outcome = AssertUnwindSafe(dispatcher.dispatch_batch(&batch.notifications))
        .catch_unwind()
        .await;

    match outcome {
        Ok(report) if report.failed == 0 => {
            info!(
                batch_id = %batch.batch_id,
                contract_id = %batch.contract_id,
                dispatcher = dispatcher.name(),
                created = report.created,
                "notifications delivered"
            );
        }
        Ok(report) => {
            warn!(
                batch_id = %batch.batch_id,
                contract_id = %batch.contract_id,
                dispatcher = dispatcher.name(),
                created = report.created,
                failed = report.failed,
                errors = ?report.errors,
                "notification batch partially failed"
            );
        }
        Err(_) => {
            warn!(
                batch_id = %batch.batch_id,
                contract_id = %batch.contract_id,
                dispatcher = dispatcher.name(),
                "notification dispatcher panicked; batch dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;
    use crate::notify::{NotificationPriority, NotificationType, NotifyError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl NotificationDispatcher for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct Panics;

    #[async_trait]
    impl NotificationDispatcher for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }

        async fn dispatch(&self, _notification: &Notification) -> Result<(), NotifyError> {
            panic!("dispatcher bug");
        }
    }

    fn notification(user: &str) -> Notification {
        Notification {
            user: UserId::new(user),
            title: "t".to_string(),
            message: "m".to_string(),
            kind: NotificationType::Info,
            action_url: "/".to_string(),
            priority: NotificationPriority::Normal,
        }
    }

    #[tokio::test]
    async fn flush_waits_for_queued_batches() {
        let recorder = Arc::new(Recorder::default());
        let outbox = NotificationOutbox::spawn(recorder.clone(), 8);

        outbox
            .enqueue(ContractId::new("c-1"), vec![notification("U1")])
            .unwrap();
        outbox
            .enqueue(ContractId::new("c-2"), vec![notification("U2"), notification("U3")])
            .unwrap();
        outbox.flush().await.unwrap();

        let users: Vec<String> = recorder
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.user.to_string())
            .collect();
        assert_eq!(users, vec!["U1", "U2", "U3"]);
    }

    #[tokio::test]
    async fn panicking_dispatcher_does_not_stop_the_worker() {
        let outbox = NotificationOutbox::spawn(Arc::new(Panics), 4);

        outbox
            .enqueue(ContractId::new("c-1"), vec![notification("U1")])
            .unwrap();
        outbox.flush().await.unwrap();

        outbox
            .enqueue(ContractId::new("c-1"), vec![notification("U2")])
            .unwrap();
        outbox.flush().await.unwrap();
    }
}
