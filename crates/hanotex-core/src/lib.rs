//! HANOTEX contract confirmation core.
//!
//! Two parties independently confirm a contract. Once both have confirmed the
//! contract becomes terminal, the linked proposal advances to
//! `contract_signed`, and the parties are notified through an outbox.

#![deny(unsafe_code)]

pub mod cascade;
pub mod confirmation;
pub mod document;
pub mod error;
pub mod flow;
pub mod ids;
pub mod notify;
pub mod outbox;
pub mod storage;
pub mod types;

pub use cascade::{CascadeOutcome, ProposalCascader};
pub use confirmation::{
    ConfirmOutcome, ConfirmationHandler, ConfirmationProfile, DEFAULT_MAX_WRITE_ATTEMPTS,
};
pub use document::{ContractDocument, ProposalDocument};
pub use error::{ConfirmError, DocumentError, ProfileError, StoreError};
pub use flow::{apply_confirmation, ConfirmationRejection, ConfirmationState, ConfirmationTransition};
pub use ids::{ContractId, ProposalId, RecordRef, ScalarId, UserId};
pub use notify::{
    plan_notifications, BatchItemError, BatchReport, Notification, NotificationDispatcher,
    NotificationPriority, NotificationTemplates, NotificationType, NotifyError,
};
pub use outbox::{NotificationOutbox, OutboxBatch, OutboxError};
pub use storage::{
    ContractStore, InMemoryStorage, PostgresStorage, ProposalStore, Storage, StorageConfig,
    StoreResult,
};
pub use types::{
    Contract, ContractStatus, Proposal, ProposalKind, ProposalRef, ProposalStatus,
};
