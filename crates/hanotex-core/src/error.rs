use crate::ids::{ContractId, UserId};
use thiserror::Error;

/// Failures while normalizing CMS-shaped documents into domain records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' must not be empty")]
    EmptyId(&'static str),

    #[error("contract parties must be distinct users, got '{0}' twice")]
    SameParty(String),

    #[error("user '{0}' confirmed a contract they are not a party to")]
    ForeignConfirmation(String),

    #[error("status '{status}' is inconsistent with {confirmed} of 2 party confirmations")]
    InconsistentStatus { status: String, confirmed: usize },

    #[error("unknown proposal collection '{0}'")]
    UnknownProposalKind(String),

    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

/// Storage backend errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("version conflict on contract '{contract_id}': expected version {expected}")]
    VersionConflict {
        contract_id: ContractId,
        expected: u64,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

impl From<DocumentError> for StoreError {
    fn from(err: DocumentError) -> Self {
        Self::InvalidData(err.to_string())
    }
}

/// Outcome taxonomy of a contract confirmation request.
///
/// Each variant maps to exactly one HTTP status at the service boundary.
#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("contract '{0}' not found")]
    NotFound(ContractId),

    #[error("user '{user_id}' is not a party to contract '{contract_id}'")]
    Forbidden {
        contract_id: ContractId,
        user_id: UserId,
    },

    #[error("user '{user_id}' has already confirmed contract '{contract_id}'")]
    AlreadyConfirmed {
        contract_id: ContractId,
        user_id: UserId,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ConfirmError {
    pub fn missing_fields() -> Self {
        Self::InvalidRequest("contractId and userId are required".to_string())
    }
}

/// Rejected confirmation profile settings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile '{profile}' uses non-terminal status '{status}' as its terminal status")]
    NonTerminalStatus { profile: String, status: String },
}
