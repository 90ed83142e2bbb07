//! Storage trait definitions

use crate::error::StoreError;
use crate::ids::{ContractId, ProposalId};
use crate::types::{Contract, Proposal, ProposalKind, ProposalStatus};
use async_trait::async_trait;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Combined storage trait
pub trait Storage: ContractStore + ProposalStore + Send + Sync {
    /// Short backend name for health output and logs
    fn backend_label(&self) -> &'static str;
}

/// Storage for contracts
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Get a contract by ID
    async fn get_contract(&self, id: &ContractId) -> StoreResult<Option<Contract>>;

    /// Insert a new contract, failing with `Conflict` if the ID is taken
    async fn insert_contract(&self, contract: Contract) -> StoreResult<Contract>;

    /// Replace the confirmation state of a contract if its stored version
    /// still equals `expected_version`.
    ///
    /// Only `users_confirm` and `status` are written. On success the stored
    /// version is `expected_version + 1` and the stored contract is returned;
    /// a stale version yields `StoreError::VersionConflict`.
    async fn compare_and_swap_contract(
        &self,
        contract: Contract,
        expected_version: u64,
    ) -> StoreResult<Contract>;
}

/// Storage for the three proposal collections
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Get a proposal by collection and ID
    async fn get_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
    ) -> StoreResult<Option<Proposal>>;

    /// Insert a new proposal, failing with `Conflict` if the ID is taken
    async fn insert_proposal(&self, proposal: Proposal) -> StoreResult<Proposal>;

    /// Set a proposal's status, returning the previous status or `None` if
    /// the proposal does not exist
    async fn set_proposal_status(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        status: ProposalStatus,
    ) -> StoreResult<Option<ProposalStatus>>;
}
