//! In-memory storage implementation

use super::traits::*;
use crate::error::StoreError;
use crate::ids::{ContractId, ProposalId};
use crate::types::{Contract, Proposal, ProposalKind, ProposalStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage for development and testing.
///
/// Compare-and-swap holds the contracts write guard across the version check
/// and the write, so concurrent confirmations of one contract serialize.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    contracts: Arc<RwLock<HashMap<ContractId, Contract>>>,
    proposals: Arc<RwLock<HashMap<(ProposalKind, ProposalId), Proposal>>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    fn backend_label(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl ContractStore for InMemoryStorage {
    async fn get_contract(&self, id: &ContractId) -> StoreResult<Option<Contract>> {
        let contracts = self.contracts.read().await;
        Ok(contracts.get(id).cloned())
    }

    async fn insert_contract(&self, contract: Contract) -> StoreResult<Contract> {
        let mut contracts = self.contracts.write().await;
        if contracts.contains_key(&contract.id) {
            return Err(StoreError::Conflict(format!(
                "contract '{}' already exists",
                contract.id
            )));
        }
        contracts.insert(contract.id.clone(), contract.clone());
        Ok(contract)
    }

    async fn compare_and_swap_contract(
        &self,
        contract: Contract,
        expected_version: u64,
    ) -> StoreResult<Contract> {
        let mut contracts = self.contracts.write().await;
        let stored = contracts
            .get_mut(&contract.id)
            .ok_or_else(|| StoreError::NotFound(format!("contract '{}'", contract.id)))?;

        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                contract_id: contract.id,
                expected: expected_version,
            });
        }

        stored.users_confirm = contract.users_confirm;
        stored.status = contract.status;
        stored.version = expected_version + 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

#[async_trait]
impl ProposalStore for InMemoryStorage {
    async fn get_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
    ) -> StoreResult<Option<Proposal>> {
        let proposals = self.proposals.read().await;
        Ok(proposals.get(&(kind, id.clone())).cloned())
    }

    async fn insert_proposal(&self, proposal: Proposal) -> StoreResult<Proposal> {
        let mut proposals = self.proposals.write().await;
        let key = (proposal.kind, proposal.id.clone());
        if proposals.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "{} '{}' already exists",
                proposal.kind, proposal.id
            )));
        }
        proposals.insert(key, proposal.clone());
        Ok(proposal)
    }

    async fn set_proposal_status(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        status: ProposalStatus,
    ) -> StoreResult<Option<ProposalStatus>> {
        let mut proposals = self.proposals.write().await;
        Ok(proposals.get_mut(&(kind, id.clone())).map(|proposal| {
            let previous = proposal.status;
            proposal.status = status;
            proposal.updated_at = Utc::now();
            previous
        }))
    }
}
