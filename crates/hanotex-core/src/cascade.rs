use crate::ids::ProposalId;
use crate::storage::Storage;
use crate::types::{Contract, ProposalKind, ProposalStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// What the cascade did for one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CascadeOutcome {
    /// Contract is not fully confirmed yet.
    Skipped,
    /// Contract links no proposal.
    NoProposal,
    Updated {
        kind: ProposalKind,
        id: ProposalId,
        previous: ProposalStatus,
    },
    AlreadySigned {
        kind: ProposalKind,
        id: ProposalId,
    },
    /// Linked proposal record does not exist.
    Missing {
        kind: ProposalKind,
        id: ProposalId,
    },
    Failed {
        kind: ProposalKind,
        id: ProposalId,
        reason: String,
    },
}

/// Mirrors contract completion onto the linked proposal.
///
/// Errors are logged and returned as [`CascadeOutcome::Failed`]; they never
/// propagate, since the contract write has already succeeded.
#[derive(Clone)]
pub struct ProposalCascader {
    storage: Arc<dyn Storage>,
}

impl ProposalCascader {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn cascade_if_completed(&self, contract: &Contract) -> CascadeOutcome {
        if !contract.both_confirmed() {
            return CascadeOutcome::Skipped;
        }

        let Some((kind, id)) = contract.proposal.target() else {
            return CascadeOutcome::NoProposal;
        };

        match self
            .storage
            .set_proposal_status(kind, id, ProposalStatus::ContractSigned)
            .await
        {
            Ok(Some(ProposalStatus::ContractSigned)) => CascadeOutcome::AlreadySigned {
                kind,
                id: id.clone(),
            },
            Ok(Some(previous)) => {
                info!(
                    contract_id = %contract.id,
                    proposal_kind = %kind,
                    proposal_id = %id,
                    previous = %previous,
                    "proposal advanced to contract_signed"
                );
                CascadeOutcome::Updated {
                    kind,
                    id: id.clone(),
                    previous,
                }
            }
            Ok(None) => {
                warn!(
                    contract_id = %contract.id,
                    proposal_kind = %kind,
                    proposal_id = %id,
                    "linked proposal not found; cascade skipped"
                );
                CascadeOutcome::Missing {
                    kind,
                    id: id.clone(),
                }
            }
            Err(err) => {
                warn!(
                    contract_id = %contract.id,
                    proposal_kind = %kind,
                    proposal_id = %id,
                    error = %err,
                    "proposal status cascade failed"
                );
                CascadeOutcome::Failed {
                    kind,
                    id: id.clone(),
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ContractId, UserId};
    use crate::storage::{InMemoryStorage, ProposalStore};
    use crate::types::{Proposal, ProposalRef};

    fn signed_contract(proposal: ProposalRef) -> Contract {
        let mut contract = Contract::new(
            ContractId::new("c-1"),
            UserId::new("U1"),
            UserId::new("U2"),
            proposal,
        )
        .unwrap();
        contract.users_confirm = vec![UserId::new("U1"), UserId::new("U2")];
        contract
    }

    #[tokio::test]
    async fn advances_linked_proposal_once() {
        let storage = Arc::new(InMemoryStorage::new());
        let id = ProposalId::new("t-1");
        storage
            .insert_proposal(Proposal::new(
                ProposalKind::Technology,
                id.clone(),
                ProposalStatus::Negotiating,
            ))
            .await
            .unwrap();
        let cascader = ProposalCascader::new(storage.clone());
        let contract = signed_contract(ProposalRef::Technology(id.clone()));

        assert_eq!(
            cascader.cascade_if_completed(&contract).await,
            CascadeOutcome::Updated {
                kind: ProposalKind::Technology,
                id: id.clone(),
                previous: ProposalStatus::Negotiating,
            }
        );
        assert_eq!(
            cascader.cascade_if_completed(&contract).await,
            CascadeOutcome::AlreadySigned {
                kind: ProposalKind::Technology,
                id: id.clone(),
            }
        );

        let stored = storage
            .get_proposal(ProposalKind::Technology, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ProposalStatus::ContractSigned);
    }

    #[tokio::test]
    async fn incomplete_or_unlinked_contracts_are_noops() {
        let cascader = ProposalCascader::new(Arc::new(InMemoryStorage::new()));

        let mut partial = signed_contract(ProposalRef::Generic(ProposalId::new("g-1")));
        partial.users_confirm.pop();
        assert_eq!(
            cascader.cascade_if_completed(&partial).await,
            CascadeOutcome::Skipped
        );

        assert_eq!(
            cascader
                .cascade_if_completed(&signed_contract(ProposalRef::None))
                .await,
            CascadeOutcome::NoProposal
        );
    }

    #[tokio::test]
    async fn missing_proposal_is_reported_not_raised() {
        let cascader = ProposalCascader::new(Arc::new(InMemoryStorage::new()));
        let contract = signed_contract(ProposalRef::Project(ProposalId::new("p-404")));

        assert!(matches!(
            cascader.cascade_if_completed(&contract).await,
            CascadeOutcome::Missing {
                kind: ProposalKind::Project,
                ..
            }
        ));
    }
}
