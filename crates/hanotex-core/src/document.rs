//! CMS-shaped documents and their conversion into domain records.

use crate::error::DocumentError;
use crate::ids::{ContractId, ProposalId, RecordRef};
use crate::types::{Contract, ContractStatus, Proposal, ProposalKind, ProposalRef, ProposalStatus};
use serde::{Deserialize, Serialize};

/// Contract as stored by the CMS: relations may be raw IDs or expanded
/// objects, and the proposal link is spread over three nullable fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractDocument {
    #[serde(default)]
    pub id: Option<RecordRef>,
    #[serde(default)]
    pub user_a: Option<RecordRef>,
    #[serde(default)]
    pub user_b: Option<RecordRef>,
    #[serde(default)]
    pub users_confirm: Vec<RecordRef>,
    #[serde(default)]
    pub status: Option<ContractStatus>,
    #[serde(default)]
    pub technology_propose: Option<RecordRef>,
    #[serde(default)]
    pub project_propose: Option<RecordRef>,
    #[serde(default)]
    pub propose: Option<RecordRef>,
}

impl ContractDocument {
    /// Normalize into a [`Contract`]. A missing `id` gets a generated one.
    pub fn into_contract(self) -> Result<Contract, DocumentError> {
        let id = match &self.id {
            Some(reference) => reference.to_contract("id")?,
            None => ContractId::generate(),
        };
        let user_a = self
            .user_a
            .as_ref()
            .ok_or(DocumentError::MissingField("user_a"))?
            .to_user("user_a")?;
        let user_b = self
            .user_b
            .as_ref()
            .ok_or(DocumentError::MissingField("user_b"))?
            .to_user("user_b")?;

        let proposal = ProposalRef::resolve(
            optional_proposal(self.technology_propose.as_ref()),
            optional_proposal(self.project_propose.as_ref()),
            optional_proposal(self.propose.as_ref()),
        );

        let mut contract = Contract::new(id, user_a, user_b, proposal)?;

        for reference in &self.users_confirm {
            let user = reference.to_user("users_confirm")?;
            if !contract.is_party(&user) {
                return Err(DocumentError::ForeignConfirmation(user.to_string()));
            }
            if !contract.has_confirmed(&user) {
                contract.users_confirm.push(user);
            }
        }

        if let Some(status) = self.status {
            contract.status = status;
        }

        // Terminal status and dual confirmation must agree.
        if contract.both_confirmed() != contract.status.is_terminal() {
            return Err(DocumentError::InconsistentStatus {
                status: contract.status.to_string(),
                confirmed: contract.users_confirm.len(),
            });
        }

        Ok(contract)
    }
}

fn optional_proposal(reference: Option<&RecordRef>) -> Option<ProposalId> {
    reference.and_then(RecordRef::id).map(ProposalId::new)
}

/// Proposal creation payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalDocument {
    #[serde(default)]
    pub id: Option<RecordRef>,
    #[serde(default)]
    pub status: Option<ProposalStatus>,
}

impl ProposalDocument {
    pub fn into_proposal(self, kind: ProposalKind) -> Result<Proposal, DocumentError> {
        let id = match &self.id {
            Some(reference) => reference.to_proposal("id")?,
            None => ProposalId::generate(),
        };
        Ok(Proposal::new(
            kind,
            id,
            self.status.unwrap_or(ProposalStatus::Pending),
        ))
    }
}
