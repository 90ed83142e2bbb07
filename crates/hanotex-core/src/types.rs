use crate::error::DocumentError;
use crate::ids::{ContractId, ProposalId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contract lifecycle status.
///
/// `Signed` and `Completed` are both terminal; which one a confirmation writes
/// is decided by the route's confirmation profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Pending,
    Signed,
    Completed,
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Signed | Self::Completed)
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = DocumentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "signed" => Ok(Self::Signed),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DocumentError::UnknownStatus(other.to_string())),
        }
    }
}

/// The three proposal collections a contract can originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    Technology,
    Project,
    Generic,
}

impl ProposalKind {
    pub const ALL: [ProposalKind; 3] = [Self::Technology, Self::Project, Self::Generic];

    /// CMS collection slug.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Technology => "technology-propose",
            Self::Project => "project-propose",
            Self::Generic => "propose",
        }
    }
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for ProposalKind {
    type Err = DocumentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection() == value)
            .ok_or_else(|| DocumentError::UnknownProposalKind(value.to_string()))
    }
}

/// Link from a contract to the proposal it settles.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ProposalRef {
    Technology(ProposalId),
    Project(ProposalId),
    Generic(ProposalId),
    #[default]
    None,
}

impl ProposalRef {
    /// Resolve the three nullable CMS relations, first populated one wins.
    pub fn resolve(
        technology: Option<ProposalId>,
        project: Option<ProposalId>,
        generic: Option<ProposalId>,
    ) -> Self {
        if let Some(id) = technology {
            Self::Technology(id)
        } else if let Some(id) = project {
            Self::Project(id)
        } else if let Some(id) = generic {
            Self::Generic(id)
        } else {
            Self::None
        }
    }

    pub fn new(kind: ProposalKind, id: ProposalId) -> Self {
        match kind {
            ProposalKind::Technology => Self::Technology(id),
            ProposalKind::Project => Self::Project(id),
            ProposalKind::Generic => Self::Generic(id),
        }
    }

    pub fn target(&self) -> Option<(ProposalKind, &ProposalId)> {
        match self {
            Self::Technology(id) => Some((ProposalKind::Technology, id)),
            Self::Project(id) => Some((ProposalKind::Project, id)),
            Self::Generic(id) => Some((ProposalKind::Generic, id)),
            Self::None => None,
        }
    }
}

/// Two-party agreement requiring independent confirmation from both parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub user_a: UserId,
    pub user_b: UserId,
    /// Parties that have confirmed, in confirmation order, without duplicates.
    pub users_confirm: Vec<UserId>,
    pub status: ContractStatus,
    pub proposal: ProposalRef,
    /// Write counter used for compare-and-swap updates.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(
        id: ContractId,
        user_a: UserId,
        user_b: UserId,
        proposal: ProposalRef,
    ) -> Result<Self, DocumentError> {
        if user_a == user_b {
            return Err(DocumentError::SameParty(user_a.to_string()));
        }
        let now = Utc::now();
        Ok(Self {
            id,
            user_a,
            user_b,
            users_confirm: Vec::new(),
            status: ContractStatus::Pending,
            proposal,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn parties(&self) -> [&UserId; 2] {
        [&self.user_a, &self.user_b]
    }

    pub fn is_party(&self, user: &UserId) -> bool {
        self.user_a == *user || self.user_b == *user
    }

    pub fn has_confirmed(&self, user: &UserId) -> bool {
        self.users_confirm.iter().any(|confirmed| confirmed == user)
    }

    /// The other party of the contract, `None` for non-parties.
    pub fn counterparty(&self, user: &UserId) -> Option<&UserId> {
        if self.user_a == *user {
            Some(&self.user_b)
        } else if self.user_b == *user {
            Some(&self.user_a)
        } else {
            None
        }
    }

    pub fn both_confirmed(&self) -> bool {
        self.parties()
            .into_iter()
            .all(|party| self.has_confirmed(party))
    }
}

/// Proposal status as mirrored from contract progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Negotiating,
    ContractSigned,
    Rejected,
    Cancelled,
}

impl ProposalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Negotiating => "negotiating",
            Self::ContractSigned => "contract_signed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = DocumentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "negotiating" => Ok(Self::Negotiating),
            "contract_signed" => Ok(Self::ContractSigned),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DocumentError::UnknownStatus(other.to_string())),
        }
    }
}

/// A technology, project or generic proposal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub kind: ProposalKind,
    pub id: ProposalId,
    pub status: ProposalStatus,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn new(kind: ProposalKind, id: ProposalId, status: ProposalStatus) -> Self {
        Self {
            kind,
            id,
            status,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_ref_resolution_is_first_match_wins() {
        let resolved = ProposalRef::resolve(
            Some(ProposalId::new("t-1")),
            Some(ProposalId::new("p-1")),
            Some(ProposalId::new("g-1")),
        );
        assert_eq!(resolved, ProposalRef::Technology(ProposalId::new("t-1")));

        let resolved = ProposalRef::resolve(None, None, Some(ProposalId::new("g-1")));
        assert_eq!(
            resolved.target(),
            Some((ProposalKind::Generic, &ProposalId::new("g-1")))
        );

        assert_eq!(ProposalRef::resolve(None, None, None), ProposalRef::None);
    }

    #[test]
    fn proposal_kind_parses_collection_slugs() {
        for kind in ProposalKind::ALL {
            assert_eq!(kind.collection().parse::<ProposalKind>().unwrap(), kind);
        }
        assert!("auction".parse::<ProposalKind>().is_err());
    }

    #[test]
    fn contract_rejects_identical_parties() {
        let err = Contract::new(
            ContractId::new("c-1"),
            UserId::new("u-1"),
            UserId::new("u-1"),
            ProposalRef::None,
        )
        .unwrap_err();
        assert_eq!(err, DocumentError::SameParty("u-1".to_string()));
    }

    #[test]
    fn counterparty_is_symmetric() {
        let contract = Contract::new(
            ContractId::new("c-1"),
            UserId::new("u-1"),
            UserId::new("u-2"),
            ProposalRef::None,
        )
        .unwrap();
        assert_eq!(
            contract.counterparty(&UserId::new("u-1")),
            Some(&UserId::new("u-2"))
        );
        assert_eq!(
            contract.counterparty(&UserId::new("u-2")),
            Some(&UserId::new("u-1"))
        );
        assert_eq!(contract.counterparty(&UserId::new("u-3")), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(ContractStatus::Signed.is_terminal());
        assert!(ContractStatus::Completed.is_terminal());
        assert!(!ContractStatus::Pending.is_terminal());
        assert_eq!(
            serde_json::to_value(ProposalStatus::ContractSigned).unwrap(),
            serde_json::json!("contract_signed")
        );
    }
}
