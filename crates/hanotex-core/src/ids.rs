//! Identifier newtypes and CMS reference normalization.
//!
//! CMS documents carry relations either as raw IDs (string or integer) or as
//! expanded objects with an `id` field. [`RecordRef`] accepts every shape and
//! collapses it into a typed identifier once, at the document boundary.

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier without validation.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Parse a caller-supplied identifier, rejecting blank input.
            pub fn parse(raw: &str) -> Result<Self, DocumentError> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(DocumentError::EmptyId($field));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// Contract document identifier.
    ContractId,
    "contractId"
);
string_id!(
    /// User identifier.
    UserId,
    "userId"
);
string_id!(
    /// Proposal identifier, unique within its proposal collection.
    ProposalId,
    "proposalId"
);

/// Scalar ID as stored by the CMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarId {
    Text(String),
    Number(i64),
}

impl ScalarId {
    fn normalized(&self) -> Option<String> {
        match self {
            Self::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Number(number) => Some(number.to_string()),
        }
    }
}

/// A relation as it arrives from the CMS: a bare ID or an expanded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordRef {
    Id(ScalarId),
    Expanded { id: ScalarId },
}

impl RecordRef {
    /// Normalized string form of the referenced ID, `None` when blank.
    pub fn id(&self) -> Option<String> {
        match self {
            Self::Id(id) | Self::Expanded { id } => id.normalized(),
        }
    }

    pub fn to_user(&self, field: &'static str) -> Result<UserId, DocumentError> {
        self.id().map(UserId::new).ok_or(DocumentError::EmptyId(field))
    }

    pub fn to_contract(&self, field: &'static str) -> Result<ContractId, DocumentError> {
        self.id()
            .map(ContractId::new)
            .ok_or(DocumentError::EmptyId(field))
    }

    pub fn to_proposal(&self, field: &'static str) -> Result<ProposalId, DocumentError> {
        self.id()
            .map(ProposalId::new)
            .ok_or(DocumentError::EmptyId(field))
    }
}

impl From<&str> for RecordRef {
    fn from(value: &str) -> Self {
        Self::Id(ScalarId::Text(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_ref_accepts_all_cms_shapes() {
        let raw: RecordRef = serde_json::from_value(json!("u-1")).unwrap();
        let numeric: RecordRef = serde_json::from_value(json!(42)).unwrap();
        let expanded: RecordRef =
            serde_json::from_value(json!({ "id": "u-1", "email": "a@b.c", "roles": ["admin"] }))
                .unwrap();
        let expanded_numeric: RecordRef = serde_json::from_value(json!({ "id": 42 })).unwrap();

        assert_eq!(raw.id().as_deref(), Some("u-1"));
        assert_eq!(numeric.id().as_deref(), Some("42"));
        assert_eq!(expanded.id(), raw.id());
        assert_eq!(expanded_numeric.id(), numeric.id());
    }

    #[test]
    fn blank_references_normalize_to_none() {
        let blank: RecordRef = serde_json::from_value(json!("   ")).unwrap();
        assert_eq!(blank.id(), None);
        assert_eq!(
            blank.to_user("user_a").unwrap_err(),
            DocumentError::EmptyId("user_a")
        );
    }

    #[test]
    fn parse_trims_and_rejects_blank() {
        assert_eq!(UserId::parse("  u-7 ").unwrap().as_str(), "u-7");
        assert_eq!(
            ContractId::parse(" ").unwrap_err(),
            DocumentError::EmptyId("contractId")
        );
    }
}
