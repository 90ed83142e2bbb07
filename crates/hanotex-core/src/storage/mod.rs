//! Storage layer for contracts and proposals.
//!
//! Backends implement [`Storage`]; the service picks one from
//! [`StorageConfig`] at startup.

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryStorage;
pub use postgres::PostgresStorage;
pub use traits::{ContractStore, ProposalStore, Storage, StoreResult};

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storage backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Keep contracts and proposals in process memory only.
    #[default]
    Memory,
    /// Persist contracts and proposals in PostgreSQL.
    Postgres {
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_max_connections() -> u32 {
    5
}

impl StorageConfig {
    pub fn postgres(url: impl Into<String>, max_connections: u32) -> Self {
        Self::Postgres {
            url: url.into(),
            max_connections,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }

    /// Connect the configured backend.
    pub async fn bootstrap(&self) -> Result<Arc<dyn Storage>, StoreError> {
        match self {
            Self::Memory => Ok(Arc::new(InMemoryStorage::new())),
            Self::Postgres {
                url,
                max_connections,
            } => Ok(Arc::new(
                PostgresStorage::connect(url, *max_connections).await?,
            )),
        }
    }
}
