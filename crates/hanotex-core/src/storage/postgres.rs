//! PostgreSQL storage implementation

use super::traits::*;
use crate::error::StoreError;
use crate::ids::{ContractId, ProposalId, UserId};
use crate::types::{Contract, ContractStatus, Proposal, ProposalKind, ProposalRef, ProposalStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

/// PostgreSQL-backed contract and proposal storage.
///
/// Compare-and-swap is a single conditional `UPDATE` on the `version`
/// column, so two confirmations racing on one contract cannot both win.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(format!("postgres connect failed: {e}")))?;

        let storage = Self { pool };
        storage.ensure_schema().await?;
        Ok(storage)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hanotex_contracts (
                id TEXT PRIMARY KEY,
                user_a TEXT NOT NULL,
                user_b TEXT NOT NULL,
                users_confirm TEXT[] NOT NULL DEFAULT '{}',
                status TEXT NOT NULL,
                proposal_kind TEXT NULL,
                proposal_id TEXT NULL,
                version BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("postgres schema create failed: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hanotex_proposals (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                status TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (kind, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("postgres schema create failed: {e}")))?;

        Ok(())
    }
}

impl Storage for PostgresStorage {
    fn backend_label(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl ContractStore for PostgresStorage {
    async fn get_contract(&self, id: &ContractId) -> StoreResult<Option<Contract>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_a, user_b, users_confirm, status, proposal_kind, proposal_id,
                   version, created_at, updated_at
            FROM hanotex_contracts
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("postgres contract load failed: {e}")))?;

        row.as_ref().map(decode_contract).transpose()
    }

    async fn insert_contract(&self, contract: Contract) -> StoreResult<Contract> {
        let (proposal_kind, proposal_id) = split_proposal(&contract.proposal);
        let version = version_to_db(contract.version)?;

        let result = sqlx::query(
            r#"
            INSERT INTO hanotex_contracts (
                id, user_a, user_b, users_confirm, status, proposal_kind, proposal_id,
                version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(contract.id.as_str())
        .bind(contract.user_a.as_str())
        .bind(contract.user_b.as_str())
        .bind(users_to_db(&contract.users_confirm))
        .bind(contract.status.as_str())
        .bind(proposal_kind)
        .bind(proposal_id)
        .bind(version)
        .bind(contract.created_at)
        .bind(contract.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("postgres contract insert failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "contract '{}' already exists",
                contract.id
            )));
        }
        Ok(contract)
    }

    async fn compare_and_swap_contract(
        &self,
        contract: Contract,
        expected_version: u64,
    ) -> StoreResult<Contract> {
        let expected = version_to_db(expected_version)?;

        let row = sqlx::query(
            r#"
            UPDATE hanotex_contracts
            SET users_confirm = $2,
                status = $3,
                version = version + 1,
                updated_at = $4
            WHERE id = $1 AND version = $5
            RETURNING id, user_a, user_b, users_confirm, status, proposal_kind, proposal_id,
                      version, created_at, updated_at
            "#,
        )
        .bind(contract.id.as_str())
        .bind(users_to_db(&contract.users_confirm))
        .bind(contract.status.as_str())
        .bind(Utc::now())
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("postgres contract update failed: {e}")))?;

        match row {
            Some(row) => decode_contract(&row),
            None => {
                // Zero rows: either the contract vanished or another writer won.
                if self.get_contract(&contract.id).await?.is_none() {
                    Err(StoreError::NotFound(format!("contract '{}'", contract.id)))
                } else {
                    Err(StoreError::VersionConflict {
                        contract_id: contract.id,
                        expected: expected_version,
                    })
                }
            }
        }
    }
}

#[async_trait]
impl ProposalStore for PostgresStorage {
    async fn get_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
    ) -> StoreResult<Option<Proposal>> {
        let row = sqlx::query(
            "SELECT kind, id, status, updated_at FROM hanotex_proposals WHERE kind = $1 AND id = $2",
        )
        .bind(kind.collection())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("postgres proposal load failed: {e}")))?;

        row.as_ref().map(decode_proposal).transpose()
    }

    async fn insert_proposal(&self, proposal: Proposal) -> StoreResult<Proposal> {
        let result = sqlx::query(
            r#"
            INSERT INTO hanotex_proposals (kind, id, status, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, id) DO NOTHING
            "#,
        )
        .bind(proposal.kind.collection())
        .bind(proposal.id.as_str())
        .bind(proposal.status.as_str())
        .bind(proposal.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("postgres proposal insert failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "{} '{}' already exists",
                proposal.kind, proposal.id
            )));
        }
        Ok(proposal)
    }

    async fn set_proposal_status(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        status: ProposalStatus,
    ) -> StoreResult<Option<ProposalStatus>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Connection(format!("postgres begin failed: {e}")))?;

        let previous: Option<String> = sqlx::query_scalar(
            "SELECT status FROM hanotex_proposals WHERE kind = $1 AND id = $2 FOR UPDATE",
        )
        .bind(kind.collection())
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StoreError::Query(format!("postgres proposal lock failed: {e}")))?;

        let Some(previous) = previous else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE hanotex_proposals SET status = $3, updated_at = $4 WHERE kind = $1 AND id = $2",
        )
        .bind(kind.collection())
        .bind(id.as_str())
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Query(format!("postgres proposal update failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Query(format!("postgres commit failed: {e}")))?;

        Ok(Some(previous.parse::<ProposalStatus>()?))
    }
}

fn users_to_db(users: &[UserId]) -> Vec<String> {
    users.iter().map(|user| user.as_str().to_string()).collect()
}

fn version_to_db(version: u64) -> Result<i64, StoreError> {
    version
        .try_into()
        .map_err(|_| StoreError::InvalidData("contract version exceeds BIGINT range".to_string()))
}

fn split_proposal(proposal: &ProposalRef) -> (Option<&'static str>, Option<&str>) {
    match proposal.target() {
        Some((kind, id)) => (Some(kind.collection()), Some(id.as_str())),
        None => (None, None),
    }
}

fn join_proposal(kind: Option<String>, id: Option<String>) -> Result<ProposalRef, StoreError> {
    match (kind, id) {
        (Some(kind), Some(id)) => Ok(ProposalRef::new(
            kind.parse::<ProposalKind>()?,
            ProposalId::new(id),
        )),
        (None, None) => Ok(ProposalRef::None),
        _ => Err(StoreError::InvalidData(
            "proposal_kind and proposal_id must be set together".to_string(),
        )),
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::InvalidData(format!("postgres decode {name} failed: {e}")))
}

fn decode_contract(row: &PgRow) -> Result<Contract, StoreError> {
    let status: String = column(row, "status")?;
    let version: i64 = column(row, "version")?;
    let users: Vec<String> = column(row, "users_confirm")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;
    let updated_at: DateTime<Utc> = column(row, "updated_at")?;

    Ok(Contract {
        id: ContractId::new(column::<String>(row, "id")?),
        user_a: UserId::new(column::<String>(row, "user_a")?),
        user_b: UserId::new(column::<String>(row, "user_b")?),
        users_confirm: users.into_iter().map(UserId::new).collect(),
        status: status.parse::<ContractStatus>()?,
        proposal: join_proposal(column(row, "proposal_kind")?, column(row, "proposal_id")?)?,
        version: version
            .try_into()
            .map_err(|_| StoreError::InvalidData("negative contract version".to_string()))?,
        created_at,
        updated_at,
    })
}

fn decode_proposal(row: &PgRow) -> Result<Proposal, StoreError> {
    let kind: String = column(row, "kind")?;
    let status: String = column(row, "status")?;

    Ok(Proposal {
        kind: kind.parse::<ProposalKind>()?,
        id: ProposalId::new(column::<String>(row, "id")?),
        status: status.parse::<ProposalStatus>()?,
        updated_at: column(row, "updated_at")?,
    })
}
