use super::json_body;
use crate::error::{ApiError, ApiResult, MSG_CONTRACT_NOT_FOUND};
use crate::state::ServiceState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hanotex_core::document::ContractDocument;
use hanotex_core::flow::ConfirmationState;
use hanotex_core::ids::ContractId;
use hanotex_core::storage::ContractStore;
use hanotex_core::types::Contract;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub contract: Contract,
}

#[derive(Debug, Serialize)]
pub struct ContractStateResponse {
    pub contract: Contract,
    pub state: &'static str,
}

/// Create a contract from a CMS-shaped document.
pub async fn create_contract(
    State(state): State<ServiceState>,
    payload: Result<Json<ContractDocument>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ContractResponse>)> {
    let contract = json_body(payload)?.into_contract()?;
    let contract = state.storage().insert_contract(contract).await?;

    info!(
        contract_id = %contract.id,
        user_a = %contract.user_a,
        user_b = %contract.user_b,
        "contract created"
    );

    Ok((StatusCode::CREATED, Json(ContractResponse { contract })))
}

pub async fn get_contract(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContractStateResponse>> {
    let not_found = || ApiError::NotFound(MSG_CONTRACT_NOT_FOUND.to_string());
    let id = ContractId::parse(&id).map_err(|_| not_found())?;

    let contract = state
        .storage()
        .get_contract(&id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(ContractStateResponse {
        state: ConfirmationState::of(&contract).name(),
        contract,
    }))
}
