use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::state::ServiceState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hanotex_core::document::ProposalDocument;
use hanotex_core::ids::ProposalId;
use hanotex_core::storage::ProposalStore;
use hanotex_core::types::{Proposal, ProposalKind};
use tracing::info;

fn parse_kind(kind: &str) -> ApiResult<ProposalKind> {
    kind.parse::<ProposalKind>()
        .map_err(|_| ApiError::NotFound(format!("unknown proposal collection '{kind}'")))
}

pub async fn create_proposal(
    State(state): State<ServiceState>,
    Path(kind): Path<String>,
    payload: Result<Json<ProposalDocument>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Proposal>)> {
    let kind = parse_kind(&kind)?;
    let proposal = json_body(payload)?.into_proposal(kind)?;
    let proposal = state.storage().insert_proposal(proposal).await?;

    info!(
        proposal_kind = %proposal.kind,
        proposal_id = %proposal.id,
        status = %proposal.status,
        "proposal created"
    );

    Ok((StatusCode::CREATED, Json(proposal)))
}

pub async fn get_proposal(
    State(state): State<ServiceState>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Json<Proposal>> {
    let kind = parse_kind(&kind)?;
    let not_found = || ApiError::NotFound(format!("proposal '{id}' not found in '{kind}'"));
    let proposal_id = ProposalId::parse(&id).map_err(|_| not_found())?;

    state
        .storage()
        .get_proposal(kind, &proposal_id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}
