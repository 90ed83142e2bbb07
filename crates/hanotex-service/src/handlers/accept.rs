//! Accept-contract endpoints.

use crate::error::{ApiError, ApiResult};
use crate::state::ServiceState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Json;
use hanotex_core::confirmation::{ConfirmOutcome, ConfirmationProfile};
use hanotex_core::ids::RecordRef;
use hanotex_core::types::Contract;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Confirmation request; relations may be bare IDs, numbers or `{ id }`.
#[derive(Debug, Default, Deserialize)]
pub struct AcceptRequest {
    #[serde(rename = "contractId", default)]
    pub contract_id: Option<RecordRef>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<RecordRef>,
}

impl AcceptRequest {
    /// Decode a request body, unwrapping a `body` envelope that holds either
    /// an object or a JSON-encoded string.
    pub fn from_slice(raw: &[u8]) -> ApiResult<Self> {
        let mut value: Value = serde_json::from_slice(raw).map_err(invalid_json)?;

        let nested = value.get_mut("body").map(Value::take);
        match nested {
            Some(Value::String(encoded)) => {
                value = serde_json::from_str(&encoded).map_err(invalid_json)?;
            }
            Some(inner @ Value::Object(_)) => value = inner,
            _ => {}
        }

        if !value.is_object() {
            return Err(ApiError::bad_request(
                "Request body must be a JSON object with contractId and userId",
            ));
        }

        serde_json::from_value(value).map_err(invalid_json)
    }

    fn ids(&self) -> (String, String) {
        let id = |reference: &Option<RecordRef>| {
            reference
                .as_ref()
                .and_then(RecordRef::id)
                .unwrap_or_default()
        };
        (id(&self.contract_id), id(&self.user_id))
    }
}

fn invalid_json(err: serde_json::Error) -> ApiError {
    ApiError::bad_request(format!("Invalid JSON body: {err}"))
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub success: bool,
    pub contract: Contract,
    #[serde(rename = "bothAccepted")]
    pub both_accepted: bool,
    pub message: String,
}

impl From<ConfirmOutcome> for AcceptResponse {
    fn from(outcome: ConfirmOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message().to_string(),
            both_accepted: outcome.both_accepted,
            contract: outcome.contract,
        }
    }
}

pub async fn accept_contract(
    State(state): State<ServiceState>,
    body: Bytes,
) -> ApiResult<Json<AcceptResponse>> {
    accept(&state, &state.contract_profile, &body).await
}

pub async fn accept_technology_contract(
    State(state): State<ServiceState>,
    body: Bytes,
) -> ApiResult<Json<AcceptResponse>> {
    accept(&state, &state.technology_profile, &body).await
}

async fn accept(
    state: &ServiceState,
    profile: &ConfirmationProfile,
    body: &[u8],
) -> ApiResult<Json<AcceptResponse>> {
    let request = AcceptRequest::from_slice(body)?;
    let (contract_id, user_id) = request.ids();

    let outcome = state
        .confirmations
        .confirm(profile, &contract_id, &user_id)
        .await?;

    Ok(Json(outcome.into()))
}

/// `OPTIONS` on the accept endpoints; headers come from [`cors_headers`].
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Fixed CORS headers on every accept-endpoint response.
pub async fn cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_body_with_numeric_ids() {
        let request = AcceptRequest::from_slice(br#"{"contractId": 42, "userId": "U1"}"#).unwrap();
        assert_eq!(request.ids(), ("42".to_string(), "U1".to_string()));
    }

    #[test]
    fn nested_object_and_string_bodies() {
        let object =
            AcceptRequest::from_slice(br#"{"body": {"contractId": "c-1", "userId": {"id": "U2"}}}"#)
                .unwrap();
        assert_eq!(object.ids(), ("c-1".to_string(), "U2".to_string()));

        let encoded = AcceptRequest::from_slice(
            br#"{"body": "{\"contractId\":\"c-1\",\"userId\":\"U1\"}"}"#,
        )
        .unwrap();
        assert_eq!(encoded.ids(), ("c-1".to_string(), "U1".to_string()));
    }

    #[test]
    fn missing_ids_become_empty() {
        let request = AcceptRequest::from_slice(br#"{"contractId": "c-1"}"#).unwrap();
        assert_eq!(request.ids(), ("c-1".to_string(), String::new()));
    }

    #[test]
    fn malformed_json_is_bad_request() {
        let err = AcceptRequest::from_slice(b"{not json").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = AcceptRequest::from_slice(br#"{"body": "{broken"}"#).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn positional_bodies_are_rejected() {
        let err = AcceptRequest::from_slice(br#"["c-1", "U1"]"#).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = AcceptRequest::from_slice(br#"{"body": "[\"c-1\", \"U1\"]"}"#).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = AcceptRequest::from_slice(br#""c-1""#).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
