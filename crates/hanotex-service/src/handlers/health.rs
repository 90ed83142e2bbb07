use crate::state::ServiceState;
use axum::extract::State;
use axum::Json;
use hanotex_core::storage::Storage;
use serde_json::{json, Value};

pub async fn health_check(State(state): State<ServiceState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "hanotex-service",
        "storage_backend": state.storage().backend_label(),
    }))
}
