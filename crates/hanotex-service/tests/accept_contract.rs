//! End-to-end confirmation flow over a real listener.

use hanotex_adapters::RecordingDispatcher;
use hanotex_core::notify::NotificationType;
use hanotex_core::storage::InMemoryStorage;
use hanotex_service::config::WorkflowConfig;
use hanotex_service::{build_router, ServiceState};
use serde_json::{json, Value};
use std::sync::Arc;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    state: ServiceState,
}

impl TestServer {
    async fn start(dispatcher: RecordingDispatcher) -> Self {
        let state = ServiceState::new(
            Arc::new(InMemoryStorage::new()),
            Arc::new(dispatcher),
            &WorkflowConfig::default(),
            32,
        )
        .unwrap();
        let app = build_router(state.clone(), true);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            state,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn project_contract_signs_cascades_and_notifies() {
    let recorder = RecordingDispatcher::new();
    let server = TestServer::start(recorder.clone()).await;

    let (status, _) = server
        .post("/proposals/project-propose", json!({ "id": 501, "status": "negotiating" }))
        .await;
    assert_eq!(status, 201);

    let (status, created) = server
        .post(
            "/contract",
            json!({
                "user_a": { "id": "alice", "email": "alice@example.com" },
                "user_b": { "id": "bob" },
                "technology_propose": null,
                "project_propose": { "id": 501 },
                "propose": "g-1"
            }),
        )
        .await;
    assert_eq!(status, 201);
    let contract_id = created["contract"]["id"].as_str().unwrap().to_string();
    assert_eq!(
        created["contract"]["proposal"],
        json!({ "kind": "project", "id": "501" })
    );

    let (status, first) = server
        .post(
            "/contract/accept-contract",
            json!({ "body": { "contractId": contract_id, "userId": "bob" } }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(first["bothAccepted"], false);

    let (_, state) = server.get(&format!("/contract/{contract_id}")).await;
    assert_eq!(state["state"], "partially_confirmed");

    let (status, second) = server
        .post(
            "/contract/accept-contract",
            json!({ "contractId": contract_id, "userId": "alice" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(second["success"], true);
    assert_eq!(second["bothAccepted"], true);
    assert_eq!(second["contract"]["status"], "signed");
    assert_eq!(second["contract"]["users_confirm"], json!(["bob", "alice"]));

    let (status, proposal) = server.get("/proposals/project-propose/501").await;
    assert_eq!(status, 200);
    assert_eq!(proposal["status"], "contract_signed");

    let (_, generic) = server.get("/proposals/propose/g-1").await;
    assert!(generic["error"].is_string());

    server.state.outbox().flush().await.unwrap();
    let recorded = recorder.recorded().await;
    let summary: Vec<(String, NotificationType)> = recorded
        .iter()
        .map(|n| (n.user.to_string(), n.kind))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("alice".to_string(), NotificationType::Contract),
            ("alice".to_string(), NotificationType::Success),
            ("bob".to_string(), NotificationType::Success),
        ]
    );
    assert!(recorded
        .iter()
        .all(|n| n.action_url == format!("/contracts/{contract_id}")));
}

#[tokio::test]
async fn concurrent_acceptance_over_http_signs_once() {
    let server = TestServer::start(RecordingDispatcher::new()).await;
    server
        .post("/contract", json!({ "id": "race", "user_a": "U1", "user_b": "U2" }))
        .await;

    let (a, b) = tokio::join!(
        server.post(
            "/technology-propose/accept-contract",
            json!({ "contractId": "race", "userId": "U1" }),
        ),
        server.post(
            "/technology-propose/accept-contract",
            json!({ "contractId": "race", "userId": "U2" }),
        ),
    );
    assert_eq!((a.0, b.0), (200, 200));
    let both = [&a.1, &b.1]
        .iter()
        .filter(|body| body["bothAccepted"] == true)
        .count();
    assert_eq!(both, 1);

    let (_, stored) = server.get("/contract/race").await;
    assert_eq!(stored["contract"]["status"], "completed");
    assert_eq!(stored["state"], "fully_signed");
}
