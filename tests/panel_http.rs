//! HTTP contract tests for the outbound clients.
//!
//! Each test spins up an Axum stub on a random port that plays the panel
//! cloud, the chat gateway or the on-site converter, and records what the
//! real clients sent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use access_relay::access::types::AuditEvent;
use access_relay::channels::{ChatProChannel, NotificationGateway};
use access_relay::config::{ChatProConfig, PanelConfig};
use access_relay::error::RemoteError;
use access_relay::panel::{
    ConverterClient, HttpConverterClient, RemoteDirectoryClient, RemotePanelClient, SegwareClient,
};

const BEARER: &str = "static-bearer";

/// Everything the stub saw, in arrival order.
#[derive(Default)]
struct Seen {
    auth_calls: AtomicUsize,
    requests: Mutex<Vec<(String, Option<String>, Value)>>,
}

impl Seen {
    fn push(&self, what: impl Into<String>, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((what.into(), auth, body));
    }

    fn requests(&self) -> Vec<(String, Option<String>, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

type Stub = Arc<Seen>;

// ── Stub handlers ───────────────────────────────────────────────────

/// First session is already stale; every later one is valid.
async fn auth(State(seen): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> String {
    let n = seen.auth_calls.fetch_add(1, Ordering::SeqCst);
    seen.push("auth", &headers, body);
    if n == 0 {
        "\"stale\"".into()
    } else {
        "\"fresh\"".into()
    }
}

async fn command(
    State(seen): State<Stub>,
    Path((account, reader, command)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> StatusCode {
    seen.push(format!("command {account}/{reader}/{command}"), &headers, Value::Null);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer fresh") => StatusCode::OK,
        _ => StatusCode::UNAUTHORIZED,
    }
}

async fn account(
    State(seen): State<Stub>,
    Path(account): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    seen.push(format!("account {account}"), &headers, Value::Null);
    if account == "missing" {
        return (StatusCode::NOT_FOUND, Json(Value::Null)).into_response();
    }
    Json(json!({ "accountCode": "0042", "companyId": 9, "tradeName": "Condomínio" })).into_response()
}

async fn receiver(
    State(seen): State<Stub>,
    Path((account, receiver)): Path<(String, String)>,
    headers: HeaderMap,
) -> Json<Value> {
    seen.push(format!("receiver {account}/{receiver}"), &headers, Value::Null);
    Json(json!({ "name": "Portão social", "id": 12 }))
}

async fn events(State(seen): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    seen.push("events", &headers, body);
    StatusCode::CREATED
}

async fn dwellers(
    State(seen): State<Stub>,
    Path(account): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    let page = query.get("page").cloned().unwrap_or_default();
    let size = query.get("pageSize").cloned().unwrap_or_default();
    seen.push(format!("dwellers {account} {page} {size}"), &headers, Value::Null);
    Json(json!({
        "content": [
            { "name": "Ana", "phones": [{ "phone": "+55 11 98765-4321" }] },
            { "name": "Bia", "phones": [] }
        ],
        "lastPage": page == "1",
        "totalElements": 2
    }))
}

async fn send_message(
    State(seen): State<Stub>,
    Path(instance): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let instance_id = query.get("instance_id").cloned().unwrap_or_default();
    seen.push(format!("send {instance} {instance_id}"), &headers, body);
    StatusCode::OK
}

async fn open_gate(
    State(seen): State<Stub>,
    Path((account, partition)): Path<(String, String)>,
    headers: HeaderMap,
) -> Json<Value> {
    seen.push(format!("open {account}/{partition}"), &headers, Value::Null);
    Json(json!({ "opened": true }))
}

/// Start the stub on a random port, return (base_url, port, seen).
async fn start_stub() -> (String, u16, Stub) {
    let seen: Stub = Arc::new(Seen::default());
    let app = Router::new()
        .route("/auth", post(auth))
        .route(
            "/v1/accounts/{account}/readers/{reader}/commands/{command}",
            post(command),
        )
        .route("/v5/accounts/{account}", get(account))
        .route("/v1/accounts/{account}/receivers/{receiver}", get(receiver))
        .route("/v2/events/accessControl", post(events))
        .route("/v5/accounts/{account}/dwellers", get(dwellers))
        .route("/{instance}/api/v1/send_message", post(send_message))
        .route(
            "/conversor_get_post/portao/open/{account}/{partition}",
            get(open_gate),
        )
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), port, seen)
}

fn segware(base_url: &str) -> SegwareClient {
    SegwareClient::new(PanelConfig {
        api_base_url: base_url.to_string(),
        auth_url: format!("{base_url}/auth"),
        username: "operator".into(),
        password: SecretString::from("hunter2"),
        bearer_token: SecretString::from(BEARER),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

// ── Panel ───────────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_session_is_dropped_and_renewed() {
    let (base_url, _, seen) = start_stub().await;
    let client = segware(&base_url);

    let first = client.issue_command("1001", "7", "3").await;
    assert!(matches!(
        first,
        Err(RemoteError::Status { status: 401, .. })
    ));

    client.issue_command("1001", "7", "3").await.unwrap();
    client.issue_command("1001", "7", "3").await.unwrap();
    assert_eq!(seen.auth_calls.load(Ordering::SeqCst), 2);

    let requests = seen.requests();
    let (what, auth, body) = &requests[0];
    assert_eq!(what, "auth");
    assert!(auth.as_deref().unwrap().starts_with("Basic "));
    assert_eq!(body, &json!({ "type": "WEB" }));
    assert!(
        requests
            .iter()
            .any(|(what, _, _)| what == "command 1001/7/3")
    );
}

#[tokio::test]
async fn metadata_uses_both_auth_schemes() {
    let (base_url, _, seen) = start_stub().await;
    let client = segware(&base_url);

    let account = client.get_account_metadata("1001").await.unwrap().unwrap();
    assert_eq!(account.account_code, "0042");
    assert_eq!(account.company_id, json!(9));

    let receiver = client
        .get_receiver_metadata("1001", "12")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(receiver.name, "Portão social");

    let requests = seen.requests();
    let bearer_for = |prefix: &str| {
        requests
            .iter()
            .find(|(what, _, _)| what.starts_with(prefix))
            .and_then(|(_, auth, _)| auth.clone())
    };
    assert_eq!(bearer_for("account").as_deref(), Some("Bearer static-bearer"));
    assert_eq!(bearer_for("receiver").as_deref(), Some("Bearer stale"));
}

#[tokio::test]
async fn unknown_account_is_none() {
    let (base_url, _, _) = start_stub().await;
    let client = segware(&base_url);
    assert_eq!(client.get_account_metadata("missing").await.unwrap(), None);
}

#[tokio::test]
async fn audit_event_is_wrapped_in_events_array() {
    let (base_url, _, seen) = start_stub().await;
    let client = segware(&base_url);

    let event = AuditEvent {
        account: "0042".into(),
        code: "W417".into(),
        company_id: json!(9),
        complement: "Nome: Ana, Telefone: 5511987654321".into(),
        event_id: "167618000".into(),
        protocol_type: "CONTACT_ID".into(),
        receiver_description: Some("Portão social".into()),
        partition: None,
    };
    client.submit_audit_event(&event).await.unwrap();

    let requests = seen.requests();
    let (_, auth, body) = requests.iter().find(|(w, _, _)| w == "events").unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer static-bearer"));
    assert_eq!(
        body,
        &json!({
            "events": [{
                "account": "0042",
                "code": "W417",
                "companyId": 9,
                "complement": "Nome: Ana, Telefone: 5511987654321",
                "eventId": "167618000",
                "protocolType": "CONTACT_ID",
                "receiverDescription": "Portão social"
            }]
        })
    );
}

#[tokio::test]
async fn dweller_pages_carry_paging_query() {
    let (base_url, _, seen) = start_stub().await;
    let client = segware(&base_url);

    let first = client.list_dwellers("1001", 0, 500).await.unwrap();
    assert!(!first.is_last_page);
    assert_eq!(first.records.len(), 2);
    assert_eq!(first.records[0].phones[0].phone, "+55 11 98765-4321");
    assert!(first.records[1].phones.is_empty());

    let second = client.list_dwellers("1001", 1, 500).await.unwrap();
    assert!(second.is_last_page);

    let pages: Vec<String> = seen.requests().into_iter().map(|(w, _, _)| w).collect();
    assert_eq!(pages, vec!["dwellers 1001 0 500", "dwellers 1001 1 500"]);
}

// ── Chat gateway ────────────────────────────────────────────────────

#[tokio::test]
async fn chatpro_send_uses_raw_token_and_instance() {
    let (base_url, _, seen) = start_stub().await;
    let channel = ChatProChannel::new(ChatProConfig {
        base_url,
        instance_id: "chatpro-abc".into(),
        bearer_token: SecretString::from("raw-token"),
    });

    channel
        .send("5511987654321@s.whatsapp.net", "✅ *Acesso Concedido*")
        .await
        .unwrap();

    let requests = seen.requests();
    let (what, auth, body) = &requests[0];
    assert_eq!(what, "send chatpro-abc chatpro-abc");
    assert_eq!(auth.as_deref(), Some("raw-token"));
    assert_eq!(
        body,
        &json!({ "number": "5511987654321@s.whatsapp.net", "message": "✅ *Acesso Concedido*" })
    );
}

// ── Converter ───────────────────────────────────────────────────────

#[tokio::test]
async fn converter_opens_on_server_port() {
    let (_, port, seen) = start_stub().await;
    let converter = HttpConverterClient::new("http://127.0.0.1", Duration::from_secs(5)).unwrap();

    let data = converter
        .open_gate(&port.to_string(), "0042", "01")
        .await
        .unwrap();
    assert_eq!(data, json!({ "opened": true }));
    assert_eq!(seen.requests()[0].0, "open 0042/01");
}
