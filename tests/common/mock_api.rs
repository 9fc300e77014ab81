use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::prelude::{BASE64_STANDARD, Engine as _};
use serde_json::{Value, json};
use tycho_types::boc::Boc;
use tycho_types::models::StdAddr;
use tycho_types::prelude::*;

use super::build_transaction;

type Response = (StatusCode, Json<Value>);

/// Minimal TON Center API v2 server.
pub struct MockTonCenter {
    pub url: String,
    pub state: Arc<MockState>,
    task: tokio::task::JoinHandle<()>,
}

#[derive(Default)]
pub struct MockState {
    /// `getAddressInformation` results by raw address.
    pub accounts: Mutex<HashMap<String, Value>>,
    /// `getTransactions` results by raw address.
    pub transactions: Mutex<HashMap<String, Vec<Value>>>,
    /// `runGetMethod` results by method name.
    pub getters: Mutex<HashMap<String, Value>>,
    pub get_method_requests: Mutex<Vec<Value>>,
    pub sent: Mutex<Vec<String>>,
    pub api_keys: Mutex<Vec<Option<String>>>,
}

impl MockTonCenter {
    pub async fn spawn() -> Self {
        let state = Arc::new(MockState::default());

        let router = Router::new()
            .route("/api/v2/getAddressInformation", get(get_address_information))
            .route("/api/v2/getTransactions", get(get_transactions))
            .route("/api/v2/runGetMethod", post(run_get_method))
            .route("/api/v2/sendBoc", post(send_boc))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/api/v2"),
            state,
            task,
        }
    }

    pub fn set_account(&self, address: &StdAddr, balance: u128, code: Option<&Cell>, last_lt: u64) {
        let result = json!({
            "@type": "raw.fullAccountState",
            "balance": balance.to_string(),
            "code": code.map(Boc::encode_base64).unwrap_or_default(),
            "data": "",
            "last_transaction_id": {
                "@type": "internal.transactionId",
                "lt": last_lt.to_string(),
                "hash": BASE64_STANDARD.encode([(last_lt % 251) as u8; 32]),
            },
            "state": if code.is_some() { "active" } else { "uninitialized" },
        });
        self.state
            .accounts
            .lock()
            .unwrap()
            .insert(address.to_string(), result);
    }

    pub fn push_transaction(&self, address: &StdAddr, lt: u64, aborted: bool, exit_code: i32) {
        let cell = build_transaction(&address.address, lt, 1_700_000_000, aborted, exit_code)
            .unwrap();
        let tx = json!({
            "@type": "raw.transaction",
            "utime": 1_700_000_000,
            "data": Boc::encode_base64(&cell),
            "transaction_id": {
                "@type": "internal.transactionId",
                "lt": lt.to_string(),
                "hash": BASE64_STANDARD.encode(cell.repr_hash().0),
            },
        });

        let mut transactions = self.state.transactions.lock().unwrap();
        transactions
            .entry(address.to_string())
            .or_default()
            .insert(0, tx);
    }

    pub fn set_getter(&self, method: &str, exit_code: i32, stack: Value) {
        let result = json!({
            "@type": "smc.runResult",
            "gas_used": 2000,
            "exit_code": exit_code,
            "stack": stack,
        });
        self.state
            .getters
            .lock()
            .unwrap()
            .insert(method.to_owned(), result);
    }

    pub fn sent_messages(&self) -> Vec<Cell> {
        let sent = self.state.sent.lock().unwrap();
        sent.iter()
            .map(|boc| Boc::decode_base64(boc).unwrap())
            .collect()
    }
}

impl Drop for MockTonCenter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn ok(result: Value) -> Response {
    (StatusCode::OK, Json(json!({ "ok": true, "result": result })))
}

fn error(status: StatusCode, message: &str) -> Response {
    let code = status.as_u16();
    (
        status,
        Json(json!({ "ok": false, "error": message, "code": code })),
    )
}

fn remember_api_key(state: &MockState, headers: &HeaderMap) {
    let key = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned);
    state.api_keys.lock().unwrap().push(key);
}

async fn get_address_information(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    remember_api_key(&state, &headers);
    let Some(address) = query.get("address") else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "address is required");
    };

    let accounts = state.accounts.lock().unwrap();
    match accounts.get(address) {
        Some(account) => ok(account.clone()),
        None => ok(json!({
            "@type": "raw.fullAccountState",
            "balance": "0",
            "code": "",
            "data": "",
            "last_transaction_id": {
                "@type": "internal.transactionId",
                "lt": "0",
                "hash": BASE64_STANDARD.encode([0u8; 32]),
            },
            "state": "uninitialized",
        })),
    }
}

async fn get_transactions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    remember_api_key(&state, &headers);
    let (Some(address), Some(limit)) = (query.get("address"), query.get("limit")) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "address and limit are required");
    };
    let Ok(limit) = limit.parse::<usize>() else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "invalid limit");
    };

    let transactions = state.transactions.lock().unwrap();
    let items = transactions
        .get(address)
        .map(|items| items.iter().take(limit).cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    ok(Value::Array(items))
}

async fn run_get_method(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    remember_api_key(&state, &headers);
    let method = request["method"].as_str().unwrap_or_default().to_owned();
    state.get_method_requests.lock().unwrap().push(request);

    let getters = state.getters.lock().unwrap();
    match getters.get(&method) {
        Some(result) => ok(result.clone()),
        None => error(
            StatusCode::SERVICE_UNAVAILABLE,
            "LITE_SERVER_UNKNOWN: cannot run get method",
        ),
    }
}

async fn send_boc(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    remember_api_key(&state, &headers);
    let Some(boc) = request["boc"].as_str() else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "boc is required");
    };
    if Boc::decode_base64(boc).is_err() {
        return error(StatusCode::BAD_REQUEST, "failed to parse boc");
    }

    state.sent.lock().unwrap().push(boc.to_owned());
    ok(json!({ "@type": "ok" }))
}
