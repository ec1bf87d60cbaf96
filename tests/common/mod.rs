// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fake storefront backend and client wiring shared by the integration tests.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shopease_session::config::Config;
use shopease_session::routes::RecordingNavigator;
use shopease_session::store::{MemoryTokenStore, TokenStore};
use shopease_session::Storefront;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Secret the fake backend signs with. The client never sees it.
const SECRET: &[u8] = b"fake_backend_signing_key_32_byte";

static NEXT_JTI: AtomicU64 = AtomicU64::new(1);

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn mint(username: &str, token_type: &str, exp_offset_secs: i64) -> String {
    let now = now_secs();
    let claims = json!({
        "token_type": token_type,
        "exp": now + exp_offset_secs,
        "iat": now,
        "jti": NEXT_JTI.fetch_add(1, Ordering::SeqCst),
        "user_id": user_id(username),
        "username": username,
        "email": format!("{}@example.com", username),
    });
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .expect("Failed to create JWT")
}

/// Access token for `username` expiring `exp_offset_secs` from now.
#[allow(dead_code)]
pub fn mint_access(username: &str, exp_offset_secs: i64) -> String {
    mint(username, "access", exp_offset_secs)
}

/// Refresh token for `username`, valid for a day.
#[allow(dead_code)]
pub fn mint_refresh(username: &str) -> String {
    mint(username, "refresh", 86400)
}

/// Unexpired access token for `username` signed with a key the backend
/// does not accept, i.e. one the server has revoked.
#[allow(dead_code)]
pub fn mint_revoked(username: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "token_type": "access",
            "exp": now_secs() + 300,
            "user_id": user_id(username),
            "username": username,
        }),
        &EncodingKey::from_secret(b"some_other_signing_key_32_bytes!"),
    )
    .expect("Failed to create JWT")
}

fn user_id(username: &str) -> u64 {
    match username {
        "alice" => 1,
        "bob" => 2,
        _ => 99,
    }
}

/// How the refresh endpoint answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum RefreshMode {
    Issue,
    Reject,
    ServerError,
}

/// Knobs and counters of the fake backend.
pub struct BackendState {
    pub users: Mutex<HashMap<String, String>>,
    pub refresh_mode: Mutex<RefreshMode>,
    pub refresh_delay: Mutex<Duration>,
    pub login_delays: Mutex<HashMap<String, Duration>>,
    /// Protected endpoints answer 401 to every token.
    pub reject_all_access: AtomicBool,
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub protected_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub last_bearer: Mutex<Option<String>>,
}

impl Default for BackendState {
    fn default() -> Self {
        let mut users = HashMap::new();
        users.insert("alice".to_string(), "wonderland".to_string());
        users.insert("bob".to_string(), "builder".to_string());
        Self {
            users: Mutex::new(users),
            refresh_mode: Mutex::new(RefreshMode::Issue),
            refresh_delay: Mutex::new(Duration::ZERO),
            login_delays: Mutex::new(HashMap::new()),
            reject_all_access: AtomicBool::new(false),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            protected_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            last_bearer: Mutex::new(None),
        }
    }
}

#[allow(dead_code)]
impl BackendState {
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn protected_calls(&self) -> usize {
        self.protected_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.refresh_mode.lock() = mode;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock() = delay;
    }

    pub fn set_login_delay(&self, username: &str, delay: Duration) {
        self.login_delays.lock().insert(username.to_string(), delay);
    }

    pub fn reject_all_access(&self) {
        self.reject_all_access.store(true, Ordering::SeqCst);
    }
}

fn token_claims(token: &str, token_type: &str) -> Option<Value> {
    let data = decode::<Value>(
        token,
        &DecodingKey::from_secret(SECRET),
        &Validation::new(Algorithm::HS256),
    )
    .ok()?;
    (data.claims["token_type"] == token_type).then_some(data.claims)
}

fn token_not_valid() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "detail": "Given token not valid for any token type",
            "code": "token_not_valid"
        })),
    )
        .into_response()
}

/// Username behind the bearer credential, or the 401 to send back.
fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<String, Response> {
    state.protected_calls.fetch_add(1, Ordering::SeqCst);

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    *state.last_bearer.lock() = token.clone();

    if state.reject_all_access.load(Ordering::SeqCst) {
        return Err(token_not_valid());
    }

    token
        .as_deref()
        .and_then(|t| token_claims(t, "access"))
        .and_then(|claims| claims["username"].as_str().map(str::to_string))
        .ok_or_else(token_not_valid)
}

async fn obtain_token(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();

    let delay = state.login_delays.lock().get(&username).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if username.is_empty() || password.is_empty() {
        let mut errors = serde_json::Map::new();
        if username.is_empty() {
            errors.insert("username".into(), json!(["This field may not be blank."]));
        }
        if password.is_empty() {
            errors.insert("password".into(), json!(["This field may not be blank."]));
        }
        return (StatusCode::BAD_REQUEST, Json(Value::Object(errors))).into_response();
    }

    let valid = state.users.lock().get(&username) == Some(&password);
    if !valid {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response();
    }

    Json(json!({
        "access": mint_access(&username, 300),
        "refresh": mint_refresh(&username),
    }))
    .into_response()
}

async fn refresh_token(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *state.refresh_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mode = *state.refresh_mode.lock();
    match mode {
        RefreshMode::ServerError => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"detail": "Service temporarily unavailable"})),
        )
            .into_response(),
        RefreshMode::Reject => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
        )
            .into_response(),
        RefreshMode::Issue => {
            let username = body["refresh"]
                .as_str()
                .and_then(|t| token_claims(t, "refresh"))
                .and_then(|claims| claims["username"].as_str().map(str::to_string));
            match username {
                Some(username) => {
                    Json(json!({"access": mint_access(&username, 300)})).into_response()
                }
                None => token_not_valid(),
            }
        }
    }
}

async fn register(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.register_calls.fetch_add(1, Ordering::SeqCst);
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default().to_string();

    if !email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"email": ["Enter a valid email address."]})),
        )
            .into_response();
    }
    if state.users.lock().contains_key(&username) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"username": ["A user with that username already exists."]})),
        )
            .into_response();
    }

    state.users.lock().insert(username.clone(), password);
    (
        StatusCode::CREATED,
        Json(json!({"username": username, "email": email})),
    )
        .into_response()
}

fn profile_json(username: &str, address: &str) -> Value {
    json!({
        "id": user_id(username) + 100,
        "user": {
            "id": user_id(username),
            "username": username,
            "email": format!("{}@example.com", username),
            "first_name": "",
            "last_name": ""
        },
        "address": address,
        "phone_number": "555-0100"
    })
}

async fn get_profile(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers) {
        Ok(username) => Json(profile_json(&username, "1 Main St")).into_response(),
        Err(response) => response,
    }
}

async fn patch_profile(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    match authorize(&state, &headers) {
        Ok(username) => {
            let address = body["address"].as_str().unwrap_or("1 Main St");
            Json(profile_json(&username, address)).into_response()
        }
        Err(response) => response,
    }
}

fn product_json(id: u64) -> Value {
    json!({
        "id": id,
        "name": format!("Product {}", id),
        "description": "A fine product",
        "price": "19.99",
        "stock": 5,
        "category": {"id": 1, "name": "Gadgets"},
        "image_url": null,
        "created_at": "2026-01-01T00:00:00Z"
    })
}

fn cart_json(items: &[(u64, u64, u32)]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|(id, product, quantity)| {
            json!({"id": id, "product": product_json(*product), "quantity": quantity})
        })
        .collect();
    json!({"id": 1, "items": items, "total": "39.98"})
}

async fn list_products(Query(params): Query<HashMap<String, String>>) -> Response {
    let results: Vec<Value> = match params.get("search").map(String::as_str) {
        Some("none") => Vec::new(),
        _ => vec![product_json(1), product_json(2)],
    };
    Json(json!({
        "count": results.len(),
        "next": null,
        "previous": null,
        "results": results
    }))
    .into_response()
}

async fn list_categories() -> Response {
    // Unpaginated on purpose
    Json(json!([{"id": 1, "name": "Gadgets"}, {"id": 2, "name": "Books"}])).into_response()
}

async fn get_cart(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers) {
        Ok(_) => Json(cart_json(&[(10, 1, 2)])).into_response(),
        Err(response) => response,
    }
}

async fn add_cart_item(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    match authorize(&state, &headers) {
        Ok(_) => {
            let product = body["product_id"].as_u64().unwrap_or(1);
            let quantity = body["quantity"].as_u64().unwrap_or(1) as u32;
            Json(cart_json(&[(10, 1, 2), (11, product, quantity)])).into_response()
        }
        Err(response) => response,
    }
}

async fn update_cart_item(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(item_id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    match authorize(&state, &headers) {
        Ok(_) => {
            let quantity = body["quantity"].as_u64().unwrap_or(1) as u32;
            Json(cart_json(&[(item_id, 1, quantity)])).into_response()
        }
        Err(response) => response,
    }
}

async fn remove_cart_item(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(_item_id): Path<u64>,
) -> Response {
    match authorize(&state, &headers) {
        Ok(_) => Json(cart_json(&[])).into_response(),
        Err(response) => response,
    }
}

fn order_json(id: u64, username: &str, body: &Value) -> Value {
    json!({
        "id": id,
        "user": {"id": user_id(username), "username": username},
        "full_name": body["full_name"].as_str().unwrap_or("Alice Liddell"),
        "email": body["email"].as_str().unwrap_or("alice@example.com"),
        "address": body["address"].as_str().unwrap_or("1 Main St"),
        "phone_number": body["phone_number"].as_str().unwrap_or("555-0100"),
        "status": "pending",
        "total_amount": "39.98",
        "items": [{"id": 1, "product": product_json(1), "quantity": 2, "price": "19.99"}],
        "created_at": "2026-01-02T00:00:00Z"
    })
}

async fn list_orders(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers) {
        Ok(username) => Json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [order_json(7, &username, &Value::Null)]
        }))
        .into_response(),
        Err(response) => response,
    }
}

async fn get_order(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(order_id): Path<u64>,
) -> Response {
    match authorize(&state, &headers) {
        Ok(_) if order_id != 7 => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Not found."})),
        )
            .into_response(),
        Ok(username) => Json(order_json(order_id, &username, &Value::Null)).into_response(),
        Err(response) => response,
    }
}

async fn create_order(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    match authorize(&state, &headers) {
        Ok(_) if body["phone_number"].as_str().unwrap_or_default().is_empty() => (
            StatusCode::BAD_REQUEST,
            Json(json!({"phone_number": ["This field may not be blank."]})),
        )
            .into_response(),
        Ok(username) => {
            (StatusCode::CREATED, Json(order_json(8, &username, &body))).into_response()
        }
        Err(response) => response,
    }
}

/// A running fake backend.
pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

/// Start a fake backend on an ephemeral local port.
pub async fn spawn_backend() -> FakeBackend {
    let state = Arc::new(BackendState::default());

    let app = Router::new()
        .route("/api/token/", post(obtain_token))
        .route("/api/token/refresh/", post(refresh_token))
        .route("/api/register/", post(register))
        .route("/api/profile/", get(get_profile).patch(patch_profile))
        .route("/api/products/", get(list_products))
        .route("/api/categories/", get(list_categories))
        .route("/api/cart/", get(get_cart))
        .route("/api/cart/items/", post(add_cart_item))
        .route(
            "/api/cart/items/{item_id}/",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/api/orders/", get(list_orders).post(create_order))
        .route("/api/orders/{order_id}/", get(get_order))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake backend");
    let addr = listener.local_addr().expect("No local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fake backend crashed");
    });

    FakeBackend {
        base_url: format!("http://{}/api", addr),
        state,
    }
}

/// Client wired against a fake backend.
pub struct TestClient {
    pub backend: FakeBackend,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub app: Storefront,
}

/// Client with an empty token store.
#[allow(dead_code)]
pub async fn test_client() -> TestClient {
    test_client_with_store(MemoryTokenStore::new()).await
}

/// Client over a pre-seeded token store.
pub async fn test_client_with_store(store: MemoryTokenStore) -> TestClient {
    let backend = spawn_backend().await;
    let store = Arc::new(store);
    let navigator = Arc::new(RecordingNavigator::new());

    let mut config = Config::with_base_url(&backend.base_url).expect("Invalid base url");
    config.request_timeout = Duration::from_secs(5);

    let app = Storefront::new(config, store.clone(), navigator.clone())
        .expect("Failed to build client");

    TestClient {
        backend,
        store,
        navigator,
        app,
    }
}

/// Client already signed in as `alice` with a valid token pair.
#[allow(dead_code)]
pub async fn signed_in_client() -> TestClient {
    let store = MemoryTokenStore::with_tokens(
        Some(mint_access("alice", 300)),
        Some(mint_refresh("alice")),
    );
    let client = test_client_with_store(store).await;
    client.app.start().await;
    client
}

/// Client whose session was restored with a token the backend now rejects.
///
/// The stored token is still valid locally, so restore signs in; every
/// protected call then hits the refresh path.
#[allow(dead_code)]
pub async fn client_with_stale_token() -> TestClient {
    let client = signed_in_client().await;
    let refresh = client.store.load().refresh_token;
    client
        .store
        .save(&mint_revoked("alice"), refresh.as_deref())
        .expect("Failed to seed store");
    client
}
