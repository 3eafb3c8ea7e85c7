//! In-process stand-in for the backend HTTP API (auth, tables, storage),
//! enough for the reqwest adapters to run end to end.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use inventaris_testing::fixture::Fixture;

use crate::helpers::ADMIN_PASSWORD;

pub const ANON_KEY: &str = "anon-key";
pub const SERVICE_KEY: &str = "service-key";
pub const ACCESS_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.stub.signature";
pub const REFRESH_TOKEN: &str = "v1.stub-refresh-token";
pub const REFRESHED_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.refreshed.signature";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub apikey: Option<String>,
    pub bearer: Option<String>,
    pub prefer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub content_type: Option<String>,
    pub upsert: Option<String>,
    pub size: usize,
}

#[derive(Default)]
pub struct StubState {
    pub items: Vec<Value>,
    pub roles: Vec<Value>,
    pub profiles: Vec<Value>,
    pub objects: Vec<StoredObject>,
    pub requests: Vec<Recorded>,
    pub next_id: i64,
    pub refreshes: usize,
    pub logouts: usize,
}

type Shared = Arc<Mutex<StubState>>;

pub struct StubBackend {
    pub base_url: String,
    pub state: Shared,
}

impl StubBackend {
    /// Serve the golden rows on an ephemeral local port.
    pub async fn start() -> Self {
        let items: Vec<Value> = Fixture::rows("contracts/supabase/inventory_items.json");
        let next_id = items.iter().filter_map(|i| i["id"].as_i64()).max().unwrap_or(0) + 1;
        let state: Shared = Arc::new(Mutex::new(StubState {
            items,
            roles: Fixture::rows("contracts/supabase/user_roles.json"),
            profiles: Fixture::rows("contracts/supabase/profiles.json"),
            next_id,
            ..Default::default()
        }));

        let app = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/logout", post(logout))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/admin/users", post(admin_create_user))
            .route(
                "/rest/v1/inventory_items",
                get(list_items).post(insert_item).patch(update_item).delete(delete_item),
            )
            .route("/rest/v1/user_roles", get(list_roles))
            .route("/rest/v1/profiles", get(list_profiles))
            .route("/storage/v1/object/{bucket}", delete(remove_objects))
            .route("/storage/v1/object/{bucket}/{*path}", post(upload_object))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    pub fn item(&self, id: i64) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i["id"] == id)
            .cloned()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let recorded = Recorded {
        method: request.method().to_string(),
        path: request.uri().path().to_owned(),
        query: request.uri().query().unwrap_or_default().to_owned(),
        apikey: header(headers, "apikey"),
        bearer: header(headers, "authorization")
            .and_then(|v| v.strip_prefix("Bearer ").map(str::to_owned)),
        prefer: header(headers, "prefer"),
    };
    state.lock().unwrap().requests.push(recorded);
    next.run(request).await
}

fn error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn eq_filter<'a>(query: &'a HashMap<String, String>, column: &str) -> Option<&'a str> {
    query.get(column)?.strip_prefix("eq.")
}

// ── Auth ─────────────────────────────────────────────────────────────────────

async fn token(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let grant = Fixture::load("contracts/supabase/auth_token.json");
    match query.get("grant_type").map(String::as_str) {
        Some("password") if body["email"] == "admin@updl.test" && body["password"] == ADMIN_PASSWORD => {
            Json(grant).into_response()
        }
        Some("password") => error(
            StatusCode::BAD_REQUEST,
            json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
        ),
        Some("refresh_token") => {
            state.lock().unwrap().refreshes += 1;
            if body["refresh_token"] != REFRESH_TOKEN {
                return error(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid_grant", "error_description": "Invalid Refresh Token: Refresh Token Not Found" }),
                );
            }
            let mut refreshed = grant;
            refreshed["access_token"] = json!(REFRESHED_TOKEN);
            Json(refreshed).into_response()
        }
        _ => error(StatusCode::BAD_REQUEST, json!({ "msg": "unsupported grant type" })),
    }
}

async fn logout(State(state): State<Shared>) -> StatusCode {
    state.lock().unwrap().logouts += 1;
    StatusCode::NO_CONTENT
}

async fn signup(Json(body): Json<Value>) -> Response {
    Json(json!({
        "id": Uuid::new_v4(),
        "email": body["email"],
        "aud": "authenticated",
        "user_metadata": body["data"],
        "confirmation_sent_at": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

async fn admin_create_user(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if header(&headers, "authorization").as_deref() != Some(&format!("Bearer {SERVICE_KEY}")) {
        return error(StatusCode::FORBIDDEN, json!({ "msg": "User not allowed" }));
    }
    Json(json!({
        "id": Uuid::new_v4(),
        "email": body["email"],
        "email_confirmed_at": Utc::now().to_rfc3339(),
        "user_metadata": body["user_metadata"],
    }))
    .into_response()
}

// ── Tables ───────────────────────────────────────────────────────────────────

async fn list_items(State(state): State<Shared>) -> Json<Vec<Value>> {
    let mut items = state.lock().unwrap().items.clone();
    items.sort_by(|a, b| b["created_at"].as_str().cmp(&a["created_at"].as_str()));
    Json(items)
}

async fn insert_item(State(state): State<Shared>, Json(mut body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let now = Utc::now().to_rfc3339();
    body["id"] = json!(state.next_id);
    body["created_at"] = json!(now);
    body["updated_at"] = json!(now);
    state.next_id += 1;
    state.items.push(body.clone());
    (StatusCode::CREATED, Json(vec![body])).into_response()
}

async fn update_item(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Json<Vec<Value>> {
    let mut state = state.lock().unwrap();
    let Some(id) = eq_filter(&query, "id").and_then(|v| v.parse::<i64>().ok()) else {
        return Json(vec![]);
    };
    let Some(row) = state.items.iter_mut().find(|i| i["id"] == id) else {
        return Json(vec![]);
    };
    if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            row.insert(key.clone(), value.clone());
        }
    }
    Json(vec![row.clone()])
}

async fn delete_item(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    let mut state = state.lock().unwrap();
    let id = eq_filter(&query, "id").and_then(|v| v.parse::<i64>().ok());
    let (removed, kept): (Vec<Value>, Vec<Value>) = state
        .items
        .drain(..)
        .partition(|i| id.is_some_and(|id| i["id"] == id));
    state.items = kept;
    Json(removed)
}

async fn list_roles(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    let state = state.lock().unwrap();
    let user = eq_filter(&query, "user_id");
    Json(
        state
            .roles
            .iter()
            .filter(|r| user.is_none_or(|u| r["user_id"] == u))
            .cloned()
            .collect(),
    )
}

async fn list_profiles(State(state): State<Shared>) -> Json<Vec<Value>> {
    Json(state.lock().unwrap().profiles.clone())
}

// ── Storage ──────────────────────────────────────────────────────────────────

async fn upload_object(
    State(state): State<Shared>,
    Path((bucket, path)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let key = format!("{bucket}/{path}");
    state.lock().unwrap().objects.push(StoredObject {
        bucket,
        path,
        content_type: header(&headers, "content-type"),
        upsert: header(&headers, "x-upsert"),
        size: body.len(),
    });
    Json(json!({ "Key": key }))
}

async fn remove_objects(
    State(state): State<Shared>,
    Path(bucket): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let prefixes: Vec<String> = body["prefixes"]
        .as_array()
        .map(|a| a.iter().filter_map(|p| p.as_str().map(str::to_owned)).collect())
        .unwrap_or_default();
    state
        .lock()
        .unwrap()
        .objects
        .retain(|o| o.bucket != bucket || !prefixes.contains(&o.path));
    Json(json!([]))
}
