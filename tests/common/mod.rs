//! In-process stand-in for the clinic HTTP API.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const SECRET: &[u8] = b"fake-clinic-signing-key";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

struct StaffAccount {
    username: String,
    password_hash: String,
    role: String,
}

#[derive(Default)]
pub struct FakeClinic {
    accounts: Mutex<Vec<StaffAccount>>,
    patients: Mutex<Vec<Value>>,
    list_override: Mutex<Option<Value>>,
    hits: Mutex<Vec<String>>,
}

impl FakeClinic {
    /// Makes `GET /patients/` answer 200 with `payload` instead of the list.
    pub fn answer_list_with(&self, payload: Value) {
        *self.list_override.lock().unwrap() = Some(payload);
    }

    pub fn seed_patient(&self, patient: Value) {
        self.patients.lock().unwrap().push(patient);
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self, prefix: &str) -> usize {
        self.hits().iter().filter(|h| h.starts_with(prefix)).count()
    }

    fn hit(&self, line: String) {
        self.hits.lock().unwrap().push(line);
    }
}

/// Serves the fake API on an ephemeral port and returns its `/api` base URL.
pub async fn spawn(clinic: Arc<FakeClinic>) -> String {
    let app = Router::new()
        .route("/api/token/", post(obtain_token))
        .route("/api/users/", post(register_user))
        .route("/api/patients/", get(list_patients).post(create_patient))
        .route("/api/patients/{id}/", patch(update_patient))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(clinic);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake clinic API");
    let addr = listener.local_addr().expect("listener has an address");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Fake clinic API failed");
    });

    format!("http://{addr}/api")
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn issue_access_token(username: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs() as usize;
    let claims = Claims {
        sub: username.to_string(),
        exp: now + 3600,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET))
        .expect("token encodes")
}

fn authorize(headers: &HeaderMap) -> Result<Claims, Response> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            detail(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            )
        })?;

    decode::<Claims>(token, &DecodingKey::from_secret(SECRET), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| detail(StatusCode::UNAUTHORIZED, "Given token not valid"))
}

#[derive(Deserialize)]
struct TokenRequest {
    username: String,
    password: String,
}

async fn obtain_token(
    State(clinic): State<Arc<FakeClinic>>,
    Json(payload): Json<TokenRequest>,
) -> Response {
    clinic.hit("POST /token/".to_string());

    let role = {
        let accounts = clinic.accounts.lock().unwrap();
        accounts
            .iter()
            .find(|a| a.username == payload.username)
            .filter(|a| {
                PasswordHash::new(&a.password_hash)
                    .map(|hash| {
                        Argon2::default()
                            .verify_password(payload.password.as_bytes(), &hash)
                            .is_ok()
                    })
                    .unwrap_or(false)
            })
            .map(|a| a.role.clone())
    };

    match role {
        Some(role) => (
            StatusCode::OK,
            Json(json!({
                "access": issue_access_token(&payload.username),
                "refresh": Uuid::new_v4().to_string(),
                "user": { "username": payload.username, "role": role },
            })),
        )
            .into_response(),
        None => detail(
            StatusCode::UNAUTHORIZED,
            "No active account found with the given credentials",
        ),
    }
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
    role: Option<String>,
    email: Option<String>,
}

async fn register_user(
    State(clinic): State<Arc<FakeClinic>>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    clinic.hit("POST /users/".to_string());

    if payload.password.len() < 8 {
        return detail(
            StatusCode::BAD_REQUEST,
            "Ensure this field has at least 8 characters.",
        );
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = match Argon2::default().hash_password(payload.password.as_bytes(), &salt) {
        Ok(hash) => hash.to_string(),
        Err(_) => return detail(StatusCode::INTERNAL_SERVER_ERROR, "hashing failed"),
    };

    let mut accounts = clinic.accounts.lock().unwrap();
    if accounts.iter().any(|a| a.username == payload.username) {
        return detail(
            StatusCode::BAD_REQUEST,
            "A user with that username already exists.",
        );
    }

    let role = payload.role.clone().unwrap_or_default();
    accounts.push(StaffAccount {
        username: payload.username.clone(),
        password_hash,
        role: role.clone(),
    });

    (
        StatusCode::CREATED,
        Json(json!({
            "id": accounts.len(),
            "username": payload.username,
            "role": role,
            "email": payload.email,
        })),
    )
        .into_response()
}

async fn list_patients(State(clinic): State<Arc<FakeClinic>>, headers: HeaderMap) -> Response {
    clinic.hit("GET /patients/".to_string());
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }

    if let Some(payload) = clinic.list_override.lock().unwrap().clone() {
        return Json(payload).into_response();
    }
    let patients = clinic.patients.lock().unwrap().clone();
    Json(Value::Array(patients)).into_response()
}

async fn create_patient(
    State(clinic): State<Arc<FakeClinic>>,
    headers: HeaderMap,
    Json(mut payload): Json<Value>,
) -> Response {
    clinic.hit("POST /patients/".to_string());
    let claims = match authorize(&headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection,
    };

    let mut patients = clinic.patients.lock().unwrap();
    let id = patients
        .iter()
        .filter_map(|p| p["id"].as_i64())
        .max()
        .unwrap_or(0)
        + 1;
    payload["id"] = json!(id);
    payload["patient_number"] = json!(format!("PAT-{id:07}"));
    payload["created_by"] = json!(claims.sub);
    patients.push(payload.clone());

    (StatusCode::CREATED, Json(payload)).into_response()
}

async fn update_patient(
    State(clinic): State<Arc<FakeClinic>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(changes): Json<Value>,
) -> Response {
    clinic.hit(format!("PATCH /patients/{id}/ {changes}"));
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }

    let mut patients = clinic.patients.lock().unwrap();
    let Some(stored) = patients.iter_mut().find(|p| p["id"].as_i64() == Some(id)) else {
        return detail(StatusCode::NOT_FOUND, "No Patient matches the given query.");
    };

    if let (Some(target), Some(changes)) = (stored.as_object_mut(), changes.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
        target.insert("updated_at".to_string(), json!("2026-10-18T09:00:00Z"));
    }

    Json(stored.clone()).into_response()
}
