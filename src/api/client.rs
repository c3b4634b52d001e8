use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::ClinicApi;
use super::models::{Credentials, NewPatient, NewUser, PatientRecord, StatusPatch, TokenGrant};
use crate::error::{ClinicError, Result};

/// reqwest-backed client for the clinic API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClinicError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Attaches the bearer header when a token is present; otherwise the call goes out bare.
fn authorize(request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
    match bearer {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Sends the request and decodes a successful JSON body, mapping every failure through `fail`.
async fn send_json<T, F>(request: RequestBuilder, fail: F) -> Result<T>
where
    T: DeserializeOwned,
    F: Fn(String) -> ClinicError,
{
    let response = request.send().await.map_err(|e| fail(e.to_string()))?;
    let response = ensure_success(response, &fail)?;
    response.json::<T>().await.map_err(|e| fail(e.to_string()))
}

fn ensure_success<F>(response: Response, fail: &F) -> Result<Response>
where
    F: Fn(String) -> ClinicError,
{
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        debug!(%status, url = %response.url(), "clinic API rejected request");
        Err(fail(status.to_string()))
    }
}

#[async_trait]
impl ClinicApi for ApiClient {
    async fn obtain_token(&self, credentials: &Credentials) -> Result<TokenGrant> {
        debug!(username = %credentials.username, "requesting token");
        let request = self.http.post(self.url("/token/")).json(credentials);
        send_json(request, ClinicError::Authentication).await
    }

    async fn register_user(&self, user: &NewUser) -> Result<Value> {
        debug!(username = %user.username, "registering user");
        let request = self.http.post(self.url("/users/")).json(user);
        send_json(request, ClinicError::Registration).await
    }

    async fn create_patient(
        &self,
        bearer: Option<&str>,
        patient: &NewPatient,
    ) -> Result<PatientRecord> {
        let request = authorize(self.http.post(self.url("/patients/")), bearer).json(patient);
        send_json(request, ClinicError::Create).await
    }

    async fn list_patients(&self, bearer: Option<&str>) -> Result<Vec<PatientRecord>> {
        let request = authorize(self.http.get(self.url("/patients/")), bearer);
        let payload: Value = send_json(request, ClinicError::Load).await?;

        match payload {
            Value::Array(_) => {
                serde_json::from_value(payload).map_err(|e| ClinicError::Load(e.to_string()))
            }
            other => {
                warn!(kind = json_kind(&other), "patient list payload is not a list, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn update_patient(
        &self,
        bearer: Option<&str>,
        patient_id: i64,
        patch: &StatusPatch,
    ) -> Result<PatientRecord> {
        debug!(patient_id, status = %patch.status, "updating patient");
        let url = self.url(&format!("/patients/{patient_id}/"));
        let request = authorize(self.http.patch(url), bearer).json(patch);
        send_json(request, ClinicError::Update).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
