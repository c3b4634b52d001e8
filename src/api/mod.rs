//! The clinic HTTP API as seen from this client.
//! Everything that talks to the network goes through [`ClinicApi`].

pub mod client;
pub mod models;


use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use models::{Credentials, NewPatient, NewUser, PatientRecord, StatusPatch, TokenGrant};

pub use client::ApiClient;

#[async_trait]
pub trait ClinicApi: Send + Sync {
    /// `POST /token/`. Any non-success answer is an authentication error.
    async fn obtain_token(&self, credentials: &Credentials) -> Result<TokenGrant>;

    /// `POST /users/`. Returns the created user as the server represents it.
    async fn register_user(&self, user: &NewUser) -> Result<Value>;

    async fn create_patient(
        &self,
        bearer: Option<&str>,
        patient: &NewPatient,
    ) -> Result<PatientRecord>;

    /// `GET /patients/`. A successful payload that is not a list yields an empty list.
    async fn list_patients(&self, bearer: Option<&str>) -> Result<Vec<PatientRecord>>;

    async fn update_patient(
        &self,
        bearer: Option<&str>,
        patient_id: i64,
        patch: &StatusPatch,
    ) -> Result<PatientRecord>;
}
