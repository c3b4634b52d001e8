use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::workflow::status::Status;

/// Staff roles offered at registration.
pub const STAFF_ROLES: [&str; 10] = [
    "Medical Officer / Doctor",
    "Nurse",
    "Clinical Officer",
    "Pharmacist",
    "Laboratory Technologist",
    "Radiographer / Imaging Specialist",
    "Midwife",
    "Facility Administrator / Manager",
    "Records & IT Officer",
    "Support Staff",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    #[serde(alias = "designation")]
    pub role: String,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.role)
    }
}

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

/// Body returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access: String,
    #[serde(default)]
    pub refresh: String,
    pub user: Identity,
}

impl TokenGrant {
    pub fn into_parts(self) -> (SessionTokens, Identity) {
        (
            SessionTokens {
                access: self.access,
                refresh: self.refresh,
            },
            self.user,
        )
    }
}

/// Registration body. Staff sign up with a role, the older form sends an email instead.
#[derive(Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl NewUser {
    pub fn with_role(
        username: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role: Some(role.into()),
            email: None,
        }
    }

    pub fn with_email(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role: None,
            email: Some(email.into()),
        }
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("role", &self.role)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, alias = "dob")]
    pub date_of_birth: Option<String>,
    #[serde(default, alias = "phone_number")]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    /// Server fields this client does not interpret (patient number, timestamps, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PatientRecord {
    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("—");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{first} {last}").trim_end().to_string()
    }

    /// Status label as shown on the dashboard card.
    pub fn status_label(&self) -> &'static str {
        self.status.as_ref().map(Status::label).unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewPatient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPatch {
    pub status: Status,
}
