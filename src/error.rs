use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClinicError>;

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Login failed: {0}")]
    Authentication(String),

    #[error("Failed to register: {0}")]
    Registration(String),

    #[error("Failed to update status: {0}")]
    Update(String),

    #[error("Failed to load patients: {0}")]
    Load(String),

    #[error("Failed to register patient: {0}")]
    Create(String),

    #[error("Patient {0} is not on the dashboard")]
    UnknownPatient(i64),

    /// A logout happened while the login call was in flight.
    #[error("Login discarded: session was logged out while signing in")]
    LoginSuperseded,

    #[error("Session storage error: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client error: {0}")]
    Client(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Malformed slot value: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
