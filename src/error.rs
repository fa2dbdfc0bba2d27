use thiserror::Error;

use crate::models::EventId;
use crate::scope::Cancelled;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(String),
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("event {0} not found")]
    NotFound(EventId),
    #[error("event {id} changed before the update (expected {expected} spots)")]
    Conflict { id: EventId, expected: u32 },
    #[error("event {0} has no spots left")]
    Exhausted(EventId),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("background task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "Event not found.",
            StoreError::Exhausted(_) => "No spots left",
            StoreError::Conflict { .. } => {
                "Spots changed while registering. Refresh and try again."
            }
            _ => "Something went wrong. Try again.",
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("registration is not ready for submission")]
    NotReady,
    #[error("no spots left")]
    NoSpotsLeft,
    #[error("spot count changed before the update")]
    Conflict,
    #[error("submission failed: {0}")]
    Submission(#[source] StoreError),
    #[error("screen was left before the request finished")]
    Cancelled,
}

impl RegistrationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            RegistrationError::NoSpotsLeft => "No spots left",
            RegistrationError::Conflict => {
                "Spots changed while registering. Refresh and try again."
            }
            RegistrationError::NotReady => "Event not found.",
            RegistrationError::Submission(_) | RegistrationError::Cancelled => {
                "Registration failed. Try again."
            }
        }
    }
}

impl From<StoreError> for RegistrationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Exhausted(_) => RegistrationError::NoSpotsLeft,
            StoreError::Conflict { .. } => RegistrationError::Conflict,
            other => RegistrationError::Submission(other),
        }
    }
}

impl From<Cancelled> for RegistrationError {
    fn from(_: Cancelled) -> Self {
        RegistrationError::Cancelled
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config mutex poisoned")]
    Poisoned,
    #[error("invalid config value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
