use std::io;

use http::status::StatusCode;
use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::error::SendError as TokioSendError;

use crate::event::EngineEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ArborError {
    #[error("No note with hierarchical name 'root' was found in the vault")]
    NoRootNoteFound,
    #[error("No schema module designates a root schema")]
    NoSchemaFound,
    #[error("Failed to parse note {path}: {reason}")]
    BadParseForNote { path: String, reason: String },
    #[error("Failed to parse schema module {path}: {reason}")]
    BadParseForSchema { path: String, reason: String },
    #[error("A schema module rooted at '{0}' already exists")]
    DuplicateModuleRoot(String),
    #[error("More than one note file maps to '{0}'")]
    DuplicateNote(String),
    #[error("Invalid Command: {0}")]
    Command(String),
    #[error("Engine initialization is already in progress")]
    InitInProgress,
    #[error("Engine is not ready, call init() first")]
    NotReady,
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ArborError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ArborError::NoRootNoteFound => StatusCode::UNPROCESSABLE_ENTITY,
            ArborError::NoSchemaFound => StatusCode::UNPROCESSABLE_ENTITY,
            ArborError::BadParseForNote { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ArborError::BadParseForSchema { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ArborError::DuplicateModuleRoot(_) => StatusCode::CONFLICT,
            ArborError::DuplicateNote(_) => StatusCode::CONFLICT,
            ArborError::Command(_) => StatusCode::BAD_REQUEST,
            ArborError::InitInProgress => StatusCode::CONFLICT,
            ArborError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ArborError::NotFound(_) => StatusCode::NOT_FOUND,
            ArborError::PermissionDenied => StatusCode::FORBIDDEN,
            ArborError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ArborError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for the error kinds that leave the vault unloadable.
    pub fn is_fatal_to_init(&self) -> bool {
        matches!(
            self,
            ArborError::NoRootNoteFound
                | ArborError::NoSchemaFound
                | ArborError::BadParseForNote { .. }
                | ArborError::BadParseForSchema { .. }
                | ArborError::DuplicateNote(_)
        )
    }
}

impl From<toml::de::Error> for ArborError {
    fn from(src: toml::de::Error) -> ArborError {
        ArborError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for ArborError {
    fn from(src: toml::ser::Error) -> ArborError {
        ArborError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<serde_yaml::Error> for ArborError {
    fn from(src: serde_yaml::Error) -> ArborError {
        ArborError::Serialization(format!("YAML (de)serialization error: {src}"))
    }
}

impl From<io::Error> for ArborError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => ArborError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => ArborError::PermissionDenied,
            _ => ArborError::Storage(format!("IOError: {}: {x}", x.kind())),
        }
    }
}

impl From<walkdir::Error> for ArborError {
    fn from(x: walkdir::Error) -> Self {
        match x.into_io_error() {
            Some(io_error) => io_error.into(),
            None => ArborError::Storage("directory walk hit a filesystem loop".to_string()),
        }
    }
}

impl From<RegexError> for ArborError {
    fn from(x: RegexError) -> Self {
        ArborError::Serialization(format!("Regex parse failed: {x}"))
    }
}

impl From<TokioSendError<EngineEvent>> for ArborError {
    fn from(x: TokioSendError<EngineEvent>) -> Self {
        ArborError::Storage(format!(
            "Channel update send Error, could not transmit engine event {:?}",
            x.0
        ))
    }
}
