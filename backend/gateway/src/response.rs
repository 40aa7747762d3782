//! The JSON response envelope: `{ "status": 200, "description": "...", "data": {...} }`.
//!
//! One `CallResponse` is created per request and handed mutably to the handler.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use keygate_core::KeygateError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const SUCCESS: &str = "success";
pub const METHOD_NOT_ALLOWED: &str = "HTTP Method Not Allowed";
pub const BAD_CONTENT_TYPE: &str = "Only JSON Content permitted";
pub const ADDRESS_PARSE_FAILED: &str = "Internet Protocol Parser Failed";
pub const MALFORMED_BODY: &str = "malformed request body";
pub const BAD_AUTHENTICATION: &str = "bad authentication";
pub const INTERNAL_FAILURE: &str = "there is an unspecified internal error";
pub const NO_SUCH_ROUTE: &str = "no such route";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("description cannot be an empty string")]
    EmptyDescription,
    #[error("the key '{0}' already exists")]
    DuplicateKey(String),
    #[error("value for '{key}' could not be serialized: {message}")]
    Serialize { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl Default for CallResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl CallResponse {
    /// Status 204 until a handler sets one.
    pub fn new() -> Self {
        Self {
            status: StatusCode::NO_CONTENT.as_u16(),
            description: None,
            data: Map::new(),
        }
    }

    pub fn rejection(status: u16, description: &str) -> Self {
        Self {
            status,
            description: Some(description.to_string()),
            data: Map::new(),
        }
    }

    /// Generic client-facing rejection for an error kind; never carries internal detail.
    pub fn from_error(err: &KeygateError) -> Self {
        let description = match err {
            KeygateError::MethodNotAllowed(_) => METHOD_NOT_ALLOWED,
            KeygateError::ContentType(_) => BAD_CONTENT_TYPE,
            KeygateError::AddressParse(_) => ADDRESS_PARSE_FAILED,
            KeygateError::MalformedBody(_) => MALFORMED_BODY,
            KeygateError::KeyDecode(_)
            | KeygateError::Replay { .. }
            | KeygateError::Signature
            | KeygateError::PermissionDenied { .. }
            | KeygateError::UnknownSender(_) => BAD_AUTHENTICATION,
            KeygateError::Transport(_) | KeygateError::Config(_) | KeygateError::Other(_) => {
                INTERNAL_FAILURE
            }
        };
        Self::rejection(err.status_code(), description)
    }

    pub fn internal_error() -> Self {
        Self::rejection(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), INTERNAL_FAILURE)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<&mut Self, ResponseError> {
        let description = description.into();
        if description.is_empty() {
            return Err(ResponseError::EmptyDescription);
        }
        self.description = Some(description);
        Ok(self)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Add a data entry; keys are write-once.
    pub fn pair(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<&mut Self, ResponseError> {
        let key = key.into();
        if self.data.contains_key(&key) {
            return Err(ResponseError::DuplicateKey(key));
        }
        let value = serde_json::to_value(value).map_err(|e| ResponseError::Serialize {
            key: key.clone(),
            message: e.to_string(),
        })?;
        self.data.insert(key, value);
        Ok(self)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl IntoResponse for CallResponse {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
