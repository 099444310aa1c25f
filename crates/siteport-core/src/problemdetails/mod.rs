//! RFC 7807 problem responses.
//!
//! Handlers return `Result<_, Problem>`; service errors convert into a `Problem`
//! carrying the status code, a short title and a detail message that is safe to show
//! to the client.

use std::collections::BTreeMap;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Wire shape of a problem, used for OpenAPI documentation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "title": "Session Not Found",
    "status": 404,
    "detail": "Import session 5f0c... does not exist"
}))]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_url: Option<String>,
    /// A short, human-readable summary of the problem type
    pub title: String,
    /// HTTP status code
    pub status: u16,
    /// A human-readable explanation specific to this occurrence of the problem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A problem response under construction.
#[derive(Debug, Clone)]
pub struct Problem {
    pub status_code: StatusCode,
    pub body: BTreeMap<String, Value>,
}

/// Start a problem for the given status code.
pub fn new<S>(status_code: S) -> Problem
where
    S: Into<StatusCode>,
{
    let status_code = status_code.into();
    let mut body = BTreeMap::new();
    body.insert("status".to_owned(), Value::from(status_code.as_u16()));
    Problem { status_code, body }
}

impl Problem {
    pub fn with_type<S: Into<String>>(self, value: S) -> Self {
        self.with_value("type", value.into())
    }

    pub fn with_title<S: Into<String>>(self, value: S) -> Self {
        self.with_value("title", value.into())
    }

    pub fn with_detail<S: Into<String>>(self, value: S) -> Self {
        self.with_value("detail", value.into())
    }

    /// Attach an extension member. Existing members with the same key are replaced.
    pub fn with_value<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.body.insert(key.to_owned(), value.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.body.get("title").and_then(Value::as_str)
    }

    pub fn detail(&self) -> Option<&str> {
        self.body.get("detail").and_then(Value::as_str)
    }
}

impl From<StatusCode> for Problem {
    fn from(status_code: StatusCode) -> Self {
        new(status_code)
    }
}

/// Result type where the error is always a `Problem`.
pub type Result<T> = std::result::Result<T, Problem>;

impl IntoResponse for Problem {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status_code, Json(self.body)).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
        );
        response
    }
}
