//! The immutable result of one dispatch.

use serde::{Serialize, Serializer};

use crate::error::RequestError;
use crate::http::HttpResponse;

/// Body, status and failure reason captured by a single dispatch.
///
/// A failed dispatch still carries whatever was captured before the
/// failure: status 0 and an empty body if no response arrived, or the real
/// status with a partial body if reading broke off midway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    body: String,
    status: u16,
    #[serde(serialize_with = "error_message")]
    error: Option<RequestError>,
}

impl Outcome {
    pub fn success(response: HttpResponse) -> Self {
        Self {
            body: response.body,
            status: response.status,
            error: None,
        }
    }

    pub fn failure(body: String, status: u16, error: RequestError) -> Self {
        Self {
            body,
            status,
            error: Some(error),
        }
    }

    /// Response body with line terminators normalised to `\n` and no
    /// trailing newline. Empty if nothing was received.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// HTTP status code, or 0 if no response was received.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<HttpResponse, RequestError> {
        match self.error {
            None => Ok(HttpResponse {
                status: self.status,
                body: self.body,
            }),
            Some(err) => Err(err),
        }
    }
}

fn error_message<S: Serializer>(error: &Option<RequestError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_converts_into_response() {
        let outcome = Outcome::success(HttpResponse {
            status: 200,
            body: "Hello\nWorld".to_string(),
        });
        assert!(outcome.is_success());
        assert_eq!(outcome.status(), 200);
        let response = outcome.into_result().unwrap();
        assert_eq!(response.body, "Hello\nWorld");
    }

    #[test]
    fn failure_before_response_looks_empty_but_is_distinguishable() {
        let outcome = Outcome::failure(String::new(), 0, RequestError::Connect("refused".to_string()));
        assert_eq!(outcome.body(), "");
        assert_eq!(outcome.status(), 0);
        assert!(!outcome.is_success());
        assert!(matches!(outcome.into_result(), Err(RequestError::Connect(_))));
    }

    #[test]
    fn serializes_error_as_message() {
        let outcome = Outcome::failure("partial".to_string(), 200, RequestError::Read("reset".to_string()));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["body"], "partial");
        assert_eq!(json["status"], 200);
        assert_eq!(json["error"], "failed to read response body: reset");
    }

    #[test]
    fn serializes_success_with_null_error() {
        let outcome = Outcome::success(HttpResponse {
            status: 204,
            body: String::new(),
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json["error"].is_null());
    }
}
