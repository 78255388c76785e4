//! Shared plumbing for the Google REST clients.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::{Error, Result};

/// Error response format for Google Cloud APIs.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail information.
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    /// HTTP status code.
    #[serde(default)]
    pub code: u16,
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Error status string (e.g. `NOT_FOUND`).
    #[serde(default)]
    pub status: String,
}

/// Build the HTTP client shared by a REST client.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(format!("pullsink/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::from)
}

/// Attach the bearer token, if any.
pub fn authorize(request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
    match access_token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Turn a non-success response into an error.
///
/// `not_found` builds the error for a 404 so each client can name the missing
/// resource.
pub async fn error_from_response(response: Response, not_found: impl FnOnce() -> Error) -> Error {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return not_found();
    }

    Error::Api {
        status: status.as_u16(),
        message: error_message(response).await,
    }
}

/// Read the message out of a Google error body, falling back to the raw text.
pub async fn error_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    parse_error_body(body)
}

fn parse_error_body(body: String) -> String {
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) if !parsed.error.status.is_empty() => {
            format!("{}: {}", parsed.error.status, parsed.error.message)
        }
        Ok(parsed) => parsed.error.message,
        Err(_) => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_google_error_body() {
        let body = r#"{"error":{"code":403,"message":"Permission denied","status":"PERMISSION_DENIED"}}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.code, 403);
        assert_eq!(parsed.error.status, "PERMISSION_DENIED");
    }

    #[test]
    fn test_error_message_formats() {
        let body = r#"{"error":{"code":404,"message":"Not found: Table p:d.t","status":"notFound"}}"#;
        assert_eq!(parse_error_body(body.to_string()), "notFound: Not found: Table p:d.t");

        let body = r#"{"error":{"message":"Backend error"}}"#;
        assert_eq!(parse_error_body(body.to_string()), "Backend error");

        assert_eq!(parse_error_body("upstream timeout".to_string()), "upstream timeout");
    }
}
