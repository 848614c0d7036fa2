//! REST clients for the hosted identity and storage services.
//!
//! The hosted document store pushes live updates over a streaming channel
//! with no REST equivalent, so it has no adapter here; [`DocumentStore`]
//! stays the seam for a realtime transport.
//!
//! [`DocumentStore`]: super::DocumentStore

mod identity;
mod storage;

pub use identity::IdentityToolkit;
pub use storage::StorageClient;

use serde::Deserialize;

use super::BackendError;

/// Error body shared by the Google REST APIs.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

/// Turn a non-success response into a [`BackendError`].
async fn error_from_response(response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|r| {
            if r.error.code == 0 {
                r.error.message
            } else {
                format!("{} ({})", r.error.message, r.error.code)
            }
        })
        .unwrap_or(text);

    match status {
        401 | 403 => BackendError::PermissionDenied(message),
        404 => BackendError::NotFound(message),
        _ => BackendError::Api { status, message },
    }
}
