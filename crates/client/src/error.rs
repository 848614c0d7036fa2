//! Unified error handling with Sentry integration.
//!
//! Every operation returns `Result<T, ClientError>`. The screen layer turns
//! a failure into a [`Notice`] with [`ClientError::notice`], which captures
//! backend failures to Sentry before hiding their details.

use tailor_hub_core::DecodeError;
use thiserror::Error;

use crate::backend::BackendError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected before reaching the backend.
    #[error("{0}")]
    Validation(String),

    /// Sign-in, sign-up or role resolution failed.
    #[error("Auth error: {0}")]
    Auth(String),

    /// A backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A stored document has an unrecognized shape.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    NotSignedIn,
}

impl ClientError {
    /// Validation failure with a user-facing message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this failure should be reported to Sentry.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Backend(err) => !matches!(
                err,
                BackendError::InvalidCredentials
                    | BackendError::AccountExists
                    | BackendError::WeakPassword(_)
                    | BackendError::NotFound(_)
            ),
            Self::Decode(_) => true,
            _ => false,
        }
    }

    /// User-facing toast for this error.
    ///
    /// Internal failures are captured to Sentry and logged; their details
    /// are not shown.
    #[must_use]
    pub fn notice(&self) -> Notice {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        }

        let message = match self {
            Self::Validation(msg) | Self::Auth(msg) => msg.clone(),
            Self::Backend(err) => match err {
                BackendError::InvalidCredentials => "Invalid email or password".to_string(),
                BackendError::AccountExists => {
                    "An account with this email already exists".to_string()
                }
                BackendError::WeakPassword(msg) => msg.clone(),
                BackendError::NotFound(_) => "Not found".to_string(),
                BackendError::UploadInterrupted(_) => {
                    "Upload failed, please try again".to_string()
                }
                BackendError::NoSession => "Please log in first".to_string(),
                _ => "Something went wrong, please try again".to_string(),
            },
            Self::Decode(_) => "Something went wrong, please try again".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::NotSignedIn => "Please log in first".to_string(),
        };

        Notice::error(message)
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A toast shown after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    /// Success toast.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Error toast.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after the session resolves to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("order", "Placed order", Some(&[("shop_id", "abc")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::NotFound("Order".to_string());
        assert_eq!(err.to_string(), "Not found: Order");

        let err = ClientError::validation("Address is required");
        assert_eq!(err.to_string(), "Address is required");
    }

    #[test]
    fn test_notice_messages() {
        assert_eq!(
            ClientError::Auth("User role not found.".into()).notice().message,
            "User role not found."
        );
        assert_eq!(
            ClientError::Backend(BackendError::InvalidCredentials)
                .notice()
                .message,
            "Invalid email or password"
        );
        let notice = ClientError::Backend(BackendError::Unavailable("db down".into())).notice();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(!notice.message.contains("db down"));
    }

    #[test]
    fn test_internal_classification() {
        assert!(ClientError::Backend(BackendError::Unavailable("x".into())).is_internal());
        assert!(!ClientError::Backend(BackendError::AccountExists).is_internal());
        assert!(!ClientError::NotSignedIn.is_internal());
        assert!(!ClientError::validation("bad").is_internal());
    }
}
