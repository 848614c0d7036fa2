//! The public contact form.

use tailor_hub_core::Email;
use tracing::{info, instrument};

use super::required;
use crate::error::{ClientError, Notice, Result};

/// A contact form submission.
#[derive(Debug, Clone, Default)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Contact form handling. Submissions are logged, not stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactService;

impl ContactService {
    /// Validate and record a submission.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` when a field is blank or the email
    /// is malformed.
    #[instrument(skip(self, form))]
    pub fn submit(&self, form: &ContactMessage) -> Result<Notice> {
        let message = "Please fill all fields";
        let name = required(&form.name, message)?;
        required(&form.email, message)?;
        let body = required(&form.message, message)?;
        let email = Email::parse(&form.email)
            .map_err(|_| ClientError::validation("Please enter a valid email"))?;

        info!(%name, email = %email.as_str(), length = body.len(), "contact message received");
        Ok(Notice::success("Message sent!"))
    }
}
