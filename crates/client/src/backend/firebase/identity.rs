//! Identity Toolkit REST client.
//!
//! Email/password accounts through `accounts:signUp` and
//! `accounts:signInWithPassword`; sessions are refreshed through the secure
//! token endpoint. The signed-in session lives in this client and is
//! announced through a `watch` channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tailor_hub_core::{Email, UserId};
use tokio::sync::watch;
use tracing::{debug, instrument};
use url::Url;

use super::{ErrorResponse, error_from_response};
use crate::backend::{AuthUser, BackendError, IdentityService};
use crate::config::BackendConfig;

/// Identity Toolkit client holding the current session.
#[derive(Clone)]
pub struct IdentityToolkit {
    inner: Arc<IdentityToolkitInner>,
}

struct IdentityToolkitInner {
    client: reqwest::Client,
    api_key: SecretString,
    identity_url: Url,
    token_url: Url,
    session: Mutex<Option<Session>>,
    auth: watch::Sender<Option<AuthUser>>,
}

struct Session {
    user: AuthUser,
    id_token: SecretString,
    refresh_token: SecretString,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

impl IdentityToolkit {
    /// Create a client with nobody signed in.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let (auth, _) = watch::channel(None);
        Self {
            inner: Arc::new(IdentityToolkitInner {
                client: reqwest::Client::new(),
                api_key: config.api_key.clone(),
                identity_url: config.identity_url.clone(),
                token_url: config.token_url.clone(),
                session: Mutex::new(None),
                auth,
            }),
        }
    }

    /// ID token of the current session, for authorizing storage calls.
    #[must_use]
    pub fn id_token(&self) -> Option<SecretString> {
        self.session().as_ref().map(|s| s.id_token.clone())
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn endpoint(&self, base: &Url, path: &str) -> String {
        format!(
            "{}/v1/{path}?key={}",
            base.as_str().trim_end_matches('/'),
            urlencoding::encode(self.inner.api_key.expose_secret())
        )
    }

    async fn password_call(
        &self,
        method: &str,
        email: &Email,
        password: &str,
    ) -> Result<Session, BackendError> {
        let url = self.endpoint(&self.inner.identity_url, method);
        let response = self
            .inner
            .client
            .post(&url)
            .json(&PasswordRequest {
                email: email.as_str(),
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error_from_response(response).await);
        }

        let body: PasswordResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        Ok(Session {
            user: AuthUser {
                uid: UserId::new(body.local_id),
                email: body
                    .email
                    .and_then(|e| Email::parse(&e).ok())
                    .or_else(|| Some(email.clone())),
            },
            id_token: SecretString::from(body.id_token),
            refresh_token: SecretString::from(body.refresh_token),
        })
    }

    fn start_session(&self, session: Session) -> AuthUser {
        let user = session.user.clone();
        *self.session() = Some(session);
        self.inner.auth.send_replace(Some(user.clone()));
        user
    }
}

/// Map Identity Toolkit error codes onto [`BackendError`].
async fn auth_error_from_response(response: reqwest::Response) -> BackendError {
    let status = response.status();
    if status.as_u16() != 400 {
        return error_from_response(response).await;
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|r| r.error.message)
        .unwrap_or(text);
    auth_error(&message)
}

fn auth_error(message: &str) -> BackendError {
    let (code, detail) = message
        .split_once(" : ")
        .map_or((message, ""), |(code, detail)| (code.trim(), detail.trim()));

    match code {
        "EMAIL_EXISTS" => BackendError::AccountExists,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_EMAIL" | "USER_DISABLED" => BackendError::InvalidCredentials,
        "WEAK_PASSWORD" => BackendError::WeakPassword(if detail.is_empty() {
            "password is too weak".to_owned()
        } else {
            detail.to_owned()
        }),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => BackendError::NoSession,
        _ => BackendError::Api {
            status: 400,
            message: message.to_owned(),
        },
    }
}

#[async_trait]
impl IdentityService for IdentityToolkit {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthUser, BackendError> {
        let session = self.password_call("accounts:signUp", email, password).await?;
        Ok(self.start_session(session))
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, BackendError> {
        let session = self
            .password_call("accounts:signInWithPassword", email, password)
            .await?;
        Ok(self.start_session(session))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        *self.session() = None;
        self.inner.auth.send_replace(None);
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.inner.auth.borrow().clone()
    }

    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.inner.auth.subscribe()
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn provision_account(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthUser, BackendError> {
        // The REST call returns the new account's tokens without touching
        // the session held here.
        let session = self.password_call("accounts:signUp", email, password).await?;
        debug!(uid = %session.user.uid, "account provisioned");
        Ok(session.user)
    }

    #[instrument(skip(self))]
    async fn refresh_session(&self) -> Result<(), BackendError> {
        let refresh_token = self
            .session()
            .as_ref()
            .map(|s| s.refresh_token.expose_secret().to_owned())
            .ok_or(BackendError::NoSession)?;

        let url = self.endpoint(&self.inner.token_url, "token");
        let response = self
            .inner
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error_from_response(response).await);
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        let mut guard = self.session();
        let Some(session) = guard.as_mut() else {
            return Err(BackendError::NoSession);
        };
        if session.user.uid.as_str() != body.user_id {
            return Err(BackendError::Parse(format!(
                "refreshed token belongs to {}",
                body.user_id
            )));
        }
        session.id_token = SecretString::from(body.id_token);
        session.refresh_token = SecretString::from(body.refresh_token);
        drop(guard);

        self.inner.auth.send_modify(|_| {});
        Ok(())
    }
}
