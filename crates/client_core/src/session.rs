//! Session context shared with everything mounted under an [`AuthProvider`].
//!
//! The context is handed down explicitly: components that need to know who
//! is signed in take a [`SessionContext`] in their constructor instead of
//! reaching for a global.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use shared::protocol::{SessionResponse, SessionUser, SESSION_PATH};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: SessionUser,
    pub expires: Option<DateTime<Utc>>,
    pub access_token: Option<String>,
}

impl Session {
    /// Session backed only by a bearer token, with no user profile loaded.
    pub fn from_token(access_token: impl Into<String>) -> Self {
        Self {
            user: SessionUser::default(),
            expires: None,
            access_token: Some(access_token.into()),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Loading,
    Authenticated(Session),
    Unauthenticated,
}

impl From<SessionResponse> for SessionStatus {
    fn from(value: SessionResponse) -> Self {
        match value.user {
            Some(user) => SessionStatus::Authenticated(Session {
                user,
                expires: value.expires,
                access_token: value.access_token,
            }),
            None => SessionStatus::Unauthenticated,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<SessionStatus>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: SessionStatus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(status)),
        }
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.read().await.clone()
    }

    pub async fn session(&self) -> Option<Session> {
        match &*self.inner.read().await {
            SessionStatus::Authenticated(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(&*self.inner.read().await, SessionStatus::Authenticated(_))
    }

    pub async fn bearer_token(&self) -> Option<String> {
        match &*self.inner.read().await {
            SessionStatus::Authenticated(session) => session.access_token.clone(),
            _ => None,
        }
    }

    pub async fn set_authenticated(&self, session: Session) {
        *self.inner.write().await = SessionStatus::Authenticated(session);
    }

    pub async fn sign_out(&self) {
        *self.inner.write().await = SessionStatus::Unauthenticated;
    }

    /// True when both handles observe the same session state.
    pub fn same_as(&self, other: &SessionContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Reloads the session from the auth backend and stores the result.
    ///
    /// On failure the previous status is kept and the error is returned.
    pub async fn refresh(
        &self,
        http: &Client,
        server_url: &str,
    ) -> Result<SessionStatus, ClientError> {
        let route = format!("{}{SESSION_PATH}", server_url.trim_end_matches('/'));
        let res = http
            .get(&route)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                route: route.clone(),
                source,
            })?;
        if !res.status().is_success() {
            warn!(status = %res.status(), "session: refresh rejected");
            return Err(ClientError::Status {
                route,
                status: res.status(),
                api_error: None,
            });
        }
        let body: SessionResponse = res
            .json()
            .await
            .map_err(|source| ClientError::Decode {
                route: route.clone(),
                source,
            })?;

        let status = SessionStatus::from(body);
        match &status {
            SessionStatus::Authenticated(session) => info!(
                user_id = session.user.id.as_ref().map(|id| id.as_str()),
                "session: authenticated"
            ),
            _ => info!("session: no active session"),
        }
        *self.inner.write().await = status.clone();
        Ok(status)
    }
}

/// Makes a [`SessionContext`] available to the subtree it wraps.
pub struct AuthProvider {
    context: SessionContext,
}

impl AuthProvider {
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Builds the wrapped subtree with access to the session and returns it
    /// unchanged.
    pub fn wrap<T>(&self, children: impl FnOnce(SessionContext) -> T) -> T {
        debug!("session: provider mounted");
        children(self.context.clone())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
