use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use reqwest::cookie::CookieStore;

use crate::api::{self, ApiError, LoginCredentials, User};
use crate::storage::{self, SavedSession};

/// Outcome of the sign-in check that gates every screen. Any failure to
/// confirm the session, transport errors included, lands on `Anonymous`.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    Authenticated(User),
    Anonymous,
}

impl AuthStatus {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthStatus::Authenticated(user) => Some(user),
            AuthStatus::Anonymous => None,
        }
    }
}

/// Owns the ambient session credential: the cookie jar shared with the HTTP
/// client, the saved copy in storage, and the signed-in user snapshot.
pub struct Manager {
    client: Arc<api::Client>,
    store: Arc<storage::Store>,
    current: RwLock<Option<User>>,
}

impl Manager {
    pub fn new(client: Arc<api::Client>, store: Arc<storage::Store>) -> Self {
        Self {
            client,
            store,
            current: RwLock::new(None),
        }
    }

    /// Seeds the cookie jar from the saved session for this server, if any.
    /// Runs before the first fetch so restored cookies ride along with it.
    pub fn restore(&self) -> Result<bool> {
        let server = self.server_key();
        let Some(saved) = self
            .store
            .get_session(&server)
            .context("load saved session")?
        else {
            return Ok(false);
        };
        if saved.cookies.is_empty() {
            return Ok(false);
        }
        let jar = self.client.jar();
        let base = self.client.base_url();
        for cookie in saved.cookies.split("; ") {
            if !cookie.is_empty() {
                jar.add_cookie_str(cookie, base);
            }
        }
        Ok(true)
    }

    pub fn check(&self) -> AuthStatus {
        match self.client.current_user() {
            Ok(user) => {
                *self.current.write() = Some(user.clone());
                AuthStatus::Authenticated(user)
            }
            Err(_) => {
                *self.current.write() = None;
                AuthStatus::Anonymous
            }
        }
    }

    pub fn login(&self, creds: &LoginCredentials) -> Result<User, ApiError> {
        self.client.login(creds)?;
        let user = self.client.current_user()?;
        *self.current.write() = Some(user.clone());
        self.persist(&user).ok();
        Ok(user)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.client.logout()?;
        *self.current.write() = None;
        self.store.delete_session(&self.server_key()).ok();
        Ok(())
    }

    pub fn current(&self) -> Option<User> {
        self.current.read().clone()
    }

    fn persist(&self, user: &User) -> Result<()> {
        let jar = self.client.jar();
        let cookies = jar
            .cookies(self.client.base_url())
            .and_then(|value| value.to_str().map(|s| s.to_string()).ok())
            .unwrap_or_default();
        if cookies.is_empty() {
            return Ok(());
        }
        self.store
            .upsert_session(SavedSession {
                server: self.server_key(),
                cookies,
                username: user.username.clone(),
                full_name: user.full_name.clone(),
                ..SavedSession::default()
            })
            .context("save session")?;
        Ok(())
    }

    fn server_key(&self) -> String {
        self.client.base_url().to_string()
    }
}
