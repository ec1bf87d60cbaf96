// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth controller: login, registration, logout, profile and session restore.
//!
//! Login, registration and restore run one at a time. Each starts a new
//! session epoch, and a result is committed to the token store and session
//! only if no newer operation (including `logout`) started in the meantime.

use crate::error::{detail_message, parse_field_errors, AuthError, Result};
use crate::models::{Credentials, ProfileUpdate, RegistrationForm, TokenPair, UserProfile};
use crate::services::gateway::Gateway;
use crate::session::{expires_at, identity_of, Identity, SessionHandle, SessionState};
use crate::store::TokenStore;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::de::IgnoredAny;
use std::sync::Arc;
use validator::Validate;

pub const TOKEN_PATH: &str = "/token/";
pub const REGISTER_PATH: &str = "/register/";
pub const PROFILE_PATH: &str = "/profile/";

const BLANK_FIELD: &str = "This field may not be blank.";

/// Owns the session-changing operations and the `SessionState` they produce.
#[derive(Clone)]
pub struct AuthController {
    gateway: Gateway,
    store: Arc<dyn TokenStore>,
    session: SessionHandle,
    /// Serializes login, registration and restore.
    op_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AuthController {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            store: gateway.store().clone(),
            session: gateway.session().clone(),
            gateway,
            op_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    // ─── Session Lifecycle ───────────────────────────────────────────────────

    /// Rebuild the session from the token store. Run once at startup,
    /// before the route guard makes its first decision.
    ///
    /// A stored token that is expired or unreadable is cleared.
    pub async fn restore_session(&self) -> SessionState {
        let _op = self.op_lock.lock().await;
        let seq = self.begin();
        self.session.update(|state| state.loading = true);

        let stored = self.store.load();
        let resolved = stored.token.as_deref().and_then(live_identity);

        let committed = self.session.commit(seq, || match resolved {
            Some((identity, exp)) => {
                tracing::info!(
                    username = ?identity.username,
                    expires_at = %exp,
                    "Session restored"
                );
                self.session.replace(SessionState::signed_in(identity, exp));
            }
            None => {
                if !stored.is_empty() {
                    tracing::info!("Stored session expired or invalid, clearing");
                    if let Err(e) = self.store.clear() {
                        tracing::error!(error = %e, "Failed to clear token store");
                    }
                }
                self.session.replace(SessionState::signed_out());
            }
        });
        if committed.is_none() {
            tracing::debug!(seq, "Session restore superseded");
        }

        self.session.snapshot()
    }

    /// Exchange username and password for a token pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity> {
        let _op = self.op_lock.lock().await;
        let seq = self.begin();
        self.login_locked(seq, username, password).await
    }

    /// Create an account, then sign in with the same username and password.
    pub async fn register(&self, form: &RegistrationForm) -> Result<Identity> {
        let _op = self.op_lock.lock().await;
        let seq = self.begin();
        self.mark_loading();

        if let Err(errors) = form.validate() {
            return self.fail(seq, errors.into());
        }

        let created: Result<IgnoredAny> = self
            .gateway
            .public_json(Method::POST, REGISTER_PATH, form)
            .await;

        if let Err(e) = created {
            return self.fail(seq, e.field_level());
        }

        tracing::info!(username = %form.username, "Account registered, signing in");
        self.login_locked(seq, &form.username, &form.password).await
    }

    /// Forget the session locally. Needs no network and cannot fail.
    pub fn logout(&self) {
        self.session.supersede(|| {
            if let Err(e) = self.store.clear() {
                tracing::error!(error = %e, "Failed to clear token store");
            }
            self.session.replace(SessionState::signed_out());
        });
        tracing::info!("Signed out");
    }

    pub fn clear_error(&self) {
        self.session.update(|state| state.error = None);
    }

    // ─── Profile ─────────────────────────────────────────────────────────────

    /// Load the account profile into the session.
    pub async fn fetch_profile(&self) -> Result<UserProfile> {
        if !self.session.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }

        let seq = self.current();
        self.mark_loading();

        match self.gateway.get_json::<UserProfile>(PROFILE_PATH).await {
            Ok(profile) => self.commit_profile(seq, profile),
            Err(e) => self.fail(seq, e),
        }
    }

    /// Patch the account profile; only fields set in `update` are sent.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        if !self.session.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }

        let seq = self.current();
        self.mark_loading();

        match self
            .gateway
            .send_json::<_, UserProfile>(Method::PATCH, PROFILE_PATH, update)
            .await
        {
            Ok(profile) => {
                tracing::info!(profile_id = profile.id, "Profile updated");
                self.commit_profile(seq, profile)
            }
            Err(e) => self.fail(seq, e.field_level()),
        }
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    async fn login_locked(&self, seq: u64, username: &str, password: &str) -> Result<Identity> {
        self.mark_loading();

        let mut blank = Vec::new();
        if username.trim().is_empty() {
            blank.push("username");
        }
        if password.is_empty() {
            blank.push("password");
        }
        if !blank.is_empty() {
            let fields = blank
                .into_iter()
                .map(|name| (name.to_string(), vec![BLANK_FIELD.to_string()]))
                .collect();
            return self.fail(seq, AuthError::ValidationFailed(fields));
        }

        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };

        let pair = match self.request_tokens(&credentials).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(username, error = %e, "Login failed");
                return self.fail(seq, e);
            }
        };

        let (identity, exp) = match live_identity(&pair.access) {
            Some(resolved) => resolved,
            None => {
                return self.fail(
                    seq,
                    AuthError::NetworkOrServer(
                        "Server issued an expired or unreadable access token".to_string(),
                    ),
                )
            }
        };

        self.commit(seq, || {
            if let Err(e) = self.store.save(&pair.access, pair.refresh.as_deref()) {
                let detail = e.detail();
                self.session.update(|state| {
                    state.loading = false;
                    state.error = Some(detail);
                });
                return Err(e);
            }
            self.session.replace(SessionState::signed_in(identity.clone(), exp));
            tracing::info!(username, "Signed in");
            Ok(identity)
        })
    }

    async fn request_tokens(&self, credentials: &Credentials) -> Result<TokenPair> {
        match self
            .gateway
            .public_json(Method::POST, TOKEN_PATH, credentials)
            .await
        {
            Ok(pair) => Ok(pair),
            Err(AuthError::Http { status, body })
                if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED =>
            {
                if status == StatusCode::BAD_REQUEST {
                    if let Some(fields) = parse_field_errors(&body) {
                        return Err(AuthError::ValidationFailed(fields));
                    }
                }
                Err(AuthError::InvalidCredentials(detail_message(&body).unwrap_or_else(
                    || "No active account found with the given credentials".to_string(),
                )))
            }
            Err(e) => Err(e),
        }
    }

    fn commit_profile(&self, seq: u64, profile: UserProfile) -> Result<UserProfile> {
        self.commit(seq, || {
            self.session.update(|state| {
                state.loading = false;
                state.error = None;
                state.profile = Some(profile.clone());
            });
            Ok(profile)
        })
    }

    /// Start a new operation, superseding any in flight.
    fn begin(&self) -> u64 {
        self.session.advance()
    }

    /// Join the current operation without superseding it.
    fn current(&self) -> u64 {
        self.session.epoch()
    }

    fn mark_loading(&self) {
        self.session.update(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    /// Apply a result if operation `seq` is still the newest.
    fn commit<T>(&self, seq: u64, apply: impl FnOnce() -> Result<T>) -> Result<T> {
        self.session.commit(seq, apply).unwrap_or_else(|| {
            tracing::debug!(seq, "Discarding result of superseded operation");
            Err(AuthError::Superseded)
        })
    }

    /// Record `err` in the session (if still current) and return it.
    ///
    /// The authentication flag is left alone: a failed re-login keeps the
    /// session whose tokens are still in the store.
    fn fail<T>(&self, seq: u64, err: AuthError) -> Result<T> {
        let detail = err.detail();
        let recorded = self.session.commit(seq, || {
            self.session.update(|state| {
                state.loading = false;
                state.error = Some(detail);
            });
        });
        if recorded.is_none() {
            tracing::debug!(seq, error = %err, "Discarding failure of superseded operation");
        }
        Err(err)
    }
}

/// Identity and expiry of `token`, if it decodes and has not expired.
fn live_identity(token: &str) -> Option<(Identity, DateTime<Utc>)> {
    let exp = expires_at(token).filter(|exp| *exp > Utc::now())?;
    Some((identity_of(token)?, exp))
}
