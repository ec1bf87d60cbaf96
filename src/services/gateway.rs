// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request gateway: the single path every backend call takes.
//!
//! Handles:
//! - Attaching the stored access token as a bearer credential
//! - Refreshing a locally expired token before sending
//! - One refresh-and-resend when the backend answers 401
//! - Forced sign-out and redirect when the session cannot be renewed
//! - Mapping non-success responses onto `AuthError`
//!
//! Refresh results and forced sign-outs are committed against the session
//! epoch captured when the request started, so they never touch a session
//! created by a later login.

use crate::config::Config;
use crate::error::{AuthError, Result};
use crate::middleware::headers::default_headers;
use crate::models::{RefreshRequest, RefreshResponse};
use crate::routes::Navigator;
use crate::session::{expires_at, identity_of, is_expired, SessionHandle, SessionState};
use crate::store::TokenStore;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Path of the token refresh endpoint.
pub const REFRESH_PATH: &str = "/token/refresh/";

/// Whether a request carries the stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Bearer,
    /// Login and registration: no credential, no refresh on 401.
    Anonymous,
}

/// Position of a request in the refresh protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    /// Resent once after a credential refresh; never refreshed again.
    AfterRefresh,
}

/// Immutable description of a backend call that can be replayed.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    auth: AuthMode,
    attempt: Attempt,
}

impl PendingRequest {
    /// `path` is relative to the API base URL and starts with `/`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: AuthMode::Bearer,
            attempt: Attempt::First,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to encode body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Attach query parameters from a flat serializable struct.
    /// `None` fields are skipped by the struct's own serde attributes.
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self> {
        let value = serde_json::to_value(query)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to encode query: {}", e)))?;
        if let serde_json::Value::Object(map) = value {
            for (key, value) in map {
                let value = match value {
                    serde_json::Value::Null => continue,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                self.query.push((key, value));
            }
        }
        Ok(self)
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = AuthMode::Anonymous;
        self
    }

    /// The same request, tagged as already resent after a refresh.
    pub fn retried(self) -> Self {
        Self {
            attempt: Attempt::AfterRefresh,
            ..self
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    pub fn auth(&self) -> AuthMode {
        self.auth
    }

    fn may_refresh(&self) -> bool {
        self.auth == AuthMode::Bearer && self.attempt == Attempt::First
    }
}

/// HTTP client wrapper implementing credential attachment and refresh-retry.
#[derive(Clone)]
pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
    login_path: String,
    store: Arc<dyn TokenStore>,
    session: SessionHandle,
    navigator: Arc<dyn Navigator>,
    /// Serializes refreshes so concurrent 401s share one refresh call.
    refresh_lock: Arc<Mutex<()>>,
}

impl Gateway {
    pub fn new(
        config: &Config,
        store: Arc<dyn TokenStore>,
        session: SessionHandle,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(default_headers())
            .build()
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            login_path: config.login_path.clone(),
            store,
            session,
            navigator,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Run `request` through the refresh protocol.
    ///
    /// Success responses are returned unchanged. A stored token that has
    /// already expired is refreshed before sending, or ends the session when
    /// there is no refresh token. A 401 on a first attempt with a refresh
    /// token on hand triggers exactly one refresh and one resend; anything
    /// else propagates.
    pub async fn execute(&self, request: PendingRequest) -> Result<reqwest::Response> {
        let epoch = self.session.epoch();

        let auth = request.auth;
        let (request, sent_token) = match auth {
            AuthMode::Anonymous => (request, None),
            AuthMode::Bearer => {
                let stored = self.store.load();
                match stored.token {
                    Some(token) if is_expired(&token) => {
                        if stored.refresh_token.is_none() {
                            tracing::info!(
                                path = %request.path,
                                "Access token expired, signing out"
                            );
                            return Err(self.force_sign_out(epoch));
                        }
                        tracing::info!(path = %request.path, "Access token expired, refreshing");
                        let fresh = self.refresh_credential(epoch, Some(&token)).await?;
                        // This send is the request's one post-refresh attempt
                        (request.retried(), Some(fresh))
                    }
                    token => (request, token),
                }
            }
        };

        let response = self.dispatch(&request, sent_token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !request.may_refresh() {
            return self.check_response(response).await;
        }

        if self.store.load().refresh_token.is_none() {
            tracing::debug!(path = %request.path, "401 without refresh token");
            return self.check_response(response).await;
        }

        let retry = request.retried();
        tracing::info!(
            method = %retry.method,
            path = %retry.path,
            "Access token rejected, refreshing"
        );

        let token = self.refresh_credential(epoch, sent_token.as_deref()).await?;
        let response = self.dispatch(&retry, Some(&token)).await?;
        self.check_response(response).await
    }

    /// Obtain a usable access token after `stale` was rejected.
    ///
    /// If another task replaced the token while we waited for the lock,
    /// that token is reused instead of refreshing again. Fails with
    /// `Superseded` once the session of `epoch` has been replaced.
    async fn refresh_credential(&self, epoch: u64, stale: Option<&str>) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        if self.session.epoch() != epoch {
            tracing::debug!(epoch, "Session replaced before refresh");
            return Err(AuthError::Superseded);
        }

        let stored = self.store.load();
        if let Some(current) = stored.token.as_deref() {
            if Some(current) != stale {
                tracing::debug!("Token already refreshed by another request");
                return Ok(current.to_string());
            }
        }

        // A concurrent refresh failed and cleared the store.
        let refresh_token = stored.refresh_token.ok_or(AuthError::SessionExpired)?;

        let url = format!("{}{}", self.base_url, REFRESH_PATH);
        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest {
                refresh: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| {
                AuthError::NetworkOrServer(format!("Token refresh request failed: {}", e))
            })?;

        let status = response.status();
        if status.is_server_error() {
            tracing::warn!(status = %status, "Token refresh failed on server");
            return Err(AuthError::NetworkOrServer(format!(
                "Token refresh failed with status {}",
                status
            )));
        }

        if !status.is_success() {
            tracing::warn!(status = %status, "Refresh token rejected, signing out");
            return Err(self.force_sign_out(epoch));
        }

        let refreshed: RefreshResponse = response.json().await.map_err(|e| {
            AuthError::NetworkOrServer(format!("Failed to parse refresh response: {}", e))
        })?;

        let identity = identity_of(&refreshed.access);
        let exp = expires_at(&refreshed.access);
        let saved = self.session.commit(epoch, || {
            self.store.save_credential(&refreshed.access)?;
            self.session.update(|state| {
                if state.is_authenticated {
                    if let Some(identity) = identity {
                        state.user = Some(identity);
                    }
                    state.expires_at = exp;
                }
            });
            Ok::<(), AuthError>(())
        });

        match saved {
            Some(result) => result?,
            None => {
                tracing::debug!(epoch, "Discarding refreshed token of replaced session");
                return Err(AuthError::Superseded);
            }
        }

        tracing::info!("Access token refreshed");
        Ok(refreshed.access)
    }

    /// Drop all credentials of the `epoch` session and send the user to the
    /// login view. Returns the error the caller should report.
    fn force_sign_out(&self, epoch: u64) -> AuthError {
        let signed_out = self.session.commit(epoch, || {
            if let Err(e) = self.store.clear() {
                tracing::error!(error = %e, "Failed to clear token store");
            }
            self.session.replace(SessionState::signed_out());
        });

        match signed_out {
            Some(()) => {
                self.navigator.navigate(&self.login_path);
                AuthError::SessionExpired
            }
            None => {
                tracing::debug!(epoch, "Session already replaced, not signing out");
                AuthError::Superseded
            }
        }
    }

    async fn dispatch(
        &self,
        request: &PendingRequest,
        token: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| {
            tracing::warn!(path = %request.path, error = %e, "Request failed");
            AuthError::NetworkOrServer(e.to_string())
        })
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));

        if status.is_server_error() {
            tracing::warn!(status = %status, "Server error");
            return Err(AuthError::NetworkOrServer(format!("HTTP {}: {}", status, body)));
        }

        Err(AuthError::Http { status, body })
    }

    // ─── JSON helpers ────────────────────────────────────────────────────────

    /// Execute and parse the JSON response body.
    pub async fn fetch<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<T> {
        let response = self.execute(request).await?;
        response
            .json()
            .await
            .map_err(|e| AuthError::NetworkOrServer(format!("JSON parse error: {}", e)))
    }

    /// Authenticated GET.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.fetch(PendingRequest::get(path)).await
    }

    /// Authenticated request with a JSON body.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.fetch(PendingRequest::new(method, path).json(body)?).await
    }

    /// Anonymous request with a JSON body (login, registration).
    pub async fn public_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.fetch(PendingRequest::new(method, path).json(body)?.anonymous()).await
    }
}
