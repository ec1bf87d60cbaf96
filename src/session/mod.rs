// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session state and the shared handle that publishes it.
//!
//! `SessionState` is derived and never persisted: it is rebuilt from the
//! token store by `AuthController::restore_session` at startup and
//! recomputed on every credential change.
//!
//! The handle also carries the session epoch. Every operation that replaces
//! the session (login, registration, restore, logout) advances it, and any
//! write made on behalf of an older epoch is dropped, so a slow response
//! from a previous session can never overwrite a newer one.

pub mod claims;

pub use claims::{expires_at, identity_of, is_expired, is_expired_at, Claims, Identity};

use crate::error::ErrorDetail;
use crate::models::UserProfile;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Authentication status as the UI sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub user: Option<Identity>,
    pub profile: Option<UserProfile>,
    /// True until the stored session has been resolved, and while an
    /// operation is in flight.
    pub loading: bool,
    pub error: Option<ErrorDetail>,
    /// Expiry of the access token backing this session.
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// State before `restore_session` has run: status unknown.
    pub fn unknown() -> Self {
        Self {
            loading: true,
            ..Self::signed_out()
        }
    }

    /// Resolved, unauthenticated state with nothing cached.
    pub fn signed_out() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            profile: None,
            loading: false,
            error: None,
            expires_at: None,
        }
    }

    pub fn signed_in(user: Identity, expires_at: DateTime<Utc>) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            expires_at: Some(expires_at),
            ..Self::signed_out()
        }
    }

    /// Authenticated with an access token that is still valid at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_authenticated && matches!(self.expires_at, Some(exp) if exp > now)
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Shared, cloneable owner of the current `SessionState`.
#[derive(Clone)]
pub struct SessionHandle {
    tx: watch::Sender<SessionState>,
    epoch: Arc<AtomicU64>,
    /// Held while a result is checked against the epoch and applied.
    commit_lock: Arc<Mutex<()>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::unknown());
        Self {
            tx,
            epoch: Arc::new(AtomicU64::new(0)),
            commit_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Raw flag; see `SessionState::is_active` for the expiry-aware check.
    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Wait until the session is no longer loading and return it.
    pub async fn wait_until_resolved(&self) -> SessionState {
        let mut rx = self.tx.subscribe();
        let state = match rx.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        state
    }

    /// Current epoch. Work started now may commit only while it is unchanged.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Start a new epoch, superseding all work in flight.
    pub(crate) fn advance(&self) -> u64 {
        let _commit = self.commit_lock.lock();
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start a new epoch and apply `reset` before anyone can commit to it.
    pub(crate) fn supersede<T>(&self, reset: impl FnOnce() -> T) -> T {
        let _commit = self.commit_lock.lock();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        reset()
    }

    /// Run `apply` if `epoch` is still current; `None` if it was superseded.
    pub(crate) fn commit<T>(&self, epoch: u64, apply: impl FnOnce() -> T) -> Option<T> {
        let _commit = self.commit_lock.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return None;
        }
        Some(apply())
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut SessionState)) {
        self.tx.send_modify(f);
    }

    pub(crate) fn replace(&self, state: SessionState) {
        self.tx.send_replace(state);
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}
