// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guard for protected views.

use crate::routes::RouteTable;
use crate::session::{SessionHandle, SessionState};
use chrono::{DateTime, Utc};

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show the requested view.
    Render,
    /// Session status not known yet; show a neutral placeholder.
    Placeholder,
    /// Send the user to login, remembering where they were going.
    Redirect {
        /// Login URL including the encoded `next` parameter
        to: String,
        /// Exact path originally requested
        return_to: String,
    },
}

/// Decides whether a view may render for the current session.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    routes: RouteTable,
    login_path: String,
}

impl RouteGuard {
    pub fn new(routes: RouteTable, login_path: impl Into<String>) -> Self {
        Self {
            routes,
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Decide for `path` given a session snapshot. Never renders a protected
    /// view while the session is unknown, signed out, or backed by an expired
    /// access token.
    pub fn decide(&self, path: &str, session: &SessionState) -> GuardDecision {
        self.decide_at(path, session, Utc::now())
    }

    /// `decide` with an explicit clock.
    pub fn decide_at(
        &self,
        path: &str,
        session: &SessionState,
        now: DateTime<Utc>,
    ) -> GuardDecision {
        if !self.routes.is_protected(path) {
            return GuardDecision::Render;
        }
        // A live session keeps its view while a profile reload is in flight
        if session.is_active_at(now) {
            return GuardDecision::Render;
        }
        // Unknown, or a login/restore still in flight
        if session.loading {
            return GuardDecision::Placeholder;
        }

        tracing::debug!(path, "Protected view requested without session");
        GuardDecision::Redirect {
            to: format!("{}?next={}", self.login_path, urlencoding::encode(path)),
            return_to: path.to_string(),
        }
    }

    /// Wait for the stored session to be resolved, then decide.
    pub async fn resolve(&self, path: &str, session: &SessionHandle) -> GuardDecision {
        if !self.routes.is_protected(path) {
            return GuardDecision::Render;
        }
        let state = session.wait_until_resolved().await;
        self.decide(path, &state)
    }

    /// Where to go after a successful login.
    ///
    /// Returns the remembered path exactly; `/` only when nothing was
    /// remembered or the value is not a same-site relative path.
    pub fn post_login_destination(&self, return_to: Option<&str>) -> String {
        match return_to {
            Some(path) if is_local_path(path) && path != self.login_path => path.to_string(),
            _ => "/".to_string(),
        }
    }

    /// Recover the remembered path from a login URL built by `decide`.
    pub fn return_to_from_login_url(&self, url: &str) -> Option<String> {
        let (_, query) = url.split_once('?')?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "next")
            .and_then(|(_, value)| urlencoding::decode(value).ok())
            .map(|value| value.into_owned())
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(RouteTable::storefront(), "/login")
    }
}

/// `/path` but not `//host` or `/\host`, which browsers treat as off-site.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}
