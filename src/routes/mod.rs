// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storefront route table and navigation.
//!
//! The rendering layer owns the actual views; this module only knows which
//! paths require a session and how to ask the host to navigate.

use parking_lot::Mutex;

/// Access level of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `:name` matches any single non-empty segment
    Param,
}

/// Path pattern such as `/orders/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    pattern: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split_segments(pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(_) => Segment::Param,
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether `path` (query string and fragment ignored) matches.
    pub fn matches(&self, path: &str) -> bool {
        let mut parts = split_segments(strip_query(path));
        for segment in &self.segments {
            match (segment, parts.next()) {
                (Segment::Literal(lit), Some(part)) if lit == part => {}
                (Segment::Param, Some(_)) => {}
                _ => return false,
            }
        }
        parts.next().is_none()
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Path without `?query` or `#fragment`.
pub fn strip_query(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// Ordered list of known routes. First match wins; unknown paths are public
/// (they render the not-found view).
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<(RoutePattern, Access)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn public(mut self, pattern: &str) -> Self {
        self.routes.push((RoutePattern::parse(pattern), Access::Public));
        self
    }

    pub fn protected(mut self, pattern: &str) -> Self {
        self.routes
            .push((RoutePattern::parse(pattern), Access::Protected));
        self
    }

    /// The storefront's views.
    pub fn storefront() -> Self {
        Self::new()
            .public("/")
            .public("/login")
            .public("/register")
            .public("/products")
            .public("/products/:id")
            .public("/cart")
            .protected("/checkout")
            .protected("/profile")
            .protected("/orders")
            .protected("/orders/:id")
    }

    pub fn access(&self, path: &str) -> Access {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, access)| *access)
            .unwrap_or(Access::Public)
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.access(path) == Access::Protected
    }
}

/// Host hook for navigation side effects (e.g. a forced redirect to login).
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for hosts that poll session state instead.
#[derive(Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "Navigation requested (ignored)");
    }
}

/// Navigator that records every requested path.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visits.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        tracing::info!(path, "Navigating");
        self.visits.lock().push(path.to_string());
    }
}
