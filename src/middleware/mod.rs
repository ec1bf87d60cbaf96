// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-cutting request and navigation concerns (headers, route guard).

pub mod guard;
pub mod headers;

pub use guard::{GuardDecision, RouteGuard};
