// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - backend access and session logic.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod gateway;
pub mod orders;

pub use auth::AuthController;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use gateway::{Attempt, AuthMode, Gateway, PendingRequest};
pub use orders::OrderService;
