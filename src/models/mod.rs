// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models exchanged with the storefront API.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem};
pub use order::{NewOrder, Order, OrderItem};
pub use product::{Category, Page, Product, ProductQuery};
pub use user::{
    Credentials, ProfileUpdate, RefreshRequest, RefreshResponse, RegistrationForm, TokenPair,
    UserProfile, UserSummary,
};
