// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Order models.

use super::{Product, UserSummary};
use serde::{Deserialize, Serialize};

/// Line in a placed order. `price` is the unit price at purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: u64,
    pub product: Product,
    pub quantity: u32,
    pub price: String,
}

/// Placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    #[serde(default)]
    pub user: Option<UserSummary>,
    pub full_name: String,
    pub email: String,
    pub address: String,
    pub phone_number: String,
    pub status: String,
    pub total_amount: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub created_at: String,
}

/// Checkout details for `POST /orders/`. The backend turns the current
/// cart into the order's items.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub full_name: String,
    pub email: String,
    pub address: String,
    pub phone_number: String,
}
