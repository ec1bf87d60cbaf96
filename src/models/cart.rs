// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shopping cart models.

use super::Product;
use serde::{Deserialize, Serialize};

/// Line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: u64,
    pub product: Product,
    pub quantity: u32,
}

/// The current user's cart. Every cart mutation returns the whole cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: u64,
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Server-computed total; a number or decimal string depending on backend
    #[serde(default)]
    pub total: serde_json::Value,
}

impl Cart {
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn find_product(&self, product_id: u64) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product.id == product_id)
    }
}

/// Body of `POST /cart/items/`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AddCartItem {
    pub product_id: u64,
    pub quantity: u32,
}

/// Body of `PUT /cart/items/:id/`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateCartItem {
    pub quantity: u32,
}
