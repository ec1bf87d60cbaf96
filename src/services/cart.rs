// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shopping cart API. Requires a session.

use crate::error::{AuthError, Result};
use crate::models::cart::{AddCartItem, UpdateCartItem};
use crate::models::Cart;
use crate::services::gateway::{Gateway, PendingRequest};
use reqwest::Method;

/// Cart operations. Each mutation returns the updated cart.
#[derive(Clone)]
pub struct CartService {
    gateway: Gateway,
}

impl CartService {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn get_cart(&self) -> Result<Cart> {
        self.gateway.get_json("/cart/").await
    }

    /// Add `quantity` of a product; existing lines are incremented.
    pub async fn add_item(&self, product_id: u64, quantity: u32) -> Result<Cart> {
        if quantity == 0 {
            return Err(AuthError::field(
                "quantity",
                "Ensure this value is greater than or equal to 1.",
            ));
        }
        tracing::debug!(product_id, quantity, "Adding to cart");
        self.gateway
            .send_json(
                Method::POST,
                "/cart/items/",
                &AddCartItem {
                    product_id,
                    quantity,
                },
            )
            .await
    }

    /// Set the quantity of a cart line.
    pub async fn update_item(&self, item_id: u64, quantity: u32) -> Result<Cart> {
        if quantity == 0 {
            return self.remove_item(item_id).await;
        }
        self.gateway
            .send_json(
                Method::PUT,
                &format!("/cart/items/{}/", item_id),
                &UpdateCartItem { quantity },
            )
            .await
    }

    pub async fn remove_item(&self, item_id: u64) -> Result<Cart> {
        self.gateway
            .fetch(PendingRequest::delete(format!("/cart/items/{}/", item_id)))
            .await
    }
}
