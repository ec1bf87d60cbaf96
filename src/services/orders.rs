// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Order history and checkout API. Requires a session.

use crate::error::Result;
use crate::models::{NewOrder, Order, Page};
use crate::services::gateway::{Gateway, PendingRequest};
use reqwest::Method;

#[derive(Clone)]
pub struct OrderService {
    gateway: Gateway,
}

impl OrderService {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Orders of the current user, newest first.
    pub async fn list_orders(&self) -> Result<Page<Order>> {
        self.gateway.get_json("/orders/").await
    }

    pub async fn get_order(&self, order_id: u64) -> Result<Order> {
        self.gateway
            .fetch(PendingRequest::get(format!("/orders/{}/", order_id)))
            .await
    }

    /// Place an order from the current cart.
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order> {
        let result = self
            .gateway
            .send_json::<_, Order>(Method::POST, "/orders/", order)
            .await;

        match result {
            Ok(order) => {
                tracing::info!(order_id = order.id, total = %order.total_amount, "Order placed");
                Ok(order)
            }
            Err(e) => Err(e.field_level()),
        }
    }
}
