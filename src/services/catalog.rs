// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Product catalog API.

use crate::error::Result;
use crate::models::{Category, Page, Product, ProductQuery};
use crate::services::gateway::{Gateway, PendingRequest};

/// Read-only catalog access. Works signed in or out.
#[derive(Clone)]
pub struct CatalogService {
    gateway: Gateway,
}

impl CatalogService {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// List active products matching `query`.
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let request = PendingRequest::get("/products/").query(query)?;
        self.gateway.fetch(request).await
    }

    pub async fn get_product(&self, product_id: u64) -> Result<Product> {
        self.gateway
            .get_json(&format!("/products/{}/", product_id))
            .await
    }

    pub async fn list_categories(&self) -> Result<Page<Category>> {
        self.gateway.get_json("/categories/").await
    }
}
