// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ShopEase session client: authentication and session lifecycle for the
//! ShopEase storefront.
//!
//! This crate provides credential storage, access token inspection, a
//! request gateway with transparent token refresh, the auth controller that
//! owns session state, and the route guard for protected views. Rendering
//! and the REST backend are external.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod store;

use config::Config;
use error::Result;
use middleware::RouteGuard;
use routes::{Navigator, RouteTable};
use services::{AuthController, CartService, CatalogService, Gateway, OrderService};
use session::{SessionHandle, SessionState};
use std::sync::Arc;
use store::{FileTokenStore, MemoryTokenStore, TokenStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared client context, constructed once at application start.
#[derive(Clone)]
pub struct Storefront {
    pub config: Config,
    pub session: SessionHandle,
    pub auth: AuthController,
    pub catalog: CatalogService,
    pub cart: CartService,
    pub orders: OrderService,
    pub guard: RouteGuard,
}

impl Storefront {
    /// Wire all components around one token store and one session.
    pub fn new(
        config: Config,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let session = SessionHandle::new();
        let gateway = Gateway::new(&config, store, session.clone(), navigator)?;
        let guard = RouteGuard::new(RouteTable::storefront(), config.login_path.clone());

        Ok(Self {
            session,
            auth: AuthController::new(gateway.clone()),
            catalog: CatalogService::new(gateway.clone()),
            cart: CartService::new(gateway.clone()),
            orders: OrderService::new(gateway),
            guard,
            config,
        })
    }

    /// Build from environment configuration. Uses a file token store when
    /// `TOKEN_FILE` is set, memory otherwise.
    pub fn from_env(navigator: Arc<dyn Navigator>) -> Result<Self> {
        let config = Config::from_env()?;
        let store: Arc<dyn TokenStore> = match &config.token_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "Using file token store");
                Arc::new(FileTokenStore::open(path))
            }
            None => Arc::new(MemoryTokenStore::new()),
        };
        Self::new(config, store, navigator)
    }

    /// Resolve the stored session. Call before the first navigation.
    pub async fn start(&self) -> SessionState {
        let state = self.auth.restore_session().await;
        tracing::info!(
            authenticated = state.is_authenticated,
            api = %self.config.api_base_url,
            "Storefront session ready"
        );
        state
    }
}

/// Install structured JSON logging. Safe to call more than once.
pub fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("shopease_session=debug,info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init();
}
