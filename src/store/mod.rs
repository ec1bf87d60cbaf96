// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential persistence.
//!
//! A token store holds exactly two values, the access token and the refresh
//! token, under the fixed keys `token` and `refreshToken`. Stores contain no
//! network or validation logic.

pub mod file;
pub mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Key of the persisted access token.
pub const TOKEN_KEY: &str = "token";
/// Key of the persisted refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Snapshot of the persisted credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(rename = "token", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        rename = "refreshToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<String>,
}

impl StoredTokens {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.refresh_token.is_none()
    }
}

/// Trait for credential storage backends.
///
/// Implementations must make `save` appear atomic: a concurrent `load` sees
/// either the old pair or the new pair, never one of each.
pub trait TokenStore: Send + Sync {
    /// Overwrite both values.
    fn save(&self, token: &str, refresh_token: Option<&str>) -> Result<()>;

    /// Replace only the access token, keeping the refresh token.
    fn save_credential(&self, token: &str) -> Result<()>;

    /// Current values. Unreadable storage is reported as absent.
    fn load(&self) -> StoredTokens;

    /// Remove both values. Succeeds when nothing was stored.
    fn clear(&self) -> Result<()>;
}
