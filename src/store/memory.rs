// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory token store.

use super::{StoredTokens, TokenStore};
use crate::error::Result;
use parking_lot::RwLock;

/// Process-local token store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the given values.
    pub fn with_tokens(token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            tokens: RwLock::new(StoredTokens {
                token,
                refresh_token,
            }),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, token: &str, refresh_token: Option<&str>) -> Result<()> {
        *self.tokens.write() = StoredTokens {
            token: Some(token.to_string()),
            refresh_token: refresh_token.map(str::to_string),
        };
        Ok(())
    }

    fn save_credential(&self, token: &str) -> Result<()> {
        self.tokens.write().token = Some(token.to_string());
        Ok(())
    }

    fn load(&self) -> StoredTokens {
        self.tokens.read().clone()
    }

    fn clear(&self) -> Result<()> {
        *self.tokens.write() = StoredTokens::default();
        Ok(())
    }
}
