// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed token store.
//!
//! Credentials are kept as a small JSON document:
//!
//! ```json
//! {"token": "eyJhbGciOi...", "refreshToken": "eyJhbGciOi..."}
//! ```
//!
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a crash mid-write leaves either the old pair or the new pair on disk.
//! On Unix the file is created with mode 0600.

use super::{StoredTokens, TokenStore};
use crate::error::{AuthError, Result};
use parking_lot::RwLock;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Token store persisted to a JSON file.
#[derive(Debug)]
pub struct FileTokenStore {
    file_path: PathBuf,
    /// Last state written to (or read from) disk.
    cache: RwLock<StoredTokens>,
}

impl FileTokenStore {
    /// Open a store at `file_path`, reading any existing credentials.
    ///
    /// A missing file is an empty store. A corrupt file is treated as empty
    /// and overwritten on the next save.
    pub fn open(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let tokens = read_tokens(&file_path);
        Self {
            file_path,
            cache: RwLock::new(tokens),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn persist(&self, tokens: &StoredTokens) -> Result<()> {
        if tokens.is_empty() {
            return match fs::remove_file(&self.file_path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AuthError::Storage(format!(
                    "Failed to remove {}: {}",
                    self.file_path.display(),
                    e
                ))),
            };
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| AuthError::Storage(format!("Failed to create dir: {}", e)))?;
            }
        }

        let json = serde_json::to_vec(tokens)
            .map_err(|e| AuthError::Storage(format!("Failed to serialize tokens: {}", e)))?;

        let tmp_path = self.file_path.with_extension("tmp");
        {
            let mut file = open_private(&tmp_path)
                .map_err(|e| AuthError::Storage(format!("Failed to open temp file: {}", e)))?;
            file.write_all(&json)
                .and_then(|_| file.sync_all())
                .map_err(|e| AuthError::Storage(format!("Failed to write tokens: {}", e)))?;
        }

        fs::rename(&tmp_path, &self.file_path)
            .map_err(|e| AuthError::Storage(format!("Failed to replace token file: {}", e)))
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &str, refresh_token: Option<&str>) -> Result<()> {
        let mut cache = self.cache.write();
        let tokens = StoredTokens {
            token: Some(token.to_string()),
            refresh_token: refresh_token.map(str::to_string),
        };
        self.persist(&tokens)?;
        *cache = tokens;
        Ok(())
    }

    fn save_credential(&self, token: &str) -> Result<()> {
        let mut cache = self.cache.write();
        let tokens = StoredTokens {
            token: Some(token.to_string()),
            refresh_token: cache.refresh_token.clone(),
        };
        self.persist(&tokens)?;
        *cache = tokens;
        Ok(())
    }

    fn load(&self) -> StoredTokens {
        self.cache.read().clone()
    }

    fn clear(&self) -> Result<()> {
        let mut cache = self.cache.write();
        // Forget in memory first so a failed delete still fails closed.
        *cache = StoredTokens::default();
        self.persist(&cache)
    }
}

fn read_tokens(path: &Path) -> StoredTokens {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Token file is unreadable, treating as empty"
            );
            StoredTokens::default()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredTokens::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read token file");
            StoredTokens::default()
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
