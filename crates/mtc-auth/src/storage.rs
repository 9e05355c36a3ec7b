//! Token storage for persisting OAuth2 state across requests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};
use crate::token::TokenRecord;

/// Key under which the OAuth2 token is stored.
pub const TOKEN_STATE_KEY: &str = "mautic_integration.oauth2_token";

/// Trait for token storage implementations.
pub trait TokenStore: Send + Sync {
    /// Load a token. Absent keys are `Ok(None)`.
    fn load(&self, key: &str) -> Result<Option<TokenRecord>>;

    /// Save a token, replacing any previous value.
    fn save(&self, key: &str, token: &TokenRecord) -> Result<()>;

    /// Delete a token. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Process-local token storage.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, TokenRecord>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, TokenRecord>>> {
        self.tokens
            .lock()
            .map_err(|_| Error::new(ErrorKind::Storage("token store lock poisoned".to_string())))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, key: &str) -> Result<Option<TokenRecord>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn save(&self, key: &str, token: &TokenRecord) -> Result<()> {
        self.lock()?.insert(key.to_string(), token.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// File-based token storage.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_path: PathBuf,
}

impl FileTokenStore {
    /// Create a new file token store with the default path.
    ///
    /// Default path: `~/.mtcbridge/tokens/`
    pub fn new() -> Result<Self> {
        let base_path = default_token_dir()?;
        Ok(Self { base_path })
    }

    /// Create a new file token store with a custom path.
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            base_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the token file path for a key.
    fn token_path(&self, key: &str) -> PathBuf {
        // Sanitize the key to create a safe filename
        let safe_key = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect::<String>();

        self.base_path.join(format!("{}.json", safe_key))
    }

    /// Ensure the base directory exists.
    fn ensure_dir(&self) -> Result<()> {
        if !self.base_path.exists() {
            std::fs::create_dir_all(&self.base_path)?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, key: &str) -> Result<Option<TokenRecord>> {
        let path = self.token_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&path)?;
        let stored: StoredToken = serde_json::from_str(&json)?;

        Ok(Some(stored.token))
    }

    fn save(&self, key: &str, token: &TokenRecord) -> Result<()> {
        self.ensure_dir()?;

        let path = self.token_path(key);
        let stored = StoredToken {
            token: token.clone(),
            stored_at: chrono::Utc::now(),
        };

        let json = serde_json::to_string_pretty(&stored)?;

        // Readers only ever see a complete file: write aside, then rename over.
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&tmp_path, perms)?;
        }

        if let Err(err) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(err.into());
        }

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.token_path(key);

        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        Ok(())
    }
}

/// Token with storage metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: TokenRecord,
    stored_at: chrono::DateTime<chrono::Utc>,
}

/// Get the default token storage directory.
pub fn default_token_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        Error::new(ErrorKind::Storage(
            "Could not find home directory".to_string(),
        ))
    })?;

    Ok(home.join(".mtcbridge").join("tokens"))
}
