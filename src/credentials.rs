//! Secret loading from a private `.env` file and the process environment.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::config::config_dir;

/// Key holding the model API credential.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Key holding the destination integration token.
pub const NOTION_TOKEN: &str = "NOTION_TOKEN";

/// Secrets loaded from the `.env` file.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Value for `key`, if present and non-blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Value for `key`, looking at `env` first and the file second.
    pub fn resolve(&self, key: &str, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        env(key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.get(key).map(str::to_owned))
    }

    /// [`Credentials::resolve`] that fails when the secret is absent.
    ///
    /// # Errors
    ///
    /// Returns an error naming the missing key.
    pub fn require(
        &self,
        key: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<String> {
        self.resolve(key, env).ok_or_else(|| {
            anyhow::anyhow!(
                "missing required credential: {key} (set it in the environment or .env)"
            )
        })
    }
}

/// Load credentials from a specific `.env` path.
///
/// # Errors
///
/// Returns an error if the file does not exist, permissions are too broad,
/// or parsing fails.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "credentials file does not exist: {}",
            path.display()
        ));
    }

    validate_private_permissions(path)?;

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        vars.insert(key, value);
    }

    Ok(Credentials { vars })
}

/// Load `path` if it exists; an absent file yields empty credentials.
///
/// # Errors
///
/// Returns an error if the file exists but is not private or cannot be parsed.
pub fn load_optional_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        debug!(path = %path.display(), "no credentials file, relying on environment");
        return Ok(Credentials::default());
    }
    load_credentials(path)
}

/// Default `.env` location (`~/.cardsync/.env`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_credentials_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join(".env"))
}

#[cfg(unix)]
fn validate_private_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to inspect credentials file {}", path.display()))?;
    let mode = metadata.permissions().mode() & 0o777;

    if mode & 0o077 != 0 {
        return Err(anyhow::anyhow!(
            "credentials file {} must be 0600, found {:o}",
            path.display(),
            mode
        ));
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_private_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}
