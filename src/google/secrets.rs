//! The OAuth credential cache.
//!
//! A single TOML file holding the OAuth client credentials and, once the user
//! has given consent, the session tokens:
//!
//! ```toml
//! client_id = "your-client-id.apps.googleusercontent.com"
//! client_secret = "your-client-secret"
//!
//! [session]
//! access_token = "..."
//! refresh_token = "..."
//! expires_at = "2025-03-20T15:00:00Z"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::TokenResponse;

/// Refresh a little before Google would reject the token.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Google OAuth client credentials (user-provided).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a token response. Refresh responses usually omit
    /// the refresh token, in which case `previous_refresh_token` is kept.
    pub fn from_token_response(
        tokens: TokenResponse,
        previous_refresh_token: Option<&str>,
    ) -> Result<Self> {
        let refresh_token = tokens
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh_token.map(str::to_string))
            .context("Google did not return a refresh token")?;

        Ok(Session {
            access_token: tokens.access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
        })
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsFile {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

impl SecretsFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Google credentials not found.\n\n\
                Create {} with:\n\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"\n\n\
                See https://console.cloud.google.com/apis/credentials for setup.",
                path.display()
            );
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize credentials")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write credentials to {}", path.display()))?;

        // Set to owner-only (0600) since file contains OAuth tokens:
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }
}
