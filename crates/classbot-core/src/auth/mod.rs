//! Credential acquisition and persistence for the Classroom API.
//!
//! Saved user credentials live in `token.json` and are written with
//! restricted permissions (0600). Tokens are never logged in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{Error, Result};

pub mod flow;

pub use flow::{ConsentFlow, LocalConsentFlow, TokenGrant};

/// OAuth scope requested from the consent flow: read-only course listing.
pub const CLASSROOM_COURSES_READONLY: &str =
    "https://www.googleapis.com/auth/classroom.courses.readonly";

/// Google token endpoint used for refresh grants.
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Type discriminator stored in the credential record.
const AUTHORIZED_USER: &str = "authorized_user";

pub(crate) fn now_millis_u64() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or(u64::MAX)
}

/// A saved user credential, serialized to `token.json`.
///
/// A single record, overwritten wholesale after each successful interactive
/// grant. Holds enough to mint new access tokens without re-prompting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Credential type (always "authorized_user").
    #[serde(rename = "type")]
    pub cred_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl StoredCredential {
    pub fn new(secrets: &ClientSecrets, refresh_token: &str) -> Self {
        Self {
            cred_type: AUTHORIZED_USER.to_string(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            refresh_token: refresh_token.to_string(),
        }
    }
}

/// OAuth client registration (the identity of the calling application, not
/// the end user). Provisioned out of band and read-only here.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    /// "Installed app" variant.
    installed: Option<ClientSecrets>,
    /// "Web app" variant.
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Loads the client registration from `credentials.json`.
    ///
    /// Failures here mean a fresh grant cannot even be attempted, so they
    /// surface as authentication errors.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            Error::Authentication(format!(
                "failed to read client secrets from {}: {err}",
                path.display()
            ))
        })?;

        let file: ClientSecretsFile = serde_json::from_str(&contents).map_err(|err| {
            Error::Authentication(format!(
                "failed to parse client secrets from {}: {err}",
                path.display()
            ))
        })?;

        file.installed.or(file.web).ok_or_else(|| {
            Error::Authentication(format!(
                "{} has neither an `installed` nor a `web` section",
                path.display()
            ))
        })
    }
}

/// In-memory authorization handle for one command invocation.
///
/// Mints bearer access tokens on demand from the refresh token, and carries
/// any access token the consent flow already produced. Never persisted.
#[derive(Debug, Clone)]
pub struct Authorizer {
    client_id: String,
    client_secret: String,
    refresh_token: Option<String>,
    access_token: Option<String>,
    /// Expiry of `access_token` in milliseconds since epoch.
    expires_at: u64,
}

impl Authorizer {
    fn from_stored(stored: StoredCredential) -> Self {
        Self {
            client_id: stored.client_id,
            client_secret: stored.client_secret,
            refresh_token: Some(stored.refresh_token),
            access_token: None,
            expires_at: 0,
        }
    }

    fn from_grant(secrets: &ClientSecrets, grant: TokenGrant) -> Self {
        Self {
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            refresh_token: grant.refresh_token,
            access_token: Some(grant.access_token),
            expires_at: grant.expires_at,
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns a bearer token, refreshing through the token endpoint when the
    /// cached one is missing or stale. A revoked or expired refresh token is
    /// not detected up front; it surfaces here as a downstream error.
    pub async fn bearer_token(&mut self, http: &reqwest::Client) -> Result<String> {
        if let Some(token) = self.access_token.as_deref()
            && now_millis_u64() < self.expires_at
        {
            return Ok(token.to_string());
        }

        let Some(refresh) = self.refresh_token.as_deref() else {
            return Err(Error::Downstream(
                "no refresh token available to mint an access token".to_string(),
            ));
        };

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("refresh_token", refresh)
            .finish();

        let response = http
            .post(TOKEN_URL)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|err| Error::Downstream(format!("failed to send token refresh request: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Downstream(format!(
                "token refresh failed (HTTP {status}): {body}"
            )));
        }

        let token: RefreshResponse = response
            .json()
            .await
            .map_err(|err| Error::Downstream(format!("failed to parse token response: {err}")))?;

        self.expires_at =
            now_millis_u64() + (token.expires_in * 1000).saturating_sub(5 * 60 * 1000);
        self.access_token = Some(token.access_token.clone());
        Ok(token.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: u64,
}

/// Reads a previously saved credential.
///
/// Any failure (missing file, malformed content, wrong record type) is a
/// cache miss, deliberately indistinguishable from an absent file. The
/// "don't care why it's missing" decision lives here and nowhere else.
pub fn try_load_stored(path: &Path) -> Option<StoredCredential> {
    let contents = fs::read_to_string(path).ok()?;
    let stored: StoredCredential = serde_json::from_str(&contents).ok()?;
    (stored.cred_type == AUTHORIZED_USER).then_some(stored)
}

/// Saves the credential record, overwriting any previous one. Written with
/// restricted permissions (0600) on unix.
pub fn save_stored(path: &Path, stored: &StoredCredential) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            Error::Persistence(format!(
                "failed to create directory {}: {err}",
                parent.display()
            ))
        })?;
    }

    let contents = serde_json::to_string(stored)
        .map_err(|err| Error::Persistence(format!("failed to serialize credential: {err}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|err| {
                Error::Persistence(format!("failed to open {} for writing: {err}", path.display()))
            })?;
        file.write_all(contents.as_bytes()).map_err(|err| {
            Error::Persistence(format!("failed to write to {}: {err}", path.display()))
        })?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|err| {
            Error::Persistence(format!("failed to write to {}: {err}", path.display()))
        })?;
    }

    Ok(())
}

/// Produces an authorization handle for the Classroom API, using the cheapest
/// available method: a previously saved credential when one is usable,
/// otherwise a fresh interactive grant that is persisted for next time.
///
/// With a valid saved credential this performs no consent flow and no write.
/// Concurrent callers that both miss the saved credential will both run the
/// consent flow and race on the write; last writer wins. Accepted limitation
/// for a single-operator deployment.
pub async fn acquire<F: ConsentFlow>(config: &AuthConfig, flow: &F) -> Result<Authorizer> {
    if let Some(stored) = try_load_stored(&config.token_path) {
        tracing::debug!(path = %config.token_path.display(), "using saved credential");
        return Ok(Authorizer::from_stored(stored));
    }

    let secrets = ClientSecrets::load(&config.client_secrets_path)?;
    tracing::info!("no saved credential, starting interactive consent flow");
    let grant = flow.authorize(&secrets, &[CLASSROOM_COURSES_READONLY]).await?;

    if let Some(refresh_token) = grant.refresh_token.as_deref() {
        save_stored(&config.token_path, &StoredCredential::new(&secrets, refresh_token))?;
        tracing::info!(
            path = %config.token_path.display(),
            refresh = %mask_token(refresh_token),
            "saved user credential"
        );
    }

    Ok(Authorizer::from_grant(&secrets, grant))
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}
