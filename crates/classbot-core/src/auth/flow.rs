//! Interactive consent flow (browser-based OAuth with a loopback redirect).
//!
//! Opens the system browser on the Google consent screen and waits for the
//! redirect on a local listener. Blocks until the user completes or abandons
//! the flow; the caller decides whether to bound that wait.

use std::future::Future;
use std::io::{Read, Write};
use std::net::TcpListener;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::auth::{ClientSecrets, now_millis_u64};
use crate::error::{Error, Result};

/// Google OAuth endpoints.
const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Loopback redirect target for installed-app clients.
const CALLBACK_PORT: u16 = 8085;
const CALLBACK_PATH: &str = "/oauth2callback";

/// A fresh grant produced by the consent flow.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token; Google omits it on repeat consents.
    pub refresh_token: Option<String>,
    /// Expiry of `access_token` in milliseconds since epoch.
    pub expires_at: u64,
}

/// The interactive, human-in-the-loop grant mechanism.
pub trait ConsentFlow {
    /// Drives a consent flow for `scopes` and returns the resulting grant.
    fn authorize(
        &self,
        secrets: &ClientSecrets,
        scopes: &[&str],
    ) -> impl Future<Output = Result<TokenGrant>> + Send;
}

/// Consent flow that opens the system browser and waits for the OAuth
/// redirect on a loopback listener.
#[derive(Debug, Default)]
pub struct LocalConsentFlow;

impl ConsentFlow for LocalConsentFlow {
    async fn authorize(&self, secrets: &ClientSecrets, scopes: &[&str]) -> Result<TokenGrant> {
        let pkce = generate_pkce();
        let state = uuid::Uuid::new_v4().to_string();
        let redirect_uri = format!("http://localhost:{CALLBACK_PORT}{CALLBACK_PATH}");
        let auth_url = build_auth_url(secrets, &pkce, &state, &redirect_uri, scopes);

        let listener = TcpListener::bind(("127.0.0.1", CALLBACK_PORT)).map_err(|err| {
            Error::Authentication(format!(
                "failed to bind localhost:{CALLBACK_PORT} for the OAuth callback: {err}"
            ))
        })?;

        if open::that(&auth_url).is_err() {
            tracing::warn!("could not open a browser; visit the URL manually");
        }
        eprintln!("Open this URL to authorize classbot:\n{auth_url}");

        let expected_state = state.clone();
        let code = tokio::task::spawn_blocking(move || wait_for_code(&listener, &expected_state))
            .await
            .map_err(|err| Error::Authentication(format!("callback listener task failed: {err}")))?
            .ok_or_else(|| {
                Error::Authentication(
                    "consent flow did not return an authorization code".to_string(),
                )
            })?;

        exchange_code(secrets, &pkce, &code, &redirect_uri).await
    }
}

/// PKCE code verifier and challenge.
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

/// Generate PKCE code verifier and challenge.
pub fn generate_pkce() -> Pkce {
    // Use two UUIDs (16 bytes each) to get 32 random bytes
    let uuid1 = uuid::Uuid::new_v4();
    let uuid2 = uuid::Uuid::new_v4();
    let mut verifier_bytes = [0u8; 32];
    verifier_bytes[..16].copy_from_slice(uuid1.as_bytes());
    verifier_bytes[16..].copy_from_slice(uuid2.as_bytes());
    let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());

    Pkce {
        verifier,
        challenge,
    }
}

/// Build the Google authorization URL.
///
/// `access_type=offline` plus `prompt=consent` so the grant carries a refresh
/// token that can be persisted.
fn build_auth_url(
    secrets: &ClientSecrets,
    pkce: &Pkce,
    state: &str,
    redirect_uri: &str,
    scopes: &[&str],
) -> String {
    let scope = scopes.join(" ");
    let params = [
        ("response_type", "code"),
        ("client_id", secrets.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", scope.as_str()),
        ("code_challenge", pkce.challenge.as_str()),
        ("code_challenge_method", "S256"),
        ("state", state),
        ("access_type", "offline"),
        ("prompt", "consent"),
    ];

    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    format!("{AUTHORIZE_URL}?{query}")
}

/// Outcome of parsing one HTTP request on the loopback listener.
enum Callback {
    /// The redirect arrived with a valid state and a code.
    Code(String),
    /// The redirect arrived but without a usable code (denied consent,
    /// state mismatch).
    Denied,
    /// Some other request (favicon and friends); keep waiting.
    NotCallback,
}

fn wait_for_code(listener: &TcpListener, expected_state: &str) -> Option<String> {
    loop {
        let Ok((mut stream, _)) = listener.accept() else {
            return None;
        };
        let mut buffer = [0u8; 2048];
        let _ = stream.read(&mut buffer);
        let request = String::from_utf8_lossy(&buffer);

        match parse_callback(&request, expected_state) {
            Callback::Code(code) => {
                let _ = stream.write_all(success_response().as_bytes());
                return Some(code);
            }
            Callback::Denied => {
                let _ = stream.write_all(error_response().as_bytes());
                return None;
            }
            Callback::NotCallback => {
                let _ = stream.write_all(error_response().as_bytes());
            }
        }
    }
}

fn parse_callback(request: &str, expected_state: &str) -> Callback {
    let Some(request_line) = request.lines().next() else {
        return Callback::NotCallback;
    };
    let mut parts = request_line.split_whitespace();
    let _method = parts.next();
    let Some(path) = parts.next() else {
        return Callback::NotCallback;
    };

    let Ok(url) = url::Url::parse(&format!("http://localhost{path}")) else {
        return Callback::NotCallback;
    };
    if url.path() != CALLBACK_PATH {
        return Callback::NotCallback;
    }

    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string());
    if state.as_deref() != Some(expected_state) {
        return Callback::Denied;
    }

    match url.query_pairs().find(|(k, _)| k == "code") {
        Some((_, code)) => Callback::Code(code.to_string()),
        None => Callback::Denied,
    }
}

fn success_response() -> String {
    let body =
        "<html><body><h3>Authorization complete</h3><p>You can close this window.</p></body></html>";
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

fn error_response() -> String {
    let body =
        "<html><body><h3>Authorization failed</h3><p>Please return to the bot and try again.</p></body></html>";
    format!(
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

/// Exchanges the authorization code for tokens.
async fn exchange_code(
    secrets: &ClientSecrets,
    pkce: &Pkce,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenGrant> {
    let client = reqwest::Client::new();
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "authorization_code")
        .append_pair("client_id", &secrets.client_id)
        .append_pair("client_secret", &secrets.client_secret)
        .append_pair("code", code)
        .append_pair("code_verifier", &pkce.verifier)
        .append_pair("redirect_uri", redirect_uri)
        .finish();

    let response = client
        .post(TOKEN_URL)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await
        .map_err(|err| Error::Authentication(format!("failed to send token exchange request: {err}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Authentication(format!(
            "token exchange failed (HTTP {status}): {body}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|err| Error::Authentication(format!("failed to parse token response: {err}")))?;

    Ok(TokenGrant {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: compute_expires_at(token.expires_in),
    })
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: u64,
}

fn compute_expires_at(expires_in_secs: u64) -> u64 {
    // 5 minute safety margin before the real expiry.
    now_millis_u64() + (expires_in_secs * 1000).saturating_sub(5 * 60 * 1000)
}

#[cfg(test)]
mod tests {
    use super::{Callback, ClientSecrets, build_auth_url, generate_pkce, parse_callback};

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "abc".to_string(),
            client_secret: "xyz".to_string(),
        }
    }

    /// Test: PKCE generation produces valid output.
    #[test]
    fn test_pkce_generation() {
        let pkce = generate_pkce();
        assert!(!pkce.verifier.is_empty());
        assert!(!pkce.challenge.is_empty());
        // Verifier should be base64url encoded 32 bytes = 43 chars
        assert!(pkce.verifier.len() >= 40);
    }

    /// Test: Auth URL contains required parameters.
    #[test]
    fn test_auth_url_format() {
        let pkce = generate_pkce();
        let url = build_auth_url(
            &secrets(),
            &pkce,
            "state-1",
            "http://localhost:8085/oauth2callback",
            &["https://www.googleapis.com/auth/classroom.courses.readonly"],
        );

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=abc"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("code_challenge="));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("classroom.courses.readonly"));
    }

    #[test]
    fn callback_with_code_and_state_is_accepted() {
        let request =
            "GET /oauth2callback?state=s1&code=4%2F0abc HTTP/1.1\r\nHost: localhost\r\n\r\n";
        match parse_callback(request, "s1") {
            Callback::Code(code) => assert_eq!(code, "4/0abc"),
            _ => panic!("expected code"),
        }
    }

    #[test]
    fn callback_with_wrong_state_is_denied() {
        let request = "GET /oauth2callback?state=other&code=abc HTTP/1.1\r\n\r\n";
        assert!(matches!(parse_callback(request, "s1"), Callback::Denied));
    }

    #[test]
    fn callback_without_code_is_denied() {
        let request = "GET /oauth2callback?state=s1&error=access_denied HTTP/1.1\r\n\r\n";
        assert!(matches!(parse_callback(request, "s1"), Callback::Denied));
    }

    #[test]
    fn unrelated_request_keeps_waiting() {
        let request = "GET /favicon.ico HTTP/1.1\r\n\r\n";
        assert!(matches!(
            parse_callback(request, "s1"),
            Callback::NotCallback
        ));
    }
}
