//! OAuth login through GitHub.
//!
//! The server never implements the protocol itself: it builds the authorize
//! URL, exchanges the callback code for a provider token, and reads the
//! provider profile over plain HTTPS.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use moonbrain_core::defaults::GITHUB_PROVIDER;
use moonbrain_core::{Error, Result, UserProfile};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_SCOPE: &str = "read:user,user:email";
const USER_AGENT: &str = concat!("moonbrain/", env!("CARGO_PKG_VERSION"));

/// Path of the callback route, appended to the public backend URL.
pub const CALLBACK_PATH: &str = "/v1/auth/github/callback";

/// External identity provider used for login.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL the browser is sent to, carrying `state` through the round trip.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange a callback `code` for a provider access token.
    async fn exchange_code(&self, code: &str) -> Result<String>;

    /// Read the profile of the account that owns `access_token`.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile>;
}

// =============================================================================
// STATE SIGNING
// =============================================================================

/// Issues and verifies the OAuth `state` parameter.
///
/// A state is `<nonce>.<hex hmac-sha256(nonce)>`, so the callback can check
/// that it was issued by this server without keeping a session store.
#[derive(Clone)]
pub struct StateSigner {
    key: Vec<u8>,
}

impl StateSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    fn signature(&self, nonce: &str) -> Option<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(nonce.as_bytes());
        Some(mac.finalize().into_bytes().to_vec())
    }

    pub fn issue(&self) -> Result<String> {
        let nonce = Uuid::new_v4().simple().to_string();
        let signature = self
            .signature(&nonce)
            .ok_or_else(|| Error::Internal("cannot sign OAuth state".into()))?;
        Ok(format!("{}.{}", nonce, hex::encode(signature)))
    }

    pub fn verify(&self, state: &str) -> bool {
        let Some((nonce, signature)) = state.split_once('.') else {
            return false;
        };
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.key) else {
            return false;
        };
        mac.update(nonce.as_bytes());
        mac.verify_slice(&signature).is_ok()
    }
}

// =============================================================================
// GITHUB
// =============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// GitHub OAuth app client.
pub struct GitHubProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GitHubProvider {
    pub fn new(client_id: &str, client_secret: &str, backend_host: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: format!("{}{}", backend_host.trim_end_matches('/'), CALLBACK_PATH),
        }
    }

    async fn primary_email(&self, access_token: &str) -> Result<Option<String>> {
        let emails: Vec<GitHubEmail> = self
            .client
            .get(format!("{GITHUB_API_URL}/user/emails"))
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email))
    }
}

#[async_trait]
impl OAuthProvider for GitHubProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}",
            GITHUB_AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(GITHUB_SCOPE),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<String> {
        let response: TokenResponse = self
            .client
            .post(GITHUB_TOKEN_URL)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
                "redirect_uri": self.redirect_uri,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(Error::Unauthorized(format!(
                "GitHub rejected the code: {}",
                response
                    .error_description
                    .or(response.error)
                    .unwrap_or_else(|| "no access token".to_string())
            ))),
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile> {
        let user: GitHubUser = self
            .client
            .get(format!("{GITHUB_API_URL}/user"))
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Private emails are only visible through /user/emails.
        let email = match user.email.filter(|e| !e.is_empty()) {
            Some(email) => email,
            None => self
                .primary_email(access_token)
                .await?
                .ok_or_else(|| Error::Unauthorized("GitHub account has no verified email".into()))?,
        };

        debug!(
            subsystem = "auth",
            component = "github",
            op = "fetch_profile",
            login = %user.login,
            "Fetched GitHub profile"
        );

        let name = user.name.unwrap_or_default();
        let (first_name, last_name) = split_name(&name);
        Ok(UserProfile {
            provider: GITHUB_PROVIDER.to_string(),
            email,
            first_name,
            last_name,
            name,
            nick_name: user.login,
            external_id: user.id.to_string(),
            avatar_url: user.avatar_url.unwrap_or_default(),
            refresh_token: None,
            token_expiration: None,
            profile_url: user.html_url.unwrap_or_default(),
        })
    }
}

/// Split a display name at its first whitespace.
fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(char::is_whitespace) {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip() {
        let signer = StateSigner::new("secret");
        let state = signer.issue().unwrap();
        assert!(signer.verify(&state));
    }

    #[test]
    fn test_state_rejects_tampering() {
        let signer = StateSigner::new("secret");
        let state = signer.issue().unwrap();
        let (nonce, sig) = state.split_once('.').unwrap();

        assert!(!signer.verify(&format!("{nonce}x.{sig}")));
        assert!(!signer.verify(nonce));
        assert!(!signer.verify(&format!("{nonce}.zz")));
        assert!(!StateSigner::new("other").verify(&state));
    }

    #[test]
    fn test_authorize_url() {
        let github = GitHubProvider::new("client-1", "s", "https://api.example.com/");
        let url = github.authorize_url("abc.def");

        assert!(url.starts_with("https://github.com/login/oauth/authorize?client_id=client-1"));
        assert!(url.contains(
            "redirect_uri=https%3A%2F%2Fapi.example.com%2Fv1%2Fauth%2Fgithub%2Fcallback"
        ));
        assert!(url.ends_with("&state=abc.def"));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("Ada Lovelace"),
            ("Ada".to_string(), "Lovelace".to_string())
        );
        assert_eq!(
            split_name("Grace Brewster Hopper"),
            ("Grace".to_string(), "Brewster Hopper".to_string())
        );
        assert_eq!(split_name("octocat"), ("octocat".to_string(), String::new()));
        assert_eq!(split_name(""), (String::new(), String::new()));
    }
}
