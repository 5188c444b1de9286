//! Bearer token helpers.

use rand::Rng;

use crate::defaults::BEARER_PREFIX_LEN;

/// Prefix of session tokens issued at OAuth login.
pub const SESSION_TOKEN_PREFIX: &str = "mb_st_";

/// Prefix of user-created API tokens.
pub const API_TOKEN_PREFIX: &str = "mb_key_";

/// Extract the token from an `Authorization` header value.
///
/// Headers of seven characters or fewer carry no token; otherwise the
/// token is everything after the `"Bearer "` scheme prefix.
///
/// ```
/// use moonbrain_core::extract_bearer_token;
///
/// assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
/// assert_eq!(extract_bearer_token("Bearer "), None);
/// ```
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    if header.len() <= BEARER_PREFIX_LEN {
        return None;
    }
    header.get(BEARER_PREFIX_LEN..)
}

const TOKEN_SECRET_LEN: usize = 32;

fn random_secret(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Generate an opaque session token.
pub fn generate_session_token() -> String {
    format!("{}{}", SESSION_TOKEN_PREFIX, random_secret(TOKEN_SECRET_LEN))
}

/// Generate an opaque API token.
pub fn generate_api_token() -> String {
    format!("{}{}", API_TOKEN_PREFIX, random_secret(TOKEN_SECRET_LEN))
}
