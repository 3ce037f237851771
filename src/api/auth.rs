use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

/// Spotify scopes needed to read and rewrite the user's playlists.
pub const SCOPES: &str = "playlist-read-private playlist-modify-public playlist-modify-private";

/// PKCE (Proof Key for Code Exchange) challenge pair.
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh 128-character verifier and its S256 challenge.
    pub fn new() -> Self {
        use rand::Rng;

        let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
        let mut rng = rand::thread_rng();
        let code_verifier: String = (0..128)
            .map(|_| chars[rng.gen_range(0..chars.len())] as char)
            .collect();

        let mut hasher = Sha256::new();
        hasher.update(code_verifier.as_bytes());
        let code_challenge = general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize());

        Self {
            code_verifier,
            code_challenge,
        }
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

/// Authorization URL the user opens in a browser to approve access.
pub fn authorization_url(
    accounts_base_url: &str,
    client_id: &str,
    redirect_uri: &str,
    challenge: &PkceChallenge,
) -> Result<String> {
    let mut url = Url::parse(accounts_base_url)?.join("authorize")?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", SCOPES)
        .append_pair("code_challenge_method", "S256")
        .append_pair("code_challenge", &challenge.code_challenge);
    Ok(url.to_string())
}

/// Pull the authorization code out of whatever the user pasted back:
/// the full redirect URL, or the bare code itself.
pub fn extract_code(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("No authorization code provided"));
    }
    if let Ok(url) = Url::parse(input) {
        if let Some((_, code)) = url.query_pairs().find(|(k, _)| k == "code") {
            return Ok(code.into_owned());
        }
        if let Some((_, error)) = url.query_pairs().find(|(k, _)| k == "error") {
            return Err(anyhow!("Authorization was denied: {error}"));
        }
        return Err(anyhow!("Redirect URL carries no authorization code"));
    }
    Ok(input.to_string())
}

/// Token endpoint response for both the exchange and refresh grants.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Refresh grants may omit a new refresh token; the old one stays valid.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
