use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;

mod auth;
mod error;
mod retry;

pub use auth::{authorization_url, extract_code, PkceChallenge, TokenResponse, SCOPES};
pub use error::ApiError;
pub use retry::RetryConfig;

/// Spotify track additions are capped at 100 items per request.
const PLAYLIST_PAGE: usize = 100;

/// Authenticated Spotify profile
#[derive(Debug, Deserialize, Clone)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlbumTrack {
    pub id: String,
    pub name: String,
    pub duration_ms: u64,
    pub track_number: u32,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlbumResponse {
    id: String,
    name: String,
    release_date: String,
    artists: Vec<ArtistRef>,
    tracks: Page<AlbumTrack>,
}

/// An album with its track listing fully paged in.
#[derive(Debug, Clone)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub release_date: String,
    pub artists: Vec<ArtistRef>,
    pub tracks: Vec<AlbumTrack>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Playlist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct CreatePlaylistRequest<'a> {
    name: &'a str,
    public: bool,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct PlaylistTracksRequest {
    uris: Vec<String>,
}

/// Client for the Spotify Web API and the accounts token endpoint.
pub struct SpotifyClient {
    client: Client,
    web_base_url: String,
    accounts_base_url: String,
    config: Arc<Mutex<Config>>,
    retry_config: RetryConfig,
}

impl SpotifyClient {
    pub fn new(config: Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.api.timeout_seconds);
        let web_base_url = config.api.web_base_url.clone();
        let accounts_base_url = config.api.accounts_base_url.clone();

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            web_base_url,
            accounts_base_url,
            config: Arc::new(Mutex::new(config)),
            retry_config: RetryConfig::default(),
        })
    }

    /// Exchange a PKCE authorization code for tokens and save them.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<()> {
        let (client_id, redirect_uri) = {
            let config = self.config.lock().unwrap();
            (
                config.auth.client_id.clone(),
                config.auth.redirect_uri.clone(),
            )
        };
        if client_id.is_empty() {
            return Err(anyhow!("No Spotify client ID configured"));
        }

        let url = format!("{}/api/token", self.accounts_base_url);
        let params = [
            ("client_id", client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("code_verifier", code_verifier),
        ];

        tracing::debug!("Exchanging authorization code");
        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .context("Failed to send token request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, error_text).into());
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;
        let refresh = tokens.refresh_token.clone().unwrap_or_default();
        {
            let mut config = self.config.lock().unwrap();
            config.set_tokens(tokens.access_token, refresh);
            config.save()?;
        }
        tracing::info!("Spotify account connected");
        Ok(())
    }

    /// Refresh the access token, save it, and return the new token.
    async fn try_refresh_token(&self) -> Result<String> {
        let (client_id, refresh_token) = {
            let config = self.config.lock().unwrap();
            if config.auth.refresh_token.is_empty() {
                return Err(anyhow!("No refresh token available"));
            }
            (
                config.auth.client_id.clone(),
                config.auth.refresh_token.clone(),
            )
        };

        let url = format!("{}/api/token", self.accounts_base_url);
        let params = [
            ("client_id", client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];

        tracing::debug!("Refreshing access token");
        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .context("Failed to send refresh request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, error_text).into());
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .context("Failed to parse refresh response")?;
        let access_token = tokens.access_token.clone();
        {
            let mut config = self.config.lock().unwrap();
            let refresh = tokens.refresh_token.unwrap_or(refresh_token);
            config.set_tokens(tokens.access_token, refresh);
            config.save()?;
        }
        tracing::info!("Access token refreshed");
        Ok(access_token)
    }

    fn current_token(&self) -> Result<String> {
        let config = self.config.lock().unwrap();
        if !config.is_authenticated() {
            return Err(anyhow!("Not logged in. Run 'tunecapsule login' first."));
        }
        Ok(config.auth.access_token.clone())
    }

    /// Authenticated GET with one token-refresh retry on 401, parsed as T.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.current_token()?;

        let response = self
            .retry_config
            .execute(|| async {
                self.client
                    .get(url)
                    .bearer_auth(&token)
                    .send()
                    .await
                    .context("Failed to send GET request")
            })
            .await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("Received 401, attempting token refresh");
            let new_token = self.try_refresh_token().await?;
            self.client
                .get(url)
                .bearer_auth(&new_token)
                .send()
                .await
                .context("Failed to retry GET request after token refresh")?
        } else {
            response
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, error_text).into());
        }
        response.json().await.context("Failed to parse response")
    }

    /// Authenticated write (PUT/POST) with one token-refresh retry on 401.
    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let token = self.current_token()?;

        let response = self
            .client
            .request(method.clone(), url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("Received 401, attempting token refresh");
            let new_token = self.try_refresh_token().await?;
            self.client
                .request(method, url)
                .bearer_auth(&new_token)
                .json(body)
                .send()
                .await
                .context("Failed to retry request after token refresh")?
        } else {
            response
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, error_text).into());
        }
        response.json().await.context("Failed to parse response")
    }

    /// Fetch an album with its full track listing (following page links).
    pub async fn album(&self, album_id: &str) -> Result<Album> {
        let url = format!("{}/albums/{}", self.web_base_url, album_id);
        let album: AlbumResponse = self.get_json(&url).await?;

        let mut tracks = album.tracks.items;
        let mut next = album.tracks.next;
        while let Some(page_url) = next {
            let page: Page<AlbumTrack> = self.get_json(&page_url).await?;
            tracks.extend(page.items);
            next = page.next;
        }

        Ok(Album {
            id: album.id,
            name: album.name,
            release_date: album.release_date,
            artists: album.artists,
            tracks,
        })
    }

    pub async fn current_user(&self) -> Result<UserProfile> {
        let url = format!("{}/me", self.web_base_url);
        self.get_json(&url).await
    }

    pub async fn playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let url = format!("{}/playlists/{}", self.web_base_url, playlist_id);
        self.get_json(&url).await
    }

    /// Create a private playlist for the current user.
    pub async fn create_playlist(&self, user_id: &str, name: &str) -> Result<Playlist> {
        let url = format!("{}/users/{}/playlists", self.web_base_url, user_id);
        let request = CreatePlaylistRequest {
            name,
            public: false,
            description: "Generated by TuneCapsule",
        };
        self.send_json(reqwest::Method::POST, &url, &request).await
    }

    /// Overwrite a playlist's contents with the given tracks, in order.
    pub async fn set_playlist_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<()> {
        let url = format!("{}/playlists/{}/tracks", self.web_base_url, playlist_id);
        let uris: Vec<String> = track_ids
            .iter()
            .map(|id| format!("spotify:track:{id}"))
            .collect();

        // First page replaces, later pages append, 100 at a time.
        let mut chunks = uris.chunks(PLAYLIST_PAGE);
        let first = chunks.next().unwrap_or_default();
        let request = PlaylistTracksRequest {
            uris: first.to_vec(),
        };
        let _: serde_json::Value = self
            .send_json(reqwest::Method::PUT, &url, &request)
            .await?;

        for chunk in chunks {
            let request = PlaylistTracksRequest {
                uris: chunk.to_vec(),
            };
            let _: serde_json::Value = self
                .send_json(reqwest::Method::POST, &url, &request)
                .await?;
        }
        tracing::info!("Uploaded {} tracks to playlist {}", uris.len(), playlist_id);
        Ok(())
    }
}

/// Pull an album ID out of a share URL, a spotify: URI, or a bare ID.
pub fn album_id_from_ref(reference: &str) -> Result<String> {
    let reference = reference.trim();
    if let Some(rest) = reference.strip_prefix("spotify:album:") {
        return Ok(rest.to_string());
    }
    if reference.starts_with("http://") || reference.starts_with("https://") {
        let url = url::Url::parse(reference).context("Malformed album URL")?;
        let mut segments = url
            .path_segments()
            .ok_or_else(|| anyhow!("Malformed album URL: {reference}"))?;
        if segments.next() == Some("album") {
            if let Some(id) = segments.next() {
                if !id.is_empty() {
                    return Ok(id.to_string());
                }
            }
        }
        return Err(anyhow!("Not an album link: {reference}"));
    }
    if reference.is_empty() || !reference.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(anyhow!("Not an album reference: {reference}"));
    }
    Ok(reference.to_string())
}
