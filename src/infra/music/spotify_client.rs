use crate::core::music::{CatalogLookup, MusicError};
use anyhow::{bail, Context};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Spotify Web API client using the client-credentials flow.
/// Only used to turn track and playlist links into search phrases.
pub struct SpotifyClient {
    client: Client,
    basic_auth: String,
    cached_token: RwLock<Option<CachedToken>>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    /// `null` for removed or local tracks.
    track: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

impl ApiTrack {
    /// "<name> <first artist>", the phrase handed to the extractor.
    fn search_phrase(&self) -> String {
        match self.artists.first() {
            Some(artist) => format!("{} {}", self.name, artist.name),
            None => self.name.clone(),
        }
    }
}

impl SpotifyClient {
    pub fn new(client: Client, client_id: &str, client_secret: &str) -> Self {
        let credentials = STANDARD.encode(format!("{client_id}:{client_secret}"));
        Self {
            client,
            basic_auth: format!("Basic {credentials}"),
            cached_token: RwLock::new(None),
        }
    }

    /// Gets a valid access token, refreshing it shortly before expiry.
    async fn access_token(&self) -> anyhow::Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() + Duration::from_secs(60) {
                    return Ok(token.token.clone());
                }
            }
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .header(AUTHORIZATION, HeaderValue::from_str(&self.basic_auth)?)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("token request failed")?;

        if !response.status().is_success() {
            bail!("token request rejected: {}", response.status());
        }

        let token: TokenResponse = response.json().await.context("invalid token response")?;
        let mut cached = self.cached_token.write().await;
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> anyhow::Result<T> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("{url} returned {}", response.status());
        }
        response.json().await.context("invalid catalog response")
    }

    async fn fetch_track_phrase(&self, url: &str) -> anyhow::Result<String> {
        let id = extract_id(url, "track").context("link has no track id")?;
        let track: ApiTrack = self.get_json(&format!("{API_BASE}/tracks/{id}")).await?;
        Ok(track.search_phrase())
    }

    async fn fetch_playlist_phrases(&self, url: &str) -> anyhow::Result<Vec<String>> {
        let id = extract_id(url, "playlist").context("link has no playlist id")?;
        let mut next = Some(format!("{API_BASE}/playlists/{id}/tracks?limit=100"));
        let mut phrases = Vec::new();

        while let Some(page_url) = next {
            let page: PlaylistPage = self.get_json(&page_url).await?;
            phrases.extend(
                page.items
                    .iter()
                    .filter_map(|item| item.track.as_ref())
                    .map(ApiTrack::search_phrase),
            );
            next = page.next;
        }

        Ok(phrases)
    }
}

/// The id segment after `/<kind>/`, without query string or trailing path.
fn extract_id<'a>(url: &'a str, kind: &str) -> Option<&'a str> {
    let marker = format!("/{kind}/");
    let start = url.find(&marker)? + marker.len();
    let id = url[start..]
        .split(|c| c == '?' || c == '/' || c == '#')
        .next()?;
    (!id.is_empty()).then_some(id)
}

#[async_trait]
impl CatalogLookup for SpotifyClient {
    async fn track_phrase(&self, url: &str) -> Result<String, MusicError> {
        self.fetch_track_phrase(url)
            .await
            .map_err(|e| MusicError::Catalog(format!("{e:#}")))
    }

    async fn playlist_phrases(&self, url: &str) -> Result<Vec<String>, MusicError> {
        self.fetch_playlist_phrases(url)
            .await
            .map_err(|e| MusicError::Catalog(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ids_from_links() {
        assert_eq!(
            extract_id("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc", "track"),
            Some("4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(
            extract_id("https://open.spotify.com/intl-de/playlist/37i9dQZF1DX/", "playlist"),
            Some("37i9dQZF1DX")
        );
        assert_eq!(extract_id("https://open.spotify.com/track/", "track"), None);
        assert_eq!(extract_id("https://open.spotify.com/album/xyz", "track"), None);
    }

    #[test]
    fn phrase_uses_first_artist() {
        let track: ApiTrack = serde_json::from_str(
            r#"{ "name": "Song", "artists": [ { "name": "Band" }, { "name": "Guest" } ] }"#,
        )
        .unwrap();
        assert_eq!(track.search_phrase(), "Song Band");

        let solo: ApiTrack = serde_json::from_str(r#"{ "name": "Intro" }"#).unwrap();
        assert_eq!(solo.search_phrase(), "Intro");
    }

    #[test]
    fn playlist_page_skips_missing_tracks() {
        let page: PlaylistPage = serde_json::from_str(
            r#"{
                "items": [
                    { "track": { "name": "A", "artists": [ { "name": "X" } ] } },
                    { "track": null }
                ],
                "next": null
            }"#,
        )
        .unwrap();

        let phrases: Vec<String> = page
            .items
            .iter()
            .filter_map(|i| i.track.as_ref())
            .map(ApiTrack::search_phrase)
            .collect();
        assert_eq!(phrases, vec!["A X"]);
        assert!(page.next.is_none());
    }
}
