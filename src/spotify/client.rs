use std::time::Duration;

use crate::ports::spotify::{
    DEFAULT_PLAYLIST_IMAGE_URL, SpotifyApiError, SpotifyApiPlaylist, SpotifyApiTrack,
    SpotifyClient, UNKNOWN_ARTIST,
};
use crate::spotify::types::{PlaylistsPage, TracksPage};

const PLAYLISTS_URL: &str = "https://api.spotify.com/v1/me/playlists?limit=50";

/// Spotify Web API client for a single bearer token.
pub struct SpotifyWebClient {
    access_token: String,
    client: reqwest::Client,
}

impl SpotifyWebClient {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, SpotifyApiError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SpotifyApiError::Unauthorized {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl SpotifyClient for SpotifyWebClient {
    async fn current_user_playlists(&self) -> Result<Vec<SpotifyApiPlaylist>, SpotifyApiError> {
        let mut all_playlists = Vec::new();
        let mut next_url = Some(PLAYLISTS_URL.to_string());

        while let Some(url) = next_url {
            let page: PlaylistsPage = self.get_json(&url).await?;

            for item in page.items {
                let image_url = item
                    .images
                    .unwrap_or_default()
                    .into_iter()
                    .next()
                    .map(|image| image.url)
                    .unwrap_or_else(|| DEFAULT_PLAYLIST_IMAGE_URL.to_string());

                all_playlists.push(SpotifyApiPlaylist {
                    id: item.id,
                    name: item.name,
                    href: item.href,
                    owner: item.owner.display_name.unwrap_or_default(),
                    image_url,
                    tracks_href: item.tracks.href,
                    total_tracks: item.tracks.total,
                });
            }
            next_url = page.next;
        }

        Ok(all_playlists)
    }

    async fn playlist_tracks(
        &self,
        tracks_href: &str,
    ) -> Result<Vec<SpotifyApiTrack>, SpotifyApiError> {
        let mut all_tracks = Vec::new();
        let mut next_url = Some(tracks_href.to_string());

        while let Some(url) = next_url {
            let page: TracksPage = self.get_json(&url).await?;

            for entry in page.items {
                // Episode slots and removed tracks come back as null
                let Some(track) = entry.track else {
                    continue;
                };
                // Local files have no canonical URL to key the song on
                let Some(spotify_url) = track.external_urls.spotify else {
                    tracing::debug!("Skipping track without canonical url: {}", track.name);
                    continue;
                };

                let artist = track
                    .artists
                    .first()
                    .map(|artist| artist.name.clone())
                    .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

                all_tracks.push(SpotifyApiTrack {
                    spotify_url,
                    title: track.name,
                    artist,
                });
            }
            next_url = page.next;
        }

        Ok(all_tracks)
    }
}
