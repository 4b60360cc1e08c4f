/// Image URL used when Spotify returns a playlist without cover art.
pub const DEFAULT_PLAYLIST_IMAGE_URL: &str = "https://default.com";

/// Artist name used when a track carries an empty artists list.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Decoupled representation of a Spotify playlist from the API.
#[derive(Debug, Clone)]
pub struct SpotifyApiPlaylist {
    pub id: String,
    pub name: String,
    pub href: String,
    pub owner: String,
    pub image_url: String,
    pub tracks_href: String,
    pub total_tracks: i32,
}

/// Decoupled representation of a playlist track from the API.
/// `spotify_url` is the canonical track URL used for de-duplication.
#[derive(Debug, Clone)]
pub struct SpotifyApiTrack {
    pub spotify_url: String,
    pub title: String,
    pub artist: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SpotifyApiError {
    /// Any non-success response. Callers treat this as an expired or
    /// invalid token and restart the authorization flow; there is no
    /// retry or backoff.
    #[error("Spotify rejected the request with status {status}")]
    Unauthorized { status: u16 },
    #[error("Failed to send http request: {0}")]
    Request(#[from] reqwest::Error),
}

/// Port trait wrapping the Spotify API capabilities used by business logic.
///
/// Implementations live in `spotify::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpotifyClient: Send + Sync {
    async fn current_user_playlists(&self) -> Result<Vec<SpotifyApiPlaylist>, SpotifyApiError>;
    async fn playlist_tracks(
        &self,
        tracks_href: &str,
    ) -> Result<Vec<SpotifyApiTrack>, SpotifyApiError>;
}
