use serde::{Deserialize, Serialize};

/// Spotify OAuth token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// One page of the current user's playlists
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistsPage {
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
    pub name: String,
    pub href: String,
    pub owner: PlaylistOwner,
    pub images: Option<Vec<Image>>,
    pub tracks: TracksRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistOwner {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

/// Reference to a playlist's tracks collection: the href is fetched
/// verbatim for the track listing, the total is the declared track count.
#[derive(Debug, Clone, Deserialize)]
pub struct TracksRef {
    pub href: String,
    pub total: i32,
}

/// One page of a playlist's tracks
#[derive(Debug, Clone, Deserialize)]
pub struct TracksPage {
    pub items: Vec<TrackEntry>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackEntry {
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub name: String,
    pub external_urls: ExternalUrls,
    pub artists: Vec<ArtistObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistObject {
    pub name: String,
}

/// A pending OAuth attempt, stored server-side keyed by its state nonce
/// until the provider redirects back. Each authorization attempt gets its
/// own entry, so concurrent attempts cannot clobber each other.
#[derive(Debug, Clone)]
pub struct PendingAuth {
    pub session_token: String,
    pub created_at: i64,
}
