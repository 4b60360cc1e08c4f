use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Redirect;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::entities;
use crate::http_server::error::ApiError;
use crate::http_server::session::CurrentUser;
use crate::http_server::state::AppState;
use crate::services::playlists::PlaylistService;
use crate::services::search::{SongRecord, SongSearchService};

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistRecord {
    pub id: i64,
    pub name: String,
    pub spotify_id: String,
    pub href: Option<String>,
    pub owner: Option<String>,
    pub image_url: Option<String>,
    pub total_tracks: i32,
    pub status: String,
}

impl From<entities::playlist::Model> for PlaylistRecord {
    fn from(playlist: entities::playlist::Model) -> Self {
        Self {
            id: playlist.id,
            name: playlist.name,
            spotify_id: playlist.spotify_id,
            href: playlist.href,
            owner: playlist.owner,
            image_url: playlist.image_url,
            total_tracks: playlist.total_tracks,
            status: playlist.status,
        }
    }
}

fn song_records(songs: Vec<entities::song::Model>) -> Vec<SongRecord> {
    songs.into_iter().map(SongRecord::from).collect()
}

pub async fn jukebox(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let listing = PlaylistService::new(state.db.clone())
        .jukebox(user.user.id)
        .await?;

    let playlists: Vec<PlaylistRecord> = listing
        .playlists
        .into_iter()
        .map(PlaylistRecord::from)
        .collect();

    Ok(Json(json!({
        "playlists": playlists,
        "songs": song_records(listing.songs),
    })))
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistPayload {
    song_ids: Option<Vec<i64>>,
    playlist_name: Option<String>,
}

pub async fn create_playlist(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<CreatePlaylistPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (song_ids, name) = match (payload.song_ids, payload.playlist_name) {
        (Some(song_ids), Some(name)) if !song_ids.is_empty() && !name.is_empty() => {
            (song_ids, name)
        }
        _ => {
            return Err(ApiError::Validation(
                "Missing song IDs or playlist name".to_string(),
            ));
        }
    };

    let playlist = PlaylistService::new(state.db.clone())
        .create(&user.user, &name, &song_ids)
        .await?;

    Ok(Json(json!({
        "message": "Playlist created successfully",
        "playlist_id": playlist.id,
    })))
}

pub async fn update_playlist_form(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(playlist_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let detail = PlaylistService::new(state.db.clone())
        .detail(playlist_id)
        .await?;

    Ok(Json(json!({
        "playlist": PlaylistRecord::from(detail.playlist),
        "songs": song_records(detail.songs),
        "all_songs": song_records(detail.all_songs),
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlaylistPayload {
    playlist_name: Option<String>,
}

pub async fn update_playlist(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(playlist_id): Path<i64>,
    Json(payload): Json<UpdatePlaylistPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = payload
        .playlist_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing playlist name".to_string()))?;

    PlaylistService::new(state.db.clone())
        .rename(playlist_id, &name)
        .await?;

    Ok(Json(json!({ "message": "Playlist updated successfully" })))
}

pub async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(playlist_id): Path<i64>,
) -> Result<Redirect, ApiError> {
    PlaylistService::new(state.db.clone())
        .delete(playlist_id)
        .await?;

    Ok(Redirect::to("/jukebox"))
}

pub async fn delete_song_from_playlist(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path((playlist_id, song_id)): Path<(i64, i64)>,
) -> Result<Redirect, ApiError> {
    PlaylistService::new(state.db.clone())
        .remove_song(playlist_id, song_id)
        .await?;

    Ok(Redirect::to(&format!("/update_playlist/{playlist_id}")))
}

#[derive(Debug, Deserialize)]
pub struct AddSongPayload {
    song_id: Option<i64>,
}

pub async fn add_song_to_playlist(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(playlist_id): Path<i64>,
    Json(payload): Json<AddSongPayload>,
) -> Result<Redirect, ApiError> {
    let song_id = payload
        .song_id
        .ok_or_else(|| ApiError::Validation("Missing song id".to_string()))?;

    PlaylistService::new(state.db.clone())
        .add_song(playlist_id, song_id)
        .await?;

    Ok(Redirect::to(&format!("/update_playlist/{playlist_id}")))
}

#[derive(Debug, Deserialize)]
pub struct SearchPayload {
    query: Option<String>,
}

pub async fn search_songs(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchPayload>,
) -> Result<Json<Vec<SongRecord>>, ApiError> {
    let query = payload
        .query
        .ok_or_else(|| ApiError::Validation("Missing query".to_string()))?;

    let results = SongSearchService::new(state.db.clone())
        .search(&query)
        .await?;

    Ok(Json(results))
}
