use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};

use crate::http_server::error::ApiError;
use crate::http_server::session::CurrentUser;
use crate::http_server::state::AppState;
use crate::services::playlists::PlaylistService;
use crate::services::search::SongRecord;

pub async fn song_detail(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(song_id): Path<i64>,
) -> Result<Json<SongRecord>, ApiError> {
    let song = PlaylistService::new(state.db.clone())
        .get_song(song_id)
        .await?;

    Ok(Json(SongRecord::from(song)))
}
