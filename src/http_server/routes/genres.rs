use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::entities;
use crate::http_server::error::ApiError;
use crate::http_server::state::AppState;
use crate::services::genres::GenreService;

#[derive(Debug, Serialize)]
pub struct GenreRecord {
    pub id: i64,
    pub name: String,
}

impl From<entities::genre::Model> for GenreRecord {
    fn from(genre: entities::genre::Model) -> Self {
        Self {
            id: genre.id,
            name: genre.name,
        }
    }
}

/// Only published genres are surfaced.
pub async fn list_genres(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GenreRecord>>, ApiError> {
    let genres = GenreService::new(state.db.clone()).list_published().await?;

    Ok(Json(genres.into_iter().map(GenreRecord::from).collect()))
}
