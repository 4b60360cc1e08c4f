use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use sea_orm::EntityTrait;
use serde::Serialize;

use crate::database::Database;
use crate::entities;

/// Flat wire shape of a song, as returned by search and listing routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongRecord {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub spotify_url: String,
    pub image_url: Option<String>,
}

impl From<entities::song::Model> for SongRecord {
    fn from(song: entities::song::Model) -> Self {
        Self {
            id: song.id,
            title: song.title,
            artist: song.artist,
            spotify_url: song.spotify_url,
            image_url: song.image_url,
        }
    }
}

/// Ranked text search over the song catalog: case-insensitive substring
/// containment on title or artist, with artist matches ahead of
/// title-only matches.
pub struct SongSearchService {
    db: Arc<Database>,
}

impl SongSearchService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SongRecord>> {
        let needle = query.to_lowercase();

        let songs = entities::song::Entity::find()
            .all(&self.db.conn)
            .await
            .wrap_err("Failed to fetch songs")?;

        let mut results: Vec<SongRecord> = songs
            .into_iter()
            .filter(|song| {
                song.title.to_lowercase().contains(&needle)
                    || song.artist.to_lowercase().contains(&needle)
            })
            .map(SongRecord::from)
            .collect();

        // Stable sort: ties keep their catalog order
        results.sort_by_key(|song| {
            if song.artist.to_lowercase().contains(&needle) {
                0
            } else {
                1
            }
        });

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_db;
    use sea_orm::{ActiveModelBehavior, ActiveModelTrait, Set};

    async fn insert_song(db: &Database, title: &str, artist: &str) -> entities::song::Model {
        let song = entities::song::ActiveModel {
            title: Set(title.into()),
            artist: Set(artist.into()),
            spotify_url: Set(format!("https://open.spotify.com/track/{title}-{artist}")),
            image_url: Set(None),
            ..entities::song::ActiveModel::new()
        };
        song.insert(&db.conn).await.unwrap()
    }

    #[tokio::test]
    async fn test_search_matches_title_or_artist_case_insensitively() {
        let db = test_db().await;
        insert_song(&db, "Bohemian Rhapsody", "Queen").await;
        insert_song(&db, "Dancing Queen", "ABBA").await;
        insert_song(&db, "Yesterday", "The Beatles").await;

        let service = SongSearchService::new(db);
        let results = service.search("qUeEn").await.unwrap();

        assert_eq!(results.len(), 2);
        for song in &results {
            assert!(
                song.title.to_lowercase().contains("queen")
                    || song.artist.to_lowercase().contains("queen")
            );
        }
    }

    #[tokio::test]
    async fn test_search_ranks_artist_matches_first() {
        let db = test_db().await;
        // Title-only match inserted first to make the ordering observable
        insert_song(&db, "Dancing Queen", "ABBA").await;
        insert_song(&db, "Bohemian Rhapsody", "Queen").await;
        insert_song(&db, "Killer Queen", "Queen").await;

        let service = SongSearchService::new(db);
        let results = service.search("queen").await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].artist, "Queen");
        assert_eq!(results[1].artist, "Queen");
        assert_eq!(results[2].title, "Dancing Queen");
    }

    #[tokio::test]
    async fn test_search_ties_keep_catalog_order() {
        let db = test_db().await;
        let first = insert_song(&db, "Killer Queen", "Queen").await;
        let second = insert_song(&db, "Don't Stop Me Now", "Queen").await;

        let service = SongSearchService::new(db);
        let results = service.search("queen").await.unwrap();

        assert_eq!(results[0].id, first.id);
        assert_eq!(results[1].id, second.id);
    }

    #[tokio::test]
    async fn test_search_no_match() {
        let db = test_db().await;
        insert_song(&db, "Yesterday", "The Beatles").await;

        let service = SongSearchService::new(db);
        let results = service.search("zeppelin").await.unwrap();

        assert!(results.is_empty());
    }
}
