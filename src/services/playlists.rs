use std::collections::BTreeSet;
use std::sync::Arc;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::database::Database;
use crate::entities;

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("One or more songs do not exist")]
    UnknownSongs,
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

/// The jukebox listing payload: the user's playlists plus the distinct
/// songs across them.
#[derive(Debug)]
pub struct JukeboxListing {
    pub playlists: Vec<entities::playlist::Model>,
    pub songs: Vec<entities::song::Model>,
}

/// Payload backing the update-playlist form: the playlist, its member
/// songs, and the whole catalog to pick additions from.
#[derive(Debug)]
pub struct PlaylistDetail {
    pub playlist: entities::playlist::Model,
    pub songs: Vec<entities::song::Model>,
    pub all_songs: Vec<entities::song::Model>,
}

/// Manual playlist building and the browse/listing reads.
pub struct PlaylistService {
    db: Arc<Database>,
}

impl PlaylistService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a playlist from an explicit set of song ids. Every id must
    /// resolve; otherwise nothing is created. The synthesized spotify id
    /// is `{username}-{n}` with n = 1 + the user's playlist count.
    pub async fn create(
        &self,
        user: &entities::user::Model,
        name: &str,
        song_ids: &[i64],
    ) -> Result<entities::playlist::Model, PlaylistError> {
        let songs = entities::song::Entity::find()
            .filter(entities::song::Column::Id.is_in(song_ids.to_vec()))
            .all(&self.db.conn)
            .await?;
        if songs.len() != song_ids.len() {
            return Err(PlaylistError::UnknownSongs);
        }

        let existing_count = entities::playlist::Entity::find()
            .filter(entities::playlist::Column::UserId.eq(user.id))
            .count(&self.db.conn)
            .await?;
        let spotify_id = format!("{}-{}", user.username, existing_count + 1);

        let txn = self.db.conn.begin().await?;

        let model = entities::playlist::ActiveModel {
            user_id: Set(user.id),
            name: Set(name.to_string()),
            spotify_id: Set(spotify_id),
            total_tracks: Set(songs.len() as i32),
            status: Set("active".to_string()),
            ..entities::playlist::ActiveModel::new()
        };
        let playlist = entities::playlist::Entity::insert(model)
            .exec_with_returning(&txn)
            .await?;

        for song in &songs {
            let link = entities::playlist_song::ActiveModel {
                playlist_id: Set(playlist.id),
                song_id: Set(song.id),
                ..entities::playlist_song::ActiveModel::new()
            };
            entities::playlist_song::Entity::insert(link).exec(&txn).await?;
        }

        txn.commit().await?;

        tracing::info!(
            "Created playlist '{}' ({} songs) for user {}",
            playlist.name,
            songs.len(),
            user.username
        );
        Ok(playlist)
    }

    /// Idempotent membership add, guarded by existence checks on both
    /// sides.
    pub async fn add_song(&self, playlist_id: i64, song_id: i64) -> Result<(), PlaylistError> {
        self.find_playlist(playlist_id).await?;
        self.find_song(song_id).await?;

        let existing = entities::playlist_song::Entity::find()
            .filter(
                Condition::all()
                    .add(entities::playlist_song::Column::PlaylistId.eq(playlist_id))
                    .add(entities::playlist_song::Column::SongId.eq(song_id)),
            )
            .one(&self.db.conn)
            .await?;
        if existing.is_some() {
            return Ok(());
        }

        let link = entities::playlist_song::ActiveModel {
            playlist_id: Set(playlist_id),
            song_id: Set(song_id),
            ..entities::playlist_song::ActiveModel::new()
        };
        entities::playlist_song::Entity::insert(link)
            .exec(&self.db.conn)
            .await?;
        Ok(())
    }

    /// Idempotent membership removal; the song itself is untouched.
    pub async fn remove_song(&self, playlist_id: i64, song_id: i64) -> Result<(), PlaylistError> {
        self.find_playlist(playlist_id).await?;
        self.find_song(song_id).await?;

        entities::playlist_song::Entity::delete_many()
            .filter(entities::playlist_song::Column::PlaylistId.eq(playlist_id))
            .filter(entities::playlist_song::Column::SongId.eq(song_id))
            .exec(&self.db.conn)
            .await?;
        Ok(())
    }

    pub async fn rename(&self, playlist_id: i64, name: &str) -> Result<(), PlaylistError> {
        let playlist = self.find_playlist(playlist_id).await?;

        let mut model: entities::playlist::ActiveModel = playlist.into();
        model.name = Set(name.to_string());
        model.update(&self.db.conn).await?;
        Ok(())
    }

    /// Deletes the playlist and its membership rows. Member songs persist
    /// for other playlists.
    pub async fn delete(&self, playlist_id: i64) -> Result<(), PlaylistError> {
        self.find_playlist(playlist_id).await?;

        let txn = self.db.conn.begin().await?;
        entities::playlist_song::Entity::delete_many()
            .filter(entities::playlist_song::Column::PlaylistId.eq(playlist_id))
            .exec(&txn)
            .await?;
        entities::playlist::Entity::delete_by_id(playlist_id)
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn jukebox(&self, user_id: i64) -> Result<JukeboxListing, PlaylistError> {
        let playlists = entities::playlist::Entity::find()
            .filter(entities::playlist::Column::UserId.eq(user_id))
            .all(&self.db.conn)
            .await?;

        let playlist_ids: Vec<i64> = playlists.iter().map(|playlist| playlist.id).collect();
        let songs = self.songs_in_playlists(&playlist_ids).await?;

        Ok(JukeboxListing { playlists, songs })
    }

    pub async fn detail(&self, playlist_id: i64) -> Result<PlaylistDetail, PlaylistError> {
        let playlist = self.find_playlist(playlist_id).await?;
        let songs = self.songs_in_playlists(&[playlist_id]).await?;
        let all_songs = entities::song::Entity::find().all(&self.db.conn).await?;

        Ok(PlaylistDetail {
            playlist,
            songs,
            all_songs,
        })
    }

    pub async fn get_song(&self, song_id: i64) -> Result<entities::song::Model, PlaylistError> {
        self.find_song(song_id).await
    }

    async fn find_playlist(
        &self,
        playlist_id: i64,
    ) -> Result<entities::playlist::Model, PlaylistError> {
        entities::playlist::Entity::find_by_id(playlist_id)
            .one(&self.db.conn)
            .await?
            .ok_or(PlaylistError::NotFound("Playlist"))
    }

    async fn find_song(&self, song_id: i64) -> Result<entities::song::Model, PlaylistError> {
        entities::song::Entity::find_by_id(song_id)
            .one(&self.db.conn)
            .await?
            .ok_or(PlaylistError::NotFound("Song"))
    }

    async fn songs_in_playlists(
        &self,
        playlist_ids: &[i64],
    ) -> Result<Vec<entities::song::Model>, PlaylistError> {
        if playlist_ids.is_empty() {
            return Ok(Vec::new());
        }

        let song_ids: BTreeSet<i64> = entities::playlist_song::Entity::find()
            .filter(entities::playlist_song::Column::PlaylistId.is_in(playlist_ids.to_vec()))
            .all(&self.db.conn)
            .await?
            .into_iter()
            .map(|link| link.song_id)
            .collect();

        if song_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(entities::song::Entity::find()
            .filter(entities::song::Column::Id.is_in(song_ids))
            .order_by_asc(entities::song::Column::Id)
            .all(&self.db.conn)
            .await?)
    }
}
