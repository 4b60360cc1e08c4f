use std::collections::BTreeSet;
use std::sync::Arc;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::database::Database;
use crate::entities;
use crate::ports::spotify::{SpotifyApiError, SpotifyApiPlaylist, SpotifyApiTrack, SpotifyClient};
use crate::ports::thumbnail::ThumbnailResolver;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Spotify rejected a request; the caller restarts the authorization
    /// flow.
    #[error("Spotify authorization expired")]
    AuthExpired,
    #[error("Spotify request failed: {0}")]
    External(reqwest::Error),
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

impl From<SpotifyApiError> for SyncError {
    fn from(err: SpotifyApiError) -> Self {
        match err {
            SpotifyApiError::Unauthorized { .. } => SyncError::AuthExpired,
            SpotifyApiError::Request(err) => SyncError::External(err),
        }
    }
}

/// Reconciles one user's remote playlist state into local storage as a
/// full refresh: the user's playlists and their songs are deleted and
/// recreated from what Spotify currently returns. The whole pass runs in
/// a single transaction, so a remote failure part-way through rolls every
/// write back instead of leaving a half-imported library.
pub struct SyncEngine<C: SpotifyClient, R: ThumbnailResolver> {
    db: Arc<Database>,
    client: C,
    resolver: R,
}

impl<C: SpotifyClient, R: ThumbnailResolver> SyncEngine<C, R> {
    pub fn new(db: Arc<Database>, client: C, resolver: R) -> Self {
        Self {
            db,
            client,
            resolver,
        }
    }

    pub async fn sync_user(&self, user_id: i64) -> Result<(), SyncError> {
        let txn = self.db.conn.begin().await?;

        self.clear_user_library(&txn, user_id).await?;

        let playlists = self.client.current_user_playlists().await?;
        tracing::info!("Importing {} playlists for user {}", playlists.len(), user_id);

        for playlist in playlists {
            let saved = self.get_or_create_playlist(&txn, user_id, &playlist).await?;

            let tracks = self.client.playlist_tracks(&playlist.tracks_href).await?;
            for track in tracks {
                let song_id = self.get_or_create_song(&txn, &track).await?;
                self.link_song(&txn, saved.id, song_id).await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    /// Deletes the user's playlists and every song linked to them. Shared
    /// songs referenced from other playlists are deleted too, membership
    /// rows included.
    async fn clear_user_library(
        &self,
        txn: &impl sea_orm::ConnectionTrait,
        user_id: i64,
    ) -> Result<(), SyncError> {
        let playlist_ids: Vec<i64> = entities::playlist::Entity::find()
            .filter(entities::playlist::Column::UserId.eq(user_id))
            .all(txn)
            .await?
            .into_iter()
            .map(|playlist| playlist.id)
            .collect();

        if playlist_ids.is_empty() {
            return Ok(());
        }

        let song_ids: BTreeSet<i64> = entities::playlist_song::Entity::find()
            .filter(entities::playlist_song::Column::PlaylistId.is_in(playlist_ids.clone()))
            .all(txn)
            .await?
            .into_iter()
            .map(|link| link.song_id)
            .collect();

        entities::playlist_song::Entity::delete_many()
            .filter(entities::playlist_song::Column::PlaylistId.is_in(playlist_ids))
            .exec(txn)
            .await?;

        entities::playlist::Entity::delete_many()
            .filter(entities::playlist::Column::UserId.eq(user_id))
            .exec(txn)
            .await?;

        if !song_ids.is_empty() {
            entities::playlist_song::Entity::delete_many()
                .filter(entities::playlist_song::Column::SongId.is_in(song_ids.clone()))
                .exec(txn)
                .await?;

            entities::song::Entity::delete_many()
                .filter(entities::song::Column::Id.is_in(song_ids))
                .exec(txn)
                .await?;
        }

        Ok(())
    }

    /// Get-or-create keyed by (owner, spotify id); another user's playlist
    /// with the same spotify id is a different row.
    async fn get_or_create_playlist(
        &self,
        txn: &impl sea_orm::ConnectionTrait,
        user_id: i64,
        playlist: &SpotifyApiPlaylist,
    ) -> Result<entities::playlist::Model, SyncError> {
        if let Some(existing) = entities::playlist::Entity::find()
            .filter(entities::playlist::Column::UserId.eq(user_id))
            .filter(entities::playlist::Column::SpotifyId.eq(&playlist.id))
            .one(txn)
            .await?
        {
            return Ok(existing);
        }

        let model = entities::playlist::ActiveModel {
            user_id: Set(user_id),
            name: Set(playlist.name.clone()),
            spotify_id: Set(playlist.id.clone()),
            href: Set(Some(playlist.href.clone())),
            owner: Set(Some(playlist.owner.clone())),
            image_url: Set(Some(playlist.image_url.clone())),
            total_tracks: Set(playlist.total_tracks),
            status: Set("active".to_string()),
            ..entities::playlist::ActiveModel::new()
        };

        Ok(entities::playlist::Entity::insert(model)
            .exec_with_returning(txn)
            .await?)
    }

    /// Get-or-create keyed by the canonical spotify url. The thumbnail is
    /// recomputed for pre-existing songs as well; the resolver memoizes
    /// per URL, so each distinct page is fetched at most once per pass.
    async fn get_or_create_song(
        &self,
        txn: &impl sea_orm::ConnectionTrait,
        track: &SpotifyApiTrack,
    ) -> Result<i64, SyncError> {
        let song = match entities::song::Entity::find()
            .filter(entities::song::Column::SpotifyUrl.eq(&track.spotify_url))
            .one(txn)
            .await?
        {
            Some(existing) => existing,
            None => {
                let model = entities::song::ActiveModel {
                    title: Set(track.title.clone()),
                    artist: Set(track.artist.clone()),
                    spotify_url: Set(track.spotify_url.clone()),
                    ..entities::song::ActiveModel::new()
                };
                entities::song::Entity::insert(model)
                    .exec_with_returning(txn)
                    .await?
            }
        };

        let image_url = self.resolver.resolve(&song.spotify_url).await;

        let song_id = song.id;
        let mut model: entities::song::ActiveModel = song.into();
        model.image_url = Set(image_url);
        model.update(txn).await?;

        Ok(song_id)
    }

    async fn link_song(
        &self,
        txn: &impl sea_orm::ConnectionTrait,
        playlist_id: i64,
        song_id: i64,
    ) -> Result<(), SyncError> {
        if entities::playlist_song::Entity::find()
            .filter(entities::playlist_song::Column::PlaylistId.eq(playlist_id))
            .filter(entities::playlist_song::Column::SongId.eq(song_id))
            .one(txn)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let model = entities::playlist_song::ActiveModel {
            playlist_id: Set(playlist_id),
            song_id: Set(song_id),
            ..entities::playlist_song::ActiveModel::new()
        };
        entities::playlist_song::Entity::insert(model).exec(txn).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::spotify::MockSpotifyClient;
    use crate::ports::thumbnail::MockThumbnailResolver;
    use crate::test_utils::test_db;

    async fn insert_user(db: &Database, username: &str) -> entities::user::Model {
        let user = entities::user::ActiveModel {
            username: Set(username.into()),
            password_hash: Set("hash".into()),
            password_salt: Set("salt".into()),
            ..entities::user::ActiveModel::new()
        };
        user.insert(&db.conn).await.unwrap()
    }

    fn api_playlist(id: &str, name: &str, total_tracks: i32) -> SpotifyApiPlaylist {
        SpotifyApiPlaylist {
            id: id.into(),
            name: name.into(),
            href: format!("https://api.spotify.com/v1/playlists/{id}"),
            owner: "Remote Owner".into(),
            image_url: "https://i.scdn.co/image/pl.jpg".into(),
            tracks_href: format!("https://api.spotify.com/v1/playlists/{id}/tracks"),
            total_tracks,
        }
    }

    fn api_track(url: &str, title: &str, artist: &str) -> SpotifyApiTrack {
        SpotifyApiTrack {
            spotify_url: url.into(),
            title: title.into(),
            artist: artist.into(),
        }
    }

    fn make_client(
        playlists: Vec<SpotifyApiPlaylist>,
        tracks_by_href: Vec<(String, Vec<SpotifyApiTrack>)>,
    ) -> MockSpotifyClient {
        let mut client = MockSpotifyClient::new();
        client
            .expect_current_user_playlists()
            .returning(move || Ok(playlists.clone()));
        client.expect_playlist_tracks().returning(move |href| {
            Ok(tracks_by_href
                .iter()
                .find(|(h, _)| h.as_str() == href)
                .map(|(_, tracks)| tracks.clone())
                .unwrap_or_default())
        });
        client
    }

    fn make_resolver() -> MockThumbnailResolver {
        let mut resolver = MockThumbnailResolver::new();
        resolver
            .expect_resolve()
            .returning(|url| Some(format!("{url}/cover.jpg")));
        resolver
    }

    async fn count_playlists(db: &Database) -> usize {
        entities::playlist::Entity::find()
            .all(&db.conn)
            .await
            .unwrap()
            .len()
    }

    async fn count_songs(db: &Database) -> usize {
        entities::song::Entity::find().all(&db.conn).await.unwrap().len()
    }

    #[tokio::test]
    async fn test_sync_imports_playlists_and_songs() {
        let db = test_db().await;
        let user = insert_user(&db, "alice").await;

        let p1 = api_playlist("pl1", "Morning", 3);
        let p2 = api_playlist("pl2", "Evening", 1);
        let client = make_client(
            vec![p1.clone(), p2.clone()],
            vec![
                (
                    p1.tracks_href.clone(),
                    vec![
                        api_track("https://open.spotify.com/track/a", "Song A", "Artist A"),
                        api_track("https://open.spotify.com/track/b", "Song B", "Artist B"),
                        api_track("https://open.spotify.com/track/c", "Song C", "Artist C"),
                    ],
                ),
                (
                    p2.tracks_href.clone(),
                    vec![api_track(
                        "https://open.spotify.com/track/d",
                        "Song D",
                        "Artist D",
                    )],
                ),
            ],
        );

        let engine = SyncEngine::new(db.clone(), client, make_resolver());
        engine.sync_user(user.id).await.unwrap();

        let playlists = entities::playlist::Entity::find()
            .filter(entities::playlist::Column::UserId.eq(user.id))
            .all(&db.conn)
            .await
            .unwrap();
        assert_eq!(playlists.len(), 2);

        let morning = playlists.iter().find(|p| p.spotify_id == "pl1").unwrap();
        assert_eq!(morning.name, "Morning");
        assert_eq!(morning.owner.as_deref(), Some("Remote Owner"));
        assert_eq!(morning.total_tracks, 3);
        assert_eq!(morning.status, "active");

        assert_eq!(count_songs(&db).await, 4);

        let songs = entities::song::Entity::find().all(&db.conn).await.unwrap();
        for song in songs {
            assert_eq!(
                song.image_url,
                Some(format!("{}/cover.jpg", song.spotify_url))
            );
        }
    }

    #[tokio::test]
    async fn test_sync_deduplicates_songs_by_canonical_url() {
        let db = test_db().await;
        let user = insert_user(&db, "alice").await;

        let p1 = api_playlist("pl1", "One", 2);
        let p2 = api_playlist("pl2", "Two", 1);
        let shared = api_track("https://open.spotify.com/track/x", "Shared", "Artist X");
        let client = make_client(
            vec![p1.clone(), p2.clone()],
            vec![
                (p1.tracks_href.clone(), vec![shared.clone(), shared.clone()]),
                (p2.tracks_href.clone(), vec![shared.clone()]),
            ],
        );

        let engine = SyncEngine::new(db.clone(), client, make_resolver());
        engine.sync_user(user.id).await.unwrap();

        assert_eq!(count_songs(&db).await, 1);

        let links = entities::playlist_song::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        // One membership row per playlist, despite the duplicate entry
        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn test_sync_is_idempotent_under_unchanged_remote_state() {
        let db = test_db().await;
        let user = insert_user(&db, "alice").await;

        let p1 = api_playlist("pl1", "Morning", 2);
        let tracks = vec![
            api_track("https://open.spotify.com/track/a", "Song A", "Artist A"),
            api_track("https://open.spotify.com/track/b", "Song B", "Artist B"),
        ];

        for _ in 0..2 {
            let client = make_client(
                vec![p1.clone()],
                vec![(p1.tracks_href.clone(), tracks.clone())],
            );
            let engine = SyncEngine::new(db.clone(), client, make_resolver());
            engine.sync_user(user.id).await.unwrap();
        }

        assert_eq!(count_playlists(&db).await, 1);
        assert_eq!(count_songs(&db).await, 2);
    }

    #[tokio::test]
    async fn test_sync_does_not_reuse_another_users_playlist() {
        let db = test_db().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;

        // Bob already imported a playlist with the same spotify id
        let bobs = entities::playlist::ActiveModel {
            user_id: Set(bob.id),
            name: Set("Bob's".into()),
            spotify_id: Set("pl1".into()),
            total_tracks: Set(0),
            status: Set("active".into()),
            ..entities::playlist::ActiveModel::new()
        };
        let bobs = bobs.insert(&db.conn).await.unwrap();

        let p1 = api_playlist("pl1", "Alice's", 0);
        let client = make_client(vec![p1.clone()], vec![(p1.tracks_href.clone(), vec![])]);
        let engine = SyncEngine::new(db.clone(), client, make_resolver());
        engine.sync_user(alice.id).await.unwrap();

        let rows = entities::playlist::Entity::find()
            .filter(entities::playlist::Column::SpotifyId.eq("pl1"))
            .all(&db.conn)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let bobs_after = entities::playlist::Entity::find_by_id(bobs.id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bobs_after.user_id, bob.id);
        assert_eq!(bobs_after.name, "Bob's");
    }

    #[tokio::test]
    async fn test_sync_recomputes_thumbnail_for_existing_song() {
        let db = test_db().await;
        let user = insert_user(&db, "alice").await;

        // A song already known from elsewhere, thumbnail never resolved
        let existing = entities::song::ActiveModel {
            title: Set("Old Title".into()),
            artist: Set("Old Artist".into()),
            spotify_url: Set("https://open.spotify.com/track/a".into()),
            image_url: Set(None),
            ..entities::song::ActiveModel::new()
        };
        let existing = existing.insert(&db.conn).await.unwrap();

        let p1 = api_playlist("pl1", "Morning", 1);
        let client = make_client(
            vec![p1.clone()],
            vec![(
                p1.tracks_href.clone(),
                vec![api_track(
                    "https://open.spotify.com/track/a",
                    "Song A",
                    "Artist A",
                )],
            )],
        );
        let engine = SyncEngine::new(db.clone(), client, make_resolver());
        engine.sync_user(user.id).await.unwrap();

        let song = entities::song::Entity::find_by_id(existing.id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        // Reused row: title/artist kept, thumbnail recomputed
        assert_eq!(song.title, "Old Title");
        assert_eq!(
            song.image_url.as_deref(),
            Some("https://open.spotify.com/track/a/cover.jpg")
        );
        assert_eq!(count_songs(&db).await, 1);
    }

    #[tokio::test]
    async fn test_failed_tracks_fetch_rolls_back_everything() {
        let db = test_db().await;
        let user = insert_user(&db, "alice").await;

        // First, a successful import
        let p1 = api_playlist("pl1", "Morning", 1);
        let client = make_client(
            vec![p1.clone()],
            vec![(
                p1.tracks_href.clone(),
                vec![api_track(
                    "https://open.spotify.com/track/a",
                    "Song A",
                    "Artist A",
                )],
            )],
        );
        let engine = SyncEngine::new(db.clone(), client, make_resolver());
        engine.sync_user(user.id).await.unwrap();

        // Then a pass whose tracks fetch is rejected mid-way
        let mut failing = MockSpotifyClient::new();
        let p1_clone = p1.clone();
        failing
            .expect_current_user_playlists()
            .returning(move || Ok(vec![p1_clone.clone()]));
        failing
            .expect_playlist_tracks()
            .returning(|_| Err(SpotifyApiError::Unauthorized { status: 401 }));

        let engine = SyncEngine::new(db.clone(), failing, make_resolver());
        let result = engine.sync_user(user.id).await;
        assert!(matches!(result, Err(SyncError::AuthExpired)));

        // The previous import is untouched
        assert_eq!(count_playlists(&db).await, 1);
        assert_eq!(count_songs(&db).await, 1);
    }

    #[tokio::test]
    async fn test_unauthorized_playlists_fetch_maps_to_auth_expired() {
        let db = test_db().await;
        let user = insert_user(&db, "alice").await;

        let mut client = MockSpotifyClient::new();
        client
            .expect_current_user_playlists()
            .returning(|| Err(SpotifyApiError::Unauthorized { status: 403 }));

        let engine = SyncEngine::new(db.clone(), client, make_resolver());
        let result = engine.sync_user(user.id).await;
        assert!(matches!(result, Err(SyncError::AuthExpired)));
    }
}
