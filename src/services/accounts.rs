use std::sync::Arc;

use rand::Rng;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use sha2::{Digest, Sha256};

use crate::database::Database;
use crate::entities;

const SESSION_TOKEN_LENGTH: usize = 48;
const SALT_LENGTH: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Username is already taken")]
    UsernameTaken,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Session not found")]
    SessionNotFound,
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

fn random_string(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            const CHARSET: &[u8] =
                b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
            CHARSET[rng.random_range(0..CHARSET.len())] as char
        })
        .collect()
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// User accounts and server-side sessions. The Spotify bearer token
/// obtained through the OAuth callback is attached to the session row.
pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<entities::user::Model, AccountError> {
        let existing = entities::user::Entity::find()
            .filter(entities::user::Column::Username.eq(username))
            .one(&self.db.conn)
            .await?;
        if existing.is_some() {
            return Err(AccountError::UsernameTaken);
        }

        let salt = random_string(SALT_LENGTH);
        let user = entities::user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(hash_password(password, &salt)),
            password_salt: Set(salt),
            ..entities::user::ActiveModel::new()
        };

        let model = user.insert(&self.db.conn).await?;
        tracing::info!("Registered user: {}", model.username);
        Ok(model)
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<entities::session::Model, AccountError> {
        let user = entities::user::Entity::find()
            .filter(entities::user::Column::Username.eq(username))
            .one(&self.db.conn)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if hash_password(password, &user.password_salt) != user.password_hash {
            return Err(AccountError::InvalidCredentials);
        }

        let session = entities::session::ActiveModel {
            token: Set(random_string(SESSION_TOKEN_LENGTH)),
            user_id: Set(user.id),
            spotify_access_token: Set(None),
            ..entities::session::ActiveModel::new()
        };

        Ok(session.insert(&self.db.conn).await?)
    }

    /// Idempotent: logging out an already-dead token is fine.
    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        entities::session::Entity::delete_by_id(token)
            .exec(&self.db.conn)
            .await?;
        Ok(())
    }

    pub async fn session_user(
        &self,
        token: &str,
    ) -> Result<Option<(entities::session::Model, entities::user::Model)>, AccountError> {
        let Some(session) = entities::session::Entity::find_by_id(token)
            .one(&self.db.conn)
            .await?
        else {
            return Ok(None);
        };

        let user = entities::user::Entity::find_by_id(session.user_id)
            .one(&self.db.conn)
            .await?
            .ok_or(AccountError::SessionNotFound)?;

        Ok(Some((session, user)))
    }

    /// Attach the Spotify bearer token to the session after the OAuth
    /// callback completes.
    pub async fn store_spotify_token(
        &self,
        token: &str,
        access_token: &str,
    ) -> Result<(), AccountError> {
        let session = entities::session::Entity::find_by_id(token)
            .one(&self.db.conn)
            .await?
            .ok_or(AccountError::SessionNotFound)?;

        let mut model: entities::session::ActiveModel = session.into();
        model.spotify_access_token = Set(Some(access_token.to_string()));
        model.update(&self.db.conn).await?;
        Ok(())
    }
}
