use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::database::Database;
use crate::entities;
use crate::entities::genre::GenreStatus;

/// Genre catalog with the published/unpublished visibility filter: only
/// published rows are surfaced by default.
pub struct GenreService {
    db: Arc<Database>,
}

impl GenreService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        name: &str,
        status: GenreStatus,
    ) -> Result<entities::genre::Model> {
        let genre = entities::genre::ActiveModel {
            name: Set(name.to_string()),
            status: Set(status),
            ..entities::genre::ActiveModel::new()
        };
        genre
            .insert(&self.db.conn)
            .await
            .wrap_err("Failed to create genre")
    }

    pub async fn list_published(&self) -> Result<Vec<entities::genre::Model>> {
        entities::genre::Entity::find()
            .filter(entities::genre::Column::Status.eq(GenreStatus::Published))
            .all(&self.db.conn)
            .await
            .wrap_err("Failed to fetch genres")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_db;

    #[tokio::test]
    async fn test_list_published_hides_unpublished() {
        let db = test_db().await;
        let service = GenreService::new(db);

        service.create("Rock", GenreStatus::Published).await.unwrap();
        service.create("Jazz", GenreStatus::Published).await.unwrap();
        service
            .create("Drafts Only", GenreStatus::Unpublished)
            .await
            .unwrap();

        let published = service.list_published().await.unwrap();
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|genre| genre.status == GenreStatus::Published));
    }

    #[tokio::test]
    async fn test_list_published_empty() {
        let db = test_db().await;
        let service = GenreService::new(db);

        assert!(service.list_published().await.unwrap().is_empty());
    }
}
