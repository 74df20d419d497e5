use crate::entities::{papers, prelude::*};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

/// Catalog record written for every successfully stored paper.
#[derive(Debug, Clone)]
pub struct NewPaper {
    pub title: String,
    pub storage_key: String,
    pub owner_id: String,
    pub size_bytes: i64,
    pub declared_type: String,
}

/// The metadata-store boundary: a keyed record store the catalog lives in.
/// Listing is newest-first per owner, which is what the library UI renders.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn insert(&self, record: NewPaper) -> Result<papers::Model>;
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<papers::Model>>;
    async fn find_for_owner(&self, owner_id: &str, id: &str) -> Result<Option<papers::Model>>;
    async fn set_favorite(
        &self,
        owner_id: &str,
        id: &str,
        favorite: bool,
    ) -> Result<Option<papers::Model>>;
    /// Removes the record and returns it so the caller can clean up the
    /// stored object.
    async fn delete(&self, owner_id: &str, id: &str) -> Result<Option<papers::Model>>;
}

pub struct SeaOrmMetadataStore {
    db: DatabaseConnection,
}

impl SeaOrmMetadataStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SeaOrmMetadataStore {
    async fn insert(&self, record: NewPaper) -> Result<papers::Model> {
        let model = papers::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            owner_id: Set(record.owner_id),
            title: Set(record.title),
            storage_key: Set(record.storage_key),
            size_bytes: Set(record.size_bytes),
            declared_type: Set(record.declared_type),
            is_favorite: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;
        Ok(model)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<papers::Model>> {
        let records = Papers::find()
            .filter(papers::Column::OwnerId.eq(owner_id))
            .order_by_desc(papers::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(records)
    }

    async fn find_for_owner(&self, owner_id: &str, id: &str) -> Result<Option<papers::Model>> {
        let record = Papers::find_by_id(id)
            .filter(papers::Column::OwnerId.eq(owner_id))
            .one(&self.db)
            .await?;
        Ok(record)
    }

    async fn set_favorite(
        &self,
        owner_id: &str,
        id: &str,
        favorite: bool,
    ) -> Result<Option<papers::Model>> {
        let Some(record) = self.find_for_owner(owner_id, id).await? else {
            return Ok(None);
        };
        let mut active: papers::ActiveModel = record.into();
        active.is_favorite = Set(favorite);
        let updated = active.update(&self.db).await?;
        Ok(Some(updated))
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<Option<papers::Model>> {
        let Some(record) = self.find_for_owner(owner_id, id).await? else {
            return Ok(None);
        };
        record.clone().delete(&self.db).await?;
        Ok(Some(record))
    }
}
