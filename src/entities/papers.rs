use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One cataloged paper: the persisted record behind a document card.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub storage_key: String,
    pub size_bytes: i64,
    pub declared_type: String,
    pub is_favorite: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
