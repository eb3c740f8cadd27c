use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A purchasable catalog item.
///
/// Products are archived, never deleted, so orders keep resolving them.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Price in minor currency units.
    pub price_in_cents: i64,

    /// Object key of the purchasable file.
    pub file_key: String,
    /// Object key of the preview image.
    pub image_key: String,

    #[sea_orm(default_value = true, indexed)]
    pub is_available: bool,

    #[sea_orm(has_many)]
    pub orders: HasMany<super::order::Entity>,

    #[sea_orm(has_many)]
    pub download_verifications: HasMany<super::download_verification::Entity>,

    pub created_at: DateTimeUtc,
    pub archived_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
