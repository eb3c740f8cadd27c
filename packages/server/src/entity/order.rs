use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A completed purchase, recorded once per payment intent.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Opaque subject id from the identity provider.
    #[sea_orm(indexed)]
    pub user_id: String,

    pub product_id: i32,
    #[sea_orm(belongs_to, from = "product_id", to = "id")]
    pub product: HasOne<super::product::Entity>,

    /// Amount charged, independent of the current catalog price.
    pub price_paid_in_cents: i64,

    #[sea_orm(unique)]
    pub payment_intent_id: String,

    #[sea_orm(has_many)]
    pub download_verifications: HasMany<super::download_verification::Entity>,

    #[sea_orm(indexed)]
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
