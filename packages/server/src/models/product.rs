use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::product;

/// Request body for registering a product against uploaded objects.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProductRequest {
    #[schema(example = "Lightroom Preset Pack")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = 1999)]
    pub price_in_cents: i64,
    /// Key returned by the upload-URL endpoint for the purchasable file.
    #[schema(example = "products/5f0c...-presets.zip")]
    pub file_key: String,
    #[schema(example = "products/91ab...-cover.png")]
    pub image_key: String,
    /// Default: true.
    pub is_available: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProductResponse {
    #[schema(example = 7)]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price_in_cents: i64,
    pub file_key: String,
    pub image_key: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl From<product::Model> for ProductResponse {
    fn from(p: product::Model) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price_in_cents: p.price_in_cents,
            file_key: p.file_key,
            image_key: p.image_key,
            is_available: p.is_available,
            created_at: p.created_at,
            archived_at: p.archived_at,
        }
    }
}
