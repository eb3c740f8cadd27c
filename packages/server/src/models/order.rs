use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entity::{order, product};

use super::shared::Pagination;

/// An order as shown to its owner.
#[derive(Serialize, utoipa::ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    #[schema(example = 7)]
    pub product_id: i32,
    #[schema(example = "Lightroom Preset Pack")]
    pub product_name: String,
    pub product_description: String,
    /// Object key of the product preview, servable via `/api/images/{key}`.
    pub image_key: String,
    #[schema(example = 1999)]
    pub price_paid_in_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<(order::Model, Option<product::Model>)> for OrderResponse {
    fn from((order, product): (order::Model, Option<product::Model>)) -> Self {
        let (product_name, product_description, image_key) = match product {
            Some(p) => (p.name, p.description, p.image_key),
            None => Default::default(),
        };
        Self {
            id: order.id,
            product_id: order.product_id,
            product_name,
            product_description,
            image_key,
            price_paid_in_cents: order.price_paid_in_cents,
            created_at: order.created_at,
        }
    }
}

/// An order in the admin ledger view.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminOrderResponse {
    pub id: Uuid,
    #[schema(example = "user_2abc")]
    pub user_id: String,
    #[schema(example = 7)]
    pub product_id: i32,
    #[schema(example = "Lightroom Preset Pack")]
    pub product_name: String,
    #[schema(example = 1999)]
    pub price_paid_in_cents: i64,
    #[schema(example = "pi_3Nxyz")]
    pub payment_intent_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<(order::Model, Option<product::Model>)> for AdminOrderResponse {
    fn from((order, product): (order::Model, Option<product::Model>)) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            product_id: order.product_id,
            product_name: product.map(|p| p.name).unwrap_or_default(),
            price_paid_in_cents: order.price_paid_in_cents,
            payment_intent_id: order.payment_intent_id,
            created_at: order.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminOrderListResponse {
    pub data: Vec<AdminOrderResponse>,
    pub pagination: Pagination,
}
