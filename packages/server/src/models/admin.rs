use chrono::NaiveDate;
use serde::Serialize;

use crate::ledger::{DailySales, ProductRevenue, SalesSummary};

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProductRevenueResponse {
    pub product_id: i32,
    pub product_name: String,
    pub order_count: u64,
    pub revenue_in_cents: i64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DailySalesResponse {
    #[schema(value_type = String, example = "2025-09-01")]
    pub date: NaiveDate,
    pub order_count: u64,
    pub revenue_in_cents: i64,
}

/// Revenue figures for the admin dashboard.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SalesSummaryResponse {
    #[schema(example = 125000)]
    pub total_revenue_in_cents: i64,
    #[schema(example = 64)]
    pub order_count: u64,
    #[schema(example = 1953)]
    pub average_order_value_in_cents: i64,
    /// Highest revenue first.
    pub revenue_by_product: Vec<ProductRevenueResponse>,
    /// Up to 7 most recent days with sales, newest first.
    pub daily: Vec<DailySalesResponse>,
}

impl From<ProductRevenue> for ProductRevenueResponse {
    fn from(r: ProductRevenue) -> Self {
        Self {
            product_id: r.product_id,
            product_name: r.product_name,
            order_count: r.order_count,
            revenue_in_cents: r.revenue_in_cents,
        }
    }
}

impl From<DailySales> for DailySalesResponse {
    fn from(d: DailySales) -> Self {
        Self {
            date: d.date,
            order_count: d.order_count,
            revenue_in_cents: d.revenue_in_cents,
        }
    }
}

impl From<SalesSummary> for SalesSummaryResponse {
    fn from(s: SalesSummary) -> Self {
        Self {
            total_revenue_in_cents: s.total_revenue_in_cents,
            order_count: s.order_count,
            average_order_value_in_cents: s.average_order_value_in_cents,
            revenue_by_product: s.revenue_by_product.into_iter().map(Into::into).collect(),
            daily: s.daily.into_iter().map(Into::into).collect(),
        }
    }
}
