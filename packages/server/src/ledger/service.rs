use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::{order, product};
use crate::payments::PaidCheckout;

/// Result of recording a paid checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new order row was written.
    Created(order::Model),
    /// The payment intent was already recorded; carries the existing order.
    Duplicate(order::Model),
    /// The checkout references a product that does not exist.
    UnknownProduct,
}

/// Revenue attributed to one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRevenue {
    pub product_id: i32,
    pub product_name: String,
    pub order_count: u64,
    pub revenue_in_cents: i64,
}

/// Totals for one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub order_count: u64,
    pub revenue_in_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSummary {
    pub total_revenue_in_cents: i64,
    pub order_count: u64,
    /// Mean order value rounded to the nearest cent; 0 without orders.
    pub average_order_value_in_cents: i64,
    /// Sorted by revenue, highest first.
    pub revenue_by_product: Vec<ProductRevenue>,
    /// The 7 most recent days with sales, newest first.
    pub daily: Vec<DailySales>,
}

/// Durable record of purchases. Orders are only ever inserted.
pub struct OrderLedger<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> OrderLedger<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Record a paid checkout at most once per payment intent.
    ///
    /// Run inside a transaction. The insert is conditional on the unique
    /// `payment_intent_id`, so concurrent deliveries of the same event
    /// produce one row and report the rest as duplicates.
    pub async fn record(&self, checkout: &PaidCheckout) -> Result<RecordOutcome, DbErr> {
        let product_exists = product::Entity::find_by_id(checkout.product_id)
            .count(self.conn)
            .await?
            > 0;
        if !product_exists {
            return Ok(RecordOutcome::UnknownProduct);
        }

        let id = Uuid::new_v4();
        let model = order::ActiveModel {
            id: Set(id),
            user_id: Set(checkout.user_id.clone()),
            product_id: Set(checkout.product_id),
            price_paid_in_cents: Set(checkout.amount_total),
            payment_intent_id: Set(checkout.payment_intent_id.clone()),
            created_at: Set(Utc::now()),
        };

        let inserted = match order::Entity::insert(model)
            .on_conflict(
                OnConflict::column(order::Column::PaymentIntentId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await
        {
            Ok(rows) => rows > 0,
            Err(DbErr::RecordNotInserted) => false,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => false,
            Err(e) => return Err(e),
        };

        if inserted {
            let created = order::Entity::find_by_id(id)
                .one(self.conn)
                .await?
                .ok_or_else(|| DbErr::Custom("inserted order not readable".to_string()))?;
            return Ok(RecordOutcome::Created(created));
        }

        let existing = self
            .find_by_payment_intent(&checkout.payment_intent_id)
            .await?
            .ok_or_else(|| {
                DbErr::Custom("payment intent conflict but existing order not found".to_string())
            })?;
        Ok(RecordOutcome::Duplicate(existing))
    }

    pub async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<order::Model>, DbErr> {
        order::Entity::find()
            .filter(order::Column::PaymentIntentId.eq(payment_intent_id))
            .one(self.conn)
            .await
    }

    /// Fetch an order only if `user_id` owns it.
    ///
    /// Ownership is part of the query, so a foreign order and a missing
    /// order are indistinguishable to the caller.
    pub async fn find_owned(
        &self,
        order_id: Uuid,
        user_id: &str,
    ) -> Result<Option<order::Model>, DbErr> {
        order::Entity::find()
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::UserId.eq(user_id))
            .one(self.conn)
            .await
    }

    /// Orders placed by `user_id`, newest first, with their products.
    pub async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<(order::Model, Option<product::Model>)>, DbErr> {
        order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .find_also_related(product::Entity)
            .all(self.conn)
            .await
    }

    /// All orders, newest first, one page at a time. `page` is 1-based.
    pub async fn list_all(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<(order::Model, Option<product::Model>)>, u64), DbErr> {
        let total = order::Entity::find().count(self.conn).await?;

        let rows = order::Entity::find()
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .offset(page.saturating_sub(1) * per_page)
            .limit(per_page)
            .find_also_related(product::Entity)
            .all(self.conn)
            .await?;

        Ok((rows, total))
    }

    /// Aggregate revenue figures over every recorded order.
    pub async fn sales_summary(&self) -> Result<SalesSummary, DbErr> {
        let rows: Vec<(i32, i64, DateTime<Utc>)> = order::Entity::find()
            .select_only()
            .column(order::Column::ProductId)
            .column(order::Column::PricePaidInCents)
            .column(order::Column::CreatedAt)
            .into_tuple()
            .all(self.conn)
            .await?;

        let names: HashMap<i32, String> = product::Entity::find()
            .select_only()
            .column(product::Column::Id)
            .column(product::Column::Name)
            .into_tuple::<(i32, String)>()
            .all(self.conn)
            .await?
            .into_iter()
            .collect();

        Ok(summarize(&rows, &names))
    }
}

fn summarize(rows: &[(i32, i64, DateTime<Utc>)], names: &HashMap<i32, String>) -> SalesSummary {
    let mut total_revenue_in_cents = 0i64;
    let mut by_product: HashMap<i32, (u64, i64)> = HashMap::new();
    let mut by_day: BTreeMap<NaiveDate, (u64, i64)> = BTreeMap::new();

    for &(product_id, price, created_at) in rows {
        total_revenue_in_cents += price;

        let entry = by_product.entry(product_id).or_default();
        entry.0 += 1;
        entry.1 += price;

        let day = by_day.entry(created_at.date_naive()).or_default();
        day.0 += 1;
        day.1 += price;
    }

    let order_count = rows.len() as u64;
    let average_order_value_in_cents = if order_count == 0 {
        0
    } else {
        (total_revenue_in_cents as f64 / order_count as f64).round() as i64
    };

    let mut revenue_by_product: Vec<ProductRevenue> = by_product
        .into_iter()
        .map(|(product_id, (order_count, revenue_in_cents))| ProductRevenue {
            product_id,
            product_name: names.get(&product_id).cloned().unwrap_or_default(),
            order_count,
            revenue_in_cents,
        })
        .collect();
    revenue_by_product.sort_by(|a, b| {
        b.revenue_in_cents
            .cmp(&a.revenue_in_cents)
            .then(a.product_id.cmp(&b.product_id))
    });

    let daily = by_day
        .into_iter()
        .rev()
        .take(7)
        .map(|(date, (order_count, revenue_in_cents))| DailySales {
            date,
            order_count,
            revenue_in_cents,
        })
        .collect();

    SalesSummary {
        total_revenue_in_cents,
        order_count,
        average_order_value_in_cents,
        revenue_by_product,
        daily,
    }
}
