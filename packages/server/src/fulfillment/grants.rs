use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter,
};
use uuid::Uuid;

use crate::entity::{download_verification, order, product};

/// Outcome of presenting a verification id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Granted {
        verification: download_verification::Model,
        product: product::Model,
    },
    /// Unknown id, or already consumed in single-use mode.
    Invalid,
    Expired,
}

/// Issues and resolves download verifications.
pub struct DownloadGrants<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> DownloadGrants<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Create a verification for an order the caller has already been
    /// shown to own. `ttl` must be positive.
    pub async fn issue(
        &self,
        order: &order::Model,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<download_verification::Model, DbErr> {
        if ttl <= Duration::zero() {
            return Err(DbErr::Custom("verification ttl must be positive".into()));
        }
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| DbErr::Custom("verification expiry out of range".into()))?;

        download_verification::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(order.product_id),
            order_id: Set(order.id),
            expires_at: Set(expires_at),
            created_at: Set(now),
        }
        .insert(self.conn)
        .await
    }

    /// Look up a verification and its product in one query.
    ///
    /// With `consume` set, a valid verification is deleted; when two
    /// requests race, only the one whose delete succeeds is granted.
    pub async fn resolve(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        consume: bool,
    ) -> Result<Resolution, DbErr> {
        let found = download_verification::Entity::find_by_id(id)
            .find_also_related(product::Entity)
            .one(self.conn)
            .await?;

        let Some((verification, Some(product))) = found else {
            return Ok(Resolution::Invalid);
        };

        if now >= verification.expires_at {
            return Ok(Resolution::Expired);
        }

        if consume {
            let deleted = download_verification::Entity::delete_many()
                .filter(download_verification::Column::Id.eq(id))
                .filter(download_verification::Column::ExpiresAt.gt(now))
                .exec(self.conn)
                .await?;
            if deleted.rows_affected == 0 {
                return Ok(Resolution::Invalid);
            }
        }

        Ok(Resolution::Granted {
            verification,
            product,
        })
    }

    /// Delete verifications that expired more than `retention` before `now`.
    /// Younger expired rows stay so they still resolve as `Expired`.
    pub async fn sweep_expired(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Result<u64, DbErr> {
        let cutoff = now
            .checked_sub_signed(retention)
            .ok_or_else(|| DbErr::Custom("sweep retention out of range".into()))?;
        let result = download_verification::Entity::delete_many()
            .filter(download_verification::Column::ExpiresAt.lt(cutoff))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
