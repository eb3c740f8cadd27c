use sea_orm::sea_query::{
    Index, IndexCreateStatement, MysqlQueryBuilder, PostgresQueryBuilder, SqliteQueryBuilder,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::entity::order;

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // My orders: WHERE user_id = ? ORDER BY created_at DESC
    let user_orders = Index::create()
        .if_not_exists()
        .name("idx_order_user_created")
        .table(order::Entity)
        .col(order::Column::UserId)
        .col(order::Column::CreatedAt)
        .to_owned();
    create_index(db, "idx_order_user_created", &user_orders).await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: &IndexCreateStatement) {
    let sql = match db.get_database_backend() {
        DatabaseBackend::Postgres => stmt.to_string(PostgresQueryBuilder),
        DatabaseBackend::MySql => stmt.to_string(MysqlQueryBuilder),
        DatabaseBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        #[allow(unreachable_patterns)]
        _ => stmt.to_string(PostgresQueryBuilder),
    };

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {name} exists"),
        Err(e) => warn!("Failed to create index {name}: {e}"),
    }
}
