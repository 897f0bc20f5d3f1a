use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ClientId, OrderId, OrderStatus, PieceId, PieceStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::Result;
use crate::records::{NewOrder, Order, Piece, SagaHistoryEntry};
use crate::store::OrderStore;

/// PostgreSQL-backed store implementation.
///
/// Every operation checks a connection out of the pool for its own short
/// scope; nothing is held across unrelated awaits. Compare-and-set status
/// updates are a single `UPDATE ... WHERE status = $expected`, so the
/// database row lock decides races.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        tracing::info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            client_id: ClientId::from_uuid(row.try_get::<Uuid, _>("client_id")?),
            number_of_pieces: row.try_get::<i32, _>("number_of_pieces")? as u32,
            description: row.try_get("description")?,
            status: row.try_get::<String, _>("status")?.parse()?,
            creation_date: row.try_get("creation_date")?,
        })
    }

    fn row_to_piece(row: PgRow) -> Result<Piece> {
        Ok(Piece {
            id: PieceId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            status: row.try_get::<String, _>("status")?.parse()?,
            manufacturing_date: row.try_get("manufacturing_date")?,
            creation_date: row.try_get("creation_date")?,
        })
    }

    fn row_to_history(row: PgRow) -> Result<SagaHistoryEntry> {
        Ok(SagaHistoryEntry {
            id: row.try_get("id")?,
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            status: row.try_get::<String, _>("status")?.parse()?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }
}

const ORDER_COLUMNS: &str = "id, client_id, number_of_pieces, description, status, creation_date";
const PIECE_COLUMNS: &str = "id, order_id, status, manufacturing_date, creation_date";

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let id = OrderId::new();
        let creation_date = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO orders (id, client_id, number_of_pieces, description, status, creation_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id.as_uuid())
        .bind(new.client_id.as_uuid())
        .bind(new.number_of_pieces as i32)
        .bind(&new.description)
        .bind(new.status.as_str())
        .bind(creation_date)
        .execute(&self.pool)
        .await?;

        Ok(Order {
            id,
            client_id: new.client_id,
            number_of_pieces: new.number_of_pieces,
            description: new.description,
            status: new.status,
            creation_date,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY creation_date ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_orders_by_client(&self, client_id: ClientId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE client_id = $1 ORDER BY creation_date ASC"
        ))
        .bind(client_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET status = $3
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn insert_piece(&self, order_id: OrderId) -> Result<Piece> {
        let id = PieceId::new();
        let creation_date = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO pieces (id, order_id, status, manufacturing_date, creation_date)
            VALUES ($1, $2, $3, NULL, $4)
            "#,
        )
        .bind(id.as_uuid())
        .bind(order_id.as_uuid())
        .bind(PieceStatus::Queued.as_str())
        .bind(creation_date)
        .execute(&self.pool)
        .await?;

        Ok(Piece {
            id,
            order_id,
            status: PieceStatus::Queued,
            manufacturing_date: None,
            creation_date,
        })
    }

    async fn get_piece(&self, id: PieceId) -> Result<Option<Piece>> {
        let row = sqlx::query(&format!(
            "SELECT {PIECE_COLUMNS} FROM pieces WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_piece).transpose()
    }

    async fn list_pieces(&self, order_id: OrderId) -> Result<Vec<Piece>> {
        let rows = sqlx::query(&format!(
            "SELECT {PIECE_COLUMNS} FROM pieces WHERE order_id = $1 ORDER BY creation_date ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_piece).collect()
    }

    async fn mark_piece_produced(
        &self,
        id: PieceId,
        produced_at: DateTime<Utc>,
    ) -> Result<Option<Piece>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE pieces SET status = $2, manufacturing_date = $3
            WHERE id = $1 AND status = $4
            RETURNING {PIECE_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(PieceStatus::Produced.as_str())
        .bind(produced_at)
        .bind(PieceStatus::Queued.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_piece).transpose()
    }

    async fn append_history(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<SagaHistoryEntry> {
        let recorded_at = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO sagas (order_id, status, recorded_at)
            VALUES ($1, $2, $3)
            RETURNING id, order_id, status, recorded_at
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(status.as_str())
        .bind(recorded_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_history(row)
    }

    async fn list_history(&self, order_id: OrderId) -> Result<Vec<SagaHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, status, recorded_at
            FROM sagas
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_history).collect()
    }
}
