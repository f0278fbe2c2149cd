use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::parse_column;
use crate::domains::order::models::{OrderSide, Position};
use crate::shared::database::PositionStore;

pub struct PositionRepository {
    pool: PgPool,
}

impl PositionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PositionStore for PositionRepository {
    async fn find_position(&self, user_id: u64, symbol: &str) -> Result<Option<Position>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, symbol, side, quantity, entry_price
            FROM positions
            WHERE user_id = $1 AND symbol = $2 AND quantity > 0
            "#,
        )
        .bind(user_id as i64)
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch position")?;

        row.map(|r| -> Result<Position> {
            Ok(Position {
                user_id: r.get::<i64, _>("user_id") as u64,
                symbol: r.get("symbol"),
                side: parse_column(r.get("side"), "side", OrderSide::parse)?,
                quantity: r.get("quantity"),
                entry_price: r.get("entry_price"),
            })
        })
        .transpose()
    }
}
