use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use super::{parse_column, parse_optional_column};
use crate::domains::order::models::{
    ContractType, MarginModeKind, OrderRecord, OrderSide, OrderStatus, OrderTrigger, OrderType,
    StopCondition, TimeInForce, TpSlType,
};
use crate::shared::database::{OrderLookup, OrderStore};

const ORDER_COLUMNS: &str = r#"
    id, user_id, account_id, user_email, symbol, asset, instrument_id, contract_type,
    side, order_type, quantity, remaining, price, leverage, margin_mode, status, time_in_force,
    tp_sl_type, tp_sl_price, trigger, stop_condition, callback_rate, activation_price,
    take_profit, take_profit_trigger, stop_loss, stop_loss_trigger,
    is_post_only, is_hidden, is_reduce_only, is_tp_sl_order,
    parent_order_id, linked_order_id, take_profit_order_id, stop_loss_order_id,
    tmp_id, original_cost, original_order_margin, created_at
"#;

pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 주문 한 건 INSERT (트랜잭션 내부에서 호출)
    async fn insert_order(conn: &mut PgConnection, order: &OrderRecord) -> Result<()> {
        let query = format!(
            "INSERT INTO orders ({}) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31,
                $32, $33, $34, $35, $36, $37, $38, $39
            )",
            ORDER_COLUMNS
        );

        sqlx::query(&query)
            .bind(order.id as i64)
            .bind(order.user_id as i64)
            .bind(order.account_id as i64)
            .bind(&order.user_email)
            .bind(&order.symbol)
            .bind(&order.asset)
            .bind(order.instrument_id as i64)
            .bind(order.contract_type.as_str())
            .bind(order.side.as_str())
            .bind(order.order_type.as_str())
            .bind(order.quantity)
            .bind(order.remaining)
            .bind(order.price)
            .bind(order.leverage)
            .bind(order.margin_mode.as_str())
            .bind(order.status.as_str())
            .bind(order.time_in_force.as_str())
            .bind(order.tp_sl_type.map(|t| t.as_str()))
            .bind(order.tp_sl_price)
            .bind(order.trigger.map(|t| t.as_str()))
            .bind(order.stop_condition.map(|c| c.as_str()))
            .bind(order.callback_rate)
            .bind(order.activation_price)
            .bind(order.take_profit)
            .bind(order.take_profit_trigger.map(|t| t.as_str()))
            .bind(order.stop_loss)
            .bind(order.stop_loss_trigger.map(|t| t.as_str()))
            .bind(order.is_post_only)
            .bind(order.is_hidden)
            .bind(order.is_reduce_only)
            .bind(order.is_tp_sl_order)
            .bind(order.parent_order_id.map(|id| id as i64))
            .bind(order.linked_order_id.map(|id| id as i64))
            .bind(order.take_profit_order_id.map(|id| id as i64))
            .bind(order.stop_loss_order_id.map(|id| id as i64))
            .bind(&order.tmp_id)
            .bind(order.original_cost)
            .bind(order.original_order_margin)
            .bind(order.created_at)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to insert order {}", order.id))?;

        Ok(())
    }

    fn row_to_order(row: &PgRow) -> Result<OrderRecord> {
        let id = |column: &str| -> Option<u64> {
            row.get::<Option<i64>, _>(column).map(|v| v as u64)
        };

        Ok(OrderRecord {
            id: row.get::<i64, _>("id") as u64,
            user_id: row.get::<i64, _>("user_id") as u64,
            account_id: row.get::<i64, _>("account_id") as u64,
            user_email: row.get("user_email"),
            symbol: row.get("symbol"),
            asset: row.get("asset"),
            instrument_id: row.get::<i64, _>("instrument_id") as u64,
            contract_type: parse_column(row.get("contract_type"), "contract_type", ContractType::parse)?,
            side: parse_column(row.get("side"), "side", OrderSide::parse)?,
            order_type: parse_column(row.get("order_type"), "order_type", OrderType::parse)?,
            quantity: row.get("quantity"),
            remaining: row.get("remaining"),
            price: row.get("price"),
            leverage: row.get("leverage"),
            margin_mode: parse_column(row.get("margin_mode"), "margin_mode", MarginModeKind::parse)?,
            status: parse_column(row.get("status"), "status", OrderStatus::parse)?,
            time_in_force: parse_column(row.get("time_in_force"), "time_in_force", TimeInForce::parse)?,
            tp_sl_type: parse_optional_column(row.get("tp_sl_type"), "tp_sl_type", TpSlType::parse)?,
            tp_sl_price: row.get("tp_sl_price"),
            trigger: parse_optional_column(row.get("trigger"), "trigger", OrderTrigger::parse)?,
            stop_condition: parse_optional_column(row.get("stop_condition"), "stop_condition", StopCondition::parse)?,
            callback_rate: row.get("callback_rate"),
            activation_price: row.get("activation_price"),
            take_profit: row.get("take_profit"),
            take_profit_trigger: parse_optional_column(row.get("take_profit_trigger"), "take_profit_trigger", OrderTrigger::parse)?,
            stop_loss: row.get("stop_loss"),
            stop_loss_trigger: parse_optional_column(row.get("stop_loss_trigger"), "stop_loss_trigger", OrderTrigger::parse)?,
            is_post_only: row.get("is_post_only"),
            is_hidden: row.get("is_hidden"),
            is_reduce_only: row.get("is_reduce_only"),
            is_tp_sl_order: row.get("is_tp_sl_order"),
            parent_order_id: id("parent_order_id"),
            linked_order_id: id("linked_order_id"),
            take_profit_order_id: id("take_profit_order_id"),
            stop_loss_order_id: id("stop_loss_order_id"),
            tmp_id: row.get("tmp_id"),
            original_cost: row.get("original_cost"),
            original_order_margin: row.get("original_order_margin"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    /// 자식 → 부모 순서로 한 트랜잭션에서 저장
    /// Insert children then parent inside one transaction
    async fn insert_lineage(&self, parent: &OrderRecord, children: &[OrderRecord]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for child in children {
            Self::insert_order(&mut tx, child).await?;
        }
        Self::insert_order(&mut tx, parent).await?;

        tx.commit().await.context("Failed to commit order lineage")?;
        Ok(())
    }

    async fn delete_orders(&self, ids: &[u64]) -> Result<u64> {
        let ids: Vec<i64> = ids.iter().map(|id| *id as i64).collect();
        let result = sqlx::query("DELETE FROM orders WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await
            .context("Failed to delete orders")?;

        Ok(result.rows_affected())
    }

    async fn find_open_order(&self, user_id: u64, lookup: &OrderLookup) -> Result<Option<OrderRecord>> {
        let (key_column, condition) = match lookup {
            OrderLookup::TmpId(_) => ("tmp_id", "tmp_id = $2"),
            OrderLookup::Id(_) => ("id", "id = $2"),
        };
        let sql = format!(
            "SELECT {} FROM orders
             WHERE user_id = $1 AND {} AND status IN ('ACTIVE', 'PENDING', 'UNTRIGGERED')
             LIMIT 1",
            ORDER_COLUMNS, condition
        );

        let q = sqlx::query(&sql).bind(user_id as i64);
        let q = match lookup {
            OrderLookup::TmpId(tmp_id) => q.bind(tmp_id.clone()),
            OrderLookup::Id(id) => q.bind(*id as i64),
        };

        let row = q
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch open order by {}", key_column))?;

        row.map(|r| Self::row_to_order(&r)).transpose()
    }

    async fn max_order_id(&self) -> Result<u64> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM orders")
            .fetch_one(&self.pool)
            .await
            .context("Failed to fetch max order id")?;

        Ok(max.unwrap_or(0) as u64)
    }
}
