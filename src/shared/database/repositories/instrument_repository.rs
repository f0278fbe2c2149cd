use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::parse_column;
use crate::domains::order::models::{ContractType, Instrument, MarginMode, MarginModeKind, TradingRules};
use crate::shared::database::InstrumentStore;

pub struct InstrumentRepository {
    pool: PgPool,
}

impl InstrumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstrumentStore for InstrumentRepository {
    async fn find_instrument(&self, symbol: &str) -> Result<Option<Instrument>> {
        let row = sqlx::query(
            r#"
            SELECT id, symbol, contract_type, quote_asset, max_figures_for_size,
                   max_figures_for_price, max_price, max_quantity_limit_order,
                   max_quantity_market_order, cap_ratio, floor_ratio
            FROM instruments
            WHERE symbol = $1
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch instrument")?;

        let Some(r) = row else {
            return Ok(None);
        };

        Ok(Some(Instrument {
            id: r.get::<i64, _>("id") as u64,
            symbol: r.get("symbol"),
            contract_type: parse_column(r.get("contract_type"), "contract_type", ContractType::parse)?,
            quote_asset: r.get("quote_asset"),
            max_figures_for_size: r.get::<i32, _>("max_figures_for_size") as u32,
            max_figures_for_price: r.get::<i32, _>("max_figures_for_price") as u32,
            max_price: r.get("max_price"),
            trading_rules: TradingRules {
                max_quantity_limit_order: r.get("max_quantity_limit_order"),
                max_quantity_market_order: r.get("max_quantity_market_order"),
                cap_ratio: r.get("cap_ratio"),
                floor_ratio: r.get("floor_ratio"),
            },
        }))
    }

    async fn find_margin_mode(&self, user_id: u64, instrument_id: u64) -> Result<Option<MarginMode>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, instrument_id, margin_mode, leverage
            FROM margin_modes
            WHERE user_id = $1 AND instrument_id = $2
            "#,
        )
        .bind(user_id as i64)
        .bind(instrument_id as i64)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch margin mode")?;

        row.map(|r| -> Result<MarginMode> {
            Ok(MarginMode {
                user_id: r.get::<i64, _>("user_id") as u64,
                instrument_id: r.get::<i64, _>("instrument_id") as u64,
                margin_mode: parse_column(r.get("margin_mode"), "margin_mode", MarginModeKind::parse)?,
                leverage: r.get("leverage"),
            })
        })
        .transpose()
    }
}
