use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::domains::order::models::Account;
use crate::shared::database::AccountStore;

pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    /// (사용자, 자산) 으로 계정 조회
    /// 캐시에 쓸 컬럼만 조회함
    async fn find_account(&self, user_id: u64, asset: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, user_email, asset, balance
            FROM accounts
            WHERE user_id = $1 AND asset = $2
            "#,
        )
        .bind(user_id as i64)
        .bind(asset)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        Ok(row.map(|r| Account {
            id: r.get::<i64, _>("id") as u64,
            user_id: r.get::<i64, _>("user_id") as u64,
            user_email: r.get("user_email"),
            asset: r.get("asset"),
            balance: r.get("balance"),
        }))
    }

    /// 잔고에서 미체결 주문 비용을 뺀 값
    async fn available_balance(&self, account: &Account) -> Result<Decimal> {
        let locked: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT SUM(original_cost)
            FROM orders
            WHERE account_id = $1 AND status IN ('ACTIVE', 'PENDING', 'UNTRIGGERED')
            "#,
        )
        .bind(account.id as i64)
        .fetch_one(&self.pool)
        .await
        .context("Failed to fetch locked order cost")?;

        Ok(account.balance - locked.unwrap_or(Decimal::ZERO))
    }
}
