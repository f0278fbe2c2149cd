use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::shared::cache::{Cache, keys};
use crate::shared::utils::parse_decimal;

/// 오더북 한 호가 [가격, 수량]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BookLevel(pub Decimal, pub Decimal);

impl BookLevel {
    pub fn price(&self) -> Decimal {
        self.0
    }

    pub fn quantity(&self) -> Decimal {
        self.1
    }
}

/// 매칭 엔진이 캐시에 올려두는 오더북 스냅샷
/// `{"bids": [["price", "qty"], ...], "asks": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderBookSnapshot {
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
}

/// 캐시 기반 시세 조회
/// Cache-backed market data reads (mark price, last price, order book)
///
/// 캐시 장애는 값 없음(None) 으로 취급하고 warn 로그만 남김.
#[derive(Clone)]
pub struct MarketData {
    cache: Arc<dyn Cache>,
}

impl MarketData {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// 마크(오라클) 가격
    pub async fn mark_price(&self, symbol: &str) -> Option<Decimal> {
        self.read_price(&keys::oracle_price(symbol)).await
    }

    /// 최근 체결가
    pub async fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.read_price(&keys::last_price(symbol)).await
    }

    /// 오더북 스냅샷 (없거나 파싱 실패 시 None)
    pub async fn orderbook(&self, symbol: &str) -> Option<OrderBookSnapshot> {
        let key = keys::orderbook(symbol);
        let raw = self.read(&key).await?;
        match serde_json::from_str(&raw) {
            Ok(book) => Some(book),
            Err(e) => {
                warn!(key = %key, "Failed to parse order book snapshot: {}", e);
                None
            }
        }
    }

    async fn read_price(&self, key: &str) -> Option<Decimal> {
        let raw = self.read(key).await?;
        let price = parse_decimal(&raw);
        if price.is_none() {
            warn!(key = %key, value = %raw, "Cached price is not a decimal");
        }
        price
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, "Cache read failed: {:#}", e);
                None
            }
        }
    }
}
