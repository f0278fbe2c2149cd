// 레퍼런스 가격 조회
// Reference price lookup for counter-order sizing

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::shared::utils::parse_decimal;

/// 외부 레퍼런스 가격 조회 trait
#[async_trait]
pub trait ReferencePriceSource: Send + Sync {
    /// 심볼의 최근 체결가
    async fn last_price(&self, symbol: &str) -> Result<Decimal>;
}

/// 바이낸스 선물 ticker 응답
/// `{"symbol": "BTCUSDT", "price": "6000.01", "time": 1589437530011}`
#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

// 바이낸스 REST 클라이언트
// Binance futures REST client (ticker price only)
pub struct BinancePriceClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl BinancePriceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// "BTC-USDT" → "BTCUSDT"
    pub fn binance_symbol(symbol: &str) -> String {
        symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }
}

#[async_trait]
impl ReferencePriceSource for BinancePriceClient {
    async fn last_price(&self, symbol: &str) -> Result<Decimal> {
        let url = format!(
            "{}/fapi/v1/ticker/price?symbol={}",
            self.base_url,
            Self::binance_symbol(symbol)
        );
        debug!("[Binance] requesting {}", url);

        // HTTP GET 요청
        let response = self
            .http_client
            .get(&url)
            .header("User-Agent", "order-intake/1.0")
            .send()
            .await
            .context("Failed to send request to Binance API")?;

        // HTTP 상태 코드 확인
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Binance API returned error: {} - {}", status, body);
        }

        // JSON 파싱
        let ticker: TickerPrice = response
            .json()
            .await
            .context("Failed to parse Binance ticker response")?;

        parse_decimal(&ticker.price)
            .with_context(|| format!("Invalid Binance ticker price: {}", ticker.price))
    }
}

/// 고정 가격 (테스트 / 오프라인 실행)
pub struct FixedPriceSource {
    price: Option<Decimal>,
}

impl FixedPriceSource {
    pub fn new(price: Decimal) -> Self {
        Self { price: Some(price) }
    }

    /// 항상 실패하는 가격 소스
    pub fn unavailable() -> Self {
        Self { price: None }
    }
}

#[async_trait]
impl ReferencePriceSource for FixedPriceSource {
    async fn last_price(&self, symbol: &str) -> Result<Decimal> {
        self.price
            .with_context(|| format!("No reference price available for {}", symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binance_symbol() {
        assert_eq!(BinancePriceClient::binance_symbol("btc-usdt"), "BTCUSDT");
        assert_eq!(BinancePriceClient::binance_symbol("SOLUSDT"), "SOLUSDT");
    }

    #[tokio::test]
    async fn test_fixed_price_source() {
        let source = FixedPriceSource::new(Decimal::new(100, 0));
        assert_eq!(source.last_price("BTCUSDT").await.unwrap(), Decimal::new(100, 0));
        assert!(FixedPriceSource::unavailable().last_price("BTCUSDT").await.is_err());
    }
}
