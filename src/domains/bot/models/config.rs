use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shared::config::{env_opt, env_or};

/// 봇 설정
/// Bot Configuration
///
/// 사용자 시장가 주문에 대해 반대 주문(counter order)을 만들 때 사용하는 설정값들
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// 반대 주문 생성 여부
    pub enabled: bool,

    /// 봇 계정 ID 목록 (잔고 검사 생략 대상)
    /// Bot account ids
    pub bot_user_ids: Vec<u64>,

    /// 반대 주문을 내는 봇 계정
    /// Account that places counter orders
    ///
    /// 없으면 반대 주문 생성을 건너뜀
    pub counter_user_id: Option<u64>,

    /// 반대 주문 여유분 비율
    /// Buffer added on top of the uncovered quantity
    ///
    /// 예: 0.1 → 부족분의 110% 만큼 주문
    pub buffer_ratio: Decimal,

    /// 유동성 계산에 사용하는 오더북 깊이 (상위 N개 호가)
    pub orderbook_depth: usize,

    /// 바이낸스 선물 REST API URL
    /// Binance futures REST base URL
    pub binance_rest_url: String,

    /// 테스트 계정별 고정 레퍼런스 가격
    /// Per-test-account reference price overrides (user id → price)
    pub fake_prices: HashMap<u64, Decimal>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_user_ids: Vec::new(),
            counter_user_id: None,
            buffer_ratio: Decimal::new(1, 1), // 0.1
            orderbook_depth: 200,
            binance_rest_url: "https://fapi.binance.com".to_string(),
            fake_prices: HashMap::new(),
        }
    }
}

impl BotConfig {
    /// 환경변수에서 설정 로드
    /// Load configuration from environment variables
    ///
    /// 환경변수가 없으면 기본값 사용
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            enabled: env_or("BOT_ENABLED", defaults.enabled),
            bot_user_ids: env_opt("BOT_USER_IDS")
                .map(|s| parse_user_ids(&s))
                .unwrap_or_default(),
            counter_user_id: env_opt("BOT_COUNTER_USER_ID").and_then(|s| s.trim().parse().ok()),
            buffer_ratio: env_or("BOT_BUFFER_RATIO", defaults.buffer_ratio),
            orderbook_depth: env_or("BOT_ORDERBOOK_DEPTH", defaults.orderbook_depth),
            binance_rest_url: env_opt("BINANCE_REST_URL").unwrap_or(defaults.binance_rest_url),
            fake_prices: env_opt("BOT_FAKE_PRICES")
                .map(|s| parse_fake_prices(&s))
                .unwrap_or_default(),
        }
    }

    /// 사용자별 고정 가격 (테스트 계정만)
    pub fn fake_price_for(&self, user_id: u64) -> Option<Decimal> {
        self.fake_prices.get(&user_id).copied()
    }

    /// 봇 계정 ID 전체 (반대 주문 계정 포함)
    pub fn all_bot_user_ids(&self) -> Vec<u64> {
        let mut ids = self.bot_user_ids.clone();
        if let Some(id) = self.counter_user_id {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// "1,2, 3" → [1, 2, 3] (잘못된 항목은 무시)
fn parse_user_ids(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}

/// "7:101.5,8:99" → {7: 101.5, 8: 99}
fn parse_fake_prices(raw: &str) -> HashMap<u64, Decimal> {
    raw.split(',')
        .filter_map(|entry| {
            let (user_id, price) = entry.split_once(':')?;
            Some((user_id.trim().parse().ok()?, price.trim().parse().ok()?))
        })
        .collect()
}
