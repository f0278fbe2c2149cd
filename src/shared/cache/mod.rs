// =====================================================
// Cache 추상화
// =====================================================
// 역할: 저지연 Key-Value 캐시 (Redis) 접근을 trait 로 분리
//
// 구현체:
// - RedisCache:  운영 환경 (REDIS_URL 설정 시)
// - MemoryCache: 로컬 실행 / 테스트
//
// 키 형식은 다른 서비스(가격 피드, 봇)와 공유되므로 바이트 단위로 동일해야 함
// =====================================================

pub mod memory_cache;
pub mod redis_cache;

pub use memory_cache::*;
pub use redis_cache::*;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-Value 캐시 trait
/// Key-value cache abstraction
#[async_trait]
pub trait Cache: Send + Sync {
    /// 값 조회 (없거나 만료되면 None)
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 값 저장
    /// `ttl` 이 None 이면 만료 없음
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// 값 삭제
    async fn del(&self, key: &str) -> Result<()>;
}

/// 캐시 키 생성 함수 모음
/// Cache key builders
pub mod keys {
    /// 마크 가격 키 접두사 (`oracle_price_BTCUSDT`)
    pub const ORACLE_PRICE_PREFIX: &str = "oracle_price_";

    /// 최근 체결가 키 접두사 (`last_price_BTCUSDT`)
    pub const LAST_PRICE_PREFIX: &str = "last_price_";

    /// 봇 주문 생성 억제 플래그 접두사
    pub const BOT_STOP_CREATE_ORDER: &str = "bot_stop_create_order";

    pub fn account(user_id: u64, asset: &str) -> String {
        format!("accounts:userId_{}:asset_{}", user_id, asset)
    }

    pub fn instrument(symbol: &str) -> String {
        format!("instruments:{}", symbol)
    }

    pub fn margin_mode(user_id: u64, instrument_id: u64) -> String {
        format!("margin_mode:userId_{}:instrumentId_{}", user_id, instrument_id)
    }

    pub fn oracle_price(symbol: &str) -> String {
        format!("{}{}", ORACLE_PRICE_PREFIX, symbol)
    }

    pub fn last_price(symbol: &str) -> String {
        format!("{}{}", LAST_PRICE_PREFIX, symbol)
    }

    pub fn bot_stop_create_order(bot_user_id: u64) -> String {
        format!("{}:botUserId_{}", BOT_STOP_CREATE_ORDER, bot_user_id)
    }

    /// 오더북 스냅샷 키 (매칭 엔진이 갱신)
    pub fn orderbook(symbol: &str) -> String {
        format!("orderbook:{}", symbol)
    }

}
