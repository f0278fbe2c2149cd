// =====================================================
// 저장소 trait
// =====================================================
// 역할: 관계형 저장소 접근을 trait 로 분리
//
// 구현체:
// - repositories::*Repository: PostgreSQL (sqlx)
// - InMemoryStore:              로컬 실행 / 테스트
// =====================================================

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domains::order::models::{Account, Instrument, MarginMode, OrderRecord, Position};

/// 미체결 주문 조회 키
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookup {
    /// 클라이언트 임시 ID
    TmpId(String),
    Id(u64),
}

/// 주문 저장소
/// Order store
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// 부모 + 자식 주문을 한 번에 저장
    /// Persist a whole lineage atomically (children first, then parent)
    async fn insert_lineage(&self, parent: &OrderRecord, children: &[OrderRecord]) -> Result<()>;

    /// 주문 삭제 (라우팅 실패 시 보상 처리용), 삭제된 행 수 반환
    async fn delete_orders(&self, ids: &[u64]) -> Result<u64>;

    /// 미체결 주문 조회 (status ∈ ACTIVE / PENDING / UNTRIGGERED)
    async fn find_open_order(&self, user_id: u64, lookup: &OrderLookup) -> Result<Option<OrderRecord>>;

    /// 마지막 주문 ID (ID 생성기 초기화용, 주문이 없으면 0)
    async fn max_order_id(&self) -> Result<u64>;
}

/// 계정 저장소
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, user_id: u64, asset: &str) -> Result<Option<Account>>;

    /// 사용 가능 잔고 = 잔고 - 미체결 주문에 묶인 비용
    async fn available_balance(&self, account: &Account) -> Result<Decimal>;
}

/// 상품 / 마진 모드 저장소
#[async_trait]
pub trait InstrumentStore: Send + Sync {
    async fn find_instrument(&self, symbol: &str) -> Result<Option<Instrument>>;

    async fn find_margin_mode(&self, user_id: u64, instrument_id: u64) -> Result<Option<MarginMode>>;
}

/// 포지션 저장소
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn find_position(&self, user_id: u64, symbol: &str) -> Result<Option<Position>>;
}
