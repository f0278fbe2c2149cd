use async_trait::async_trait;

use crate::domains::order::models::{OrderLineage, RawOrderCommand};
use crate::shared::errors::IntakeError;

/// 명령 한 건의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// 저장 + 라우팅 완료
    Routed(OrderLineage),
    /// 거부됨 (ErrorQueue 에 에러 한 건 적재됨)
    Rejected,
}

/// 명령 처리기 인터페이스
/// Processes one consumed command
///
/// # 구현체
/// - `OrderIntakeService`: 일반 주문 토픽
/// - `UserMarketOrderService`: 사용자 시장가 주문 토픽 (봇 반대 주문 포함)
#[async_trait]
pub trait CommandProcessor: Send + Sync {
    /// 거부는 `Ok(Rejected)`, 인프라 장애만 `Err`
    async fn process(&self, command: RawOrderCommand) -> Result<ProcessOutcome, IntakeError>;
}
