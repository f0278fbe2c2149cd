use thiserror::Error;

/// 주문 접수 파이프라인 인프라 에러
/// Order intake infrastructure errors
///
/// 비즈니스 거부(잔고 부족, 정밀도 초과 등)는 여기에 포함되지 않음.
/// 그런 경우는 `Rejection` 으로 표현되어 ErrorQueue 로 전달됨.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// 토픽 메시지 디코딩 실패
    /// Topic payload could not be decoded
    #[error("Failed to decode command at offset {offset}: {reason}")]
    Decode { offset: u64, reason: String },

    /// 계정/상품/마진 모드 조회 중 저장소 또는 캐시 에러
    /// Store or cache failure while resolving order context
    #[error("Failed to resolve order context: {0}")]
    Context(#[source] anyhow::Error),

    /// 주문 계보(부모 + 자식) 저장 실패
    /// Failed to persist an order lineage
    #[error("Failed to persist order lineage: {0}")]
    Persist(#[source] anyhow::Error),

    /// 매칭 엔진 라우팅 실패
    /// Failed to route an order to its matching engine
    #[error("Failed to route order {order_id} to {symbol}: {source}")]
    Route {
        symbol: String,
        order_id: u64,
        #[source]
        source: anyhow::Error,
    },
}
