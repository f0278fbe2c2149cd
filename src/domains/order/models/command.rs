use serde::{Deserialize, Serialize};

use super::CreateOrderRequest;

/// 종료(drain) 제어 명령으로 예약된 tmpOrderId
pub const STOP_SAVE_ORDERS_FROM_CLIENT: &str = "STOP_SAVE_ORDERS_FROM_CLIENT";

/// 토픽에서 소비하는 작업 단위
/// Unit of work consumed from the order topic
///
/// `tmp_order_id` 는 클라이언트가 만든 임시 ID (조회/표시용).
/// 중복 제거 키로 사용하지 않음.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrderCommand {
    #[serde(default)]
    pub create_order_dto: CreateOrderRequest,

    #[serde(default)]
    pub user_id: u64,

    #[serde(default)]
    pub tmp_order_id: Option<String>,
}

impl RawOrderCommand {
    pub fn new(user_id: u64, tmp_order_id: Option<String>, request: CreateOrderRequest) -> Self {
        Self {
            create_order_dto: request,
            user_id,
            tmp_order_id,
        }
    }

    /// 종료 제어 명령 생성
    pub fn shutdown_sentinel() -> Self {
        Self {
            tmp_order_id: Some(STOP_SAVE_ORDERS_FROM_CLIENT.to_string()),
            ..Default::default()
        }
    }

    /// 거래 주문이 아닌 종료 제어 명령인지
    pub fn is_shutdown_sentinel(&self) -> bool {
        self.tmp_order_id.as_deref() == Some(STOP_SAVE_ORDERS_FROM_CLIENT)
    }
}
