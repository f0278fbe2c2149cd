use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 클라이언트 주문 요청 (createOrderDto)
/// Client order request as it arrives on the topic
///
/// 모든 값은 검증 전 원본 그대로 보관함:
/// - 수량/가격: 문자열 또는 숫자 → 문자열로 보관 ("50%", "1e-7" 허용)
/// - side/type/tpSLType 등: 대문자 문자열 (분류기에서 파싱)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub side: Option<String>,

    #[serde(rename = "type", default)]
    pub order_type: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub quantity: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub price: Option<String>,

    #[serde(default)]
    pub symbol: Option<String>,

    /// 증거금 자산 (없으면 상품의 정산 자산)
    #[serde(default)]
    pub asset: Option<String>,

    #[serde(rename = "tpSLType", default)]
    pub tp_sl_type: Option<String>,

    /// 조건부 주문의 발동 가격
    #[serde(rename = "tpSLPrice", default, deserialize_with = "string_or_number")]
    pub tp_sl_price: Option<String>,

    #[serde(default)]
    pub trigger: Option<String>,

    #[serde(default)]
    pub stop_condition: Option<String>,

    /// 트레일링 스탑 콜백 비율 (%)
    #[serde(default, deserialize_with = "string_or_number")]
    pub callback_rate: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub activation_price: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub take_profit: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub stop_loss: Option<String>,

    #[serde(default)]
    pub take_profit_trigger: Option<String>,

    #[serde(default)]
    pub stop_loss_trigger: Option<String>,

    #[serde(default)]
    pub is_post_only: Option<bool>,

    #[serde(default)]
    pub is_hidden: Option<bool>,

    #[serde(default)]
    pub is_reduce_only: Option<bool>,

    #[serde(default)]
    pub time_in_force: Option<String>,
}

impl CreateOrderRequest {
    /// 빈 문자열 필드 제거
    /// Strip empty string fields so they read as absent
    pub fn strip_empty(&mut self) {
        let fields = [
            &mut self.side,
            &mut self.order_type,
            &mut self.quantity,
            &mut self.price,
            &mut self.symbol,
            &mut self.asset,
            &mut self.tp_sl_type,
            &mut self.tp_sl_price,
            &mut self.trigger,
            &mut self.stop_condition,
            &mut self.callback_rate,
            &mut self.activation_price,
            &mut self.take_profit,
            &mut self.stop_loss,
            &mut self.take_profit_trigger,
            &mut self.stop_loss_trigger,
            &mut self.time_in_force,
        ];

        for field in fields {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
    }
}

/// JSON 문자열 / 숫자를 모두 문자열로 받음
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected decimal string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_numbers_and_strips_empty() {
        let mut req: CreateOrderRequest = serde_json::from_str(
            r#"{"side":"BUY","type":"LIMIT","quantity":0.5,"price":"","tpSLType":"STOP_LIMIT","tpSLPrice":"100"}"#,
        )
        .unwrap();
        assert_eq!(req.quantity.as_deref(), Some("0.5"));
        assert_eq!(req.price.as_deref(), Some(""));

        req.strip_empty();
        assert_eq!(req.price, None);
        assert_eq!(req.tp_sl_price.as_deref(), Some("100"));
    }
}
