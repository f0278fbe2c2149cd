use serde::{Deserialize, Serialize};

/// 문자열 ↔ enum 변환 구현
/// (DB 컬럼 / 요청 필드는 모두 대문자 문자열)
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// 대문자 문자열 파싱 (알 수 없는 값이면 None)
            pub fn parse(value: &str) -> Option<Self> {
                match value.trim() {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// 주문 방향
/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

wire_enum!(OrderSide { Buy => "BUY", Sell => "SELL" });

impl OrderSide {
    /// 반대 방향 (TP/SL 자식 주문, 봇 반대 주문)
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// 주문 유형
/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
}

wire_enum!(OrderType { Limit => "LIMIT", Market => "MARKET" });

/// 조건부 주문 유형 (tpSLType)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TpSlType {
    StopLimit,
    StopMarket,
    TrailingStop,
    TakeProfitLimit,
    StopLossLimit,
    TakeProfitMarket,
    StopLossMarket,
}

wire_enum!(TpSlType {
    StopLimit => "STOP_LIMIT",
    StopMarket => "STOP_MARKET",
    TrailingStop => "TRAILING_STOP",
    TakeProfitLimit => "TAKE_PROFIT_LIMIT",
    StopLossLimit => "STOP_LOSS_LIMIT",
    TakeProfitMarket => "TAKE_PROFIT_MARKET",
    StopLossMarket => "STOP_LOSS_MARKET",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Good-Till-Cancel
    Gtc,
    /// Immediate-Or-Cancel
    Ioc,
    /// Fill-Or-Kill
    Fok,
}

wire_enum!(TimeInForce { Gtc => "GTC", Ioc => "IOC", Fok => "FOK" });

/// 주문 상태
/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Active,
    Untriggered,
    Filled,
    Canceled,
}

wire_enum!(OrderStatus {
    Pending => "PENDING",
    Active => "ACTIVE",
    Untriggered => "UNTRIGGERED",
    Filled => "FILLED",
    Canceled => "CANCELED",
});

impl OrderStatus {
    /// 아직 매칭 엔진에 살아있는 상태
    pub const OPEN: [OrderStatus; 3] = [Self::Active, Self::Pending, Self::Untriggered];

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }
}

/// 조건 판단에 사용할 가격 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderTrigger {
    /// 최근 체결가
    Last,
    /// 마크(오라클) 가격
    Oracle,
}

wire_enum!(OrderTrigger { Last => "LAST", Oracle => "ORACLE" });

/// 발동 조건 (트리거 가격 대비 크거나 / 작거나)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopCondition {
    Gt,
    Lt,
}

wire_enum!(StopCondition { Gt => "GT", Lt => "LT" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractType {
    UsdM,
    CoinM,
}

wire_enum!(ContractType { UsdM => "USD_M", CoinM => "COIN_M" });

/// 마진 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginModeKind {
    Cross,
    Isolate,
}

wire_enum!(MarginModeKind { Cross => "CROSS", Isolate => "ISOLATE" });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_serde() {
        assert_eq!(serde_json::to_string(&ContractType::UsdM).unwrap(), "\"USD_M\"");
        assert_eq!(
            serde_json::to_string(&TpSlType::TakeProfitMarket).unwrap(),
            "\"TAKE_PROFIT_MARKET\""
        );
        assert_eq!(TpSlType::parse("STOP_LOSS_LIMIT"), Some(TpSlType::StopLossLimit));
        assert_eq!(OrderSide::parse("buy"), None);
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
    }
}
