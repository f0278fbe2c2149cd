use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 주문 거부 사유
/// Business rejection reasons
///
/// 거부는 예외로 던지지 않음. `OrderError` 로 변환되어 ErrorQueue 에 쌓이고
/// 비동기로 사용자에게 알림됨.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// 수량 누락 / 파싱 불가 / 0 이하
    #[error("Invalid order quantity: {0}")]
    InvalidQuantity(String),

    #[error("Account not found for asset {asset}")]
    AccountNotFound { asset: String },

    #[error("Instrument not found: {symbol}")]
    InstrumentNotFound { symbol: String },

    #[error("Mark price not found: {symbol}")]
    MarkPriceNotFound { symbol: String },

    #[error("Not enough balance: available={available}, cost={cost}")]
    NotEnoughBalance { available: Decimal, cost: Decimal },

    #[error("Order quantity is below minimum {min}")]
    MinimumQuantity { min: Decimal },

    #[error("Order quantity exceeds maximum {max}")]
    MaximumQuantity { max: Decimal },

    #[error("Order quantity has more than {precision} decimal places")]
    QuantityPrecision { precision: u32 },

    #[error("Order price has more than {precision} decimal places")]
    PricePrecision { precision: u32 },

    #[error("Order price out of range: {0}")]
    PriceOutOfRange(String),

    #[error("Order price exceeds maximum {max}")]
    MaxPrice { max: Decimal },

    #[error("Take profit trigger or price is not valid")]
    TakeProfitNotValid,

    #[error("Stop loss trigger or price is not valid")]
    StopLossNotValid,

    #[error("Trailing stop is not valid: {0}")]
    TrailingStop(String),

    #[error("Post only order is not valid: {0}")]
    PostOnly(String),

    #[error("Stop price is missing or not valid")]
    StopPrice,

    #[error("Trigger is missing or not valid")]
    Trigger,

    #[error("Stop condition is missing or not valid")]
    StopCondition,

    #[error("Limit price is missing or not valid")]
    LimitPrice,

    #[error("Order side is missing or not valid")]
    Side,

    #[error("Unknown order type combination")]
    Unknown,
}

impl Rejection {
    /// 클라이언트에 전달되는 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuantity(_) => "ORDER_QUANTITY_VALIDATION_FAIL",
            Self::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            Self::InstrumentNotFound { .. } => "INSTRUMENT_NOT_FOUND",
            Self::MarkPriceNotFound { .. } => "MARK_PRICE_NOT_FOUND",
            Self::NotEnoughBalance { .. } => "NOT_ENOUGH_BALANCE",
            Self::MinimumQuantity { .. } => "ORDER_MINIMUM_QUANTITY_VALIDATION_FAIL",
            Self::MaximumQuantity { .. } => "ORDER_MAXIMUM_QUANTITY_VALIDATION_FAIL",
            Self::QuantityPrecision { .. } => "ORDER_QUANTITY_PRECISION_VALIDATION_FAIL",
            Self::PricePrecision { .. } => "ORDER_PRICE_PRECISION_VALIDATION_FAIL",
            Self::PriceOutOfRange(_) => "ORDER_PRICE_VALIDATION_FAIL",
            Self::MaxPrice { .. } => "ORDER_MAX_PRICE_VALIDATION_FAIL",
            Self::TakeProfitNotValid => "TAKE_PROFIT_TRIGGER_OR_PRICE_NOT_VALID",
            Self::StopLossNotValid => "STOP_LOSS_TRIGGER_OR_PRICE_NOT_VALID",
            Self::TrailingStop(_) => "ORDER_TRAILING_STOP_VALIDATION_FAIL",
            Self::PostOnly(_) => "ORDER_POST_ONLY_VALIDATION_FAIL",
            Self::StopPrice => "ORDER_STOP_PRICE_VALIDATION_FAIL",
            Self::Trigger => "ORDER_TRIGGER_VALIDATION_FAIL",
            Self::StopCondition => "ORDER_STOP_CONDITION_VALIDATION_FAIL",
            Self::LimitPrice => "ORDER_LIMIT_PRICE_VALIDATION_FAIL",
            Self::Side => "ORDER_SIDE_VALIDATION_FAIL",
            Self::Unknown => "ORDER_UNKNOWN_VALIDATION_FAIL",
        }
    }
}

/// 사용자 알림용 에러 레코드
/// User-facing error record delivered through the notification side channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderError {
    pub code: String,
    pub message: String,
    pub user_id: u64,
}

impl OrderError {
    pub fn from_rejection(user_id: u64, rejection: &Rejection) -> Self {
        Self {
            code: rejection.code().to_string(),
            message: rejection.to_string(),
            user_id,
        }
    }
}
