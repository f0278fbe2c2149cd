use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ContractType, MarginModeKind};

/// 거래 상품
/// Tradable instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub id: u64,
    pub symbol: String,
    pub contract_type: ContractType,

    /// 증거금/정산 자산 (예: "USDT")
    pub quote_asset: String,

    /// 수량 소수점 자릿수
    pub max_figures_for_size: u32,

    /// 가격 소수점 자릿수
    pub max_figures_for_price: u32,

    pub max_price: Decimal,

    pub trading_rules: TradingRules,
}

/// 상품별 거래 규칙
/// Per-instrument trading rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingRules {
    pub max_quantity_limit_order: Decimal,
    pub max_quantity_market_order: Decimal,

    /// 매수 지정가 상한 = 기준가 × cap_ratio
    pub cap_ratio: Decimal,

    /// 매도 지정가 하한 = 기준가 × floor_ratio
    pub floor_ratio: Decimal,
}

/// 사용자별 상품 마진 설정
/// Per-user margin mode for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginMode {
    pub user_id: u64,
    pub instrument_id: u64,
    pub margin_mode: MarginModeKind,
    pub leverage: Decimal,
}

impl MarginMode {
    /// 설정이 없을 때의 기본값 (CROSS)
    pub fn default_cross(user_id: u64, instrument_id: u64, leverage: Decimal) -> Self {
        Self {
            user_id,
            instrument_id,
            margin_mode: MarginModeKind::Cross,
            leverage,
        }
    }
}
