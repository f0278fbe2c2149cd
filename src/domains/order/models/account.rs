use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderSide;

/// 거래 계정 (사용자 + 증거금 자산 단위)
/// Trading account, one per (user, asset)
///
/// 캐시에는 JSON 으로 저장됨 (`accounts:userId_{id}:asset_{asset}`, TTL 60초)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: u64,
    pub user_id: u64,
    pub user_email: String,
    pub asset: String,
    pub balance: Decimal,
}

/// 현재 포지션
/// Open position for a user on one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub user_id: u64,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub entry_price: Decimal,
}
