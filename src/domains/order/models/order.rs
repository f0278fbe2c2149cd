// =====================================================
// 정규화된 주문 모델
// =====================================================
// 분류기 출력은 OrderKind 태그드 유니온.
// 각 variant 는 해당 주문 유형에 유효한 필드만 가짐
// (예: Market 은 price / isPostOnly 를 가질 수 없음).
//
// OrderRecord 는 저장소 행 + 매칭 엔진 전송 형식 (평탄화).
// =====================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    ContractType, MarginModeKind, OrderSide, OrderStatus, OrderTrigger, OrderType,
    StopCondition, TimeInForce, TpSlType,
};

/// 조건부 주문의 발동 조건
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTrigger {
    pub price: Decimal,
    pub trigger: OrderTrigger,
    pub condition: StopCondition,
}

/// 첨부된 TP 또는 SL 한쪽
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TpSlLeg {
    pub price: Decimal,
    pub trigger: OrderTrigger,
}

/// 주문에 첨부된 TP / SL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TpSlAttachment {
    pub take_profit: Option<TpSlLeg>,
    pub stop_loss: Option<TpSlLeg>,
}

impl TpSlAttachment {
    pub fn is_empty(&self) -> bool {
        self.take_profit.is_none() && self.stop_loss.is_none()
    }
}

/// 분류 결과 주문 유형
/// Classified order kind, one variant per terminal branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderKind {
    Limit {
        price: Decimal,
        is_hidden: bool,
        tp_sl: TpSlAttachment,
    },
    PostOnlyLimit {
        price: Decimal,
        is_hidden: bool,
        tp_sl: TpSlAttachment,
    },
    Market {
        tp_sl: TpSlAttachment,
    },
    StopLimit {
        price: Decimal,
        stop: StopTrigger,
        is_hidden: bool,
        tp_sl: TpSlAttachment,
    },
    StopMarket {
        stop: StopTrigger,
        tp_sl: TpSlAttachment,
    },
    TakeProfitLimit {
        price: Decimal,
        stop: StopTrigger,
    },
    StopLossLimit {
        price: Decimal,
        stop: StopTrigger,
    },
    TakeProfitMarket {
        stop: StopTrigger,
    },
    StopLossMarket {
        stop: StopTrigger,
    },
    TrailingStop {
        /// 콜백 비율 (%)
        callback_rate: Decimal,
        activation_price: Option<Decimal>,
        trigger: OrderTrigger,
    },
}

impl OrderKind {
    pub fn order_type(&self) -> OrderType {
        match self {
            Self::Limit { .. }
            | Self::PostOnlyLimit { .. }
            | Self::StopLimit { .. }
            | Self::TakeProfitLimit { .. }
            | Self::StopLossLimit { .. } => OrderType::Limit,
            Self::Market { .. }
            | Self::StopMarket { .. }
            | Self::TakeProfitMarket { .. }
            | Self::StopLossMarket { .. }
            | Self::TrailingStop { .. } => OrderType::Market,
        }
    }

    pub fn tp_sl_type(&self) -> Option<TpSlType> {
        match self {
            Self::Limit { .. } | Self::PostOnlyLimit { .. } | Self::Market { .. } => None,
            Self::StopLimit { .. } => Some(TpSlType::StopLimit),
            Self::StopMarket { .. } => Some(TpSlType::StopMarket),
            Self::TakeProfitLimit { .. } => Some(TpSlType::TakeProfitLimit),
            Self::StopLossLimit { .. } => Some(TpSlType::StopLossLimit),
            Self::TakeProfitMarket { .. } => Some(TpSlType::TakeProfitMarket),
            Self::StopLossMarket { .. } => Some(TpSlType::StopLossMarket),
            Self::TrailingStop { .. } => Some(TpSlType::TrailingStop),
        }
    }

    /// 지정가 (가격을 가진 유형만)
    pub fn price(&self) -> Option<Decimal> {
        match self {
            Self::Limit { price, .. }
            | Self::PostOnlyLimit { price, .. }
            | Self::StopLimit { price, .. }
            | Self::TakeProfitLimit { price, .. }
            | Self::StopLossLimit { price, .. } => Some(*price),
            _ => None,
        }
    }

    pub fn stop(&self) -> Option<&StopTrigger> {
        match self {
            Self::StopLimit { stop, .. }
            | Self::StopMarket { stop, .. }
            | Self::TakeProfitLimit { stop, .. }
            | Self::StopLossLimit { stop, .. }
            | Self::TakeProfitMarket { stop }
            | Self::StopLossMarket { stop } => Some(stop),
            _ => None,
        }
    }

    /// 첨부 TP/SL (허용되는 유형만)
    pub fn tp_sl(&self) -> Option<&TpSlAttachment> {
        match self {
            Self::Limit { tp_sl, .. }
            | Self::PostOnlyLimit { tp_sl, .. }
            | Self::Market { tp_sl }
            | Self::StopLimit { tp_sl, .. }
            | Self::StopMarket { tp_sl, .. } => Some(tp_sl),
            _ => None,
        }
    }

    pub fn is_post_only(&self) -> bool {
        matches!(self, Self::PostOnlyLimit { .. })
    }

    pub fn is_hidden(&self) -> bool {
        match self {
            Self::Limit { is_hidden, .. }
            | Self::PostOnlyLimit { is_hidden, .. }
            | Self::StopLimit { is_hidden, .. } => *is_hidden,
            _ => false,
        }
    }
}

/// 주문 비용 (봇 주문은 계산하지 않음)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderCost {
    pub original_cost: Option<Decimal>,
    pub original_order_margin: Option<Decimal>,
}

/// 분류/검증이 끝난 주문
/// Normalized order produced by the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOrder {
    pub user_id: u64,
    pub account_id: u64,
    pub user_email: String,
    pub symbol: String,
    pub asset: String,
    pub instrument_id: u64,
    pub contract_type: ContractType,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub remaining: Decimal,
    pub leverage: Decimal,
    pub margin_mode: MarginModeKind,
    pub status: OrderStatus,
    pub time_in_force: TimeInForce,
    pub tmp_id: Option<String>,
    pub is_reduce_only: bool,
    pub cost: OrderCost,
    pub kind: OrderKind,
}

/// 저장소 행 / 매칭 엔진 전송 형식
/// Flat order row, also the `data` of a PLACE_ORDER command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: u64,
    pub user_id: u64,
    pub account_id: u64,
    pub user_email: String,
    pub symbol: String,
    pub asset: String,
    pub instrument_id: u64,
    pub contract_type: ContractType,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub remaining: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub leverage: Decimal,
    pub margin_mode: MarginModeKind,
    pub status: OrderStatus,
    pub time_in_force: TimeInForce,

    #[serde(rename = "tpSLType", skip_serializing_if = "Option::is_none")]
    pub tp_sl_type: Option<TpSlType>,
    #[serde(rename = "tpSLPrice", skip_serializing_if = "Option::is_none")]
    pub tp_sl_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<OrderTrigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_condition: Option<StopCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_trigger: Option<OrderTrigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_trigger: Option<OrderTrigger>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_post_only: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_hidden: bool,
    pub is_reduce_only: bool,
    pub is_tp_sl_order: bool,

    // 계보 (lineage) 상호 참조
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_order_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_order_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_order_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_order_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmp_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_order_margin: Option<Decimal>,

    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// 정규화된 주문 → 저장 행 (ID 는 사전 할당된 값)
    pub fn from_normalized(id: u64, order: &NormalizedOrder, created_at: DateTime<Utc>) -> Self {
        let kind = &order.kind;
        let stop = kind.stop();
        let tp_sl = kind.tp_sl().copied().unwrap_or_default();

        let (callback_rate, activation_price, trailing_trigger) = match kind {
            OrderKind::TrailingStop {
                callback_rate,
                activation_price,
                trigger,
            } => (Some(*callback_rate), *activation_price, Some(*trigger)),
            _ => (None, None, None),
        };

        Self {
            id,
            user_id: order.user_id,
            account_id: order.account_id,
            user_email: order.user_email.clone(),
            symbol: order.symbol.clone(),
            asset: order.asset.clone(),
            instrument_id: order.instrument_id,
            contract_type: order.contract_type,
            side: order.side,
            order_type: kind.order_type(),
            quantity: order.quantity,
            remaining: order.remaining,
            price: kind.price(),
            leverage: order.leverage,
            margin_mode: order.margin_mode,
            status: order.status,
            time_in_force: order.time_in_force,
            tp_sl_type: kind.tp_sl_type(),
            tp_sl_price: stop.map(|s| s.price),
            trigger: stop.map(|s| s.trigger).or(trailing_trigger),
            stop_condition: stop.map(|s| s.condition),
            callback_rate,
            activation_price,
            take_profit: tp_sl.take_profit.map(|l| l.price),
            take_profit_trigger: tp_sl.take_profit.map(|l| l.trigger),
            stop_loss: tp_sl.stop_loss.map(|l| l.price),
            stop_loss_trigger: tp_sl.stop_loss.map(|l| l.trigger),
            is_post_only: kind.is_post_only(),
            is_hidden: kind.is_hidden(),
            is_reduce_only: order.is_reduce_only,
            is_tp_sl_order: false,
            parent_order_id: None,
            linked_order_id: None,
            take_profit_order_id: None,
            stop_loss_order_id: None,
            tmp_id: order.tmp_id.clone(),
            original_cost: order.cost.original_cost,
            original_order_margin: order.cost.original_order_margin,
            created_at,
        }
    }
}

/// 부모 주문 + 파생 TP/SL 자식 주문
/// A primary order and its derived children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineage {
    pub parent: OrderRecord,
    pub children: Vec<OrderRecord>,
}

impl OrderLineage {
    /// 계보 전체 주문 ID (부모 먼저)
    pub fn order_ids(&self) -> Vec<u64> {
        std::iter::once(self.parent.id)
            .chain(self.children.iter().map(|c| c.id))
            .collect()
    }

    pub fn take_profit_child(&self) -> Option<&OrderRecord> {
        self.children
            .iter()
            .find(|c| Some(c.id) == self.parent.take_profit_order_id)
    }

    pub fn stop_loss_child(&self) -> Option<&OrderRecord> {
        self.children
            .iter()
            .find(|c| Some(c.id) == self.parent.stop_loss_order_id)
    }
}
