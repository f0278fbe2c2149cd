// =====================================================
// 주문 저장 / 계보 연결
// Order persistence and lineage linking
// =====================================================
// 부모 주문에 TP/SL 이 첨부되어 있으면 자식 주문을 파생함.
//
// 처리 순서 (한 주문 단위):
// 1. ID 사전 할당 (부모, TP 자식, SL 자식)
//    → 저장 전에 모든 상호 참조가 확정됨
// 2. 자식 → 부모 순서로 한 트랜잭션에 저장
// 3. 부모 라우팅 (실패 시 계보 전체 삭제 = 보상 처리)
// 4. 자식 라우팅 (parentOrderId 포함)
//
// 자식 주문 규칙:
// - 반대 방향, MARKET, IOC, hidden, reduce-only
// - TP → TAKE_PROFIT_MARKET, SL → STOP_MARKET
// - 발동 조건: BUY 부모 (TP: GT, SL: LT), SELL 부모 (TP: LT, SL: GT)
// =====================================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::router::{EngineCommand, MatchingEngineRouter};
use crate::domains::order::models::{
    NormalizedOrder, OrderKind, OrderLineage, OrderRecord, OrderSide, StopCondition,
    StopTrigger, TimeInForce, TpSlAttachment, TpSlLeg,
};
use crate::shared::database::OrderStore;
use crate::shared::errors::IntakeError;
use crate::shared::utils::IdGenerator;

/// 자식 주문 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildRole {
    TakeProfit,
    StopLoss,
}

impl ChildRole {
    /// 부모 방향에 따른 발동 조건
    fn condition(self, parent_side: OrderSide) -> StopCondition {
        match (self, parent_side) {
            (Self::TakeProfit, OrderSide::Buy) | (Self::StopLoss, OrderSide::Sell) => StopCondition::Gt,
            (Self::TakeProfit, OrderSide::Sell) | (Self::StopLoss, OrderSide::Buy) => StopCondition::Lt,
        }
    }
}

/// 주문 저장 + 라우팅
pub struct OrderPersistence {
    store: Arc<dyn OrderStore>,
    router: Arc<dyn MatchingEngineRouter>,
    ids: Arc<IdGenerator>,
}

impl OrderPersistence {
    pub fn new(
        store: Arc<dyn OrderStore>,
        router: Arc<dyn MatchingEngineRouter>,
        ids: Arc<IdGenerator>,
    ) -> Self {
        Self { store, router, ids }
    }

    /// 계보 구성 (ID 할당 + 상호 참조 연결, 아직 저장 안 함)
    /// Build the lineage with every cross-reference already set
    pub fn build_lineage(&self, order: &NormalizedOrder) -> OrderLineage {
        let created_at = Utc::now();
        let parent_id = self.ids.next();
        let tp_sl = order.kind.tp_sl().copied().unwrap_or_default();

        let tp_id = tp_sl.take_profit.map(|_| self.ids.next());
        let sl_id = tp_sl.stop_loss.map(|_| self.ids.next());

        let mut parent = OrderRecord::from_normalized(parent_id, order, created_at);
        parent.take_profit_order_id = tp_id;
        parent.stop_loss_order_id = sl_id;

        let mut children = Vec::with_capacity(2);
        if let (Some(leg), Some(id)) = (tp_sl.take_profit, tp_id) {
            children.push(derive_child(order, leg, ChildRole::TakeProfit, id, parent_id, sl_id, created_at));
        }
        if let (Some(leg), Some(id)) = (tp_sl.stop_loss, sl_id) {
            children.push(derive_child(order, leg, ChildRole::StopLoss, id, parent_id, tp_id, created_at));
        }

        OrderLineage { parent, children }
    }

    /// 계보 저장 후 라우팅
    /// Persist the whole lineage, then route parent and children
    ///
    /// # Returns
    /// * `Err(IntakeError::Persist)` - 저장 실패 (아무것도 라우팅되지 않음)
    /// * `Err(IntakeError::Route)` - 라우팅 실패
    pub async fn persist_and_route(&self, lineage: &OrderLineage) -> Result<(), IntakeError> {
        let parent = &lineage.parent;

        // ━━━━━━━━━━━━━━━━━━━━ 1. 저장 (자식 → 부모) ━━━━━━━━━━━━━━━━━━━━
        self.store
            .insert_lineage(parent, &lineage.children)
            .await
            .map_err(IntakeError::Persist)?;

        // ━━━━━━━━━━━━━━━━━━━━ 2. 부모 라우팅 ━━━━━━━━━━━━━━━━━━━━
        if let Err(e) = self
            .router
            .route_command(&parent.symbol, EngineCommand::place_order(parent.clone()))
            .await
        {
            // 라우팅되지 않은 계보는 남기지 않음
            let ids = lineage.order_ids();
            match self.store.delete_orders(&ids).await {
                Ok(deleted) => warn!(
                    order_id = parent.id,
                    deleted,
                    "[Order Persistence] parent routing failed, lineage removed"
                ),
                Err(cleanup) => error!(
                    order_id = parent.id,
                    "[Order Persistence] failed to remove unrouted lineage: {:#}",
                    cleanup
                ),
            }
            return Err(IntakeError::Route {
                symbol: parent.symbol.clone(),
                order_id: parent.id,
                source: e,
            });
        }

        // ━━━━━━━━━━━━━━━━━━━━ 3. 자식 라우팅 ━━━━━━━━━━━━━━━━━━━━
        for child in &lineage.children {
            if let Err(e) = self
                .router
                .route_command(&child.symbol, EngineCommand::place_order(child.clone()))
                .await
            {
                error!(
                    order_id = child.id,
                    parent_order_id = parent.id,
                    "[Order Persistence] child routing failed after parent was routed: {:#}",
                    e
                );
                return Err(IntakeError::Route {
                    symbol: child.symbol.clone(),
                    order_id: child.id,
                    source: e,
                });
            }
        }

        info!(
            order_id = parent.id,
            user_id = parent.user_id,
            symbol = %parent.symbol,
            children = lineage.children.len(),
            "[Order Persistence] order routed"
        );
        Ok(())
    }

    /// build_lineage + persist_and_route
    pub async fn save(&self, order: &NormalizedOrder) -> Result<OrderLineage, IntakeError> {
        let lineage = self.build_lineage(order);
        self.persist_and_route(&lineage).await?;
        Ok(lineage)
    }
}

/// 부모 주문에서 TP/SL 자식 주문 파생
fn derive_child(
    parent: &NormalizedOrder,
    leg: TpSlLeg,
    role: ChildRole,
    id: u64,
    parent_id: u64,
    sibling_id: Option<u64>,
    created_at: chrono::DateTime<Utc>,
) -> OrderRecord {
    let stop = StopTrigger {
        price: leg.price,
        trigger: leg.trigger,
        condition: role.condition(parent.side),
    };
    let kind = match role {
        ChildRole::TakeProfit => OrderKind::TakeProfitMarket { stop },
        ChildRole::StopLoss => OrderKind::StopMarket {
            stop,
            tp_sl: TpSlAttachment::default(),
        },
    };

    let child = NormalizedOrder {
        side: parent.side.opposite(),
        time_in_force: TimeInForce::Ioc,
        is_reduce_only: true,
        tmp_id: None,
        cost: Default::default(),
        kind,
        ..parent.clone()
    };

    let mut record = OrderRecord::from_normalized(id, &child, created_at);
    record.is_hidden = true;
    record.is_tp_sl_order = true;
    record.parent_order_id = Some(parent_id);
    record.linked_order_id = sibling_id;
    record
}
