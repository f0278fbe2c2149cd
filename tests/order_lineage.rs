// =====================================================
// 주문 계보 (부모 + TP/SL 자식) 저장 / 라우팅 통합 테스트
// =====================================================

mod common;
use common::*;

use serde_json::{Value, json};

use order_intake::domains::intake::{CommandProcessor, ProcessOutcome};
use order_intake::domains::order::models::{
    OrderLineage, OrderSide, OrderStatus, OrderTrigger, OrderType, StopCondition, TimeInForce,
    TpSlType,
};
use order_intake::shared::database::{OrderLookup, OrderStore};
use order_intake::shared::errors::IntakeError;

fn limit_with_tp_sl(side: &str, take_profit: &str, stop_loss: &str) -> Value {
    json!({
        "side": side, "type": "LIMIT", "quantity": "2", "price": "100", "symbol": SYMBOL,
        "takeProfit": take_profit, "takeProfitTrigger": "LAST",
        "stopLoss": stop_loss, "stopLossTrigger": "ORACLE"
    })
}

async fn process_routed(h: &Harness, dto: Value) -> OrderLineage {
    match h.process(command(USER_ID, dto)).await {
        ProcessOutcome::Routed(lineage) => lineage,
        ProcessOutcome::Rejected => panic!("rejected: {:?}", h.error_codes()),
    }
}

/// 테스트: 매수 부모 → TP/SL 자식 파생
#[tokio::test]
async fn test_buy_parent_derives_take_profit_and_stop_loss_children() {
    let h = Harness::new().await;
    let lineage = process_routed(&h, limit_with_tp_sl("BUY", "110", "90")).await;

    let parent = &lineage.parent;
    let tp = lineage.take_profit_child().expect("take profit child");
    let sl = lineage.stop_loss_child().expect("stop loss child");

    // ID: 부모 → TP → SL 순서로 사전 할당
    assert_eq!((parent.id, tp.id, sl.id), (1, 2, 3));
    assert_eq!(parent.take_profit, Some(d("110")));
    assert_eq!(parent.stop_loss, Some(d("90")));

    for child in [tp, sl] {
        assert_eq!(child.side, OrderSide::Sell);
        assert_eq!(child.order_type, OrderType::Market);
        assert_eq!(child.time_in_force, TimeInForce::Ioc);
        assert_eq!(child.quantity, d("2"));
        assert_eq!(child.status, OrderStatus::Pending);
        assert!(child.is_reduce_only);
        assert!(child.is_hidden);
        assert!(child.is_tp_sl_order);
        assert_eq!(child.parent_order_id, Some(parent.id));
        assert_eq!(child.price, None);
        assert_eq!(child.original_cost, None);
        assert_eq!(child.tmp_id, None);
    }

    assert_eq!(tp.tp_sl_type, Some(TpSlType::TakeProfitMarket));
    assert_eq!(tp.tp_sl_price, Some(d("110")));
    assert_eq!(tp.trigger, Some(OrderTrigger::Last));
    assert_eq!(tp.stop_condition, Some(StopCondition::Gt));
    assert_eq!(tp.linked_order_id, Some(sl.id));

    assert_eq!(sl.tp_sl_type, Some(TpSlType::StopMarket));
    assert_eq!(sl.tp_sl_price, Some(d("90")));
    assert_eq!(sl.trigger, Some(OrderTrigger::Oracle));
    assert_eq!(sl.stop_condition, Some(StopCondition::Lt));
    assert_eq!(sl.linked_order_id, Some(tp.id));

    // 저장된 내용 == 라우팅된 내용, 부모 먼저 라우팅
    assert_eq!(h.store.orders().len(), 3);
    assert_eq!(h.store.order(tp.id).as_ref(), Some(tp));
    assert_eq!(h.router.routed_ids(), vec![1, 2, 3]);
    for (symbol, command) in h.router.routed() {
        assert_eq!(symbol, SYMBOL);
        assert_eq!(command.code, "PLACE_ORDER");
    }
}

/// 테스트: 매도 부모 → 발동 조건 반대
#[tokio::test]
async fn test_sell_parent_reverses_conditions() {
    let h = Harness::new().await;
    let lineage = process_routed(&h, limit_with_tp_sl("SELL", "90", "110")).await;

    let tp = lineage.take_profit_child().expect("take profit child");
    let sl = lineage.stop_loss_child().expect("stop loss child");
    assert_eq!(tp.side, OrderSide::Buy);
    assert_eq!(tp.stop_condition, Some(StopCondition::Lt));
    assert_eq!(sl.stop_condition, Some(StopCondition::Gt));
}

/// 테스트: 시장가 + SL 만 첨부 (기준가 = 최근 체결가)
#[tokio::test]
async fn test_market_parent_with_stop_loss_only() {
    let h = Harness::new().await;
    h.set_prices("100", "102").await;

    let lineage = process_routed(
        &h,
        json!({
            "side": "BUY", "type": "MARKET", "quantity": "1", "symbol": SYMBOL,
            "stopLoss": "101", "stopLossTrigger": "LAST"
        }),
    )
    .await;

    assert_eq!(lineage.children.len(), 1);
    let sl = lineage.stop_loss_child().expect("stop loss child");
    assert_eq!(sl.linked_order_id, None);
    assert_eq!(lineage.parent.take_profit_order_id, None);
    assert_eq!(lineage.parent.stop_loss_order_id, Some(sl.id));
}

/// 테스트: 부모 라우팅 실패 → 계보 전체 삭제
#[tokio::test]
async fn test_parent_routing_failure_removes_lineage() {
    let h = Harness::new().await;
    h.router.fail_on(1);

    let err = h
        .service
        .process(command(USER_ID, limit_with_tp_sl("BUY", "110", "90")))
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::Route { order_id: 1, .. }));
    assert!(h.store.orders().is_empty());
    assert!(h.router.routed().is_empty());
}

/// 테스트: 자식 라우팅 실패 → 에러 전파, 저장된 계보는 유지
#[tokio::test]
async fn test_child_routing_failure_is_propagated() {
    let h = Harness::new().await;
    h.router.fail_on(3);

    let err = h
        .service
        .process(command(USER_ID, limit_with_tp_sl("BUY", "110", "90")))
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::Route { order_id: 3, .. }));
    assert_eq!(h.router.routed_ids(), vec![1, 2]);
    assert_eq!(h.store.orders().len(), 3);
}

/// 테스트: 저장 실패 → 아무것도 라우팅되지 않음
#[tokio::test]
async fn test_persist_failure_routes_nothing() {
    let h = Harness::new().await;
    h.store.fail_next_insert();

    let err = h
        .service
        .process(command(USER_ID, limit_with_tp_sl("BUY", "110", "90")))
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::Persist(_)));
    assert!(h.router.routed().is_empty());
}

/// 테스트: 같은 tmpOrderId 재전송 → 주문 두 건 (중복 제거 없음)
#[tokio::test]
async fn test_replayed_tmp_order_id_creates_two_orders() {
    let h = Harness::new().await;
    let dto = json!({ "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "100", "symbol": SYMBOL });

    let first = process_routed(&h, dto.clone()).await;
    let second = process_routed(&h, dto).await;

    assert_ne!(first.parent.id, second.parent.id);
    assert_eq!(h.store.orders().len(), 2);
    assert!(h.store.orders().iter().all(|o| o.tmp_id.as_deref() == Some("tmp-1")));

    let found = h
        .store
        .find_open_order(USER_ID, &OrderLookup::TmpId("tmp-1".to_string()))
        .await
        .unwrap();
    assert!(found.is_some());

    let by_id = h
        .service
        .find_open_order(USER_ID, &OrderLookup::Id(second.parent.id))
        .await
        .unwrap();
    assert_eq!(by_id.map(|o| o.id), Some(second.parent.id));

    // 다른 사용자로는 조회되지 않음
    let other = h
        .store
        .find_open_order(BOT_USER_ID, &OrderLookup::Id(second.parent.id))
        .await
        .unwrap();
    assert!(other.is_none());
}

/// 테스트: ID 생성기는 저장소 최대 ID 이후부터
#[tokio::test]
async fn test_max_order_id_seeds_next_lineage() {
    let h = Harness::new().await;
    process_routed(&h, limit_with_tp_sl("BUY", "110", "90")).await;

    let max = h.store.max_order_id().await.unwrap();
    assert_eq!(max, 3);
}
