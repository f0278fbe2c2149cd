// =====================================================
// 주문 분류 / 검증 통합 테스트
// =====================================================
// 기본 시드: BTCUSDT (수량 3자리, 가격 2자리, 지정가 ±5%),
//            마크 가격 100, 레버리지 20 (마진 모드 없음 → CROSS)

mod common;
use common::*;

use std::sync::Arc;

use serde_json::json;

use order_intake::domains::intake::ProcessOutcome;
use order_intake::domains::order::models::{
    OrderLineage, OrderSide, OrderStatus, OrderTrigger, OrderType, TimeInForce, TpSlType,
};
use order_intake::domains::order::services::FixedCostEstimator;
use order_intake::shared::cache::{Cache, keys};

fn routed(outcome: ProcessOutcome) -> OrderLineage {
    match outcome {
        ProcessOutcome::Routed(lineage) => lineage,
        ProcessOutcome::Rejected => panic!("expected order to be routed"),
    }
}

/// 거부되고 에러가 정확히 한 건 적재되었는지 확인
async fn assert_rejected_with(h: &Harness, user_id: u64, dto: serde_json::Value, code: &str) {
    let outcome = h.process(command(user_id, dto)).await;
    assert_eq!(outcome, ProcessOutcome::Rejected);
    assert_eq!(h.error_codes(), vec![code.to_string()]);
    assert!(h.store.orders().is_empty());
    assert!(h.router.routed().is_empty());
}

/// 테스트: 지정가 주문 정상 처리
#[tokio::test]
async fn test_limit_order_is_normalized_and_routed() {
    let h = Harness::new().await;

    let lineage = routed(
        h.process(command(
            USER_ID,
            json!({ "side": "BUY", "type": "LIMIT", "quantity": "1.5", "price": 101, "symbol": SYMBOL }),
        ))
        .await,
    );

    let order = &lineage.parent;
    assert!(lineage.children.is_empty());
    assert_eq!(order.side, OrderSide::Buy);
    assert_eq!(order.order_type, OrderType::Limit);
    assert_eq!(order.price, Some(d("101")));
    assert_eq!(order.quantity, d("1.5"));
    assert_eq!(order.remaining, d("1.5"));
    assert_eq!(order.time_in_force, TimeInForce::Gtc);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.leverage, d("20"));
    assert_eq!(order.asset, ASSET);
    assert_eq!(order.tmp_id.as_deref(), Some("tmp-1"));
    // 증거금 1.5 × 101 / 20 = 7.575, 수수료 151.5 × 0.0005 = 0.07575
    assert_eq!(order.original_order_margin, Some(d("7.575")));
    assert_eq!(order.original_cost, Some(d("7.65075")));

    assert_eq!(h.router.routed_ids(), vec![order.id]);
    assert!(h.errors.is_empty());
}

/// 테스트: 수량 자릿수 (정규화된 소수 기준)
#[tokio::test]
async fn test_quantity_precision_uses_normalized_scale() {
    let h = Harness::new().await;

    // 뒤쪽 0 은 유효 자릿수가 아님
    routed(
        h.process(command(
            USER_ID,
            json!({ "side": "BUY", "type": "LIMIT", "quantity": "1.500000", "price": "100", "symbol": SYMBOL }),
        ))
        .await,
    );

    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({ "side": "BUY", "type": "LIMIT", "quantity": "1.0001", "price": "100", "symbol": SYMBOL }),
        "ORDER_QUANTITY_PRECISION_VALIDATION_FAIL",
    )
    .await;
}

/// 테스트: 가격 자릿수
#[tokio::test]
async fn test_price_precision_rejected() {
    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({ "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "100.123", "symbol": SYMBOL }),
        "ORDER_PRICE_PRECISION_VALIDATION_FAIL",
    )
    .await;
}

/// 테스트: 최소 / 최대 수량
#[tokio::test]
async fn test_quantity_limits() {
    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({ "side": "BUY", "type": "LIMIT", "quantity": "0.0001", "price": "100", "symbol": SYMBOL }),
        "ORDER_MINIMUM_QUANTITY_VALIDATION_FAIL",
    )
    .await;

    // 시장가 최대 50
    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({ "side": "BUY", "type": "MARKET", "quantity": "51", "symbol": SYMBOL }),
        "ORDER_MAXIMUM_QUANTITY_VALIDATION_FAIL",
    )
    .await;
}

/// 테스트: 지정가 범위 (매수 상한 / 매도 하한)
#[tokio::test]
async fn test_limit_price_bounds() {
    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({ "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "105.01", "symbol": SYMBOL }),
        "ORDER_PRICE_VALIDATION_FAIL",
    )
    .await;

    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({ "side": "SELL", "type": "LIMIT", "quantity": "1", "price": "94.99", "symbol": SYMBOL }),
        "ORDER_PRICE_VALIDATION_FAIL",
    )
    .await;
}

/// 테스트: 100% 시장가 주문은 97% 로 제한
#[tokio::test]
async fn test_full_percentage_market_order_keeps_headroom() {
    let h = Harness::new().await;
    h.store.insert_account(account(2, "100"));

    let lineage = routed(
        h.process(command(2, json!({ "side": "BUY", "type": "MARKET", "quantity": "100%", "symbol": SYMBOL })))
            .await,
    );

    // 100 × 20 × 97% / 100
    let order = &lineage.parent;
    assert_eq!(order.quantity, d("19.4"));
    assert_eq!(order.order_type, OrderType::Market);
    assert_eq!(order.time_in_force, TimeInForce::Ioc);
    assert_eq!(order.price, None);
}

/// 테스트: 비율 수량은 시장가 주문만 허용
#[tokio::test]
async fn test_percentage_quantity_rejected_for_limit_order() {
    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({ "side": "BUY", "type": "LIMIT", "quantity": "50%", "price": "100", "symbol": SYMBOL }),
        "ORDER_QUANTITY_VALIDATION_FAIL",
    )
    .await;
}

/// 테스트: 잔고 1000, 비용 1000.000001 → 잔고 부족
#[tokio::test]
async fn test_balance_must_exceed_cost() {
    let h = Harness::with_estimator(Arc::new(FixedCostEstimator::new(d("1000.000001")))).await;
    h.store.insert_account(account(3, "1000"));
    assert_rejected_with(
        &h,
        3,
        json!({ "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "100", "symbol": SYMBOL }),
        "NOT_ENOUGH_BALANCE",
    )
    .await;

    // 잔고 == 비용 도 거부
    let h = Harness::with_estimator(Arc::new(FixedCostEstimator::new(d("1000")))).await;
    h.store.insert_account(account(3, "1000"));
    assert_rejected_with(
        &h,
        3,
        json!({ "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "100", "symbol": SYMBOL }),
        "NOT_ENOUGH_BALANCE",
    )
    .await;

    let h = Harness::with_estimator(Arc::new(FixedCostEstimator::new(d("999.99")))).await;
    h.store.insert_account(account(3, "1000"));
    routed(
        h.process(command(
            3,
            json!({ "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "100", "symbol": SYMBOL }),
        ))
        .await,
    );
}

/// 테스트: 요청의 leverage 값은 무시하고 마진 모드 레버리지로 비용 계산
#[tokio::test]
async fn test_request_leverage_cannot_bypass_balance_check() {
    let h = Harness::new().await;
    h.store.insert_account(account(4, "10"));

    // 10 × 100 / 20 = 50 > 10
    assert_rejected_with(
        &h,
        4,
        json!({ "side": "BUY", "type": "LIMIT", "quantity": "10", "price": "100", "leverage": "100000", "symbol": SYMBOL }),
        "NOT_ENOUGH_BALANCE",
    )
    .await;

    let lineage = routed(
        h.process(command(
            USER_ID,
            json!({ "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "100", "leverage": 125, "symbol": SYMBOL }),
        ))
        .await,
    );
    assert_eq!(lineage.parent.leverage, d("20"));
}

/// 테스트: Decimal 범위를 넘는 수량은 panic 없이 거부
#[tokio::test]
async fn test_oversized_quantity_is_rejected_without_overflow() {
    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({ "side": "BUY", "type": "LIMIT", "quantity": "10000000000000000000000000000", "price": "100", "symbol": SYMBOL }),
        "ORDER_QUANTITY_VALIDATION_FAIL",
    )
    .await;
}

/// 테스트: 비율 수량 계산이 범위를 넘으면 거부
#[tokio::test]
async fn test_oversized_percentage_resolution_is_rejected() {
    let h = Harness::new().await;
    // 잔고 × 레버리지 20 이 Decimal 최대값 초과
    h.store.insert_account(account(5, "70000000000000000000000000000"));

    assert_rejected_with(
        &h,
        5,
        json!({ "side": "BUY", "type": "MARKET", "quantity": "50%", "symbol": SYMBOL }),
        "ORDER_QUANTITY_VALIDATION_FAIL",
    )
    .await;
}

/// 테스트: 봇 계정은 잔고 검사 생략
#[tokio::test]
async fn test_bot_order_skips_balance_check() {
    let h = Harness::new().await;

    let lineage = routed(
        h.process(command(
            BOT_USER_ID,
            json!({ "side": "SELL", "type": "LIMIT", "quantity": "5", "price": "100", "symbol": SYMBOL }),
        ))
        .await,
    );
    assert_eq!(lineage.parent.user_id, BOT_USER_ID);
    assert_eq!(lineage.parent.original_cost, None);
}

/// 테스트: 마크 가격 없음
#[tokio::test]
async fn test_missing_mark_price() {
    let h = Harness::new().await;
    h.cache.del(&keys::oracle_price(SYMBOL)).await.unwrap();

    assert_rejected_with(
        &h,
        USER_ID,
        json!({ "side": "BUY", "type": "MARKET", "quantity": "1", "symbol": SYMBOL }),
        "MARK_PRICE_NOT_FOUND",
    )
    .await;
}

/// 테스트: 트레일링 스탑
#[tokio::test]
async fn test_trailing_stop() {
    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({
            "side": "SELL", "type": "MARKET", "tpSLType": "TRAILING_STOP",
            "quantity": "1", "callbackRate": "6", "trigger": "LAST", "symbol": SYMBOL
        }),
        "ORDER_TRAILING_STOP_VALIDATION_FAIL",
    )
    .await;

    let h = Harness::new().await;
    let lineage = routed(
        h.process(command(
            USER_ID,
            json!({
                "side": "SELL", "type": "MARKET", "tpSLType": "TRAILING_STOP",
                "quantity": "1", "callbackRate": 1, "activationPrice": "98.5", "trigger": "LAST",
                "symbol": SYMBOL
            }),
        ))
        .await,
    );
    let order = &lineage.parent;
    assert_eq!(order.tp_sl_type, Some(TpSlType::TrailingStop));
    assert_eq!(order.callback_rate, Some(d("1")));
    assert_eq!(order.activation_price, Some(d("98.5")));
    assert_eq!(order.trigger, Some(OrderTrigger::Last));
    assert_eq!(order.time_in_force, TimeInForce::Ioc);
}

/// 테스트: STOP_LIMIT (가격 범위는 발동 가격 기준)
#[tokio::test]
async fn test_stop_limit() {
    let stop_limit = |price: &str| {
        json!({
            "side": "BUY", "type": "LIMIT", "tpSLType": "STOP_LIMIT", "quantity": "1",
            "price": price, "tpSLPrice": "90", "trigger": "ORACLE", "stopCondition": "LT",
            "symbol": SYMBOL
        })
    };

    // 발동 가격 90 × 1.05 = 94.5
    let h = Harness::new().await;
    let lineage = routed(h.process(command(USER_ID, stop_limit("94"))).await);
    let order = &lineage.parent;
    assert_eq!(order.tp_sl_type, Some(TpSlType::StopLimit));
    assert_eq!(order.tp_sl_price, Some(d("90")));
    assert_eq!(order.price, Some(d("94")));
    assert_eq!(order.time_in_force, TimeInForce::Gtc);

    let h = Harness::new().await;
    assert_rejected_with(&h, USER_ID, stop_limit("95"), "ORDER_PRICE_VALIDATION_FAIL").await;

    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({
            "side": "BUY", "type": "LIMIT", "tpSLType": "STOP_LIMIT", "quantity": "1",
            "price": "94", "tpSLPrice": "90", "trigger": "ORACLE", "symbol": SYMBOL
        }),
        "ORDER_STOP_CONDITION_VALIDATION_FAIL",
    )
    .await;
}

/// 테스트: TAKE_PROFIT_MARKET 단독 주문은 reduce-only
#[tokio::test]
async fn test_standalone_take_profit_is_reduce_only() {
    let h = Harness::new().await;
    let lineage = routed(
        h.process(command(
            USER_ID,
            json!({
                "side": "SELL", "type": "MARKET", "tpSLType": "TAKE_PROFIT_MARKET", "quantity": "1",
                "tpSLPrice": "120", "trigger": "LAST", "stopCondition": "GT", "symbol": SYMBOL
            }),
        ))
        .await,
    );
    assert!(lineage.parent.is_reduce_only);
    assert_eq!(lineage.parent.time_in_force, TimeInForce::Ioc);
}

/// 테스트: post-only 는 GTC 만 허용
#[tokio::test]
async fn test_post_only_requires_gtc() {
    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({
            "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "100",
            "isPostOnly": true, "timeInForce": "IOC", "symbol": SYMBOL
        }),
        "ORDER_POST_ONLY_VALIDATION_FAIL",
    )
    .await;

    let h = Harness::new().await;
    let lineage = routed(
        h.process(command(
            USER_ID,
            json!({ "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "100", "isPostOnly": true, "symbol": SYMBOL }),
        ))
        .await,
    );
    assert!(lineage.parent.is_post_only);
}

/// 테스트: 첨부 TP 방향 검사 (매수 → TP 는 기준가보다 높아야 함)
#[tokio::test]
async fn test_attached_take_profit_direction() {
    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({
            "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "100",
            "takeProfit": "99", "takeProfitTrigger": "LAST", "symbol": SYMBOL
        }),
        "TAKE_PROFIT_TRIGGER_OR_PRICE_NOT_VALID",
    )
    .await;
}

/// 테스트: 방향 없음 / 알 수 없는 조합
#[tokio::test]
async fn test_side_and_unknown_combinations() {
    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({ "type": "LIMIT", "quantity": "1", "price": "100", "symbol": SYMBOL }),
        "ORDER_SIDE_VALIDATION_FAIL",
    )
    .await;

    let h = Harness::new().await;
    assert_rejected_with(
        &h,
        USER_ID,
        json!({
            "side": "BUY", "type": "MARKET", "tpSLType": "STOP_LIMIT", "quantity": "1",
            "tpSLPrice": "90", "symbol": SYMBOL
        }),
        "ORDER_UNKNOWN_VALIDATION_FAIL",
    )
    .await;
}

/// 테스트: 빈 문자열 필드는 없는 것으로 취급
#[tokio::test]
async fn test_empty_strings_are_stripped() {
    let h = Harness::new().await;
    let lineage = routed(
        h.process(command(
            USER_ID,
            json!({
                "side": "BUY", "type": "MARKET", "quantity": "1", "price": "",
                "takeProfit": "", "stopLoss": "", "symbol": SYMBOL
            }),
        ))
        .await,
    );
    assert!(lineage.children.is_empty());
}
