// =====================================================
// 사용자 시장가 주문 + 봇 반대 주문 통합 테스트
// =====================================================

mod common;
use common::*;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use order_intake::domains::bot::models::BotConfig;
use order_intake::domains::bot::services::{
    FixedPriceSource, ReferencePriceSource, UserMarketOrderService,
};
use order_intake::domains::intake::{CommandProcessor, ProcessOutcome};
use order_intake::domains::order::models::{OrderSide, OrderType};
use order_intake::domains::order::services::MarketData;
use order_intake::shared::cache::{Cache, keys};

fn bot_config() -> BotConfig {
    BotConfig {
        enabled: true,
        bot_user_ids: vec![BOT_USER_ID],
        counter_user_id: Some(BOT_USER_ID),
        ..Default::default()
    }
}

fn service(h: &Harness, prices: Arc<dyn ReferencePriceSource>, config: BotConfig) -> UserMarketOrderService {
    UserMarketOrderService::new(
        h.resolver.clone(),
        h.validator.clone(),
        h.persistence.clone(),
        MarketData::new(h.cache.clone()),
        h.cache.clone(),
        prices,
        config,
    )
}

async fn set_orderbook(h: &Harness, book: Value) {
    h.cache
        .set(&keys::orderbook(SYMBOL), &book.to_string(), None)
        .await
        .unwrap();
}

fn market_buy(quantity: &str) -> Value {
    json!({ "side": "BUY", "type": "MARKET", "quantity": quantity, "symbol": SYMBOL })
}

/// 가격 조회 시점의 억제 플래그 값을 기록하는 가격 소스
struct FlagProbe {
    cache: Arc<dyn Cache>,
    seen: Mutex<Option<String>>,
}

#[async_trait]
impl ReferencePriceSource for FlagProbe {
    async fn last_price(&self, _symbol: &str) -> Result<Decimal> {
        let flag = self.cache.get(&keys::bot_stop_create_order(BOT_USER_ID)).await?;
        *self.seen.lock() = flag;
        Ok(d("100"))
    }
}

/// 테스트: 유동성 부족분 × 1.1 만큼 봇 반대 주문 후 사용자 주문
#[tokio::test]
async fn test_counter_order_sized_from_uncovered_quantity() {
    let h = Harness::new().await;
    // 레퍼런스 가격 100 이하 매도 호가 0.5 → 부족분 1.5 → 1.65
    set_orderbook(&h, json!({ "bids": [], "asks": [["99.5", "0.5"], ["100.5", "10"]] })).await;

    let svc = service(&h, Arc::new(FixedPriceSource::new(d("100"))), bot_config());
    let outcome = svc.process(command(USER_ID, market_buy("2"))).await.unwrap();

    let ProcessOutcome::Routed(lineage) = outcome else {
        panic!("user order was rejected: {:?}", h.error_codes());
    };
    assert_eq!(lineage.parent.user_id, USER_ID);

    let routed = h.router.routed();
    assert_eq!(routed.len(), 2);

    // 봇 주문이 먼저 라우팅됨
    let bot_order = &routed[0].1.data;
    assert_eq!(bot_order.user_id, BOT_USER_ID);
    assert_eq!(bot_order.side, OrderSide::Sell);
    assert_eq!(bot_order.order_type, OrderType::Limit);
    assert_eq!(bot_order.quantity, d("1.65"));
    assert_eq!(bot_order.price, Some(d("100")));

    let user_order = &routed[1].1.data;
    assert_eq!(user_order.id, lineage.parent.id);
    assert_eq!(user_order.order_type, OrderType::Market);

    // 억제 플래그는 해제됨
    assert_eq!(h.cache.get(&keys::bot_stop_create_order(BOT_USER_ID)).await.unwrap(), None);
}

/// 테스트: 반대 주문 생성 중에는 억제 플래그 "true"
#[tokio::test]
async fn test_suppression_flag_set_during_synthesis() {
    let h = Harness::new().await;
    let probe = Arc::new(FlagProbe {
        cache: h.cache.clone(),
        seen: Mutex::new(None),
    });

    let svc = service(&h, probe.clone(), bot_config());
    svc.process(command(USER_ID, market_buy("1"))).await.unwrap();

    assert_eq!(probe.seen.lock().as_deref(), Some("true"));
    assert_eq!(h.cache.get(&keys::bot_stop_create_order(BOT_USER_ID)).await.unwrap(), None);
}

/// 테스트: 레퍼런스 가격 조회 실패 → 반대 주문 없이 사용자 주문만 처리
#[tokio::test]
async fn test_reference_price_failure_skips_counter_order() {
    let h = Harness::new().await;
    let svc = service(&h, Arc::new(FixedPriceSource::unavailable()), bot_config());

    let outcome = svc.process(command(USER_ID, market_buy("1"))).await.unwrap();

    assert!(matches!(outcome, ProcessOutcome::Routed(_)));
    let routed = h.router.routed();
    assert_eq!(routed.len(), 1);
    assert_eq!(routed[0].1.data.user_id, USER_ID);
    assert_eq!(h.cache.get(&keys::bot_stop_create_order(BOT_USER_ID)).await.unwrap(), None);
}

/// 테스트: 테스트 계정은 고정 가격 사용
#[tokio::test]
async fn test_fake_price_override_for_test_account() {
    let h = Harness::new().await;
    let config = BotConfig {
        fake_prices: HashMap::from([(USER_ID, d("101.257"))]),
        ..bot_config()
    };
    let svc = service(&h, Arc::new(FixedPriceSource::unavailable()), config);

    svc.process(command(USER_ID, market_buy("1"))).await.unwrap();

    // 가격 자릿수 2 에서 내림
    let routed = h.router.routed();
    assert_eq!(routed.len(), 2);
    assert_eq!(routed[0].1.data.user_id, BOT_USER_ID);
    assert_eq!(routed[0].1.data.price, Some(d("101.25")));
}

/// 테스트: 오더북 유동성이 충분하면 반대 주문 없음
#[tokio::test]
async fn test_sufficient_liquidity_needs_no_counter_order() {
    let h = Harness::new().await;
    set_orderbook(&h, json!({ "bids": [], "asks": [["99", "5"]] })).await;

    let svc = service(&h, Arc::new(FixedPriceSource::new(d("100"))), bot_config());
    svc.process(command(USER_ID, market_buy("2"))).await.unwrap();

    let routed = h.router.routed();
    assert_eq!(routed.len(), 1);
    assert_eq!(routed[0].1.data.user_id, USER_ID);
}

/// 테스트: 지정가 주문 / 봇 비활성화 시 반대 주문 없음
#[tokio::test]
async fn test_no_counter_order_for_limit_or_disabled_bot() {
    let h = Harness::new().await;
    let svc = service(&h, Arc::new(FixedPriceSource::new(d("100"))), bot_config());
    svc.process(command(
        USER_ID,
        json!({ "side": "BUY", "type": "LIMIT", "quantity": "1", "price": "100", "symbol": SYMBOL }),
    ))
    .await
    .unwrap();
    assert_eq!(h.router.routed().len(), 1);

    let h = Harness::new().await;
    let config = BotConfig {
        enabled: false,
        ..bot_config()
    };
    let svc = service(&h, Arc::new(FixedPriceSource::new(d("100"))), config);
    svc.process(command(USER_ID, market_buy("1"))).await.unwrap();
    assert_eq!(h.router.routed().len(), 1);
}

/// 테스트: 사용자 주문이 거부되면 아무것도 생성하지 않음
#[tokio::test]
async fn test_rejected_user_order_creates_nothing() {
    let h = Harness::new().await;
    let svc = service(&h, Arc::new(FixedPriceSource::new(d("100"))), bot_config());

    let outcome = svc.process(command(USER_ID, market_buy("0.0001"))).await.unwrap();

    assert_eq!(outcome, ProcessOutcome::Rejected);
    assert!(h.router.routed().is_empty());
    assert_eq!(h.error_codes(), vec!["ORDER_MINIMUM_QUANTITY_VALIDATION_FAIL".to_string()]);
}
