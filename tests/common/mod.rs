// =====================================================
// 통합 테스트 공통 헬퍼
// =====================================================
// 목적: 모든 통합 테스트에서 공통으로 사용하는 인메모리 파이프라인 제공
//
// 사용법:
// ```rust
// mod common;
// use common::*;
//
// #[tokio::test]
// async fn test_something() {
//     let h = Harness::new().await;
//     h.process(command(USER_ID, json!({ ... }))).await;
// }
// ```
// =====================================================
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use order_intake::domains::intake::{CommandProcessor, IntakeScheduler, ProcessOutcome};
use order_intake::domains::order::models::{
    Account, ContractType, Instrument, OrderError, RawOrderCommand, TradingRules,
};
use order_intake::domains::order::services::{
    ClassifierConfig, ContextResolver, CostEstimator, ErrorQueue, InMemoryRouter,
    LinearCostEstimator, MarketData, Notifier, OrderIntakeService, OrderPersistence,
    OrderValidator,
};
use order_intake::shared::cache::{Cache, MemoryCache, keys};
use order_intake::shared::config::IntakeConfig;
use order_intake::shared::database::InMemoryStore;
use order_intake::shared::utils::IdGenerator;

// 테스트용 상수
pub const SYMBOL: &str = "BTCUSDT";
pub const ASSET: &str = "USDT";
pub const INSTRUMENT_ID: u64 = 1;
pub const USER_ID: u64 = 1;
pub const BOT_USER_ID: u64 = 900;

pub fn d(s: &str) -> Decimal {
    s.parse().expect("invalid decimal literal")
}

/// BTCUSDT: 수량 3자리, 가격 2자리, 지정가 ±5%
pub fn instrument() -> Instrument {
    Instrument {
        id: INSTRUMENT_ID,
        symbol: SYMBOL.to_string(),
        contract_type: ContractType::UsdM,
        quote_asset: ASSET.to_string(),
        max_figures_for_size: 3,
        max_figures_for_price: 2,
        max_price: d("1000000"),
        trading_rules: TradingRules {
            max_quantity_limit_order: d("100"),
            max_quantity_market_order: d("50"),
            cap_ratio: d("1.05"),
            floor_ratio: d("0.95"),
        },
    }
}

pub fn account(user_id: u64, balance: &str) -> Account {
    Account {
        id: user_id * 10,
        user_id,
        user_email: format!("user{}@test.com", user_id),
        asset: ASSET.to_string(),
        balance: d(balance),
    }
}

/// 토픽 메시지와 같은 형식으로 명령 생성
pub fn command(user_id: u64, dto: Value) -> RawOrderCommand {
    serde_json::from_value(json!({
        "createOrderDto": dto,
        "userId": user_id,
        "tmpOrderId": format!("tmp-{}", user_id),
    }))
    .expect("invalid command json")
}

/// 전달된 에러를 기록하는 Notifier (실패 주입 가능)
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<OrderError>>,
    failures_left: Mutex<usize>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_times(&self, times: usize) {
        *self.failures_left.lock() = times;
    }

    pub fn delivered(&self) -> Vec<OrderError> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, errors: &[OrderError]) -> Result<()> {
        {
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                bail!("notification endpoint unavailable");
            }
        }
        self.delivered.lock().extend_from_slice(errors);
        Ok(())
    }
}

/// 인메모리 파이프라인
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub router: Arc<InMemoryRouter>,
    pub errors: ErrorQueue,
    pub notifier: Arc<RecordingNotifier>,
    pub resolver: Arc<ContextResolver>,
    pub validator: Arc<OrderValidator>,
    pub persistence: Arc<OrderPersistence>,
    pub service: Arc<OrderIntakeService>,
}

impl Harness {
    /// 기본 시드: 상품 1개, 사용자 계정 (잔고 100,000), 마크 가격 100
    pub async fn new() -> Self {
        Self::with_estimator(Arc::new(LinearCostEstimator::default())).await
    }

    pub async fn with_estimator(estimator: Arc<dyn CostEstimator>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        store.insert_instrument(instrument());
        store.insert_account(account(USER_ID, "100000"));
        store.insert_account(account(BOT_USER_ID, "0"));

        let cache = Arc::new(MemoryCache::new());
        let router = Arc::new(InMemoryRouter::new());
        let errors = ErrorQueue::new();
        let ids = Arc::new(IdGenerator::new());

        let resolver = Arc::new(
            ContextResolver::new(
                cache.clone(),
                store.clone(),
                store.clone(),
                errors.clone(),
                std::time::Duration::from_secs(60),
                d("20"),
            )
            .with_bot_user_ids([BOT_USER_ID]),
        );
        let validator = Arc::new(OrderValidator::new(
            MarketData::new(cache.clone()),
            store.clone(),
            store.clone(),
            estimator,
            errors.clone(),
            ClassifierConfig::default(),
        ));
        let persistence = Arc::new(OrderPersistence::new(store.clone(), router.clone(), ids));
        let service = Arc::new(OrderIntakeService::new(
            resolver.clone(),
            validator.clone(),
            persistence.clone(),
            store.clone(),
        ));

        let harness = Self {
            store,
            cache,
            router,
            errors,
            notifier: Arc::new(RecordingNotifier::new()),
            resolver,
            validator,
            persistence,
            service,
        };
        harness.set_prices("100", "100").await;
        harness
    }

    pub async fn set_prices(&self, mark: &str, last: &str) {
        self.cache
            .set(&keys::oracle_price(SYMBOL), mark, None)
            .await
            .expect("cache set failed");
        self.cache
            .set(&keys::last_price(SYMBOL), last, None)
            .await
            .expect("cache set failed");
    }

    pub async fn process(&self, command: RawOrderCommand) -> ProcessOutcome {
        self.service
            .process(command)
            .await
            .expect("infrastructure failure")
    }

    /// 적재된 에러 코드 (전달 전)
    pub fn error_codes(&self) -> Vec<String> {
        self.errors.snapshot().into_iter().map(|e| e.code).collect()
    }

    pub fn scheduler(&self, config: IntakeConfig) -> IntakeScheduler {
        IntakeScheduler::new(
            "test",
            self.service.clone(),
            self.errors.clone(),
            self.notifier.clone(),
            config,
        )
    }
}
