// =====================================================
// order_intake - 주문 접수 서비스 진입점
// =====================================================
// 1. 설정 / 로깅 초기화
// 2. 저장소 (PostgreSQL 또는 메모리), 캐시 (Redis 또는 메모리) 연결
// 3. ID 생성기 초기화 (저장소 최대 주문 ID 이후부터)
// 4. 두 토픽 소비자 구성
//    - save_order_from_client  → OrderIntakeService
//    - save_user_market_order  → UserMarketOrderService (파일 지정 시)
// 5. 모든 스케줄러가 drain 완료를 보고하면 종료
// =====================================================

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use order_intake::domains::bot::models::BotConfig;
use order_intake::domains::bot::services::{BinancePriceClient, UserMarketOrderService};
use order_intake::domains::intake::{CommandProcessor, IntakeScheduler, TopicConsumer};
use order_intake::domains::order::services::{
    ClassifierConfig, ContextResolver, ErrorQueue, HttpNotifier, LinearCostEstimator, LogNotifier,
    MarketData, Notifier, OrderIntakeService, OrderPersistence, OrderValidator, TopicRouter,
};
use order_intake::shared::cache::{Cache, MemoryCache, RedisCache};
use order_intake::shared::config::{AppConfig, ORDER_TOPIC, USER_MARKET_ORDER_TOPIC};
use order_intake::shared::database::{
    AccountRepository, AccountStore, Database, InMemoryStore, InstrumentRepository, InstrumentStore,
    OrderRepository, OrderStore, PositionRepository, PositionStore,
};
use order_intake::shared::logging;
use order_intake::shared::topic::JsonLinesSink;
use order_intake::shared::topic::JsonLinesSource;
use order_intake::shared::utils::IdGenerator;

/// 저장소 묶음
struct Stores {
    orders: Arc<dyn OrderStore>,
    accounts: Arc<dyn AccountStore>,
    instruments: Arc<dyn InstrumentStore>,
    positions: Arc<dyn PositionStore>,
}

async fn connect_stores(config: &AppConfig) -> Result<Stores> {
    let Some(url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not set, using in-memory store");
        let store = Arc::new(InMemoryStore::new());
        return Ok(Stores {
            orders: store.clone(),
            accounts: store.clone(),
            instruments: store.clone(),
            positions: store,
        });
    };

    let db = Database::new(url, config.database_max_connections).await?;
    db.initialize().await?;
    let pool = db.pool().clone();
    info!("Database: PostgreSQL");

    Ok(Stores {
        orders: Arc::new(OrderRepository::new(pool.clone())),
        accounts: Arc::new(AccountRepository::new(pool.clone())),
        instruments: Arc::new(InstrumentRepository::new(pool.clone())),
        positions: Arc::new(PositionRepository::new(pool)),
    })
}

async fn connect_cache(config: &AppConfig) -> Result<Arc<dyn Cache>> {
    match config.redis_url.as_deref() {
        Some(url) => {
            let cache = RedisCache::connect(url).await?;
            info!("Cache: Redis");
            Ok(Arc::new(cache))
        }
        None => {
            warn!("REDIS_URL not set, using in-memory cache");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}

async fn open_source(topic: &str, path: Option<&Path>) -> Result<JsonLinesSource> {
    match path {
        Some(path) => JsonLinesSource::open(topic, path).await,
        None => Ok(JsonLinesSource::stdin(topic)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ━━━━━━━━━━━━━━━━━━━━ 1. 설정 / 로깅 ━━━━━━━━━━━━━━━━━━━━
    logging::init();
    let config = AppConfig::from_env();
    let bot_config = BotConfig::from_env();

    // ━━━━━━━━━━━━━━━━━━━━ 2. 저장소 / 캐시 ━━━━━━━━━━━━━━━━━━━━
    let stores = connect_stores(&config).await?;
    let cache = connect_cache(&config).await?;

    // ━━━━━━━━━━━━━━━━━━━━ 3. ID 생성기 ━━━━━━━━━━━━━━━━━━━━
    let last_id = stores
        .orders
        .max_order_id()
        .await
        .context("Failed to load last order id")?;
    let ids = Arc::new(IdGenerator::starting_after(last_id));
    info!(last_id, "Order id generator initialized");

    // ━━━━━━━━━━━━━━━━━━━━ 4. 파이프라인 구성 ━━━━━━━━━━━━━━━━━━━━
    let errors = ErrorQueue::new();
    let notifier: Arc<dyn Notifier> = match config.notification_url.clone() {
        Some(url) => Arc::new(HttpNotifier::new(url)?),
        None => Arc::new(LogNotifier),
    };

    let router = Arc::new(TopicRouter::new(
        Arc::new(JsonLinesSink::stdout()),
        config.matching_engine_topic_prefix.clone(),
    ));
    let market = MarketData::new(cache.clone());

    let resolver = Arc::new(
        ContextResolver::new(
            cache.clone(),
            stores.accounts.clone(),
            stores.instruments.clone(),
            errors.clone(),
            config.account_cache_ttl,
            config.default_leverage,
        )
        .with_bot_user_ids(bot_config.all_bot_user_ids()),
    );
    let validator = Arc::new(OrderValidator::new(
        market.clone(),
        stores.accounts.clone(),
        stores.positions.clone(),
        Arc::new(LinearCostEstimator::default()),
        errors.clone(),
        ClassifierConfig {
            default_leverage: config.default_leverage,
            market_percent_headroom: config.market_percent_headroom,
        },
    ));
    let persistence = Arc::new(OrderPersistence::new(stores.orders.clone(), router, ids));

    let order_service: Arc<dyn CommandProcessor> = Arc::new(OrderIntakeService::new(
        resolver.clone(),
        validator.clone(),
        persistence.clone(),
        stores.orders.clone(),
    ));

    let mut pipelines = vec![(
        IntakeScheduler::new(
            ORDER_TOPIC,
            order_service,
            errors.clone(),
            notifier.clone(),
            config.intake.clone(),
        ),
        open_source(ORDER_TOPIC, config.order_topic_file.as_deref()).await?,
    )];

    if let Some(path) = config.user_market_order_topic_file.as_deref() {
        let user_market_service: Arc<dyn CommandProcessor> = Arc::new(UserMarketOrderService::new(
            resolver,
            validator,
            persistence,
            market,
            cache,
            Arc::new(BinancePriceClient::new(bot_config.binance_rest_url.clone())?),
            bot_config,
        ));
        pipelines.push((
            IntakeScheduler::new(
                USER_MARKET_ORDER_TOPIC,
                user_market_service,
                errors,
                notifier,
                config.intake.clone(),
            ),
            open_source(USER_MARKET_ORDER_TOPIC, Some(path)).await?,
        ));
    }

    // ━━━━━━━━━━━━━━━━━━━━ 5. 실행 ━━━━━━━━━━━━━━━━━━━━
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, stopping consumers");
                cancel.cancel();
            }
        });
    }

    let mut timers = Vec::new();
    let mut consumers = JoinSet::new();
    let mut schedulers = Vec::new();

    for (scheduler, source) in pipelines {
        timers.extend(scheduler.start());
        schedulers.push(scheduler.clone());

        let name = scheduler.name().to_string();
        let consumer = TopicConsumer::new(source, scheduler, cancel.clone());
        // 소비가 끝나면 (EOF, 취소, 종료 명령, panic) 남은 작업을 비우고 종료
        consumers.spawn(async move { (name, consumer.run_to_drain().await) });
    }

    while let Some(joined) = consumers.join_next().await {
        match joined {
            Ok((name, Ok(exit))) => info!(scheduler = %name, ?exit, "Consumer stopped"),
            Ok((name, Err(e))) => error!(scheduler = %name, "Consumer failed: {:#}", e),
            Err(e) => error!("Consumer task aborted: {}", e),
        }
    }

    // 모든 소비 태스크가 끝난 뒤에는 종료 플래그가 반드시 ON
    for scheduler in &schedulers {
        scheduler.begin_shutdown();
        scheduler.wait_drained().await;
    }
    for timer in timers {
        if let Err(e) = timer.await {
            error!("Scheduler timer task failed: {}", e);
        }
    }

    info!("All schedulers drained, exiting");
    Ok(())
}
