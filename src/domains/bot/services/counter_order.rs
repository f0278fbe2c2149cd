// =====================================================
// UserMarketOrderService - 사용자 시장가 주문 + 봇 반대 주문
// =====================================================
// 사용자 시장가 주문이 들어오면 오더북에 유동성이 부족하지 않도록
// 레퍼런스 가격에 봇 지정가 주문을 먼저 깔아둠.
//
// 처리 순서:
// 1. 컨텍스트 조회 + 사용자 주문 검증
// 2. (시장가 + 봇 활성화) 봇 자동 주문 억제 플래그 설정
// 3. 레퍼런스 가격 조회 (테스트 계정은 고정 가격)
//    → 실패 시 반대 주문 생략, 사용자 주문은 계속 처리
// 4. 오더북에서 레퍼런스 가격 이내 유동성 합산
// 5. 부족분 × (1 + 여유분) 만큼 반대 방향 LIMIT 주문 저장 + 라우팅
// 6. 사용자 주문 저장 + 라우팅 (자식 주문 포함)
// 7. 억제 플래그 해제 (성공/실패 무관)
// =====================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};

use super::reference_price::ReferencePriceSource;
use crate::domains::bot::models::BotConfig;
use crate::domains::intake::{CommandProcessor, ProcessOutcome};
use crate::domains::order::models::{
    CreateOrderRequest, NormalizedOrder, OrderKind, OrderLineage, OrderSide, OrderType, RawOrderCommand,
};
use crate::domains::order::services::{
    ContextResolver, MarketData, OrderBookSnapshot, OrderPersistence, OrderValidator,
};
use crate::shared::cache::{Cache, keys};
use crate::shared::errors::IntakeError;
use crate::shared::utils::round_down;

pub struct UserMarketOrderService {
    resolver: Arc<ContextResolver>,
    validator: Arc<OrderValidator>,
    persistence: Arc<OrderPersistence>,
    market: MarketData,
    cache: Arc<dyn Cache>,
    prices: Arc<dyn ReferencePriceSource>,
    config: BotConfig,
}

impl UserMarketOrderService {
    pub fn new(
        resolver: Arc<ContextResolver>,
        validator: Arc<OrderValidator>,
        persistence: Arc<OrderPersistence>,
        market: MarketData,
        cache: Arc<dyn Cache>,
        prices: Arc<dyn ReferencePriceSource>,
        config: BotConfig,
    ) -> Self {
        Self {
            resolver,
            validator,
            persistence,
            market,
            cache,
            prices,
            config,
        }
    }

    /// 반대 주문 대상인지 (봇 활성화 + 시장가 + 반대 주문 계정 설정)
    fn counter_account_for(&self, order: &NormalizedOrder) -> Option<u64> {
        if !self.config.enabled || !matches!(order.kind, OrderKind::Market { .. }) {
            return None;
        }
        self.config
            .counter_user_id
            .filter(|bot_user_id| *bot_user_id != order.user_id)
    }

    /// 레퍼런스 가격 (테스트 계정 고정 가격 우선)
    async fn reference_price(&self, user_id: u64, symbol: &str) -> Option<Decimal> {
        if let Some(price) = self.config.fake_price_for(user_id) {
            return Some(price);
        }
        match self.prices.last_price(symbol).await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(
                    user_id,
                    symbol,
                    "[Counter Order] reference price unavailable, skipping counter order: {:#}",
                    e
                );
                None
            }
        }
    }

    /// 반대 주문 생성
    ///
    /// # Returns
    /// * `Ok(Some(lineage))` - 반대 주문 저장 + 라우팅됨
    /// * `Ok(None)` - 필요 없음 / 가격 없음 / 검증 거부
    async fn place_counter_order(
        &self,
        bot_user_id: u64,
        order: &NormalizedOrder,
        price_precision: u32,
        size_precision: u32,
    ) -> Result<Option<OrderLineage>> {
        // ━━━━━━━━━━━━━━━━━━━━ 1. 레퍼런스 가격 ━━━━━━━━━━━━━━━━━━━━
        let Some(reference) = self.reference_price(order.user_id, &order.symbol).await else {
            return Ok(None);
        };

        // ━━━━━━━━━━━━━━━━━━━━ 2. 유동성 / 부족분 ━━━━━━━━━━━━━━━━━━━━
        let book = self.market.orderbook(&order.symbol).await.unwrap_or_default();
        let quantity = counter_quantity(
            order.side,
            order.quantity,
            &book,
            reference,
            self.config.orderbook_depth,
            self.config.buffer_ratio,
            size_precision,
        );
        if quantity <= Decimal::ZERO {
            info!(
                user_id = order.user_id,
                symbol = %order.symbol,
                "[Counter Order] resting liquidity covers the order"
            );
            return Ok(None);
        }

        // ━━━━━━━━━━━━━━━━━━━━ 3. 봇 주문 검증 + 저장 ━━━━━━━━━━━━━━━━━━━━
        let request = CreateOrderRequest {
            side: Some(order.side.opposite().to_string()),
            order_type: Some(OrderType::Limit.to_string()),
            quantity: Some(quantity.normalize().to_string()),
            price: Some(round_down(reference, price_precision).normalize().to_string()),
            symbol: Some(order.symbol.clone()),
            ..Default::default()
        };

        let Some(ctx) = self
            .resolver
            .resolve(bot_user_id, &request)
            .await
            .context("Failed to resolve bot context")?
        else {
            return Ok(None);
        };
        let Some(counter) = self
            .validator
            .validate(request, bot_user_id, None, &ctx)
            .await
            .context("Failed to validate bot order")?
        else {
            return Ok(None);
        };

        let lineage = self
            .persistence
            .save(&counter)
            .await
            .context("Failed to save bot order")?;

        info!(
            bot_user_id,
            order_id = lineage.parent.id,
            symbol = %counter.symbol,
            side = %counter.side,
            quantity = %counter.quantity,
            price = %reference,
            "[Counter Order] bot order placed"
        );
        Ok(Some(lineage))
    }

    async fn suppress(&self, bot_user_id: u64) {
        if let Err(e) = self
            .cache
            .set(&keys::bot_stop_create_order(bot_user_id), "true", None)
            .await
        {
            warn!(bot_user_id, "[Counter Order] failed to set suppression flag: {:#}", e);
        }
    }

    async fn release(&self, bot_user_id: u64) {
        if let Err(e) = self.cache.del(&keys::bot_stop_create_order(bot_user_id)).await {
            warn!(bot_user_id, "[Counter Order] failed to clear suppression flag: {:#}", e);
        }
    }
}

#[async_trait]
impl CommandProcessor for UserMarketOrderService {
    async fn process(&self, command: RawOrderCommand) -> Result<ProcessOutcome, IntakeError> {
        let RawOrderCommand {
            create_order_dto: request,
            user_id,
            tmp_order_id,
        } = command;

        // ━━━━━━━━━━━━━━━━━━━━ 1. 컨텍스트 + 사용자 주문 검증 ━━━━━━━━━━━━━━━━━━━━
        let Some(ctx) = self
            .resolver
            .resolve(user_id, &request)
            .await
            .map_err(IntakeError::Context)?
        else {
            return Ok(ProcessOutcome::Rejected);
        };
        let Some(order) = self
            .validator
            .validate(request, user_id, tmp_order_id, &ctx)
            .await
            .map_err(IntakeError::Context)?
        else {
            return Ok(ProcessOutcome::Rejected);
        };

        let Some(bot_user_id) = self.counter_account_for(&order) else {
            let lineage = self.persistence.save(&order).await?;
            return Ok(ProcessOutcome::Routed(lineage));
        };

        // ━━━━━━━━━━━━━━━━━━━━ 2. 반대 주문 (억제 플래그 구간) ━━━━━━━━━━━━━━━━━━━━
        self.suppress(bot_user_id).await;

        if let Err(e) = self
            .place_counter_order(
                bot_user_id,
                &order,
                ctx.instrument.max_figures_for_price,
                ctx.instrument.max_figures_for_size,
            )
            .await
        {
            warn!(user_id, bot_user_id, "[Counter Order] counter order failed: {:#}", e);
        }

        // ━━━━━━━━━━━━━━━━━━━━ 3. 사용자 주문 ━━━━━━━━━━━━━━━━━━━━
        let saved = self.persistence.save(&order).await;
        self.release(bot_user_id).await;

        Ok(ProcessOutcome::Routed(saved?))
    }
}

/// 반대 주문 수량
/// Quantity the bot must rest at `reference` so a market order of `quantity` fills
///
/// - 사용자 BUY: 레퍼런스 가격 이하 매도 호가 합산
/// - 사용자 SELL: 레퍼런스 가격 이상 매수 호가 합산
/// - (수량 - 유동성) × (1 + buffer), 수량 자릿수에서 올림
pub fn counter_quantity(
    user_side: OrderSide,
    quantity: Decimal,
    book: &OrderBookSnapshot,
    reference: Decimal,
    depth: usize,
    buffer_ratio: Decimal,
    size_precision: u32,
) -> Decimal {
    let liquidity: Decimal = match user_side {
        OrderSide::Buy => book
            .asks
            .iter()
            .take(depth)
            .filter(|level| level.price() <= reference)
            .map(|level| level.quantity())
            .sum(),
        OrderSide::Sell => book
            .bids
            .iter()
            .take(depth)
            .filter(|level| level.price() >= reference)
            .map(|level| level.quantity())
            .sum(),
    };

    let uncovered = quantity - liquidity;
    if uncovered <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    (uncovered * (Decimal::ONE + buffer_ratio))
        .round_dp_with_strategy(size_precision, RoundingStrategy::AwayFromZero)
}
