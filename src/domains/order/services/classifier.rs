// =====================================================
// 주문 분류기 / 검증기
// =====================================================
// 역할: 원본 주문 요청 + 조회된 컨텍스트 → 정규화된 주문 또는 거부 사유
//
// 처리 순서:
// 1. 빈 필드 제거, 수량 필수
// 2. 지수 표기 수량 정규화, 비율(%) 수량 확인
// 3. 봇이 아니면: 레버리지 결정 (마진 모드 / 기본값), 비율 수량 계산, 비용 계산 / 잔고 확인
// 4. remaining = quantity, status = PENDING, 기본 GTC
// 5. 최소 / 최대 수량
// 6. 수량 / 가격 소수점 자릿수
// 7. 지정가 범위 (기준가 × cap / floor)
// 8. 첨부 TP/SL 방향 확인 (checkPrice 기준)
// 9. (type, tpSLType, isPostOnly) 로 최종 유형 결정
//
// classify() 는 순수 함수. 잔고/포지션/시세 조회는 OrderValidator 가 담당.
// =====================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::debug;

use super::cost_estimator::{CostEstimator, CostInput};
use super::error_queue::ErrorQueue;
use super::market_data::MarketData;
use crate::domains::order::models::{
    Account, CreateOrderRequest, Instrument, MarginMode, NormalizedOrder, OrderCost, OrderKind,
    OrderSide, OrderStatus, OrderTrigger, OrderType, Position, Rejection, StopCondition,
    StopTrigger, TimeInForce, TpSlAttachment, TpSlLeg, TpSlType,
};
use crate::shared::database::{AccountStore, PositionStore};
use crate::shared::utils::{min_step, parse_decimal, parse_percentage, round_down, validate_precision};

/// 분류기 설정
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// 마진 모드 레버리지가 없을 때 사용
    pub default_leverage: Decimal,
    /// 100% 시장가 주문 시 남겨둘 비율 (%)
    pub market_percent_headroom: Decimal,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            default_leverage: Decimal::new(20, 0),
            market_percent_headroom: Decimal::new(3, 0),
        }
    }
}

/// 주문 한 건의 조회된 컨텍스트
#[derive(Debug, Clone)]
pub struct OrderContext {
    pub account: Account,
    pub instrument: Instrument,
    pub margin_mode: MarginMode,
    pub is_bot: bool,
}

/// 분류 시점의 시세 / 잔고
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub mark_price: Option<Decimal>,
    pub last_price: Option<Decimal>,
    pub available_balance: Decimal,
    pub position: Option<Position>,
}

/// 최종 분기 (terminal branch)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    TrailingStop,
    PostOnlyLimit,
    StopLimit,
    StopMarket,
    TakeProfitLimit,
    StopLossLimit,
    TakeProfitMarket,
    StopLossMarket,
    Limit,
    Market,
}

impl Branch {
    fn select(
        order_type: OrderType,
        tp_sl_type: Option<TpSlType>,
        is_post_only: bool,
    ) -> Result<Self, Rejection> {
        use OrderType::{Limit, Market};

        match (order_type, tp_sl_type, is_post_only) {
            (_, Some(TpSlType::TrailingStop), _) => Ok(Self::TrailingStop),
            (Limit, None, true) => Ok(Self::PostOnlyLimit),
            (_, _, true) => Err(Rejection::PostOnly(
                "post only is allowed only for plain LIMIT orders".to_string(),
            )),
            (Limit, Some(TpSlType::StopLimit), false) => Ok(Self::StopLimit),
            (Market, Some(TpSlType::StopMarket), false) => Ok(Self::StopMarket),
            (Limit, Some(TpSlType::TakeProfitLimit), false) => Ok(Self::TakeProfitLimit),
            (Limit, Some(TpSlType::StopLossLimit), false) => Ok(Self::StopLossLimit),
            (Market, Some(TpSlType::TakeProfitMarket), false) => Ok(Self::TakeProfitMarket),
            (Market, Some(TpSlType::StopLossMarket), false) => Ok(Self::StopLossMarket),
            (Limit, None, false) => Ok(Self::Limit),
            (Market, None, false) => Ok(Self::Market),
            _ => Err(Rejection::Unknown),
        }
    }

    /// 지정가를 가지는 유형
    fn is_price_bearing(self) -> bool {
        matches!(
            self,
            Self::Limit
                | Self::PostOnlyLimit
                | Self::StopLimit
                | Self::TakeProfitLimit
                | Self::StopLossLimit
        )
    }

    /// 발동 가격(tpSLPrice)을 가지는 유형
    fn uses_stop(self) -> bool {
        matches!(
            self,
            Self::StopLimit
                | Self::StopMarket
                | Self::TakeProfitLimit
                | Self::StopLossLimit
                | Self::TakeProfitMarket
                | Self::StopLossMarket
        )
    }

    /// 가격 범위를 마크 가격 대신 발동 가격 기준으로 검사하는 유형
    fn bounds_from_stop(self) -> bool {
        matches!(self, Self::StopLimit | Self::TakeProfitLimit | Self::StopLossLimit)
    }

    /// TP/SL 첨부 허용 유형
    fn accepts_tp_sl(self) -> bool {
        matches!(
            self,
            Self::Limit | Self::PostOnlyLimit | Self::Market | Self::StopLimit | Self::StopMarket
        )
    }
}

/// 주문 분류 / 검증
/// Classify and validate one order request
///
/// # Arguments
/// * `request` - 원본 주문 요청
/// * `user_id` - 주문자
/// * `tmp_id` - 클라이언트 임시 주문 ID
/// * `ctx` - 계정 / 상품 / 마진 모드
/// * `market` - 마크 가격, 최근 체결가, 사용 가능 잔고, 포지션
/// * `estimator` - 비용 계산기
///
/// # Returns
/// * `Ok(NormalizedOrder)` - 유효한 주문
/// * `Err(Rejection)` - 거부 사유 (호출자가 ErrorQueue 에 적재)
pub fn classify(
    mut request: CreateOrderRequest,
    user_id: u64,
    tmp_id: Option<String>,
    ctx: &OrderContext,
    market: &MarketSnapshot,
    estimator: &dyn CostEstimator,
    config: &ClassifierConfig,
) -> Result<NormalizedOrder, Rejection> {
    let instrument = &ctx.instrument;
    let rules = &instrument.trading_rules;

    // ━━━━━━━━━━━━━━━━━━━━ 1. 빈 필드 제거 / 필수 값 ━━━━━━━━━━━━━━━━━━━━
    request.strip_empty();

    let raw_quantity = request
        .quantity
        .clone()
        .ok_or_else(|| Rejection::InvalidQuantity("quantity is required".to_string()))?;

    let side = request
        .side
        .as_deref()
        .and_then(OrderSide::parse)
        .ok_or(Rejection::Side)?;

    let order_type = request
        .order_type
        .as_deref()
        .and_then(OrderType::parse)
        .ok_or(Rejection::Unknown)?;

    let tp_sl_type = match request.tp_sl_type.as_deref() {
        Some(raw) => Some(TpSlType::parse(raw).ok_or(Rejection::Unknown)?),
        None => None,
    };

    let selected = Branch::select(order_type, tp_sl_type, request.is_post_only.unwrap_or(false));
    let branch = selected.as_ref().ok().copied();
    let price_bearing = branch.map_or(order_type == OrderType::Limit, Branch::is_price_bearing);

    // ━━━━━━━━━━━━━━━━━━━━ 2. 수량 정규화 ━━━━━━━━━━━━━━━━━━━━
    let percent = parse_percentage(&raw_quantity);
    let mut quantity = match percent {
        Some(_) => {
            if ctx.is_bot || branch != Some(Branch::Market) {
                return Err(Rejection::InvalidQuantity(
                    "percentage quantity is only allowed for market orders".to_string(),
                ));
            }
            None
        }
        None => {
            let value = parse_decimal(&raw_quantity).ok_or_else(|| {
                Rejection::InvalidQuantity(format!("quantity is not a decimal: {}", raw_quantity))
            })?;
            if value <= Decimal::ZERO {
                return Err(Rejection::InvalidQuantity("quantity must be positive".to_string()));
            }
            Some(value)
        }
    };

    let limit_price = if price_bearing {
        parse_optional(&request.price, Rejection::LimitPrice)?
    } else {
        None
    };

    // ━━━━━━━━━━━━━━━━━━━━ 3. 레버리지 / 비용 (봇 제외) ━━━━━━━━━━━━━━━━━━━━
    // 레버리지는 사용자 마진 모드 설정값만 사용 (요청 값은 무시)
    let leverage = if ctx.margin_mode.leverage > Decimal::ZERO {
        ctx.margin_mode.leverage
    } else {
        config.default_leverage
    };

    let mut cost = OrderCost::default();
    if !ctx.is_bot {
        let mark_price = market
            .mark_price
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| Rejection::MarkPriceNotFound {
                symbol: instrument.symbol.clone(),
            })?;

        if let Some(pct) = percent {
            let pct = if pct >= Decimal::ONE_HUNDRED {
                Decimal::ONE_HUNDRED - config.market_percent_headroom
            } else {
                pct
            };
            if pct <= Decimal::ZERO {
                return Err(Rejection::InvalidQuantity(
                    "percentage must be positive".to_string(),
                ));
            }

            let resolved = market
                .available_balance
                .checked_mul(leverage)
                .and_then(|v| v.checked_mul(pct))
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .and_then(|v| v.checked_div(mark_price))
                .ok_or_else(|| {
                    Rejection::InvalidQuantity("percentage quantity is out of range".to_string())
                })?;
            quantity = Some(round_down(resolved, instrument.max_figures_for_size));
        }

        let estimate = estimator
            .estimate(&CostInput {
                side,
                quantity: quantity.unwrap_or_default(),
                reference_price: limit_price.unwrap_or(mark_price),
                leverage,
                position: market.position.as_ref(),
                instrument,
            })
            .ok_or_else(|| Rejection::InvalidQuantity("order cost is out of range".to_string()))?;

        if market.available_balance <= estimate.cost {
            return Err(Rejection::NotEnoughBalance {
                available: market.available_balance,
                cost: estimate.cost,
            });
        }

        cost = OrderCost {
            original_cost: Some(estimate.cost),
            original_order_margin: Some(estimate.margin),
        };
    }

    // ━━━━━━━━━━━━━━━━━━━━ 4. 기본 값 ━━━━━━━━━━━━━━━━━━━━
    let quantity = quantity
        .ok_or_else(|| Rejection::InvalidQuantity("quantity could not be resolved".to_string()))?;
    let requested_tif = match request.time_in_force.as_deref() {
        Some(raw) => Some(TimeInForce::parse(raw).ok_or(Rejection::Unknown)?),
        None => None,
    };
    let limit_tif = requested_tif.unwrap_or(TimeInForce::Gtc);

    // ━━━━━━━━━━━━━━━━━━━━ 5. 최소 / 최대 수량 ━━━━━━━━━━━━━━━━━━━━
    let min = min_step(instrument.max_figures_for_size);
    if quantity < min {
        return Err(Rejection::MinimumQuantity { min });
    }

    let max = if price_bearing {
        rules.max_quantity_limit_order
    } else {
        rules.max_quantity_market_order
    };
    if quantity > max {
        return Err(Rejection::MaximumQuantity { max });
    }

    // ━━━━━━━━━━━━━━━━━━━━ 6. 소수점 자릿수 ━━━━━━━━━━━━━━━━━━━━
    if validate_precision(quantity, instrument.max_figures_for_size) {
        return Err(Rejection::QuantityPrecision {
            precision: instrument.max_figures_for_size,
        });
    }

    let uses_stop = branch.is_some_and(Branch::uses_stop);
    let accepts_tp_sl = branch.is_some_and(Branch::accepts_tp_sl);
    let is_trailing = branch == Some(Branch::TrailingStop);

    let stop_price = if uses_stop {
        parse_optional(&request.tp_sl_price, Rejection::StopPrice)?
    } else {
        None
    };
    let (take_profit, stop_loss) = if accepts_tp_sl {
        (
            parse_optional(&request.take_profit, Rejection::TakeProfitNotValid)?,
            parse_optional(&request.stop_loss, Rejection::StopLossNotValid)?,
        )
    } else {
        (None, None)
    };
    let activation_price = if is_trailing {
        parse_optional(
            &request.activation_price,
            Rejection::TrailingStop("activation price is not a decimal".to_string()),
        )?
    } else {
        None
    };

    let price_precision = instrument.max_figures_for_price;
    let price_fields = [limit_price, stop_price, take_profit, stop_loss, activation_price];
    if price_fields
        .into_iter()
        .flatten()
        .any(|p| validate_precision(p, price_precision))
    {
        return Err(Rejection::PricePrecision {
            precision: price_precision,
        });
    }

    // ━━━━━━━━━━━━━━━━━━━━ 7. 지정가 범위 ━━━━━━━━━━━━━━━━━━━━
    if let Some(b) = branch.filter(|b| b.is_price_bearing()) {
        let price = limit_price.ok_or(Rejection::LimitPrice)?;
        if price <= Decimal::ZERO {
            return Err(Rejection::PriceOutOfRange("price must be positive".to_string()));
        }
        if price > instrument.max_price {
            return Err(Rejection::MaxPrice {
                max: instrument.max_price,
            });
        }

        let base = if b.bounds_from_stop() {
            Some(require_stop(stop_price)?)
        } else {
            market.mark_price
        };

        if let Some(base) = base {
            match side {
                OrderSide::Buy => {
                    let cap = bound(base, rules.cap_ratio)?;
                    if price > cap {
                        return Err(Rejection::PriceOutOfRange(format!(
                            "buy price {} is above {}",
                            price, cap
                        )));
                    }
                }
                OrderSide::Sell => {
                    let floor = bound(base, rules.floor_ratio)?;
                    if price < floor {
                        return Err(Rejection::PriceOutOfRange(format!(
                            "sell price {} is below {}",
                            price, floor
                        )));
                    }
                }
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━ 8. 첨부 TP/SL 방향 ━━━━━━━━━━━━━━━━━━━━
    let mut tp_sl = TpSlAttachment::default();
    if let Some(b) = branch.filter(|_| take_profit.is_some() || stop_loss.is_some()) {
        let check_price = match b {
            Branch::Limit | Branch::PostOnlyLimit => limit_price.ok_or(Rejection::LimitPrice)?,
            Branch::StopLimit | Branch::StopMarket => require_stop(stop_price)?,
            _ => market
                .last_price
                .or(market.mark_price)
                .ok_or_else(|| Rejection::MarkPriceNotFound {
                    symbol: instrument.symbol.clone(),
                })?,
        };

        if let Some(price) = take_profit {
            let trigger = parse_trigger(&request.take_profit_trigger)
                .ok_or(Rejection::TakeProfitNotValid)?;
            let valid = price > Decimal::ZERO
                && match side {
                    OrderSide::Buy => price > check_price,
                    OrderSide::Sell => price < check_price,
                };
            if !valid {
                return Err(Rejection::TakeProfitNotValid);
            }
            tp_sl.take_profit = Some(TpSlLeg { price, trigger });
        }

        if let Some(price) = stop_loss {
            let trigger =
                parse_trigger(&request.stop_loss_trigger).ok_or(Rejection::StopLossNotValid)?;
            let valid = price > Decimal::ZERO
                && match side {
                    OrderSide::Buy => price < check_price,
                    OrderSide::Sell => price > check_price,
                };
            if !valid {
                return Err(Rejection::StopLossNotValid);
            }
            tp_sl.stop_loss = Some(TpSlLeg { price, trigger });
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━ 9. 최종 유형 ━━━━━━━━━━━━━━━━━━━━
    let branch = selected?;
    let is_hidden = request.is_hidden.unwrap_or(false);
    let mut is_reduce_only = request.is_reduce_only.unwrap_or(false);
    let price = || limit_price.ok_or(Rejection::LimitPrice);
    let stop = || stop_trigger(stop_price, &request);

    let (kind, time_in_force) = match branch {
        Branch::TrailingStop => {
            let callback_rate = request
                .callback_rate
                .as_deref()
                .and_then(parse_decimal)
                .ok_or_else(|| Rejection::TrailingStop("callback rate is required".to_string()))?;
            if callback_rate < Decimal::new(1, 1) || callback_rate > Decimal::new(5, 0) {
                return Err(Rejection::TrailingStop(format!(
                    "callback rate {} must be between 0.1 and 5",
                    callback_rate
                )));
            }
            if activation_price.is_some_and(|p| p <= Decimal::ZERO) {
                return Err(Rejection::TrailingStop(
                    "activation price must be positive".to_string(),
                ));
            }
            let trigger = parse_trigger(&request.trigger).ok_or(Rejection::Trigger)?;

            (
                OrderKind::TrailingStop {
                    callback_rate,
                    activation_price,
                    trigger,
                },
                TimeInForce::Ioc,
            )
        }
        Branch::PostOnlyLimit => {
            if limit_tif != TimeInForce::Gtc {
                return Err(Rejection::PostOnly(format!(
                    "time in force must be GTC, got {}",
                    limit_tif
                )));
            }
            (
                OrderKind::PostOnlyLimit {
                    price: price()?,
                    is_hidden,
                    tp_sl,
                },
                TimeInForce::Gtc,
            )
        }
        Branch::StopLimit => (
            OrderKind::StopLimit {
                price: price()?,
                stop: stop()?,
                is_hidden,
                tp_sl,
            },
            limit_tif,
        ),
        Branch::StopMarket => (
            OrderKind::StopMarket {
                stop: stop()?,
                tp_sl,
            },
            TimeInForce::Ioc,
        ),
        Branch::TakeProfitLimit => {
            is_reduce_only = true;
            (
                OrderKind::TakeProfitLimit {
                    price: price()?,
                    stop: stop()?,
                },
                limit_tif,
            )
        }
        Branch::StopLossLimit => {
            is_reduce_only = true;
            (
                OrderKind::StopLossLimit {
                    price: price()?,
                    stop: stop()?,
                },
                limit_tif,
            )
        }
        Branch::TakeProfitMarket => {
            is_reduce_only = true;
            (OrderKind::TakeProfitMarket { stop: stop()? }, TimeInForce::Ioc)
        }
        Branch::StopLossMarket => {
            is_reduce_only = true;
            (OrderKind::StopLossMarket { stop: stop()? }, TimeInForce::Ioc)
        }
        Branch::Limit => (
            OrderKind::Limit {
                price: price()?,
                is_hidden,
                tp_sl,
            },
            limit_tif,
        ),
        Branch::Market => (OrderKind::Market { tp_sl }, TimeInForce::Ioc),
    };

    Ok(NormalizedOrder {
        user_id,
        account_id: ctx.account.id,
        user_email: ctx.account.user_email.clone(),
        symbol: instrument.symbol.clone(),
        asset: ctx.account.asset.clone(),
        instrument_id: instrument.id,
        contract_type: instrument.contract_type,
        side,
        quantity,
        remaining: quantity,
        leverage,
        margin_mode: ctx.margin_mode.margin_mode,
        status: OrderStatus::Pending,
        time_in_force,
        tmp_id,
        is_reduce_only,
        cost,
        kind,
    })
}

/// 선택적 decimal 필드 파싱 (값이 있는데 파싱 실패면 `err`)
fn parse_optional(value: &Option<String>, err: Rejection) -> Result<Option<Decimal>, Rejection> {
    match value.as_deref() {
        Some(raw) => parse_decimal(raw).map(Some).ok_or(err),
        None => Ok(None),
    }
}

fn parse_trigger(value: &Option<String>) -> Option<OrderTrigger> {
    value.as_deref().and_then(OrderTrigger::parse)
}

/// 기준가 × 비율 (범위 초과 시 가격 범위 거부)
fn bound(base: Decimal, ratio: Decimal) -> Result<Decimal, Rejection> {
    base.checked_mul(ratio)
        .ok_or_else(|| Rejection::PriceOutOfRange(format!("reference price {} is out of range", base)))
}

/// 발동 가격 필수 + 0 초과
fn require_stop(stop_price: Option<Decimal>) -> Result<Decimal, Rejection> {
    stop_price
        .filter(|p| *p > Decimal::ZERO)
        .ok_or(Rejection::StopPrice)
}

fn stop_trigger(
    stop_price: Option<Decimal>,
    request: &CreateOrderRequest,
) -> Result<StopTrigger, Rejection> {
    let price = require_stop(stop_price)?;
    let trigger = parse_trigger(&request.trigger).ok_or(Rejection::Trigger)?;
    let condition = request
        .stop_condition
        .as_deref()
        .and_then(StopCondition::parse)
        .ok_or(Rejection::StopCondition)?;

    Ok(StopTrigger {
        price,
        trigger,
        condition,
    })
}

/// 주문 검증기
/// Gathers market data, balance and position, then runs `classify`
///
/// 거부 시 ErrorQueue 에 정확히 한 건을 적재하고 `Ok(None)` 반환.
/// 저장소 장애만 `Err` 로 전파.
pub struct OrderValidator {
    market: MarketData,
    accounts: Arc<dyn AccountStore>,
    positions: Arc<dyn PositionStore>,
    estimator: Arc<dyn CostEstimator>,
    errors: ErrorQueue,
    config: ClassifierConfig,
}

impl OrderValidator {
    pub fn new(
        market: MarketData,
        accounts: Arc<dyn AccountStore>,
        positions: Arc<dyn PositionStore>,
        estimator: Arc<dyn CostEstimator>,
        errors: ErrorQueue,
        config: ClassifierConfig,
    ) -> Self {
        Self {
            market,
            accounts,
            positions,
            estimator,
            errors,
            config,
        }
    }

    pub async fn validate(
        &self,
        request: CreateOrderRequest,
        user_id: u64,
        tmp_id: Option<String>,
        ctx: &OrderContext,
    ) -> Result<Option<NormalizedOrder>> {
        let symbol = ctx.instrument.symbol.as_str();

        let (mark_price, last_price) =
            tokio::join!(self.market.mark_price(symbol), self.market.last_price(symbol));

        // 봇은 잔고 검사를 하지 않으므로 조회 생략
        let (available_balance, position) = if ctx.is_bot {
            (Decimal::ZERO, None)
        } else {
            tokio::try_join!(
                self.accounts.available_balance(&ctx.account),
                self.positions.find_position(user_id, symbol),
            )
            .context("Failed to load balance and position")?
        };

        let snapshot = MarketSnapshot {
            mark_price,
            last_price,
            available_balance,
            position,
        };

        match classify(
            request,
            user_id,
            tmp_id,
            ctx,
            &snapshot,
            self.estimator.as_ref(),
            &self.config,
        ) {
            Ok(order) => Ok(Some(order)),
            Err(rejection) => {
                debug!(
                    user_id,
                    symbol,
                    code = rejection.code(),
                    "[Order Validator] rejected: {}",
                    rejection
                );
                self.errors.reject(user_id, &rejection);
                Ok(None)
            }
        }
    }
}
