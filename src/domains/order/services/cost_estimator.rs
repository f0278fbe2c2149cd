// =====================================================
// 주문 비용 / 증거금 계산
// =====================================================
// 분류기는 계산식을 모름. CostEstimator 가 돌려준 값만 잔고와 비교.
//
// LinearCostEstimator (선형 계약 기본식):
//   notional = quantity × reference_price
//   margin   = (quantity - 반대 포지션 상쇄 수량) × reference_price / leverage
//   fee      = notional × taker_fee_rate
//   cost     = margin + fee
//
// 모든 연산은 checked. Decimal 범위를 넘으면 None.
// =====================================================

use rust_decimal::Decimal;

use crate::domains::order::models::{Instrument, OrderSide, Position};

/// 비용 계산 입력
pub struct CostInput<'a> {
    pub side: OrderSide,
    pub quantity: Decimal,
    /// 지정가 주문은 주문 가격, 시장가 주문은 마크 가격
    pub reference_price: Decimal,
    pub leverage: Decimal,
    pub position: Option<&'a Position>,
    pub instrument: &'a Instrument,
}

/// 비용 계산 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostEstimate {
    /// 잔고와 비교할 총 비용 (증거금 + 수수료)
    pub cost: Decimal,
    /// 주문 증거금
    pub margin: Decimal,
}

/// 주문 비용 계산기
pub trait CostEstimator: Send + Sync {
    /// Decimal 범위를 넘으면 None
    fn estimate(&self, input: &CostInput<'_>) -> Option<CostEstimate>;
}

/// 선형(USD-M) 계약 비용 계산기
pub struct LinearCostEstimator {
    taker_fee_rate: Decimal,
}

impl LinearCostEstimator {
    pub fn new(taker_fee_rate: Decimal) -> Self {
        Self { taker_fee_rate }
    }
}

impl Default for LinearCostEstimator {
    /// 테이커 수수료 0.05%
    fn default() -> Self {
        Self::new(Decimal::new(5, 4))
    }
}

impl CostEstimator for LinearCostEstimator {
    fn estimate(&self, input: &CostInput<'_>) -> Option<CostEstimate> {
        let notional = input.quantity.checked_mul(input.reference_price)?;

        // 반대 방향 포지션을 줄이는 수량은 증거금 불필요
        let offset = match input.position {
            Some(position) if position.side != input.side => position.quantity.min(input.quantity),
            _ => Decimal::ZERO,
        };

        let leverage = if input.leverage > Decimal::ZERO {
            input.leverage
        } else {
            Decimal::ONE
        };

        let margin = (input.quantity - offset)
            .checked_mul(input.reference_price)?
            .checked_div(leverage)?;
        let fee = notional.checked_mul(self.taker_fee_rate)?;

        Some(CostEstimate {
            cost: margin.checked_add(fee)?,
            margin,
        })
    }
}

/// 고정 비용 계산기 (테스트 / 시뮬레이션용)
pub struct FixedCostEstimator {
    cost: Decimal,
}

impl FixedCostEstimator {
    pub fn new(cost: Decimal) -> Self {
        Self { cost }
    }
}

impl CostEstimator for FixedCostEstimator {
    fn estimate(&self, _input: &CostInput<'_>) -> Option<CostEstimate> {
        Some(CostEstimate {
            cost: self.cost,
            margin: self.cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::order::models::{ContractType, TradingRules};

    fn instrument() -> Instrument {
        Instrument {
            id: 1,
            symbol: "BTCUSDT".to_string(),
            contract_type: ContractType::UsdM,
            quote_asset: "USDT".to_string(),
            max_figures_for_size: 3,
            max_figures_for_price: 1,
            max_price: Decimal::new(1_000_000, 0),
            trading_rules: TradingRules {
                max_quantity_limit_order: Decimal::new(100, 0),
                max_quantity_market_order: Decimal::new(50, 0),
                cap_ratio: Decimal::new(105, 2),
                floor_ratio: Decimal::new(95, 2),
            },
        }
    }

    #[test]
    fn test_linear_cost_with_opposite_position_offset() {
        let instrument = instrument();
        let estimator = LinearCostEstimator::new(Decimal::ZERO);
        let position = Position {
            user_id: 1,
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Sell,
            quantity: Decimal::ONE,
            entry_price: Decimal::new(100, 0),
        };

        let input = CostInput {
            side: OrderSide::Buy,
            quantity: Decimal::new(3, 0),
            reference_price: Decimal::new(100, 0),
            leverage: Decimal::new(10, 0),
            position: Some(&position),
            instrument: &instrument,
        };

        // (3 - 1) × 100 / 10 = 20
        assert_eq!(estimator.estimate(&input).unwrap().cost, Decimal::new(20, 0));
    }

    #[test]
    fn test_linear_cost_includes_fee() {
        let instrument = instrument();
        let estimator = LinearCostEstimator::default();
        let input = CostInput {
            side: OrderSide::Buy,
            quantity: Decimal::ONE,
            reference_price: Decimal::new(1000, 0),
            leverage: Decimal::ONE,
            position: None,
            instrument: &instrument,
        };

        // 1000 + 1000 × 0.0005
        assert_eq!(estimator.estimate(&input).unwrap().cost, Decimal::new(10005, 1));
    }

    #[test]
    fn test_linear_cost_overflow_is_none() {
        let instrument = instrument();
        let estimator = LinearCostEstimator::default();
        let input = CostInput {
            side: OrderSide::Buy,
            quantity: Decimal::MAX,
            reference_price: Decimal::new(100, 0),
            leverage: Decimal::ONE,
            position: None,
            instrument: &instrument,
        };

        assert_eq!(estimator.estimate(&input), None);
    }
}
