// =====================================================
// Decimal 헬퍼
// =====================================================
// 역할: 클라이언트가 보낸 문자열 수량/가격을 고정 소수점으로 정규화
//
// 입력 형태:
// - "1.25"        일반 소수
// - "1e-7"        지수 표기 (JS 클라이언트에서 자주 옴)
// - "50%"         시장가 주문의 잔고 대비 비율
// =====================================================

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// rust_decimal 이 표현 가능한 최대 scale
const MAX_SCALE: u32 = 28;

/// 문자열 → Decimal (일반 / 지수 표기 모두 허용)
/// Parse plain or scientific notation into a Decimal
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.contains(['e', 'E']) {
        Decimal::from_scientific(trimmed).ok()
    } else {
        Decimal::from_str(trimmed).ok()
    }
}

/// "50%" 형태의 비율 수량 파싱
/// Returns the percentage part if the string carries a trailing `%`.
pub fn parse_percentage(raw: &str) -> Option<Decimal> {
    let stripped = raw.trim().strip_suffix('%')?;
    parse_decimal(stripped)
}

/// 소수점 이하 유효 자릿수 (뒤쪽 0 제외)
pub fn fraction_digits(value: &Decimal) -> u32 {
    value.normalize().scale()
}

/// 정밀도 검사
/// Precision check
///
/// 소수점 이하 자릿수가 `precision` 을 초과하면 true (= 검증 실패).
///
/// # Examples
/// ```
/// use rust_decimal::Decimal;
/// use order_intake::shared::utils::validate_precision;
///
/// assert!(validate_precision(Decimal::new(1234, 3), 2));   // 1.234 → 3자리 > 2
/// assert!(!validate_precision(Decimal::new(123, 2), 2));   // 1.23  → 2자리
/// ```
pub fn validate_precision(value: Decimal, precision: u32) -> bool {
    fraction_digits(&value) > precision
}

/// 해당 정밀도의 최소 단위 (1 / 10^precision)
pub fn min_step(precision: u32) -> Decimal {
    Decimal::new(1, precision.min(MAX_SCALE))
}

/// 0 방향 절사 (수량 계산 시 잔고 초과 방지)
pub fn round_down(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision.min(MAX_SCALE), RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scientific_notation() {
        assert_eq!(parse_decimal("1e-7"), Some(Decimal::new(1, 7)));
        assert_eq!(parse_decimal("2.5E3"), Some(Decimal::new(2500, 0)));
        assert_eq!(parse_decimal("0.010").map(|d| d.normalize().to_string()).as_deref(), Some("0.01"));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("  "), None);
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("50%"), Some(Decimal::new(50, 0)));
        assert_eq!(parse_percentage("12.5%"), Some(Decimal::new(125, 1)));
        assert_eq!(parse_percentage("50"), None);
    }

    #[test]
    fn test_validate_precision_boundary() {
        // 자릿수가 같으면 통과, 초과하면 실패
        assert!(!validate_precision(Decimal::from_str("0.001").unwrap(), 3));
        assert!(validate_precision(Decimal::from_str("0.0001").unwrap(), 3));
        // 뒤쪽 0 은 자릿수로 세지 않음
        assert!(!validate_precision(Decimal::from_str("0.1000").unwrap(), 1));
    }

    #[test]
    fn test_min_step_and_round_down() {
        assert_eq!(min_step(3), Decimal::from_str("0.001").unwrap());
        assert_eq!(min_step(0), Decimal::ONE);
        assert_eq!(
            round_down(Decimal::from_str("1.23789").unwrap(), 3),
            Decimal::from_str("1.237").unwrap()
        );
    }
}
