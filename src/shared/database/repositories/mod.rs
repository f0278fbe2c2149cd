// PostgreSQL repositories
pub mod order_repository;
pub mod account_repository;
pub mod instrument_repository;
pub mod position_repository;

pub use order_repository::*;
pub use account_repository::*;
pub use instrument_repository::*;
pub use position_repository::*;

use anyhow::{Result, anyhow};

/// 문자열 컬럼 → enum 변환 (알 수 없는 값이면 에러)
pub(crate) fn parse_column<T>(value: &str, column: &str, parse: fn(&str) -> Option<T>) -> Result<T> {
    parse(value).ok_or_else(|| anyhow!("Unexpected value in column {}: {}", column, value))
}

/// 선택적 문자열 컬럼 → Option<enum>
pub(crate) fn parse_optional_column<T>(
    value: Option<String>,
    column: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>> {
    value.map(|v| parse_column(&v, column, parse)).transpose()
}
