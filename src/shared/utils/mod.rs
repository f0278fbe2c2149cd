/// 공유 유틸리티 모듈
/// Shared Utilities Module
///
/// 역할:
/// - ID 생성기 (Order ID 사전 할당)
/// - 고정 소수점 문자열 정규화 / 정밀도 검사
pub mod id_generator;
pub mod decimal;

pub use id_generator::*;
pub use decimal::*;
