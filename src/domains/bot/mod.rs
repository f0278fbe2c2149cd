/// Bot 모듈
/// Bot Module
///
/// 역할:
/// - 사용자 시장가 주문을 받으면 외부 레퍼런스 가격으로 봇 반대 주문 생성
/// - 반대 주문 생성 중에는 봇 자동 주문 억제 플래그를 캐시에 설정
///
/// 구조:
/// - `services/reference_price.rs`: 바이낸스 레퍼런스 가격 조회
/// - `services/counter_order.rs`: 사용자 시장가 주문 + 반대 주문 처리
/// - `models/config.rs`: 봇 설정 (봇 계정, 여유분 비율 등)
pub mod models;
pub mod services;
