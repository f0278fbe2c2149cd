//! 파생상품 거래소 주문 접수 파이프라인
//! Order intake and validation pipeline for a derivatives venue
//!
//! 토픽에서 주문 명령을 소비 → 계정/상품/마진 모드 조회 → 주문 분류/검증 →
//! 부모/자식(TP/SL) 주문 저장 → 심볼별 매칭 엔진으로 라우팅.

pub mod domains;
pub mod shared;
