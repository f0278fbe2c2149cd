// =====================================================
// 매칭 엔진 라우터
// Matching Engine Router
// =====================================================
// 역할: 정규화된 주문을 심볼 담당 매칭 엔진으로 전달
//
// 전달 형식: `{code: PLACE_ORDER, data: OrderRecord}`
// 심볼 하나 = 논리적 목적지 하나 (같은 심볼 안에서는 전송 순서 유지)
//
// 구현체:
// - TopicRouter:    `{prefix}{symbol}` 토픽으로 produce
// - InMemoryRouter: 전달 내용 기록 + 실패 주입 (테스트용)
// =====================================================

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domains::order::models::OrderRecord;
use crate::shared::topic::TopicSink;

/// 주문 등록 명령 코드
pub const PLACE_ORDER: &str = "PLACE_ORDER";

/// 매칭 엔진으로 보내는 명령
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCommand {
    pub code: String,
    pub data: OrderRecord,
}

impl EngineCommand {
    pub fn place_order(order: OrderRecord) -> Self {
        Self {
            code: PLACE_ORDER.to_string(),
            data: order,
        }
    }
}

/// 매칭 엔진 라우터 인터페이스
#[async_trait]
pub trait MatchingEngineRouter: Send + Sync {
    /// 심볼 담당 매칭 엔진으로 명령 전달
    async fn route_command(&self, symbol: &str, command: EngineCommand) -> Result<()>;
}

/// 토픽 기반 라우터
pub struct TopicRouter {
    sink: Arc<dyn TopicSink>,
    topic_prefix: String,
}

impl TopicRouter {
    pub fn new(sink: Arc<dyn TopicSink>, topic_prefix: impl Into<String>) -> Self {
        Self {
            sink,
            topic_prefix: topic_prefix.into(),
        }
    }

    pub fn topic_for(&self, symbol: &str) -> String {
        format!("{}{}", self.topic_prefix, symbol)
    }
}

#[async_trait]
impl MatchingEngineRouter for TopicRouter {
    async fn route_command(&self, symbol: &str, command: EngineCommand) -> Result<()> {
        let topic = self.topic_for(symbol);
        let payload = serde_json::to_string(&command).context("Failed to serialize engine command")?;

        self.sink
            .produce(&topic, payload)
            .await
            .with_context(|| format!("Failed to produce to {}", topic))?;

        debug!(topic = %topic, order_id = command.data.id, code = %command.code, "routed");
        Ok(())
    }
}

/// 인메모리 라우터 (테스트용)
/// Records routed commands; can be told to fail for given order ids
#[derive(Default)]
pub struct InMemoryRouter {
    routed: Mutex<Vec<(String, EngineCommand)>>,
    fail_order_ids: Mutex<HashSet<u64>>,
}

impl InMemoryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 해당 주문 ID 라우팅 시 실패하도록 설정
    pub fn fail_on(&self, order_id: u64) {
        self.fail_order_ids.lock().insert(order_id);
    }

    /// (symbol, command) 전달 순서대로
    pub fn routed(&self) -> Vec<(String, EngineCommand)> {
        self.routed.lock().clone()
    }

    /// 전달된 주문 ID 순서
    pub fn routed_ids(&self) -> Vec<u64> {
        self.routed.lock().iter().map(|(_, c)| c.data.id).collect()
    }
}

#[async_trait]
impl MatchingEngineRouter for InMemoryRouter {
    async fn route_command(&self, symbol: &str, command: EngineCommand) -> Result<()> {
        if self.fail_order_ids.lock().contains(&command.data.id) {
            bail!("InMemoryRouter: routing failed for order {}", command.data.id);
        }
        self.routed.lock().push((symbol.to_string(), command));
        Ok(())
    }
}
