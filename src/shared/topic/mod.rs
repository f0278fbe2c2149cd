// =====================================================
// Topic (메시지 로그) 추상화
// =====================================================
// 역할: 상위 메시지 로그에서 명령 소비 / 매칭 엔진 토픽으로 명령 생산
//
// 소비 규칙 (at-least-once):
// - recv() 로 받은 메시지는 commit(offset) 전까지 재전달될 수 있음
// - commit 하지 않은 메시지는 재시작 시 다시 처리됨
// =====================================================

pub mod channel;
pub mod json_lines;

pub use channel::*;
pub use json_lines::*;

use anyhow::Result;
use async_trait::async_trait;

/// 토픽에서 받은 메시지 한 건
#[derive(Debug, Clone)]
pub struct TopicMessage {
    pub topic: String,
    pub offset: u64,
    pub payload: String,
}

/// 토픽 소비자 (consumer group 하나)
/// Topic consumer
#[async_trait]
pub trait TopicSource: Send {
    /// 다음 메시지 수신 (스트림 종료 시 None)
    async fn recv(&mut self) -> Result<Option<TopicMessage>>;

    /// 처리 완료 offset 커밋 (ack)
    async fn commit(&mut self, offset: u64) -> Result<()>;
}

/// 토픽 생산자
/// Topic producer
#[async_trait]
pub trait TopicSink: Send + Sync {
    async fn produce(&self, topic: &str, payload: String) -> Result<()>;
}
