use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{TopicMessage, TopicSink, TopicSource};

/// 채널 기반 인메모리 토픽 생성
/// Create an in-process topic backed by an unbounded channel
///
/// Producer 를 모두 drop 하면 Source 의 recv() 가 None 을 반환함.
pub fn channel_topic(topic: &str) -> (ChannelProducer, ChannelSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    let committed = Arc::new(Mutex::new(Vec::new()));

    let producer = ChannelProducer {
        topic: topic.to_string(),
        tx,
        next_offset: Arc::new(AtomicU64::new(0)),
        committed: committed.clone(),
    };
    let source = ChannelSource { rx, committed };

    (producer, source)
}

/// 인메모리 토픽 생산자 (테스트 / 로컬 실행용)
#[derive(Clone)]
pub struct ChannelProducer {
    topic: String,
    tx: mpsc::UnboundedSender<TopicMessage>,
    next_offset: Arc<AtomicU64>,
    committed: Arc<Mutex<Vec<u64>>>,
}

impl ChannelProducer {
    /// 메시지 발행, 할당된 offset 반환
    pub fn send(&self, payload: impl Into<String>) -> Result<u64> {
        let offset = self.next_offset.fetch_add(1, Ordering::SeqCst);
        self.tx
            .send(TopicMessage {
                topic: self.topic.clone(),
                offset,
                payload: payload.into(),
            })
            .map_err(|_| anyhow::anyhow!("Topic {} is closed", self.topic))?;
        Ok(offset)
    }

    /// 소비자가 커밋한 offset 목록
    pub fn committed(&self) -> Vec<u64> {
        self.committed.lock().clone()
    }

    /// 커밋 기록 핸들 (Producer 를 drop 한 뒤에도 조회 가능)
    pub fn commit_log(&self) -> CommitLog {
        CommitLog(self.committed.clone())
    }
}

/// 커밋된 offset 조회 핸들
#[derive(Clone)]
pub struct CommitLog(Arc<Mutex<Vec<u64>>>);

impl CommitLog {
    pub fn offsets(&self) -> Vec<u64> {
        self.0.lock().clone()
    }
}

/// 인메모리 토픽 소비자
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<TopicMessage>,
    committed: Arc<Mutex<Vec<u64>>>,
}

#[async_trait]
impl TopicSource for ChannelSource {
    async fn recv(&mut self) -> Result<Option<TopicMessage>> {
        Ok(self.rx.recv().await)
    }

    async fn commit(&mut self, offset: u64) -> Result<()> {
        self.committed.lock().push(offset);
        Ok(())
    }
}

/// 생산된 메시지를 기록만 하는 Sink
#[derive(Default)]
pub struct MemorySink {
    produced: Mutex<Vec<(String, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// (topic, payload) 목록
    pub fn produced(&self) -> Vec<(String, String)> {
        self.produced.lock().clone()
    }
}

#[async_trait]
impl TopicSink for MemorySink {
    async fn produce(&self, topic: &str, payload: String) -> Result<()> {
        self.produced.lock().push((topic.to_string(), payload));
        Ok(())
    }
}
