use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::debug;

use super::{TopicMessage, TopicSink, TopicSource};

type BoxedReader = Box<dyn AsyncBufRead + Unpin + Send>;

/// JSON Lines 토픽 소비자
/// Reads one JSON payload per line from a file or stdin
///
/// offset = 0부터 시작하는 줄 번호 (빈 줄 제외)
pub struct JsonLinesSource {
    topic: String,
    lines: Lines<BoxedReader>,
    next_offset: u64,
    committed: Option<u64>,
}

impl JsonLinesSource {
    pub fn new(topic: &str, reader: BoxedReader) -> Self {
        Self {
            topic: topic.to_string(),
            lines: reader.lines(),
            next_offset: 0,
            committed: None,
        }
    }

    /// 파일에서 읽기
    pub async fn open(topic: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open topic file: {}", path.display()))?;
        Ok(Self::new(topic, Box::new(BufReader::new(file))))
    }

    /// 표준 입력에서 읽기
    pub fn stdin(topic: &str) -> Self {
        Self::new(topic, Box::new(BufReader::new(tokio::io::stdin())))
    }

    /// 마지막으로 커밋된 offset
    pub fn committed(&self) -> Option<u64> {
        self.committed
    }
}

#[async_trait]
impl TopicSource for JsonLinesSource {
    async fn recv(&mut self) -> Result<Option<TopicMessage>> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .with_context(|| format!("Failed to read from topic {}", self.topic))?;

            let Some(line) = line else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }

            let offset = self.next_offset;
            self.next_offset += 1;
            return Ok(Some(TopicMessage {
                topic: self.topic.clone(),
                offset,
                payload: line,
            }));
        }
    }

    async fn commit(&mut self, offset: u64) -> Result<()> {
        debug!(topic = %self.topic, offset, "offset committed");
        self.committed = Some(offset);
        Ok(())
    }
}

/// JSON Lines 토픽 생산자
/// Writes `{"topic": ..., "payload": ...}` per line
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl JsonLinesSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> TopicSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn produce(&self, topic: &str, payload: String) -> Result<()> {
        let payload: Value =
            serde_json::from_str(&payload).context("Routed payload is not valid JSON")?;
        let mut line = serde_json::to_vec(&json!({ "topic": topic, "payload": payload }))
            .context("Failed to serialize routed message")?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .context("Failed to write routed message")?;
        writer.flush().await.context("Failed to flush routed message")?;
        Ok(())
    }
}
