// =====================================================
// TopicConsumer - 토픽 소비 루프
// =====================================================
// 메시지 한 건씩 디코드 → 스케줄러에 전달 → 결과에 따라 commit
//
// - 디코드 실패:        로그 후 commit (재시도해도 같은 결과)
// - Suspended (종료 중): commit 하지 않고 루프 종료
// - 인프라 장애 (Err):   로그 후 commit 하지 않음
// - 그 외:              commit
//
// run_to_drain: 루프가 어떤 식으로 끝나든 (panic 포함) 스케줄러를 drain 상태로 넘김
// =====================================================

use std::panic::AssertUnwindSafe;

use anyhow::{Result, anyhow};
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::scheduler::{Admission, IntakeScheduler};
use crate::domains::order::models::RawOrderCommand;
use crate::shared::errors::IntakeError;
use crate::shared::topic::TopicSource;

/// 소비 루프 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerExit {
    /// 외부 취소 (Ctrl+C 등)
    Cancelled,
    /// 스트림 끝
    EndOfStream,
    /// 종료 플래그로 인해 멈춤
    Suspended,
}

pub struct TopicConsumer<S> {
    source: S,
    scheduler: IntakeScheduler,
    cancel: CancellationToken,
}

impl<S: TopicSource> TopicConsumer<S> {
    pub fn new(source: S, scheduler: IntakeScheduler, cancel: CancellationToken) -> Self {
        Self {
            source,
            scheduler,
            cancel,
        }
    }

    /// 소비 루프 실행 후 스케줄러 종료 시작
    /// Runs the loop, then always flips the scheduler into draining
    ///
    /// 루프가 panic 해도 begin_shutdown 은 호출됨. panic 은 Err 로 변환.
    pub async fn run_to_drain(self) -> Result<ConsumerExit> {
        let scheduler = self.scheduler.clone();
        let exit = AssertUnwindSafe(self.run())
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(anyhow!("consumer loop for {} panicked", scheduler.name())));

        scheduler.begin_shutdown();
        exit
    }

    /// 소비 루프 실행
    pub async fn run(mut self) -> Result<ConsumerExit> {
        let name = self.scheduler.name().to_string();
        info!(scheduler = %name, "[Topic Consumer] started");

        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(scheduler = %name, "[Topic Consumer] cancelled");
                    return Ok(ConsumerExit::Cancelled);
                }
                received = self.source.recv() => received?,
            };

            let Some(message) = received else {
                info!(scheduler = %name, "[Topic Consumer] end of stream");
                return Ok(ConsumerExit::EndOfStream);
            };
            let offset = message.offset;

            let command = match serde_json::from_str::<RawOrderCommand>(&message.payload) {
                Ok(command) => command,
                Err(e) => {
                    let err = IntakeError::Decode {
                        offset,
                        reason: e.to_string(),
                    };
                    warn!(scheduler = %name, topic = %message.topic, "[Topic Consumer] {}", err);
                    self.source.commit(offset).await?;
                    continue;
                }
            };

            let user_id = command.user_id;
            let tmp_order_id = command.tmp_order_id.clone();

            match self.scheduler.on_command(command).await {
                Ok(Admission::Suspended) => {
                    info!(
                        scheduler = %name,
                        offset,
                        "[Topic Consumer] shutdown in progress, message left unacknowledged"
                    );
                    return Ok(ConsumerExit::Suspended);
                }
                Ok(admission) => {
                    debug!(scheduler = %name, offset, ?admission, "[Topic Consumer] admitted");
                    self.source.commit(offset).await?;
                }
                Err(e) => {
                    error!(
                        scheduler = %name,
                        offset,
                        user_id,
                        ?tmp_order_id,
                        "[Topic Consumer] command failed, not acknowledged: {:#}",
                        anyhow::Error::new(e)
                    );
                }
            }
        }
    }
}
