// =====================================================
// IntakeScheduler - 명령 접수 / 배치 처리 / drain 프로토콜
// =====================================================
// 명령 한 건 접수 시 (on_command):
// 1. 종료 플래그가 켜져 있으면 Suspended (ack 하지 않음)
// 2. 종료 명령(STOP_SAVE_ORDERS_FROM_CLIENT) + 첫 메시지 이후 10초 경과
//    → 종료 플래그 ON, 배치 크기 확대
// 3. 내부 큐가 high-water mark(100,000) 이상이면 100ms 대기 후 진행
// 4. Inline: 즉시 처리 / Batched: 큐에 적재
//
// 백그라운드 타이머 (start):
// - 50ms:  에러 알림 전달 + (배치 모드) 큐에서 batch_size 만큼 처리
//          처리 중 에러/패닉은 로그만 남기고 타이머는 계속 동작
// - 500ms: 종료 플래그 ON + 실행 중 핸들러 없음 + 큐 비어있음 → drained
// =====================================================

use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::processor::{CommandProcessor, ProcessOutcome};
use crate::domains::order::models::RawOrderCommand;
use crate::domains::order::services::{ErrorQueue, Notifier};
use crate::shared::config::{IntakeConfig, IntakeMode};
use crate::shared::errors::IntakeError;

/// on_command 결과
#[derive(Debug)]
pub enum Admission {
    /// Inline 모드에서 즉시 처리됨
    Processed(ProcessOutcome),
    /// Batched 모드에서 큐에 적재됨
    Enqueued,
    /// 종료 제어 명령 (주문 아님)
    Control,
    /// 종료 중 → 소비자는 ack 하지 않고 멈춰야 함
    Suspended,
}

/// 접수 스케줄러 (clone 시 같은 상태 공유)
#[derive(Clone)]
pub struct IntakeScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    processor: Arc<dyn CommandProcessor>,
    errors: ErrorQueue,
    notifier: Arc<dyn Notifier>,
    config: IntakeConfig,

    queue: Mutex<VecDeque<RawOrderCommand>>,
    first_seen: OnceLock<Instant>,
    batch_size: AtomicUsize,

    /// 실행 중인 핸들러 ID
    inflight: Mutex<HashSet<u64>>,
    next_handler_id: AtomicU64,

    /// 종료 플래그
    shutdown: CancellationToken,
    /// drain 완료 신호
    drained: CancellationToken,
    /// 타이머 정지
    stop: CancellationToken,
}

/// 실행 중 핸들러 등록 (drop 시 해제)
struct InflightGuard {
    inner: Arc<Inner>,
    id: u64,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inner.inflight.lock().remove(&self.id);
    }
}

impl IntakeScheduler {
    pub fn new(
        name: impl Into<String>,
        processor: Arc<dyn CommandProcessor>,
        errors: ErrorQueue,
        notifier: Arc<dyn Notifier>,
        config: IntakeConfig,
    ) -> Self {
        let batch_size = config.batch_size;
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                processor,
                errors,
                notifier,
                config,
                queue: Mutex::new(VecDeque::new()),
                first_seen: OnceLock::new(),
                batch_size: AtomicUsize::new(batch_size),
                inflight: Mutex::new(HashSet::new()),
                next_handler_id: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
                drained: CancellationToken::new(),
                stop: CancellationToken::new(),
            }),
        }
    }

    /// 명령 한 건 접수
    /// Admit one consumed command
    ///
    /// # Returns
    /// * `Ok(Admission)` - 소비자는 Suspended 가 아니면 ack
    /// * `Err(IntakeError)` - 인프라 장애 (ack 여부는 소비자가 결정)
    pub async fn on_command(&self, command: RawOrderCommand) -> Result<Admission, IntakeError> {
        let inner = &self.inner;

        // ━━━━━━━━━━━━━━━━━━━━ 1. 종료 중이면 멈춤 ━━━━━━━━━━━━━━━━━━━━
        if inner.shutdown.is_cancelled() {
            return Ok(Admission::Suspended);
        }

        let first_seen = *inner.first_seen.get_or_init(Instant::now);

        // ━━━━━━━━━━━━━━━━━━━━ 2. 종료 제어 명령 ━━━━━━━━━━━━━━━━━━━━
        if command.is_shutdown_sentinel() {
            if first_seen.elapsed() >= inner.config.shutdown_grace {
                self.begin_shutdown();
            } else {
                info!(
                    scheduler = %inner.name,
                    "[Intake Scheduler] shutdown command ignored, grace period not elapsed"
                );
            }
            return Ok(Admission::Control);
        }

        // ━━━━━━━━━━━━━━━━━━━━ 3. backpressure ━━━━━━━━━━━━━━━━━━━━
        let queued = inner.queue.lock().len();
        if queued >= inner.config.high_water_mark {
            warn!(
                scheduler = %inner.name,
                queued,
                "[Intake Scheduler] queue above high-water mark, pausing intake"
            );
            tokio::time::sleep(inner.config.backpressure_pause).await;
        }

        // ━━━━━━━━━━━━━━━━━━━━ 4. 처리 / 적재 ━━━━━━━━━━━━━━━━━━━━
        match inner.config.mode {
            IntakeMode::Inline => {
                let _guard = self.enter();
                let outcome = inner.processor.process(command).await?;
                Ok(Admission::Processed(outcome))
            }
            IntakeMode::Batched => {
                inner.queue.lock().push_back(command);
                Ok(Admission::Enqueued)
            }
        }
    }

    /// 종료 플래그 ON + 배치 크기 확대
    pub fn begin_shutdown(&self) {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return;
        }
        inner.shutdown.cancel();
        inner
            .batch_size
            .store(inner.config.drain_batch_size, Ordering::SeqCst);

        info!(
            scheduler = %inner.name,
            queued = self.queue_len(),
            batch_size = inner.config.drain_batch_size,
            "[Intake Scheduler] shutdown flag set, draining"
        );
    }

    /// 백그라운드 타이머 시작 (drain 타이머, 종료 확인 타이머)
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let drain = self.clone();
        let exit = self.clone();
        vec![
            tokio::spawn(async move { drain.run_drain_timer().await }),
            tokio::spawn(async move { exit.run_exit_timer().await }),
        ]
    }

    /// 타이머 정지
    pub fn stop(&self) {
        self.inner.stop.cancel();
    }

    /// drain 완료까지 대기
    pub async fn wait_drained(&self) {
        self.inner.drained.cancelled().await;
    }

    pub fn is_drained(&self) -> bool {
        self.inner.drained.is_cancelled()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn batch_size(&self) -> usize {
        self.inner.batch_size.load(Ordering::SeqCst)
    }

    pub fn inflight(&self) -> usize {
        self.inner.inflight.lock().len()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn enter(&self) -> InflightGuard {
        let id = self.inner.next_handler_id.fetch_add(1, Ordering::SeqCst);
        self.inner.inflight.lock().insert(id);
        InflightGuard {
            inner: self.inner.clone(),
            id,
        }
    }

    async fn run_drain_timer(self) {
        let mut ticker = interval(self.inner.config.drain_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.inner.stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // 핸들러 에러 / 패닉이 타이머를 멈추지 않도록 격리
            if AssertUnwindSafe(self.drain_tick()).catch_unwind().await.is_err() {
                error!(
                    scheduler = %self.inner.name,
                    "[Intake Scheduler] drain tick panicked"
                );
            }
        }
    }

    /// 주기 작업 한 번
    /// One periodic pass: deliver queued errors, then process a command batch
    ///
    /// 알림 전송 실패는 명령 처리를 막지 않음. 에러는 큐 앞에 되돌려 다음 주기에 재전송.
    pub async fn drain_tick(&self) {
        let inner = &self.inner;
        let _guard = self.enter();

        // ━━━━━━━━━━━━━━━━━━━━ 1. 에러 알림 ━━━━━━━━━━━━━━━━━━━━
        let errors = inner.errors.drain(inner.config.error_batch_size);
        if !errors.is_empty() {
            let count = errors.len();
            if let Err(e) = inner.notifier.notify(&errors).await {
                inner.errors.requeue_front(errors);
                warn!(
                    scheduler = %inner.name,
                    count,
                    "[Intake Scheduler] failed to deliver error notifications: {:#}",
                    e
                );
            }
        }

        // ━━━━━━━━━━━━━━━━━━━━ 2. 명령 배치 ━━━━━━━━━━━━━━━━━━━━
        let batch: Vec<RawOrderCommand> = {
            let mut queue = inner.queue.lock();
            let n = self.batch_size().min(queue.len());
            queue.drain(..n).collect()
        };

        for command in batch {
            let user_id = command.user_id;
            let tmp_order_id = command.tmp_order_id.clone();
            match inner.processor.process(command).await {
                Ok(outcome) => debug!(
                    scheduler = %inner.name,
                    user_id,
                    ?tmp_order_id,
                    routed = matches!(outcome, ProcessOutcome::Routed(_)),
                    "[Intake Scheduler] batched command processed"
                ),
                Err(e) => error!(
                    scheduler = %inner.name,
                    user_id,
                    ?tmp_order_id,
                    "[Intake Scheduler] batched command failed: {:#}",
                    e
                ),
            }
        }
    }

    async fn run_exit_timer(self) {
        let mut ticker = interval(self.inner.config.exit_check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.inner.stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self.is_shutting_down() && self.inflight() == 0 && self.queue_len() == 0 {
                self.flush_errors().await;
                info!(scheduler = %self.inner.name, "[Intake Scheduler] drain complete");
                self.inner.drained.cancel();
                self.inner.stop.cancel();
                break;
            }
        }
    }

    /// 남은 에러 알림 모두 전달 (실패 시 로그만)
    async fn flush_errors(&self) {
        let inner = &self.inner;
        let errors = inner.errors.drain(usize::MAX);
        if errors.is_empty() {
            return;
        }
        if let Err(e) = inner.notifier.notify(&errors).await {
            error!(
                scheduler = %inner.name,
                dropped = errors.len(),
                "[Intake Scheduler] failed to flush error notifications: {:#}",
                e
            );
        }
    }
}
