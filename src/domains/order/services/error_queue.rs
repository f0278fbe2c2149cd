// =====================================================
// ErrorQueue - 사용자 에러 알림 큐
// =====================================================
// 역할: 주문 거부를 예외 대신 큐에 쌓고, 스케줄러가 주기적으로
//       Notifier 로 전달
//
// 주문 처리 성공/실패 경로와 분리된 side channel
// =====================================================

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::warn;

use crate::domains::order::models::{OrderError, Rejection};

/// 에러 알림 FIFO 큐 (clone 시 같은 큐 공유)
#[derive(Clone, Default)]
pub struct ErrorQueue {
    inner: Arc<Mutex<VecDeque<OrderError>>>,
}

impl ErrorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, error: OrderError) {
        self.inner.lock().push_back(error);
    }

    /// 거부 사유를 에러 레코드로 변환해서 적재
    pub fn reject(&self, user_id: u64, rejection: &Rejection) {
        self.push(OrderError::from_rejection(user_id, rejection));
    }

    /// 앞에서부터 최대 `max` 개 꺼내기
    pub fn drain(&self, max: usize) -> Vec<OrderError> {
        let mut queue = self.inner.lock();
        let n = max.min(queue.len());
        queue.drain(..n).collect()
    }

    /// 전달 실패한 묶음을 순서 그대로 앞에 되돌림
    pub fn requeue_front(&self, errors: Vec<OrderError>) {
        let mut queue = self.inner.lock();
        for error in errors.into_iter().rev() {
            queue.push_front(error);
        }
    }

    /// 큐 내용 복사 (테스트 / 디버깅용)
    pub fn snapshot(&self) -> Vec<OrderError> {
        self.inner.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// 에러 알림 전달 trait
/// Delivers drained errors to users
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, errors: &[OrderError]) -> Result<()>;
}

/// HTTP 알림 (소켓 서버의 내부 엔드포인트로 POST)
pub struct HttpNotifier {
    http_client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http_client, url })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, errors: &[OrderError]) -> Result<()> {
        let response = self
            .http_client
            .post(&self.url)
            .json(errors)
            .send()
            .await
            .context("Failed to send error notifications")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Notification endpoint returned error: {} - {}", status, body);
        }

        Ok(())
    }
}

/// 로그로만 출력하는 Notifier (NOTIFICATION_URL 미설정 시)
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, errors: &[OrderError]) -> Result<()> {
        for error in errors {
            warn!(
                user_id = error.user_id,
                code = %error.code,
                "[Order Error] {}",
                error.message
            );
        }
        Ok(())
    }
}
