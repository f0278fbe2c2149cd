/// ID 생성기
/// ID Generator
///
/// 역할:
/// - 주문 ID 사전 할당 (부모 / 자식 주문 상호 참조를 저장 전에 확정)
/// - Atomic counter를 사용하여 스레드 안전하게 ID 생성
///
/// 초기화:
/// 서버 시작 시 저장소의 마지막 주문 ID를 읽어와서 초기화
/// (서버 재시작 시에도 ID가 중복되지 않도록)
///
/// ```rust
/// use order_intake::shared::utils::IdGenerator;
///
/// let ids = IdGenerator::starting_after(41);
/// assert_eq!(ids.next(), 42);
/// assert_eq!(ids.next(), 43);
/// ```
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    /// 1부터 시작하는 생성기
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// 마지막으로 사용된 ID 다음부터 발급
    /// Start issuing ids right after `last_id`
    pub fn starting_after(last_id: u64) -> Self {
        Self {
            counter: AtomicU64::new(last_id + 1),
        }
    }

    /// 다음 주문 ID 생성
    /// Generate next order ID
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }

    /// 현재 ID 값 조회 (디버깅용)
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
