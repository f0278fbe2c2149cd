// =====================================================
// AppConfig - 프로세스 설정
// =====================================================
// 역할: 환경 변수에서 설정을 읽고, 없으면 기본값 사용
//
// 외부 의존성 선택:
//   - DATABASE_URL 없음 → InMemoryStore
//   - REDIS_URL 없음    → MemoryCache
//   - *_TOPIC_FILE 없음 → 표준 입력 (일반 주문 토픽만)
// =====================================================

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

/// 일반 주문 토픽 이름
pub const ORDER_TOPIC: &str = "save_order_from_client";

/// 사용자 시장가 주문 토픽 이름 (봇 반대 주문 경로)
pub const USER_MARKET_ORDER_TOPIC: &str = "save_user_market_order";

/// 명령 처리 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeMode {
    /// 메시지 수신 즉시 동기 처리
    Inline,
    /// 내부 큐에 쌓고 주기적으로 배치 처리
    Batched,
}

impl FromStr for IntakeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "batched" => Ok(Self::Batched),
            other => Err(format!("unknown intake mode: {}", other)),
        }
    }
}

/// 접수 스케줄러 설정
/// Intake scheduler settings
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub mode: IntakeMode,

    /// 주기당 처리할 명령 수 (배치 모드)
    pub batch_size: usize,

    /// 종료 신호 이후 주기당 처리할 명령 수
    pub drain_batch_size: usize,

    /// 주기당 전달할 에러 알림 수
    pub error_batch_size: usize,

    /// 내부 큐 high-water mark
    pub high_water_mark: usize,

    /// high-water mark 도달 시 대기 시간
    pub backpressure_pause: Duration,

    /// 배치/에러 drain 주기
    pub drain_interval: Duration,

    /// 종료 가능 여부 확인 주기
    pub exit_check_interval: Duration,

    /// 첫 메시지 이후 종료 명령을 받아들이기까지의 유예 시간
    pub shutdown_grace: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            mode: IntakeMode::Inline,
            batch_size: 100,
            drain_batch_size: 1000,
            error_batch_size: 100,
            high_water_mark: 100_000,
            backpressure_pause: Duration::from_millis(100),
            drain_interval: Duration::from_millis(50),
            exit_check_interval: Duration::from_millis(500),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl IntakeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            mode: env_or("INTAKE_MODE", defaults.mode),
            batch_size: env_or("INTAKE_BATCH_SIZE", defaults.batch_size),
            drain_batch_size: env_or("INTAKE_DRAIN_BATCH_SIZE", defaults.drain_batch_size),
            error_batch_size: env_or("INTAKE_ERROR_BATCH_SIZE", defaults.error_batch_size),
            high_water_mark: env_or("INTAKE_HIGH_WATER_MARK", defaults.high_water_mark),
            backpressure_pause: Duration::from_millis(env_or("INTAKE_BACKPRESSURE_PAUSE_MS", 100)),
            drain_interval: Duration::from_millis(env_or("INTAKE_DRAIN_INTERVAL_MS", 50)),
            exit_check_interval: Duration::from_millis(env_or("INTAKE_EXIT_CHECK_INTERVAL_MS", 500)),
            shutdown_grace: Duration::from_secs(env_or("INTAKE_SHUTDOWN_GRACE_SECS", 10)),
        }
    }
}

/// 프로세스 전체 설정
/// Process configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub order_topic_file: Option<PathBuf>,
    pub user_market_order_topic_file: Option<PathBuf>,
    pub intake: IntakeConfig,

    /// 계정 캐시 TTL (기본 60초)
    pub account_cache_ttl: Duration,

    /// 마진 모드가 없을 때의 레버리지
    pub default_leverage: Decimal,

    /// 100% 시장가 주문 시 남겨둘 비율 (%)
    pub market_percent_headroom: Decimal,

    /// 에러 알림 전송 URL (없으면 로그로만 출력)
    pub notification_url: Option<String>,

    /// 매칭 엔진 토픽 접두사 (`{prefix}{symbol}`)
    pub matching_engine_topic_prefix: String,
}

impl AppConfig {
    /// 환경변수에서 설정 로드
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            database_url: env_opt("DATABASE_URL"),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            redis_url: env_opt("REDIS_URL"),
            order_topic_file: env_opt("ORDER_TOPIC_FILE").map(PathBuf::from),
            user_market_order_topic_file: env_opt("USER_MARKET_ORDER_TOPIC_FILE").map(PathBuf::from),
            intake: IntakeConfig::from_env(),
            account_cache_ttl: Duration::from_secs(env_or("ACCOUNT_CACHE_TTL_SECS", 60)),
            default_leverage: env_or("DEFAULT_LEVERAGE", Decimal::new(20, 0)),
            market_percent_headroom: env_or("MARKET_PERCENT_HEADROOM", Decimal::new(3, 0)),
            notification_url: env_opt("NOTIFICATION_URL"),
            matching_engine_topic_prefix: std::env::var("MATCHING_ENGINE_TOPIC_PREFIX")
                .unwrap_or_else(|_| "matching_engine_".to_string()),
        }
    }
}

/// 비어있지 않은 환경 변수
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// 환경 변수 파싱, 없거나 파싱 실패 시 기본값
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
