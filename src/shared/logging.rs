use tracing_subscriber::EnvFilter;

/// 로깅 초기화
/// Install the global tracing subscriber
///
/// `RUST_LOG` 가 없으면 `info` 레벨.
/// 테스트에서 여러 번 호출되어도 두 번째부터는 무시됨.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
