// =====================================================
// ContextResolver - 계정 / 상품 / 마진 모드 조회
// =====================================================
// 조회 정책: 캐시 → 저장소 → 캐시 적재
//
// - 계정:      `accounts:userId_{id}:asset_{asset}`            TTL 60초
// - 상품:      `instruments:{symbol}`                          만료 없음
// - 마진 모드: `margin_mode:userId_{u}:instrumentId_{i}`        만료 없음
//
// 캐시 장애는 저장소 조회로 대체 (warn 로그).
// 동일 계정에 대한 동시 변경은 TTL 동안 오래된 값을 읽을 수 있음.
// =====================================================

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::classifier::OrderContext;
use super::error_queue::ErrorQueue;
use crate::domains::order::models::{Account, CreateOrderRequest, Instrument, MarginMode, Rejection};
use crate::shared::cache::{Cache, keys};
use crate::shared::database::{AccountStore, InstrumentStore};

pub struct ContextResolver {
    cache: Arc<dyn Cache>,
    accounts: Arc<dyn AccountStore>,
    instruments: Arc<dyn InstrumentStore>,
    errors: ErrorQueue,
    account_ttl: Duration,
    default_leverage: Decimal,
    bot_user_ids: HashSet<u64>,
}

impl ContextResolver {
    pub fn new(
        cache: Arc<dyn Cache>,
        accounts: Arc<dyn AccountStore>,
        instruments: Arc<dyn InstrumentStore>,
        errors: ErrorQueue,
        account_ttl: Duration,
        default_leverage: Decimal,
    ) -> Self {
        Self {
            cache,
            accounts,
            instruments,
            errors,
            account_ttl,
            default_leverage,
            bot_user_ids: HashSet::new(),
        }
    }

    /// 봇 계정 ID 등록 (봇 주문은 잔고 검사 생략)
    pub fn with_bot_user_ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.bot_user_ids.extend(ids);
        self
    }

    pub fn is_bot(&self, user_id: u64) -> bool {
        self.bot_user_ids.contains(&user_id)
    }

    /// 계정 조회
    /// Resolve the account for (user, asset)
    ///
    /// # Returns
    /// * `Ok(Some)` - 캐시 또는 저장소에서 찾음
    /// * `Ok(None)` - 없음, ACCOUNT_NOT_FOUND 적재됨 (호출자는 주문 중단)
    pub async fn resolve_account(&self, user_id: u64, asset: &str) -> Result<Option<Account>> {
        let key = keys::account(user_id, asset);
        let account = self
            .cached_or_load(&key, Some(self.account_ttl), || {
                self.accounts.find_account(user_id, asset)
            })
            .await?;

        if account.is_none() {
            self.errors.reject(
                user_id,
                &Rejection::AccountNotFound {
                    asset: asset.to_string(),
                },
            );
        }
        Ok(account)
    }

    /// 상품 조회, 없으면 INSTRUMENT_NOT_FOUND 적재
    pub async fn resolve_instrument(&self, user_id: u64, symbol: &str) -> Result<Option<Instrument>> {
        let key = keys::instrument(symbol);
        let instrument = self
            .cached_or_load(&key, None, || self.instruments.find_instrument(symbol))
            .await?;

        if instrument.is_none() {
            self.errors.reject(
                user_id,
                &Rejection::InstrumentNotFound {
                    symbol: symbol.to_string(),
                },
            );
        }
        Ok(instrument)
    }

    /// 마진 모드 조회, 없으면 CROSS + 기본 레버리지
    pub async fn resolve_margin_mode(&self, user_id: u64, instrument_id: u64) -> Result<MarginMode> {
        let key = keys::margin_mode(user_id, instrument_id);
        let margin_mode = self
            .cached_or_load(&key, None, || {
                self.instruments.find_margin_mode(user_id, instrument_id)
            })
            .await?;

        Ok(margin_mode.unwrap_or_else(|| {
            MarginMode::default_cross(user_id, instrument_id, self.default_leverage)
        }))
    }

    /// 주문 한 건의 컨텍스트 조회
    /// Resolve instrument, account and margin mode for one order
    ///
    /// 하나라도 없으면 에러 한 건을 적재하고 `Ok(None)`.
    pub async fn resolve(&self, user_id: u64, request: &CreateOrderRequest) -> Result<Option<OrderContext>> {
        let Some(symbol) = request.symbol.as_deref().filter(|s| !s.trim().is_empty()) else {
            self.errors.reject(
                user_id,
                &Rejection::InstrumentNotFound {
                    symbol: String::new(),
                },
            );
            return Ok(None);
        };

        let Some(instrument) = self.resolve_instrument(user_id, symbol).await? else {
            return Ok(None);
        };

        let asset = request
            .asset
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(&instrument.quote_asset)
            .to_string();

        let (account, margin_mode) = tokio::try_join!(
            self.resolve_account(user_id, &asset),
            self.resolve_margin_mode(user_id, instrument.id),
        )?;

        let Some(account) = account else {
            return Ok(None);
        };

        Ok(Some(OrderContext {
            account,
            instrument,
            margin_mode,
            is_bot: self.is_bot(user_id),
        }))
    }

    /// 캐시 우선 조회, 없으면 loader 실행 후 캐시에 적재
    async fn cached_or_load<T, F, Fut>(&self, key: &str, ttl: Option<Duration>, loader: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => warn!(key = %key, "Discarding malformed cache entry: {}", e),
            },
            Ok(None) => debug!(key = %key, "cache miss"),
            Err(e) => warn!(key = %key, "Cache read failed, falling back to store: {:#}", e),
        }

        let Some(value) = loader().await? else {
            return Ok(None);
        };

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.cache.set(key, &raw, ttl).await {
                    warn!(key = %key, "Cache write failed: {:#}", e);
                }
            }
            Err(e) => warn!(key = %key, "Failed to serialize cache entry: {}", e),
        }

        Ok(Some(value))
    }
}
