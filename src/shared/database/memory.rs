use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use super::{AccountStore, InstrumentStore, OrderLookup, OrderStore, PositionStore};
use crate::domains::order::models::{Account, Instrument, MarginMode, OrderRecord, Position};

/// 메모리 기반 저장소
/// In-memory implementation of every store trait
///
/// DATABASE_URL 이 없을 때 사용. 테스트에서는 조회 횟수 확인 /
/// 저장 실패 주입에도 사용함.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    account_reads: AtomicUsize,
    fail_next_insert: AtomicBool,
}

#[derive(Default)]
struct State {
    orders: BTreeMap<u64, OrderRecord>,
    accounts: HashMap<(u64, String), Account>,
    instruments: HashMap<String, Instrument>,
    margin_modes: HashMap<(u64, u64), MarginMode>,
    positions: HashMap<(u64, String), Position>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ━━━━━━━━━━━━━━━━━━━━ 시드 데이터 ━━━━━━━━━━━━━━━━━━━━

    pub fn insert_account(&self, account: Account) {
        let key = (account.user_id, account.asset.clone());
        self.state.write().accounts.insert(key, account);
    }

    pub fn insert_instrument(&self, instrument: Instrument) {
        let key = instrument.symbol.clone();
        self.state.write().instruments.insert(key, instrument);
    }

    pub fn insert_margin_mode(&self, margin_mode: MarginMode) {
        let key = (margin_mode.user_id, margin_mode.instrument_id);
        self.state.write().margin_modes.insert(key, margin_mode);
    }

    pub fn insert_position(&self, position: Position) {
        let key = (position.user_id, position.symbol.clone());
        self.state.write().positions.insert(key, position);
    }

    // ━━━━━━━━━━━━━━━━━━━━ 조회 / 실패 주입 ━━━━━━━━━━━━━━━━━━━━

    /// 저장된 주문 전체 (ID 순)
    pub fn orders(&self) -> Vec<OrderRecord> {
        self.state.read().orders.values().cloned().collect()
    }

    pub fn order(&self, id: u64) -> Option<OrderRecord> {
        self.state.read().orders.get(&id).cloned()
    }

    /// find_account 호출 횟수
    pub fn account_reads(&self) -> usize {
        self.account_reads.load(Ordering::SeqCst)
    }

    /// 다음 insert_lineage 한 번을 실패시킴
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_lineage(&self, parent: &OrderRecord, children: &[OrderRecord]) -> Result<()> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            bail!("Failed to insert order lineage (injected)");
        }

        // 하나의 write lock 안에서 자식 → 부모 순서로 저장
        let mut state = self.state.write();
        if let Some(dup) = children
            .iter()
            .chain(std::iter::once(parent))
            .find(|o| state.orders.contains_key(&o.id))
        {
            bail!("Duplicate order id: {}", dup.id);
        }
        for child in children {
            state.orders.insert(child.id, child.clone());
        }
        state.orders.insert(parent.id, parent.clone());
        Ok(())
    }

    async fn delete_orders(&self, ids: &[u64]) -> Result<u64> {
        let mut state = self.state.write();
        let deleted = ids
            .iter()
            .filter(|id| state.orders.remove(*id).is_some())
            .count();
        Ok(deleted as u64)
    }

    async fn find_open_order(&self, user_id: u64, lookup: &OrderLookup) -> Result<Option<OrderRecord>> {
        let state = self.state.read();
        let found = state.orders.values().find(|o| {
            let matches_key = match lookup {
                OrderLookup::TmpId(tmp_id) => o.tmp_id.as_deref() == Some(tmp_id.as_str()),
                OrderLookup::Id(id) => o.id == *id,
            };
            matches_key && o.user_id == user_id && o.status.is_open()
        });
        Ok(found.cloned())
    }

    async fn max_order_id(&self) -> Result<u64> {
        Ok(self
            .state
            .read()
            .orders
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_account(&self, user_id: u64, asset: &str) -> Result<Option<Account>> {
        self.account_reads.fetch_add(1, Ordering::SeqCst);
        let key = (user_id, asset.to_string());
        Ok(self.state.read().accounts.get(&key).cloned())
    }

    async fn available_balance(&self, account: &Account) -> Result<Decimal> {
        let state = self.state.read();
        let locked: Decimal = state
            .orders
            .values()
            .filter(|o| o.account_id == account.id && o.status.is_open())
            .filter_map(|o| o.original_cost)
            .sum();
        Ok(account.balance - locked)
    }
}

#[async_trait]
impl InstrumentStore for InMemoryStore {
    async fn find_instrument(&self, symbol: &str) -> Result<Option<Instrument>> {
        Ok(self.state.read().instruments.get(symbol).cloned())
    }

    async fn find_margin_mode(&self, user_id: u64, instrument_id: u64) -> Result<Option<MarginMode>> {
        Ok(self
            .state
            .read()
            .margin_modes
            .get(&(user_id, instrument_id))
            .cloned())
    }
}

#[async_trait]
impl PositionStore for InMemoryStore {
    async fn find_position(&self, user_id: u64, symbol: &str) -> Result<Option<Position>> {
        let key = (user_id, symbol.to_string());
        Ok(self.state.read().positions.get(&key).cloned())
    }
}
