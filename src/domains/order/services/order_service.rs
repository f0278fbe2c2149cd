use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::classifier::OrderValidator;
use super::context_resolver::ContextResolver;
use super::lineage::OrderPersistence;
use crate::domains::intake::{CommandProcessor, ProcessOutcome};
use crate::domains::order::models::{OrderRecord, RawOrderCommand};
use crate::shared::database::{OrderLookup, OrderStore};
use crate::shared::errors::IntakeError;

/// 주문 접수 서비스
/// Order Intake Service
///
/// 역할:
/// - 컨텍스트 조회 → 분류/검증 → 계보 저장 → 라우팅
///
/// 처리 흐름:
/// 1. 계정 / 상품 / 마진 모드 조회 (없으면 에러 적재 후 종료)
/// 2. 주문 분류 / 검증 (거부 시 에러 적재 후 종료)
/// 3. 부모 + 자식 주문 저장 후 매칭 엔진으로 라우팅
pub struct OrderIntakeService {
    resolver: Arc<ContextResolver>,
    validator: Arc<OrderValidator>,
    persistence: Arc<OrderPersistence>,
    orders: Arc<dyn OrderStore>,
}

impl OrderIntakeService {
    pub fn new(
        resolver: Arc<ContextResolver>,
        validator: Arc<OrderValidator>,
        persistence: Arc<OrderPersistence>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            resolver,
            validator,
            persistence,
            orders,
        }
    }

    /// 미체결 주문 조회 (tmpOrderId 또는 주문 ID)
    pub async fn find_open_order(
        &self,
        user_id: u64,
        lookup: &OrderLookup,
    ) -> anyhow::Result<Option<OrderRecord>> {
        self.orders.find_open_order(user_id, lookup).await
    }
}

#[async_trait]
impl CommandProcessor for OrderIntakeService {
    async fn process(&self, command: RawOrderCommand) -> Result<ProcessOutcome, IntakeError> {
        let RawOrderCommand {
            create_order_dto: request,
            user_id,
            tmp_order_id,
        } = command;

        // ━━━━━━━━━━━━━━━━━━━━ 1. 컨텍스트 조회 ━━━━━━━━━━━━━━━━━━━━
        let Some(ctx) = self
            .resolver
            .resolve(user_id, &request)
            .await
            .map_err(IntakeError::Context)?
        else {
            debug!(user_id, tmp_order_id = ?tmp_order_id, "[Order Intake] context not resolved");
            return Ok(ProcessOutcome::Rejected);
        };

        // ━━━━━━━━━━━━━━━━━━━━ 2. 분류 / 검증 ━━━━━━━━━━━━━━━━━━━━
        let Some(order) = self
            .validator
            .validate(request, user_id, tmp_order_id, &ctx)
            .await
            .map_err(IntakeError::Context)?
        else {
            return Ok(ProcessOutcome::Rejected);
        };

        // ━━━━━━━━━━━━━━━━━━━━ 3. 저장 + 라우팅 ━━━━━━━━━━━━━━━━━━━━
        let lineage = self.persistence.save(&order).await?;
        Ok(ProcessOutcome::Routed(lineage))
    }
}
