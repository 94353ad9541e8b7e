//! Payment reconciliation.
//!
//! Gateway events arrive already authenticated. This adapter only checks that
//! the requester may act on the order, records the payment outcome and lets
//! the order state machine do any status change, all in one transaction.

use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, Model as OrderModel},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::PAYMENT_RECONCILIATIONS,
    models::{OrderStatus, PaymentStatus},
    notifications::OrderNotifier,
    services::{
        identity::{require_active_user, IdentityProvider},
        order_status::{self, TransitionOutcome, TransitionRequest},
        orders::{ensure_may_act, load_order, publish_transition},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Confirmed,
    Failed { reason: String },
}

/// A verified gateway notification for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub order_id: Uuid,
    /// Identity the gateway session was opened for.
    pub user_id: Uuid,
    pub provider_reference: Option<String>,
    #[serde(flatten)]
    pub outcome: PaymentOutcome,
}

#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn OrderNotifier>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn OrderNotifier>,
    ) -> Self {
        Self {
            db_pool,
            identity,
            notifier,
            event_sender: None,
        }
    }

    pub fn with_event_sender(mut self, event_sender: Arc<EventSender>) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    #[instrument(skip(self, event), fields(order_id = %event.order_id))]
    pub async fn reconcile_payment(&self, event: PaymentEvent) -> Result<OrderModel, ServiceError> {
        let result = match event.outcome {
            PaymentOutcome::Confirmed => {
                self.on_payment_confirmed(event.order_id, event.user_id, event.provider_reference)
                    .await
            }
            PaymentOutcome::Failed { reason } => {
                self.on_payment_failed(event.order_id, event.user_id, reason)
                    .await
            }
        };
        if result.is_err() {
            PAYMENT_RECONCILIATIONS
                .with_label_values(&["rejected"])
                .inc();
        }
        result
    }

    /// Records a captured payment. A pending order moves to `confirmed`.
    #[instrument(skip(self, provider_reference), fields(order_id = %order_id))]
    pub async fn on_payment_confirmed(
        &self,
        order_id: Uuid,
        requester_id: Uuid,
        provider_reference: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let requester = require_active_user(self.identity.as_ref(), requester_id).await?;

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for payment confirmation");
            ServiceError::DatabaseError(e)
        })?;

        let order = load_order(&txn, order_id).await?;
        ensure_may_act(&requester, &order)?;
        ensure_unreconciled(&order)?;

        let paid = write_payment(
            &txn,
            &order,
            order::ActiveModel {
                payment_status: Set(PaymentStatus::Completed),
                paid_at: Set(Some(Utc::now())),
                transaction_id: Set(provider_reference.clone().or(order.transaction_id.clone())),
                ..Default::default()
            },
        )
        .await?;

        let outcome = if paid.status == OrderStatus::Pending {
            let request = TransitionRequest::new(OrderStatus::Confirmed)
                .with_note("payment confirmed")
                .by(requester.id);
            Some(order_status::transition(&txn, paid, request).await?)
        } else {
            if paid.status == OrderStatus::Cancelled {
                warn!("Payment captured for a cancelled order");
            }
            None
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit payment confirmation");
            ServiceError::DatabaseError(e)
        })?;

        PAYMENT_RECONCILIATIONS
            .with_label_values(&["confirmed"])
            .inc();
        info!(transaction_id = ?provider_reference, "Payment confirmed");

        self.emit(Event::PaymentCompleted {
            order_id,
            transaction_id: provider_reference,
        })
        .await;
        self.finish(order_id, outcome).await
    }

    /// Records a failed payment and cancels the order, releasing its stock.
    #[instrument(skip(self, reason), fields(order_id = %order_id))]
    pub async fn on_payment_failed(
        &self,
        order_id: Uuid,
        requester_id: Uuid,
        reason: String,
    ) -> Result<OrderModel, ServiceError> {
        let requester = require_active_user(self.identity.as_ref(), requester_id).await?;

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for payment failure");
            ServiceError::DatabaseError(e)
        })?;

        let order = load_order(&txn, order_id).await?;
        ensure_may_act(&requester, &order)?;
        ensure_unreconciled(&order)?;
        if !order.status.is_cancellable() {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }

        let failed = write_payment(
            &txn,
            &order,
            order::ActiveModel {
                payment_status: Set(PaymentStatus::Failed),
                ..Default::default()
            },
        )
        .await?;

        let note = format!("payment failed: {}", reason);
        let outcome = order_status::transition(
            &txn,
            failed,
            TransitionRequest::cancelled(note, None).by(requester.id),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit payment failure");
            ServiceError::DatabaseError(e)
        })?;

        PAYMENT_RECONCILIATIONS.with_label_values(&["failed"]).inc();
        info!(released = outcome.released.len(), "Order cancelled after payment failure");

        self.emit(Event::PaymentFailed { order_id, reason }).await;
        self.finish(order_id, Some(outcome)).await
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to publish payment event");
            }
        }
    }

    async fn finish(
        &self,
        order_id: Uuid,
        outcome: Option<TransitionOutcome>,
    ) -> Result<OrderModel, ServiceError> {
        match outcome {
            Some(outcome) => {
                publish_transition(
                    self.notifier.as_ref(),
                    self.event_sender.as_deref(),
                    &outcome,
                )
                .await;
                Ok(outcome.order)
            }
            None => load_order(&*self.db_pool, order_id).await,
        }
    }
}

fn ensure_unreconciled(order: &OrderModel) -> Result<(), ServiceError> {
    match order.payment_status {
        PaymentStatus::Completed | PaymentStatus::Refunded => Err(ServiceError::Conflict(format!(
            "Payment for order {} already reconciled",
            order.order_number
        ))),
        _ => Ok(()),
    }
}

/// Compare-and-set on `(id, version)` for the payment columns.
async fn write_payment(
    txn: &DatabaseTransaction,
    order: &OrderModel,
    mut changes: order::ActiveModel,
) -> Result<OrderModel, ServiceError> {
    changes.version = Set(order.version + 1);
    changes.updated_at = Set(Utc::now());
    let written = OrderEntity::update_many()
        .set(changes)
        .filter(order::Column::Id.eq(order.id))
        .filter(order::Column::Version.eq(order.version))
        .exec(txn)
        .await?;
    if written.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(order.id));
    }
    load_order(txn, order.id).await
}
