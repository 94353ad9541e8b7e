//! Order lifecycle state machine.
//!
//! [`transition`] is the only place that writes `orders.status`. Each call
//! validates the edge, applies the side effects that belong to the target
//! status, appends a history row and, for cancellations, hands the reserved
//! stock back. It runs on the caller's connection so all of that commits or
//! rolls back together.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        order::{self, Entity as OrderEntity},
        order_line::{self, Entity as OrderLineEntity},
        order_status_history::{self, Entity as StatusHistoryEntity},
    },
    errors::ServiceError,
    models::{OrderStatus, PaymentStatus, RefundStatus},
    services::inventory::{self, StockLine},
};

/// Statuses reachable from `from` in one step.
pub fn allowed_targets(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Pending => &[Confirmed, Processing, Cancelled],
        Confirmed => &[Processing, Cancelled],
        Processing => &[Shipped, Cancelled],
        Shipped => &[Delivered, Returned],
        Returned => &[Refunded],
        Delivered | Cancelled | Refunded => &[],
    }
}

pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    allowed_targets(from).contains(&to)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: String,
    pub cancelled_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmentDetails {
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub target: OrderStatus,
    pub note: Option<String>,
    pub actor_id: Option<Uuid>,
    /// Required when `target` is `cancelled`.
    pub cancellation: Option<Cancellation>,
    /// Only read when `target` is `shipped`.
    pub shipment: Option<ShipmentDetails>,
}

impl TransitionRequest {
    pub fn new(target: OrderStatus) -> Self {
        Self {
            target,
            note: None,
            actor_id: None,
            cancellation: None,
            shipment: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn by(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn cancelled(reason: impl Into<String>, cancelled_by: Option<Uuid>) -> Self {
        let reason = reason.into();
        Self {
            target: OrderStatus::Cancelled,
            note: Some(reason.clone()),
            actor_id: cancelled_by,
            cancellation: Some(Cancellation {
                reason,
                cancelled_by,
            }),
            shipment: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub order: order::Model,
    pub previous: OrderStatus,
    /// Stock handed back by this transition, empty unless it cancelled.
    pub released: Vec<StockLine>,
}

/// Stock lines of an order, in display order.
pub async fn order_stock_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<StockLine>, ServiceError> {
    let lines = OrderLineEntity::find()
        .filter(order_line::Column::OrderId.eq(order_id))
        .order_by_asc(order_line::Column::Position)
        .all(conn)
        .await?;
    Ok(lines
        .iter()
        .map(|l| StockLine::new(l.product_id, l.quantity))
        .collect())
}

/// Appends one audit row; sequences start at 1 and never repeat per order.
pub async fn append_history<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    status: OrderStatus,
    note: Option<String>,
    actor_id: Option<Uuid>,
) -> Result<order_status_history::Model, ServiceError> {
    let existing = StatusHistoryEntity::find()
        .filter(order_status_history::Column::OrderId.eq(order_id))
        .count(conn)
        .await?;
    let entry = order_status_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        sequence: Set(existing as i32 + 1),
        status: Set(status),
        note: Set(note),
        actor_id: Set(actor_id),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(entry)
}

/// Moves `order` to `request.target`.
///
/// `order` is the snapshot the caller read; the write only lands if the row
/// still carries that version and status, otherwise the caller lost a race
/// and gets `ConcurrentModification`.
#[instrument(skip(conn, order, request), fields(order_id = %order.id, from = %order.status, to = %request.target))]
pub async fn transition<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
    request: TransitionRequest,
) -> Result<TransitionOutcome, ServiceError> {
    let from = order.status;
    let to = request.target;
    if !can_transition(from, to) {
        warn!("Rejected status transition");
        return Err(ServiceError::InvalidTransition { from, to });
    }

    let now = Utc::now();
    let mut changes = order::ActiveModel {
        status: Set(to),
        version: Set(order.version + 1),
        updated_at: Set(now),
        ..Default::default()
    };

    let mut release_stock = false;
    match to {
        OrderStatus::Shipped => {
            changes.shipped_at = Set(Some(now));
            if let Some(shipment) = request.shipment {
                if shipment.carrier.is_some() {
                    changes.carrier = Set(shipment.carrier);
                }
                if shipment.tracking_number.is_some() {
                    changes.tracking_number = Set(shipment.tracking_number);
                }
            }
        }
        OrderStatus::Delivered => {
            changes.delivered_at = Set(Some(now));
            // Cash on delivery is collected at the door.
            if order.payment_method.is_cash_on_delivery() {
                changes.payment_status = Set(PaymentStatus::Completed);
                changes.paid_at = Set(Some(now));
            }
        }
        OrderStatus::Cancelled => {
            let cancellation = request.cancellation.ok_or_else(|| {
                ServiceError::ValidationError("A cancellation reason is required".to_string())
            })?;
            if cancellation.reason.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "A cancellation reason is required".to_string(),
                ));
            }
            changes.cancellation_reason = Set(Some(cancellation.reason));
            changes.cancelled_at = Set(Some(now));
            changes.cancelled_by = Set(cancellation.cancelled_by);
            changes.refund_status = Set(Some(RefundStatus::Pending));
            if !order.stock_released {
                changes.stock_released = Set(true);
                release_stock = true;
            }
        }
        OrderStatus::Refunded => {
            // Only money that was collected can be refunded.
            if order.payment_status == PaymentStatus::Completed {
                changes.payment_status = Set(PaymentStatus::Refunded);
            }
            if order.refund_status.is_some() {
                changes.refund_status = Set(Some(RefundStatus::Completed));
            }
        }
        OrderStatus::Pending
        | OrderStatus::Confirmed
        | OrderStatus::Processing
        | OrderStatus::Returned => {}
    }

    let written = OrderEntity::update_many()
        .set(changes)
        .filter(order::Column::Id.eq(order.id))
        .filter(order::Column::Version.eq(order.version))
        .filter(order::Column::Status.eq(from))
        .exec(conn)
        .await?;
    if written.rows_affected == 0 {
        warn!("Order changed underneath the transition");
        return Err(ServiceError::ConcurrentModification(order.id));
    }

    let released = if release_stock {
        let lines = order_stock_lines(conn, order.id).await?;
        inventory::release(conn, &lines).await?
    } else {
        Vec::new()
    };

    append_history(conn, order.id, to, request.note, request.actor_id).await?;

    let updated = OrderEntity::find_by_id(order.id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order.id)))?;

    info!(version = updated.version, "Order status updated");
    Ok(TransitionOutcome {
        order: updated,
        previous: from,
        released,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use OrderStatus::*;

    #[rstest]
    #[case(Pending, Confirmed, true)]
    #[case(Pending, Processing, true)]
    #[case(Pending, Cancelled, true)]
    #[case(Pending, Shipped, false)]
    #[case(Confirmed, Processing, true)]
    #[case(Confirmed, Cancelled, true)]
    #[case(Confirmed, Delivered, false)]
    #[case(Processing, Shipped, true)]
    #[case(Processing, Cancelled, true)]
    #[case(Shipped, Delivered, true)]
    #[case(Shipped, Returned, true)]
    #[case(Shipped, Cancelled, false)]
    #[case(Delivered, Cancelled, false)]
    #[case(Delivered, Returned, false)]
    #[case(Returned, Refunded, true)]
    #[case(Cancelled, Cancelled, false)]
    #[case(Cancelled, Pending, false)]
    #[case(Refunded, Pending, false)]
    fn transition_table(#[case] from: OrderStatus, #[case] to: OrderStatus, #[case] ok: bool) {
        assert_eq!(can_transition(from, to), ok);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for status in [Delivered, Cancelled, Refunded] {
            assert!(status.is_terminal());
            assert!(allowed_targets(status).is_empty());
        }
    }

    #[test]
    fn cancellable_states_match_the_table() {
        for status in [Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Returned, Refunded] {
            assert_eq!(status.is_cancellable(), can_transition(status, Cancelled));
        }
    }

    #[test]
    fn cancelled_request_carries_reason_as_note() {
        let actor = Uuid::new_v4();
        let request = TransitionRequest::cancelled("customer request", Some(actor));
        assert_eq!(request.target, Cancelled);
        assert_eq!(request.note.as_deref(), Some("customer request"));
        assert_eq!(request.cancellation.map(|c| c.cancelled_by), Some(Some(actor)));
    }
}
