//! Outbound notification collaborator.
//!
//! Delivery is fire-and-forget: callers log a failed notification and carry
//! on, the unit of work that triggered it has already committed.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::entities::order;
use crate::events::{Event, EventSender};
use crate::models::OrderStatus;

/// Notification service errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification channel closed: {0}")]
    ChannelClosed(String),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Trait for notification service operations
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn notify_order_created(&self, order: &order::Model) -> Result<(), NotificationError>;

    async fn notify_order_status_changed(
        &self,
        order: &order::Model,
        previous: OrderStatus,
    ) -> Result<(), NotificationError>;
}

/// Publishes notifications onto the domain event channel, where downstream
/// consumers (email, push) pick them up.
#[derive(Clone, Debug)]
pub struct EventNotifier {
    events: Arc<EventSender>,
}

impl EventNotifier {
    pub fn new(events: Arc<EventSender>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl OrderNotifier for EventNotifier {
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn notify_order_created(&self, order: &order::Model) -> Result<(), NotificationError> {
        debug!("Publishing order created notification");
        self.events
            .send(Event::OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
                user_id: order.user_id,
                total: order.total,
            })
            .await
            .map_err(NotificationError::ChannelClosed)
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, status = %order.status))]
    async fn notify_order_status_changed(
        &self,
        order: &order::Model,
        previous: OrderStatus,
    ) -> Result<(), NotificationError> {
        debug!("Publishing order status notification");
        self.events
            .send(Event::OrderStatusChanged {
                order_id: order.id,
                old_status: previous,
                new_status: order.status,
            })
            .await
            .map_err(NotificationError::ChannelClosed)
    }
}

/// Notifier that drops everything, for deployments without a delivery channel.
#[derive(Clone, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl OrderNotifier for NoopNotifier {
    async fn notify_order_created(&self, _order: &order::Model) -> Result<(), NotificationError> {
        Ok(())
    }

    async fn notify_order_status_changed(
        &self,
        _order: &order::Model,
        _previous: OrderStatus,
    ) -> Result<(), NotificationError> {
        Ok(())
    }
}
