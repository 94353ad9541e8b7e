use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::OrderStatus;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a bounded channel and returns the sender half together with
    /// the receiver expected by [`process_events`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Domain events published after the unit of work that produced them commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        user_id: Uuid,
        total: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCancelled {
        order_id: Uuid,
        reason: String,
    },

    // Inventory events
    InventoryReserved {
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    InventoryReleased {
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    LowStock {
        product_id: Uuid,
        stock: i32,
        threshold: i32,
    },

    // Coupon events
    CouponRedeemed {
        coupon_id: Uuid,
        order_id: Uuid,
        user_id: Uuid,
        discount: Decimal,
    },

    // Payment events
    PaymentCompleted {
        order_id: Uuid,
        transaction_id: Option<String>,
    },
    PaymentFailed {
        order_id: Uuid,
        reason: String,
    },
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderCreated {
                order_id,
                order_number,
                user_id,
                total,
            } => {
                info!(%order_id, %order_number, %user_id, %total, "Order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "Order status changed");
            }
            Event::OrderCancelled { order_id, reason } => {
                info!(%order_id, reason = %reason, "Order cancelled");
            }
            Event::InventoryReserved {
                order_id,
                product_id,
                quantity,
            } => {
                info!(%order_id, %product_id, quantity, "Inventory reserved");
            }
            Event::InventoryReleased {
                order_id,
                product_id,
                quantity,
            } => {
                info!(%order_id, %product_id, quantity, "Inventory released");
            }
            Event::LowStock {
                product_id,
                stock,
                threshold,
            } => {
                warn!(
                    %product_id,
                    stock, threshold, "Low inventory alert: product is at or below its threshold"
                );
            }
            Event::CouponRedeemed {
                coupon_id,
                order_id,
                user_id,
                discount,
            } => {
                info!(%coupon_id, %order_id, %user_id, %discount, "Coupon redeemed");
            }
            Event::PaymentCompleted {
                order_id,
                transaction_id,
            } => {
                info!(%order_id, transaction_id = ?transaction_id, "Payment completed");
            }
            Event::PaymentFailed { order_id, reason } => {
                warn!(%order_id, reason = %reason, "Payment failed");
            }
        }
    }

    warn!("Event processing loop has ended");
}
