use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity, Model as OrderModel},
        order_line::{self, Entity as OrderLineEntity},
        order_status_history::{self, Entity as StatusHistoryEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{CHECKOUT_FAILURES, COUPON_REDEMPTIONS, ORDERS_CREATED, ORDER_CANCELLATIONS},
    models::{OrderStatus, PaymentMethod, PaymentStatus, ShippingMethod},
    notifications::OrderNotifier,
    services::{
        catalog,
        coupons::{self, CouponLine, DiscountDecision},
        identity::{require_active_user, IdentityProvider, UserIdentity},
        inventory::{self, Reservation, StockLine},
        order_status::{self, ShipmentDetails, TransitionOutcome, TransitionRequest},
        pricing::{PricedLine, Pricing, PricingCalculator},
    },
};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const ORDER_NUMBER_SUFFIX_LEN: usize = 6;
const ORDER_NUMBER_ATTEMPTS: usize = 5;
const ORDER_NUMBER_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Request/Response types for the order service
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CartLineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(max = 64))]
    pub size: Option<String>,
    #[validate(length(max = 64))]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(length(min = 1, max = 255))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub postal_code: String,
    #[validate(length(equal = 2, message = "Country must be an ISO 3166-1 alpha-2 code"))]
    pub country: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    #[validate]
    pub lines: Vec<CartLineRequest>,
    #[validate]
    pub shipping_address: Address,
    /// Falls back to the shipping address.
    #[validate]
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOrderRequest {
    pub target: OrderStatus,
    pub note: Option<String>,
    pub actor_id: Uuid,
    pub shipment: Option<ShipmentDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: OrderModel,
    /// Display order.
    pub lines: Vec<order_line::Model>,
    /// Oldest first.
    pub history: Vec<order_status_history::Model>,
}

impl OrderDetails {
    pub fn pricing(&self) -> Pricing {
        Pricing {
            subtotal: self.order.subtotal,
            tax: self.order.tax,
            shipping: self.order.shipping_cost,
            discount: self.order.discount,
            total: self.order.total,
        }
    }
}

/// What a committed checkout produced, kept for post-commit side effects.
struct PlacedOrder {
    order: OrderModel,
    reservation: Reservation,
    coupon: Option<DiscountDecision>,
}

/// Orders of `user_id` that were not cancelled.
pub async fn count_active_orders<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<u64, ServiceError> {
    Ok(OrderEntity::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
        .count(conn)
        .await?)
}

/// `{prefix}-{yyyymmdd}-{6 upper-case alphanumerics}`.
pub fn generate_order_number(prefix: &str, now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
        .map(|_| ORDER_NUMBER_CHARSET[rng.gen_range(0..ORDER_NUMBER_CHARSET.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, now.format("%Y%m%d"), suffix)
}

fn failure_reason(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::InsufficientStock(_) => "insufficient_stock",
        ServiceError::ProductUnavailable(_) => "product_unavailable",
        ServiceError::CouponRejected { .. } => "coupon_rejected",
        ServiceError::NotFound(_) => "not_found",
        ServiceError::ValidationError(_) => "validation",
        ServiceError::Unauthorized(_) | ServiceError::Forbidden(_) => "unauthorized",
        _ => "internal",
    }
}

/// Post-commit fan-out for a status change: notification plus domain events.
/// Failures are logged and swallowed.
pub(crate) async fn publish_transition(
    notifier: &dyn OrderNotifier,
    event_sender: Option<&EventSender>,
    outcome: &TransitionOutcome,
) {
    if let Err(e) = notifier
        .notify_order_status_changed(&outcome.order, outcome.previous)
        .await
    {
        warn!(order_id = %outcome.order.id, error = %e, "Failed to send status notification");
    }

    let Some(sender) = event_sender else {
        return;
    };
    let mut events = Vec::with_capacity(outcome.released.len() + 1);
    if outcome.order.status == OrderStatus::Cancelled {
        events.push(Event::OrderCancelled {
            order_id: outcome.order.id,
            reason: outcome.order.cancellation_reason.clone().unwrap_or_default(),
        });
    }
    for line in &outcome.released {
        events.push(Event::InventoryReleased {
            order_id: outcome.order.id,
            product_id: line.product_id,
            quantity: line.quantity,
        });
    }
    for event in events {
        if let Err(e) = sender.send(event).await {
            warn!(order_id = %outcome.order.id, error = %e, "Failed to publish order event");
        }
    }
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn OrderNotifier>,
    event_sender: Option<Arc<EventSender>>,
    pricing: PricingCalculator,
    order_number_prefix: String,
    max_line_quantity: i32,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn OrderNotifier>,
        config: &AppConfig,
    ) -> Self {
        Self {
            db_pool,
            identity,
            notifier,
            event_sender: None,
            pricing: PricingCalculator::new(config.shipping.clone()),
            order_number_prefix: config.order_number_prefix.clone(),
            max_line_quantity: config.max_line_quantity,
        }
    }

    pub fn with_event_sender(mut self, event_sender: Arc<EventSender>) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Prices the cart from live catalog data, applies the coupon, reserves
    /// stock and persists the order in one transaction.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, lines = request.lines.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderDetails, ServiceError> {
        let result = self.try_create_order(request).await;
        if let Err(e) = &result {
            CHECKOUT_FAILURES
                .with_label_values(&[failure_reason(e)])
                .inc();
        }
        result
    }

    async fn try_create_order(&self, request: CreateOrderRequest) -> Result<OrderDetails, ServiceError> {
        request.validate()?;
        if request.lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "An order needs at least one line".to_string(),
            ));
        }
        if let Some(line) = request
            .lines
            .iter()
            .find(|l| l.quantity > self.max_line_quantity)
        {
            return Err(ServiceError::ValidationError(format!(
                "Quantity {} for product {} exceeds the limit of {}",
                line.quantity, line.product_id, self.max_line_quantity
            )));
        }

        require_active_user(self.identity.as_ref(), request.user_id).await?;

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let placed = self.place_order(&txn, &request).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %placed.order.id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        ORDERS_CREATED.inc();
        if placed.coupon.is_some() {
            COUPON_REDEMPTIONS.inc();
        }
        info!(
            order_id = %placed.order.id,
            order_number = %placed.order.order_number,
            total = %placed.order.total,
            "Order created successfully"
        );

        self.publish_created(&placed).await;

        self.get_order_details(db, placed.order.id).await
    }

    async fn place_order(
        &self,
        txn: &DatabaseTransaction,
        request: &CreateOrderRequest,
    ) -> Result<PlacedOrder, ServiceError> {
        let now = Utc::now();

        // Price every line from the catalog row, never from the client.
        let mut priced = Vec::with_capacity(request.lines.len());
        let mut snapshots = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = catalog::get_product(txn, line.product_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;
            if !product.is_orderable() {
                return Err(ServiceError::ProductUnavailable(format!(
                    "Product {} is {}",
                    product.id, product.status
                )));
            }
            priced.push(PricedLine::new(
                product.id,
                product.category_id,
                product.price,
                line.quantity,
                product.tax_rate,
            ));
            snapshots.push(product);
        }

        let subtotal = PricingCalculator::subtotal(&priced);
        let coupon = match request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            Some(code) => {
                let coupon_lines: Vec<CouponLine> = priced.iter().map(CouponLine::from).collect();
                let order_count = count_active_orders(txn, request.user_id).await?;
                Some(
                    coupons::evaluate(
                        txn,
                        code,
                        Some(request.user_id),
                        subtotal,
                        &coupon_lines,
                        order_count,
                    )
                    .await?,
                )
            }
            None => None,
        };
        let discount = coupon.as_ref().map(|c| c.discount).unwrap_or_default();
        let pricing = self
            .pricing
            .price(&priced, discount, request.shipping_method)?;

        let stock_lines: Vec<StockLine> = request
            .lines
            .iter()
            .map(|l| StockLine::new(l.product_id, l.quantity))
            .collect();
        let reservation = inventory::reserve(txn, &stock_lines).await?;

        let order_number = self.unique_order_number(txn, now).await?;
        let shipping_address = serde_json::to_string(&request.shipping_address)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        let billing_address = serde_json::to_string(
            request
                .billing_address
                .as_ref()
                .unwrap_or(&request.shipping_address),
        )
        .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let order_id = Uuid::new_v4();
        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            user_id: Set(request.user_id),
            status: Set(OrderStatus::Pending),
            subtotal: Set(pricing.subtotal),
            tax: Set(pricing.tax),
            shipping_cost: Set(pricing.shipping),
            discount: Set(pricing.discount),
            total: Set(pricing.total),
            coupon_code: Set(coupon.as_ref().map(|c| c.code.clone())),
            coupon_discount: Set(coupon.as_ref().map(|c| c.discount)),
            coupon_type: Set(coupon.as_ref().map(|c| c.coupon_type)),
            payment_method: Set(request.payment_method),
            payment_status: Set(PaymentStatus::Pending),
            transaction_id: Set(None),
            paid_at: Set(None),
            shipping_method: Set(request.shipping_method),
            carrier: Set(None),
            tracking_number: Set(None),
            shipped_at: Set(None),
            delivered_at: Set(None),
            shipping_address: Set(shipping_address),
            billing_address: Set(billing_address),
            cancellation_reason: Set(None),
            cancelled_at: Set(None),
            cancelled_by: Set(None),
            refund_status: Set(None),
            stock_released: Set(false),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        for (position, ((line, product), priced_line)) in request
            .lines
            .iter()
            .zip(&snapshots)
            .zip(&priced)
            .enumerate()
        {
            order_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                position: Set(position as i32),
                product_id: Set(product.id),
                name: Set(product.name.clone()),
                sku: Set(product.sku.clone()),
                image: Set(product.image.clone()),
                unit_price: Set(priced_line.unit_price),
                quantity: Set(priced_line.quantity),
                line_subtotal: Set(priced_line.line_subtotal),
                tax_rate: Set(priced_line.tax_rate),
                line_tax: Set(priced_line.line_tax),
                size: Set(line.size.clone()),
                color: Set(line.color.clone()),
            }
            .insert(txn)
            .await?;
        }

        order_status::append_history(
            txn,
            order_id,
            OrderStatus::Pending,
            Some("Order placed".to_string()),
            Some(request.user_id),
        )
        .await?;

        // Redemption comes last so it only ever counts a persisted order.
        if let Some(decision) = &coupon {
            coupons::redeem(
                txn,
                decision.coupon_id,
                request.user_id,
                order_id,
                decision.discount,
            )
            .await?;
        }

        Ok(PlacedOrder {
            order,
            reservation,
            coupon,
        })
    }

    async fn unique_order_number(
        &self,
        txn: &DatabaseTransaction,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let candidate = generate_order_number(&self.order_number_prefix, now);
            let taken = OrderEntity::find()
                .filter(order::Column::OrderNumber.eq(candidate.clone()))
                .count(txn)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
        }
        Err(ServiceError::InternalError(
            "Could not allocate a unique order number".to_string(),
        ))
    }

    async fn publish_created(&self, placed: &PlacedOrder) {
        if let Err(e) = self.notifier.notify_order_created(&placed.order).await {
            warn!(order_id = %placed.order.id, error = %e, "Failed to send order created notification");
        }

        let Some(sender) = &self.event_sender else {
            return;
        };
        let order_id = placed.order.id;
        let mut events: Vec<Event> = placed
            .reservation
            .lines
            .iter()
            .map(|line| Event::InventoryReserved {
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect();
        events.extend(placed.reservation.low_stock.iter().map(|alert| Event::LowStock {
            product_id: alert.product_id,
            stock: alert.stock,
            threshold: alert.threshold,
        }));
        if let Some(decision) = &placed.coupon {
            events.push(Event::CouponRedeemed {
                coupon_id: decision.coupon_id,
                order_id,
                user_id: placed.order.user_id,
                discount: decision.discount,
            });
        }
        for event in events {
            if let Err(e) = sender.send(event).await {
                warn!(order_id = %order_id, error = %e, "Failed to publish order event");
            }
        }
    }

    /// Admin-driven status change. Cancellation is routed through
    /// [`OrderService::cancel_order`].
    #[instrument(skip(self, request), fields(order_id = %order_id, target = %request.target))]
    pub async fn transition_order(
        &self,
        order_id: Uuid,
        request: TransitionOrderRequest,
    ) -> Result<OrderModel, ServiceError> {
        let actor = require_active_user(self.identity.as_ref(), request.actor_id).await?;
        if !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only administrators can change order status".to_string(),
            ));
        }

        if request.target == OrderStatus::Cancelled {
            let reason = request
                .note
                .unwrap_or_else(|| "Cancelled by administrator".to_string());
            return self.cancel_order(order_id, reason, request.actor_id).await;
        }

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start transaction for status update");
            ServiceError::DatabaseError(e)
        })?;

        let order = load_order(&txn, order_id).await?;
        let transition = TransitionRequest {
            target: request.target,
            note: request.note,
            actor_id: Some(actor.id),
            cancellation: None,
            shipment: request.shipment,
        };
        let outcome = order_status::transition(&txn, order, transition).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit status update transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            old_status = %outcome.previous,
            new_status = %outcome.order.status,
            "Order status updated successfully"
        );
        publish_transition(
            self.notifier.as_ref(),
            self.event_sender.as_deref(),
            &outcome,
        )
        .await;
        Ok(outcome.order)
    }

    /// Cancels an order on behalf of its owner or an administrator and
    /// returns its stock in the same transaction.
    #[instrument(skip(self, reason), fields(order_id = %order_id, actor_id = %actor_id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: String,
        actor_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        if reason.trim().is_empty() || reason.len() > 500 {
            return Err(ServiceError::ValidationError(
                "Reason must be between 1 and 500 characters".to_string(),
            ));
        }
        let actor = require_active_user(self.identity.as_ref(), actor_id).await?;

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start transaction for cancellation");
            ServiceError::DatabaseError(e)
        })?;

        let order = load_order(&txn, order_id).await?;
        ensure_may_act(&actor, &order)?;

        let outcome = order_status::transition(
            &txn,
            order,
            TransitionRequest::cancelled(reason, Some(actor.id)),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit cancellation transaction");
            ServiceError::DatabaseError(e)
        })?;

        ORDER_CANCELLATIONS.inc();
        info!(released = outcome.released.len(), "Order cancelled");
        publish_transition(
            self.notifier.as_ref(),
            self.event_sender.as_deref(),
            &outcome,
        )
        .await;
        Ok(outcome.order)
    }

    /// Order with lines and history, visible to its owner and administrators.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        requester_id: Uuid,
    ) -> Result<OrderDetails, ServiceError> {
        let requester = require_active_user(self.identity.as_ref(), requester_id).await?;
        let db = &*self.db_pool;
        let details = self.get_order_details(db, order_id).await?;
        ensure_may_act(&requester, &details.order)?;
        Ok(details)
    }

    /// Orders of `user_id`, newest first.
    #[instrument(skip(self))]
    pub async fn list_user_orders(
        &self,
        user_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Vec<OrderModel>, ServiceError> {
        let requester = require_active_user(self.identity.as_ref(), requester_id).await?;
        if !requester.may_act_on(user_id) {
            return Err(ServiceError::Forbidden(
                "Cannot list another user's orders".to_string(),
            ));
        }
        Ok(OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    async fn get_order_details<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
    ) -> Result<OrderDetails, ServiceError> {
        let order = load_order(conn, order_id).await?;
        let lines = OrderLineEntity::find()
            .filter(order_line::Column::OrderId.eq(order_id))
            .order_by_asc(order_line::Column::Position)
            .all(conn)
            .await?;
        let history = StatusHistoryEntity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::Sequence)
            .all(conn)
            .await?;
        Ok(OrderDetails {
            order,
            lines,
            history,
        })
    }
}

pub(crate) async fn load_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<OrderModel, ServiceError> {
    OrderEntity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

pub(crate) fn ensure_may_act(actor: &UserIdentity, order: &OrderModel) -> Result<(), ServiceError> {
    if actor.may_act_on(order.user_id) {
        Ok(())
    } else {
        warn!(actor_id = %actor.id, order_id = %order.id, "Actor does not own order");
        Err(ServiceError::Forbidden(format!(
            "User {} may not act on order {}",
            actor.id, order.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn order_numbers_follow_the_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let number = generate_order_number("ORD", now);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], "20261019");
        assert_eq!(parts[2].len(), ORDER_NUMBER_SUFFIX_LEN);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn checkout_failures_are_labelled_by_cause() {
        assert_eq!(
            failure_reason(&ServiceError::InsufficientStock("x".into())),
            "insufficient_stock"
        );
        assert_eq!(
            failure_reason(&ServiceError::db_error("boom")),
            "internal"
        );
    }

    #[test]
    fn address_requires_two_letter_country() {
        let mut address = Address {
            full_name: "Ada Lovelace".into(),
            line1: "12 St James's Square".into(),
            line2: None,
            city: "London".into(),
            state: None,
            postal_code: "SW1Y 4JH".into(),
            country: "GB".into(),
            phone: None,
        };
        assert!(address.validate().is_ok());
        address.country = "GBR".into();
        assert!(address.validate().is_err());
    }
}
