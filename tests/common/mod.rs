#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use storefront_orders::{
    config::AppConfig,
    db::{self, DbConfig, DbPool},
    entities::{coupon, coupon_usage, order_status_history, product},
    events::{process_events, EventSender},
    models::{CouponType, PaymentMethod, ShippingMethod},
    notifications::{EventNotifier, OrderNotifier},
    services::{
        catalog::{CatalogService, NewProduct},
        coupons::{CouponScope, CouponService, NewCoupon},
        identity::{IdentityProvider, InMemoryIdentityProvider, UserIdentity},
        orders::{Address, CartLineRequest, CreateOrderRequest, OrderService},
        payments::PaymentService,
    },
};
use uuid::Uuid;

/// Services wired against a fresh in-memory SQLite database.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub catalog: CatalogService,
    pub coupons: CouponService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub admin_id: Uuid,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::new(
            "sqlite::memory:".to_string(),
            "test".to_string(),
        ))
        .await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        Self::assemble(cfg, None).await
    }

    /// Same wiring as [`TestApp::new`] but with a caller-supplied notifier.
    pub async fn with_notifier(notifier: Arc<dyn OrderNotifier>) -> Self {
        Self::assemble(
            AppConfig::new("sqlite::memory:".to_string(), "test".to_string()),
            Some(notifier),
        )
        .await
    }

    async fn assemble(cfg: AppConfig, notifier: Option<Arc<dyn OrderNotifier>>) -> Self {
        // One long-lived connection keeps the in-memory database alive and
        // serialises transactions the way row locks would on Postgres.
        let pool = db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            idle_timeout: Duration::from_secs(3600),
            acquire_timeout: Duration::from_secs(30),
            ..Default::default()
        })
        .await
        .expect("connect to sqlite");
        db::run_migrations(&pool).await.expect("run migrations");
        let db = Arc::new(pool);

        let (sender, rx) = EventSender::channel(cfg.event_channel_capacity);
        let event_task = tokio::spawn(process_events(rx));
        let sender = Arc::new(sender);

        let identity = Arc::new(InMemoryIdentityProvider::new());
        let admin_id = Uuid::new_v4();
        identity.insert(UserIdentity::admin(admin_id));

        let identity_dyn: Arc<dyn IdentityProvider> = identity.clone();
        let notifier: Arc<dyn OrderNotifier> =
            notifier.unwrap_or_else(|| Arc::new(EventNotifier::new(sender.clone())));

        let orders = OrderService::new(db.clone(), identity_dyn.clone(), notifier.clone(), &cfg)
            .with_event_sender(sender.clone());
        let payments =
            PaymentService::new(db.clone(), identity_dyn, notifier).with_event_sender(sender);

        Self {
            catalog: CatalogService::new(db.clone()),
            coupons: CouponService::new(db.clone()),
            db,
            identity,
            orders,
            payments,
            admin_id,
            _event_task: event_task,
        }
    }

    /// Registers an active customer and returns its id.
    pub fn customer(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.identity.insert(UserIdentity::customer(id));
        id
    }

    pub async fn seed_product(&self, sku: &str, price: Decimal, tax_rate: Decimal, stock: i32) -> product::Model {
        self.catalog
            .create_product(NewProduct {
                name: format!("Product {}", sku),
                sku: sku.to_string(),
                image: None,
                price,
                tax_rate,
                stock,
                low_stock_threshold: 1,
                category_id: None,
            })
            .await
            .expect("seed product")
    }

    pub async fn product(&self, id: Uuid) -> product::Model {
        self.catalog.get_product(id).await.expect("product exists")
    }

    pub fn new_coupon(code: &str, coupon_type: CouponType, value: Decimal) -> NewCoupon {
        NewCoupon {
            code: code.to_string(),
            description: None,
            coupon_type,
            value,
            minimum_order_amount: Decimal::ZERO,
            maximum_discount_amount: None,
            usage_limit: None,
            usage_limit_per_user: 1,
            valid_from: Utc::now() - ChronoDuration::days(1),
            valid_until: Utc::now() + ChronoDuration::days(30),
            first_time_user_only: false,
            scope: CouponScope::default(),
            created_by: None,
        }
    }

    pub async fn seed_coupon(&self, request: NewCoupon) -> coupon::Model {
        self.coupons
            .create_coupon(request)
            .await
            .expect("seed coupon")
            .coupon
    }

    pub async fn coupon_usage_count(&self, coupon_id: Uuid) -> u64 {
        coupon_usage::Entity::find()
            .filter(coupon_usage::Column::CouponId.eq(coupon_id))
            .count(&*self.db)
            .await
            .expect("count usages")
    }

    pub async fn history(&self, order_id: Uuid) -> Vec<order_status_history::Model> {
        use sea_orm::QueryOrder;
        order_status_history::Entity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::Sequence)
            .all(&*self.db)
            .await
            .expect("load history")
    }
}

pub fn address() -> Address {
    Address {
        full_name: "Grace Hopper".to_string(),
        line1: "1 Navy Yard".to_string(),
        line2: None,
        city: "Arlington".to_string(),
        state: Some("VA".to_string()),
        postal_code: "22202".to_string(),
        country: "US".to_string(),
        phone: None,
    }
}

pub fn order_request(user_id: Uuid, lines: &[(Uuid, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id,
        lines: lines
            .iter()
            .map(|(product_id, quantity)| CartLineRequest {
                product_id: *product_id,
                quantity: *quantity,
                size: None,
                color: None,
            })
            .collect(),
        shipping_address: address(),
        billing_address: None,
        payment_method: PaymentMethod::Card,
        shipping_method: ShippingMethod::Standard,
        coupon_code: None,
    }
}
