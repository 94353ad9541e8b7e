//! Prometheus counters for the order core.
//!
//! Counters are process-wide statics registered into a private registry;
//! [`gather_text`] renders them in the Prometheus text exposition format.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = {
        let registry = Registry::new_custom(Some("storefront".into()), None)
            .expect("registry can be created");
        registry
            .register(Box::new(ORDERS_CREATED.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(ORDER_CANCELLATIONS.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(COUPON_REDEMPTIONS.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(CHECKOUT_FAILURES.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(PAYMENT_RECONCILIATIONS.clone()))
            .expect("metric can be registered");
        registry
    };
    pub static ref ORDERS_CREATED: IntCounter =
        IntCounter::new("orders_created_total", "Total number of orders created")
            .expect("metric can be created");
    pub static ref ORDER_CANCELLATIONS: IntCounter = IntCounter::new(
        "order_cancellations_total",
        "Total number of order cancellations"
    )
    .expect("metric can be created");
    pub static ref COUPON_REDEMPTIONS: IntCounter = IntCounter::new(
        "coupon_redemptions_total",
        "Total number of coupon redemptions recorded"
    )
    .expect("metric can be created");
    pub static ref CHECKOUT_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "checkout_failures_total",
            "Total number of failed checkouts"
        ),
        &["reason"]
    )
    .expect("metric can be created");
    pub static ref PAYMENT_RECONCILIATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "payment_reconciliations_total",
            "Payment gateway events applied to orders"
        ),
        &["outcome"]
    )
    .expect("metric can be created");
}

/// Renders every registered metric in the Prometheus text format.
pub fn gather_text() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
