//! Storefront order core
//!
//! Prices carts, redeems coupons, reserves stock and drives orders through
//! their lifecycle. HTTP routing and process startup live in the embedding
//! application.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod services;

pub mod prelude {
    pub use crate::config::{AppConfig, ShippingConfig};
    pub use crate::db::DbPool;
    pub use crate::errors::{ErrorKind, ServiceError};
    pub use crate::events::{Event, EventSender};
    pub use crate::models::*;
    pub use crate::services::{
        coupons::CouponService,
        orders::{CreateOrderRequest, OrderService},
        payments::{PaymentEvent, PaymentOutcome, PaymentService},
    };
}
