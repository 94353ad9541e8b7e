//! sea-orm entities backing the order core.
//!
//! An order document is split across `orders`, `order_lines` and
//! `order_status_history`; a coupon across `coupons`, `coupon_targets` and
//! `coupon_usages`. `products` is the stock projection of the catalog.

pub mod coupon;
pub mod coupon_target;
pub mod coupon_usage;
pub mod order;
pub mod order_line;
pub mod order_status_history;
pub mod product;
