//! Order core services.
//!
//! Each module exposes free functions generic over `ConnectionTrait` for work
//! that must join a caller's transaction, and a service struct that owns the
//! connection pool for the operations callers invoke directly.

pub mod catalog;
pub mod coupons;
pub mod identity;
pub mod inventory;
pub mod order_status;
pub mod orders;
pub mod payments;
pub mod pricing;
