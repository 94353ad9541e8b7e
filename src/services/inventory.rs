//! Inventory ledger: all-or-nothing stock reservation and its reversal.
//!
//! Every line is checked before any row is touched. The decrements themselves
//! are conditional (`stock >= quantity`), so two checkouts racing for the last
//! units cannot both win even though both passed the check.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use sea_orm::ConnectionTrait;

use crate::errors::ServiceError;
use crate::services::catalog;

/// A product and the number of units moved for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl StockLine {
    pub fn new(product_id: Uuid, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub product_id: Uuid,
    pub stock: i32,
    pub threshold: i32,
}

/// Result of a successful reservation.
#[derive(Debug, Clone, Default)]
pub struct Reservation {
    /// Merged lines that were decremented, one per product.
    pub lines: Vec<StockLine>,
    /// Products left at or below their low-stock threshold.
    pub low_stock: Vec<LowStockAlert>,
}

/// Sums quantities per product, keeping first-seen order.
pub fn merge_lines(lines: &[StockLine]) -> Vec<StockLine> {
    let mut merged: Vec<StockLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(*line),
        }
    }
    merged
}

/// Reserves stock for every line or for none of them.
#[instrument(skip(conn, lines), fields(line_count = lines.len()))]
pub async fn reserve<C: ConnectionTrait>(
    conn: &C,
    lines: &[StockLine],
) -> Result<Reservation, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one line is required".to_string(),
        ));
    }
    if let Some(bad) = lines.iter().find(|l| l.quantity < 1) {
        return Err(ServiceError::ValidationError(format!(
            "Quantity for product {} must be at least 1",
            bad.product_id
        )));
    }

    let merged = merge_lines(lines);
    check_available(conn, &merged).await?;
    let applied = apply_decrements(conn, &merged).await?;

    let mut low_stock = Vec::new();
    for line in &applied {
        if let Some(product) = catalog::get_product(conn, line.product_id).await? {
            if product.is_low_on_stock() {
                warn!(
                    product_id = %product.id,
                    stock = product.stock,
                    threshold = product.low_stock_threshold,
                    "Product at or below low-stock threshold"
                );
                low_stock.push(LowStockAlert {
                    product_id: product.id,
                    stock: product.stock,
                    threshold: product.low_stock_threshold,
                });
            }
        }
    }

    info!(products = applied.len(), "Stock reserved");
    Ok(Reservation {
        lines: applied,
        low_stock,
    })
}

/// Check phase: every line must name an orderable product with enough stock.
async fn check_available<C: ConnectionTrait>(
    conn: &C,
    merged: &[StockLine],
) -> Result<(), ServiceError> {
    for line in merged {
        let product = catalog::get_product(conn, line.product_id)
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
        if product.stock < line.quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Product {} has {} in stock, {} requested",
                product.id, product.stock, line.quantity
            )));
        }
    }
    Ok(())
}

/// Apply phase: conditionally decrements each merged line in turn. If one
/// decrement finds too little stock, the lines already taken are put back
/// and the whole batch fails with `InsufficientStock`.
#[instrument(skip(conn, merged), fields(line_count = merged.len()))]
pub async fn apply_decrements<C: ConnectionTrait>(
    conn: &C,
    merged: &[StockLine],
) -> Result<Vec<StockLine>, ServiceError> {
    let mut applied: Vec<StockLine> = Vec::with_capacity(merged.len());
    for line in merged {
        if catalog::conditional_decrement_stock(conn, line.product_id, line.quantity).await? {
            applied.push(*line);
            continue;
        }

        warn!(
            product_id = %line.product_id,
            quantity = line.quantity,
            "Stock changed between check and decrement; rolling back batch"
        );
        for done in &applied {
            if let Err(e) = catalog::increment_stock(conn, done.product_id, done.quantity).await {
                error!(product_id = %done.product_id, error = %e, "Failed to roll back reservation");
                return Err(e);
            }
        }
        return Err(ServiceError::InsufficientStock(format!(
            "Product {} no longer has {} in stock",
            line.product_id, line.quantity
        )));
    }
    Ok(applied)
}

/// Hands reserved units back. Callers guarantee at most one release per order.
#[instrument(skip(conn, lines), fields(line_count = lines.len()))]
pub async fn release<C: ConnectionTrait>(
    conn: &C,
    lines: &[StockLine],
) -> Result<Vec<StockLine>, ServiceError> {
    let merged = merge_lines(lines);
    for line in &merged {
        debug!(product_id = %line.product_id, quantity = line.quantity, "Releasing stock");
        catalog::increment_stock(conn, line.product_id, line.quantity).await?;
    }
    info!(products = merged.len(), "Stock released");
    Ok(merged)
}
