use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ProductStatus;

/// Catalog product as seen by the order core: authoritative price, tax rate
/// and the stock counters the inventory ledger mutates.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    pub image: Option<String>,
    pub price: Decimal,
    /// Percentage, e.g. `8` for 8%.
    pub tax_rate: Decimal,
    pub stock: i32,
    pub sold_count: i32,
    pub low_stock_threshold: i32,
    pub status: ProductStatus,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_orderable(&self) -> bool {
        self.status == ProductStatus::Active
    }

    pub fn is_low_on_stock(&self) -> bool {
        self.stock <= self.low_stock_threshold
    }
}
