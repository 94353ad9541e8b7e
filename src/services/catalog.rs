//! Product store as seen by the order core.
//!
//! The free functions take any [`ConnectionTrait`] so the ledger can run them
//! on a pool or inside an open transaction.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    db::DbPool,
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    models::ProductStatus,
};

pub async fn get_product<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<product::Model>, ServiceError> {
    Ok(ProductEntity::find_by_id(id).one(conn).await?)
}

/// Decrements stock and bumps sold_count only when at least `quantity` units
/// are on hand. Returns whether the row was updated.
pub async fn conditional_decrement_stock<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    quantity: i32,
) -> Result<bool, ServiceError> {
    let result = ProductEntity::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(quantity),
        )
        .col_expr(
            product::Column::SoldCount,
            Expr::col(product::Column::SoldCount).add(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(id))
        .filter(product::Column::Stock.gte(quantity))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Returns `quantity` units to stock and takes them off sold_count.
pub async fn increment_stock<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    let result = ProductEntity::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).add(quantity),
        )
        .col_expr(
            product::Column::SoldCount,
            Expr::col(product::Column::SoldCount).sub(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound(format!("Product {} not found", id)));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    pub image: Option<String>,
    #[validate(custom = "validate_money")]
    pub price: Decimal,
    #[validate(custom = "validate_tax_rate")]
    pub tax_rate: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[validate(range(min = 0))]
    pub low_stock_threshold: i32,
    pub category_id: Option<Uuid>,
}

/// Prices are whole cents; `12.500` is fine, `9.995` is not.
fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("negative_amount"));
    }
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new("sub_cent_amount"));
    }
    Ok(())
}

fn validate_tax_rate(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("tax_rate_out_of_range"));
    }
    Ok(())
}

/// Admin-side catalog writes the order core needs for seeding and tests.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(&self, request: NewProduct) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            sku: Set(request.sku),
            image: Set(request.image),
            price: Set(request.price),
            tax_rate: Set(request.tax_rate),
            stock: Set(request.stock),
            sold_count: Set(0),
            low_stock_threshold: Set(request.low_stock_threshold),
            status: Set(ProductStatus::Active),
            category_id: Set(request.category_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(product_id = %model.id, "Product created");
        Ok(model)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        get_product(&*self.db_pool, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: Uuid,
        status: ProductStatus,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get_product(id).await?;
        let mut active: product::ActiveModel = existing.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }
}
