use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::CouponType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Always stored upper-case.
    #[sea_orm(unique)]
    pub code: String,
    pub description: Option<String>,
    pub coupon_type: CouponType,
    pub value: Decimal,
    pub minimum_order_amount: Decimal,
    pub maximum_discount_amount: Option<Decimal>,
    /// `None` means unlimited.
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: i32,
    /// Equal to the number of `coupon_usages` rows for this coupon.
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub first_time_user_only: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::coupon_target::Entity")]
    Target,
    #[sea_orm(has_many = "super::coupon_usage::Entity")]
    Usage,
}

impl Related<super::coupon_target::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Target.def()
    }
}

impl Related<super::coupon_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
