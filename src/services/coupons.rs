//! Coupon engine: eligibility rules, discount computation and redemption.
//!
//! Rules are checked in a fixed order and the first failure decides what a
//! checkout sees. [`CouponService::validate_coupon`] runs the same rules but
//! reports every failure at once.
//!
//! Redemption never reads `used_count` and writes it back. The global cap is
//! enforced by a conditional increment, and the per-user cap is counted after
//! that increment, while the coupon row is locked by this transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Condition, Expr},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    db::DbPool,
    entities::{
        coupon::{self, Entity as CouponEntity},
        coupon_target::{self, Entity as CouponTargetEntity},
        coupon_usage::{self, Entity as CouponUsageEntity},
    },
    errors::ServiceError,
    models::{CouponTargetKind, CouponType},
    services::{orders, pricing::round_money},
};

/// Why a coupon cannot be applied, in rule order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    thiserror::Error,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CouponRejection {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotYetValid,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("order total is below the coupon minimum")]
    MinimumOrderNotMet,
    #[error("coupon is only available on a first order")]
    FirstOrderOnly,
    #[error("per-user usage limit reached")]
    PerUserLimitReached,
    #[error("coupon is not available to this user")]
    UserNotEligible,
    #[error("coupon does not apply to any item in the cart")]
    NotApplicableToCart,
    #[error("cart contains an item excluded from this coupon")]
    ExcludedItemInCart,
}

impl CouponRejection {
    pub fn code(self) -> &'static str {
        self.into()
    }
}

/// Product and category ids a coupon is limited to or barred from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponScope {
    pub applicable_products: Vec<Uuid>,
    pub applicable_categories: Vec<Uuid>,
    pub applicable_users: Vec<Uuid>,
    pub excluded_products: Vec<Uuid>,
    pub excluded_categories: Vec<Uuid>,
}

impl CouponScope {
    pub fn from_targets(targets: &[coupon_target::Model]) -> Self {
        let mut scope = Self::default();
        for target in targets {
            let list = match target.kind {
                CouponTargetKind::ApplicableProduct => &mut scope.applicable_products,
                CouponTargetKind::ApplicableCategory => &mut scope.applicable_categories,
                CouponTargetKind::ApplicableUser => &mut scope.applicable_users,
                CouponTargetKind::ExcludedProduct => &mut scope.excluded_products,
                CouponTargetKind::ExcludedCategory => &mut scope.excluded_categories,
            };
            list.push(target.target_id);
        }
        scope
    }

    fn entries(&self) -> Vec<(CouponTargetKind, Uuid)> {
        let lists = [
            (CouponTargetKind::ApplicableProduct, &self.applicable_products),
            (CouponTargetKind::ApplicableCategory, &self.applicable_categories),
            (CouponTargetKind::ApplicableUser, &self.applicable_users),
            (CouponTargetKind::ExcludedProduct, &self.excluded_products),
            (CouponTargetKind::ExcludedCategory, &self.excluded_categories),
        ];
        lists
            .into_iter()
            .flat_map(|(kind, ids)| ids.iter().map(move |id| (kind, *id)))
            .collect()
    }

    fn includes(&self, line: &CouponLine) -> bool {
        self.applicable_products.contains(&line.product_id)
            || line
                .category_id
                .map_or(false, |c| self.applicable_categories.contains(&c))
    }

    fn excludes(&self, line: &CouponLine) -> bool {
        self.excluded_products.contains(&line.product_id)
            || line
                .category_id
                .map_or(false, |c| self.excluded_categories.contains(&c))
    }
}

/// The parts of a cart line the scoping rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponLine {
    pub product_id: Uuid,
    pub category_id: Option<Uuid>,
}

impl From<&crate::services::pricing::PricedLine> for CouponLine {
    fn from(line: &crate::services::pricing::PricedLine) -> Self {
        Self {
            product_id: line.product_id,
            category_id: line.category_id,
        }
    }
}

/// Everything about the shopper and cart the rules depend on.
#[derive(Debug, Clone)]
pub struct CouponContext<'a> {
    pub user_id: Option<Uuid>,
    pub cart_total: Decimal,
    pub lines: &'a [CouponLine],
    /// Orders of this user that were not cancelled.
    pub user_order_count: u64,
    /// Times this user already redeemed the coupon.
    pub user_usage_count: u64,
}

/// Runs every rule and returns the failures in rule order.
pub fn check_rules(
    coupon: &coupon::Model,
    scope: &CouponScope,
    ctx: &CouponContext<'_>,
    now: DateTime<Utc>,
) -> Vec<CouponRejection> {
    let mut failures = Vec::new();

    if !coupon.is_active {
        failures.push(CouponRejection::Inactive);
    }
    if now < coupon.valid_from {
        failures.push(CouponRejection::NotYetValid);
    } else if now > coupon.valid_until {
        failures.push(CouponRejection::Expired);
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            failures.push(CouponRejection::UsageLimitReached);
        }
    }
    if ctx.cart_total < coupon.minimum_order_amount {
        failures.push(CouponRejection::MinimumOrderNotMet);
    }
    if coupon.first_time_user_only && ctx.user_order_count > 0 {
        failures.push(CouponRejection::FirstOrderOnly);
    }
    if ctx.user_id.is_some() && ctx.user_usage_count >= coupon.usage_limit_per_user.max(0) as u64 {
        failures.push(CouponRejection::PerUserLimitReached);
    }
    if !scope.applicable_users.is_empty() {
        let member = ctx
            .user_id
            .map_or(false, |id| scope.applicable_users.contains(&id));
        if !member {
            failures.push(CouponRejection::UserNotEligible);
        }
    }
    let scoped = !scope.applicable_products.is_empty() || !scope.applicable_categories.is_empty();
    if scoped && !ctx.lines.iter().any(|line| scope.includes(line)) {
        failures.push(CouponRejection::NotApplicableToCart);
    }
    // Exclusion wins even when another line matched the inclusion lists.
    if ctx.lines.iter().any(|line| scope.excludes(line)) {
        failures.push(CouponRejection::ExcludedItemInCart);
    }

    failures
}

/// Discount for `cart_total`: rounded to cents, capped by the coupon maximum
/// and by the cart total, never negative.
pub fn compute_discount(coupon: &coupon::Model, cart_total: Decimal) -> Decimal {
    let raw = match coupon.coupon_type {
        CouponType::Percentage => cart_total * coupon.value / Decimal::ONE_HUNDRED,
        CouponType::Fixed => coupon.value,
    };
    let mut discount = round_money(raw);
    if let Some(max) = coupon.maximum_discount_amount {
        discount = discount.min(max);
    }
    discount.min(cart_total).max(Decimal::ZERO)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountDecision {
    pub coupon_id: Uuid,
    pub code: String,
    pub coupon_type: CouponType,
    pub discount: Decimal,
}

/// Normalizes a shopper-entered code to its stored form.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

async fn find_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<(coupon::Model, CouponScope), ServiceError> {
    let coupon = CouponEntity::find()
        .filter(coupon::Column::Code.eq(normalize_code(code)))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))?;
    let targets = CouponTargetEntity::find()
        .filter(coupon_target::Column::CouponId.eq(coupon.id))
        .all(conn)
        .await?;
    let scope = CouponScope::from_targets(&targets);
    Ok((coupon, scope))
}

async fn count_user_usages<C: ConnectionTrait>(
    conn: &C,
    coupon_id: Uuid,
    user_id: Uuid,
) -> Result<u64, ServiceError> {
    Ok(CouponUsageEntity::find()
        .filter(coupon_usage::Column::CouponId.eq(coupon_id))
        .filter(coupon_usage::Column::UserId.eq(user_id))
        .count(conn)
        .await?)
}

/// Checks a coupon for a checkout. The first failing rule is reported.
#[instrument(skip(conn, lines), fields(code = %code))]
pub async fn evaluate<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    user_id: Option<Uuid>,
    cart_total: Decimal,
    lines: &[CouponLine],
    user_order_count: u64,
) -> Result<DiscountDecision, ServiceError> {
    let (coupon, scope) = find_by_code(conn, code).await?;
    let user_usage_count = match user_id {
        Some(user) => count_user_usages(conn, coupon.id, user).await?,
        None => 0,
    };
    let ctx = CouponContext {
        user_id,
        cart_total,
        lines,
        user_order_count,
        user_usage_count,
    };

    let failures = check_rules(&coupon, &scope, &ctx, Utc::now());
    if let Some(first) = failures.first() {
        info!(reason = first.code(), "Coupon rejected");
        return Err(ServiceError::CouponRejected {
            code: coupon.code,
            reasons: vec![*first],
        });
    }

    Ok(DiscountDecision {
        coupon_id: coupon.id,
        code: coupon.code.clone(),
        coupon_type: coupon.coupon_type,
        discount: compute_discount(&coupon, cart_total),
    })
}

/// Records one redemption of `coupon_id` for `order_id`.
///
/// Must run inside the transaction that inserted the order; an error leaves
/// the caller to roll everything back.
#[instrument(skip(conn), fields(coupon_id = %coupon_id, order_id = %order_id))]
pub async fn redeem<C: ConnectionTrait>(
    conn: &C,
    coupon_id: Uuid,
    user_id: Uuid,
    order_id: Uuid,
    discount: Decimal,
) -> Result<coupon_usage::Model, ServiceError> {
    let now = Utc::now();
    let bumped = CouponEntity::update_many()
        .col_expr(
            coupon::Column::UsedCount,
            Expr::col(coupon::Column::UsedCount).add(1),
        )
        .col_expr(coupon::Column::UpdatedAt, Expr::value(now))
        .filter(coupon::Column::Id.eq(coupon_id))
        .filter(
            Condition::any()
                .add(coupon::Column::UsageLimit.is_null())
                .add(Expr::col(coupon::Column::UsedCount).lt(Expr::col(coupon::Column::UsageLimit))),
        )
        .exec(conn)
        .await?;

    let coupon = CouponEntity::find_by_id(coupon_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", coupon_id)))?;

    if bumped.rows_affected == 0 {
        warn!("Coupon exhausted at redemption time");
        return Err(ServiceError::CouponRejected {
            code: coupon.code,
            reasons: vec![CouponRejection::UsageLimitReached],
        });
    }

    let used_by_user = count_user_usages(conn, coupon_id, user_id).await?;
    if used_by_user >= coupon.usage_limit_per_user.max(0) as u64 {
        warn!(user_id = %user_id, "Per-user coupon limit hit at redemption time");
        return Err(ServiceError::CouponRejected {
            code: coupon.code,
            reasons: vec![CouponRejection::PerUserLimitReached],
        });
    }

    let usage = coupon_usage::ActiveModel {
        id: Set(Uuid::new_v4()),
        coupon_id: Set(coupon_id),
        user_id: Set(user_id),
        order_id: Set(order_id),
        discount_amount: Set(discount),
        used_at: Set(now),
    }
    .insert(conn)
    .await?;

    info!(user_id = %user_id, %discount, "Coupon redeemed");
    Ok(usage)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_new_coupon"))]
pub struct NewCoupon {
    #[validate(length(min = 3, max = 64), custom = "validate_code")]
    pub code: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub coupon_type: CouponType,
    pub value: Decimal,
    pub minimum_order_amount: Decimal,
    pub maximum_discount_amount: Option<Decimal>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
    #[validate(range(min = 1))]
    pub usage_limit_per_user: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub first_time_user_only: bool,
    #[serde(default)]
    pub scope: CouponScope,
    pub created_by: Option<Uuid>,
}

fn validate_code(code: &str) -> Result<(), ValidationError> {
    if code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("code_charset"))
    }
}

fn validate_new_coupon(coupon: &NewCoupon) -> Result<(), ValidationError> {
    if coupon.value <= Decimal::ZERO {
        return Err(ValidationError::new("value_not_positive"));
    }
    if coupon.coupon_type == CouponType::Percentage && coupon.value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage_above_100"));
    }
    if coupon.minimum_order_amount.is_sign_negative() {
        return Err(ValidationError::new("negative_minimum_order"));
    }
    if matches!(coupon.maximum_discount_amount, Some(max) if max <= Decimal::ZERO) {
        return Err(ValidationError::new("maximum_discount_not_positive"));
    }
    if coupon.valid_from >= coupon.valid_until {
        return Err(ValidationError::new("validity_window_inverted"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponDetails {
    pub coupon: coupon::Model,
    pub scope: CouponScope,
    /// Oldest first.
    pub usages: Vec<coupon_usage::Model>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub user_id: Option<Uuid>,
    pub lines: Vec<CouponLine>,
    pub cart_total: Decimal,
}

#[derive(Clone)]
pub struct CouponService {
    db_pool: Arc<DbPool>,
}

impl CouponService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Checks a coupon without redeeming it and reports every violated rule.
    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn validate_coupon(
        &self,
        request: ValidateCouponRequest,
    ) -> Result<DiscountDecision, ServiceError> {
        let db = &*self.db_pool;
        let (coupon, scope) = find_by_code(db, &request.code).await?;

        let (user_order_count, user_usage_count) = match request.user_id {
            Some(user) => (
                orders::count_active_orders(db, user).await?,
                count_user_usages(db, coupon.id, user).await?,
            ),
            None => (0, 0),
        };
        let ctx = CouponContext {
            user_id: request.user_id,
            cart_total: request.cart_total,
            lines: &request.lines,
            user_order_count,
            user_usage_count,
        };

        let failures = check_rules(&coupon, &scope, &ctx, Utc::now());
        if !failures.is_empty() {
            return Err(ServiceError::CouponRejected {
                code: coupon.code,
                reasons: failures,
            });
        }

        Ok(DiscountDecision {
            coupon_id: coupon.id,
            code: coupon.code.clone(),
            coupon_type: coupon.coupon_type,
            discount: compute_discount(&coupon, request.cart_total),
        })
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_coupon(&self, request: NewCoupon) -> Result<CouponDetails, ServiceError> {
        request.validate()?;
        let code = normalize_code(&request.code);

        let txn = self.db_pool.begin().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to start transaction for coupon creation");
            ServiceError::DatabaseError(e)
        })?;

        let existing = CouponEntity::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} already exists",
                code
            )));
        }

        let now = Utc::now();
        let coupon = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            description: Set(request.description),
            coupon_type: Set(request.coupon_type),
            value: Set(request.value),
            minimum_order_amount: Set(request.minimum_order_amount),
            maximum_discount_amount: Set(request.maximum_discount_amount),
            usage_limit: Set(request.usage_limit),
            usage_limit_per_user: Set(request.usage_limit_per_user),
            used_count: Set(0),
            valid_from: Set(request.valid_from),
            valid_until: Set(request.valid_until),
            is_active: Set(true),
            first_time_user_only: Set(request.first_time_user_only),
            created_by: Set(request.created_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (kind, target_id) in request.scope.entries() {
            coupon_target::ActiveModel {
                id: Set(Uuid::new_v4()),
                coupon_id: Set(coupon.id),
                kind: Set(kind),
                target_id: Set(target_id),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to commit coupon creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
        Ok(CouponDetails {
            coupon,
            scope: request.scope,
            usages: Vec::new(),
        })
    }

    #[instrument(skip(self))]
    pub async fn deactivate_coupon(&self, coupon_id: Uuid) -> Result<coupon::Model, ServiceError> {
        let db = &*self.db_pool;
        let coupon = CouponEntity::find_by_id(coupon_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", coupon_id)))?;

        let mut active: coupon::ActiveModel = coupon.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        info!(code = %updated.code, "Coupon deactivated");
        Ok(updated)
    }

    pub async fn get_coupon(&self, code: &str) -> Result<CouponDetails, ServiceError> {
        let db = &*self.db_pool;
        let (coupon, scope) = find_by_code(db, code).await?;
        let usages = CouponUsageEntity::find()
            .filter(coupon_usage::Column::CouponId.eq(coupon.id))
            .order_by_asc(coupon_usage::Column::UsedAt)
            .all(db)
            .await?;
        Ok(CouponDetails {
            coupon,
            scope,
            usages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn coupon(coupon_type: CouponType, value: Decimal) -> coupon::Model {
        let now = Utc::now();
        coupon::Model {
            id: Uuid::new_v4(),
            code: "SAVE10".into(),
            description: None,
            coupon_type,
            value,
            minimum_order_amount: dec!(50),
            maximum_discount_amount: None,
            usage_limit: None,
            usage_limit_per_user: 1,
            used_count: 0,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            is_active: true,
            first_time_user_only: false,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ctx<'a>(lines: &'a [CouponLine], cart_total: Decimal) -> CouponContext<'a> {
        CouponContext {
            user_id: Some(Uuid::new_v4()),
            cart_total,
            lines,
            user_order_count: 0,
            user_usage_count: 0,
        }
    }

    fn line(category_id: Option<Uuid>) -> CouponLine {
        CouponLine {
            product_id: Uuid::new_v4(),
            category_id,
        }
    }

    #[test]
    fn percentage_discount_on_two_hundred() {
        let c = coupon(CouponType::Percentage, dec!(10));
        assert_eq!(compute_discount(&c, dec!(200)), dec!(20));
    }

    #[test]
    fn discount_clamps_to_maximum_then_cart_total() {
        let mut c = coupon(CouponType::Percentage, dec!(50));
        c.maximum_discount_amount = Some(dec!(30));
        assert_eq!(compute_discount(&c, dec!(200)), dec!(30));

        let fixed = coupon(CouponType::Fixed, dec!(75));
        assert_eq!(compute_discount(&fixed, dec!(60)), dec!(60));
    }

    #[test]
    fn percentage_discount_rounds_half_up() {
        let c = coupon(CouponType::Percentage, dec!(15));
        // 15% of 10.10 = 1.515
        assert_eq!(compute_discount(&c, dec!(10.10)), dec!(1.52));
    }

    #[test]
    fn eligible_coupon_has_no_failures() {
        let lines = [line(None)];
        let c = coupon(CouponType::Percentage, dec!(10));
        assert!(check_rules(&c, &CouponScope::default(), &ctx(&lines, dec!(200)), Utc::now())
            .is_empty());
    }

    #[test]
    fn failures_are_reported_in_rule_order() {
        let lines = [line(None)];
        let mut c = coupon(CouponType::Percentage, dec!(10));
        c.is_active = false;
        c.valid_until = Utc::now() - Duration::hours(1);
        c.usage_limit = Some(3);
        c.used_count = 3;

        let mut context = ctx(&lines, dec!(10));
        context.user_usage_count = 1;

        let failures = check_rules(&c, &CouponScope::default(), &context, Utc::now());
        assert_eq!(
            failures,
            vec![
                CouponRejection::Inactive,
                CouponRejection::Expired,
                CouponRejection::UsageLimitReached,
                CouponRejection::MinimumOrderNotMet,
                CouponRejection::PerUserLimitReached,
            ]
        );
    }

    #[test]
    fn not_yet_valid_window() {
        let lines = [line(None)];
        let mut c = coupon(CouponType::Fixed, dec!(5));
        c.valid_from = Utc::now() + Duration::hours(2);
        let failures = check_rules(&c, &CouponScope::default(), &ctx(&lines, dec!(100)), Utc::now());
        assert_eq!(failures, vec![CouponRejection::NotYetValid]);
    }

    #[test]
    fn first_order_only_counts_previous_orders() {
        let lines = [line(None)];
        let mut c = coupon(CouponType::Fixed, dec!(5));
        c.first_time_user_only = true;

        let mut context = ctx(&lines, dec!(100));
        assert!(check_rules(&c, &CouponScope::default(), &context, Utc::now()).is_empty());

        context.user_order_count = 2;
        assert_eq!(
            check_rules(&c, &CouponScope::default(), &context, Utc::now()),
            vec![CouponRejection::FirstOrderOnly]
        );
    }

    #[test]
    fn anonymous_shopper_fails_user_allow_list() {
        let lines = [line(None)];
        let c = coupon(CouponType::Fixed, dec!(5));
        let scope = CouponScope {
            applicable_users: vec![Uuid::new_v4()],
            ..CouponScope::default()
        };
        let mut context = ctx(&lines, dec!(100));
        context.user_id = None;
        assert_eq!(
            check_rules(&c, &scope, &context, Utc::now()),
            vec![CouponRejection::UserNotEligible]
        );
    }

    #[test]
    fn inclusion_is_a_union_of_products_and_categories() {
        let category = Uuid::new_v4();
        let lines = [line(None), line(Some(category))];
        let c = coupon(CouponType::Fixed, dec!(5));
        let scope = CouponScope {
            applicable_products: vec![Uuid::new_v4()],
            applicable_categories: vec![category],
            ..CouponScope::default()
        };
        assert!(check_rules(&c, &scope, &ctx(&lines, dec!(100)), Utc::now()).is_empty());

        let unrelated = [line(Some(Uuid::new_v4()))];
        assert_eq!(
            check_rules(&c, &scope, &ctx(&unrelated, dec!(100)), Utc::now()),
            vec![CouponRejection::NotApplicableToCart]
        );
    }

    #[test]
    fn exclusion_wins_over_inclusion() {
        let category = Uuid::new_v4();
        let excluded = line(Some(category));
        let lines = [excluded];
        let c = coupon(CouponType::Fixed, dec!(5));
        let scope = CouponScope {
            applicable_categories: vec![category],
            excluded_products: vec![excluded.product_id],
            ..CouponScope::default()
        };
        assert_eq!(
            check_rules(&c, &scope, &ctx(&lines, dec!(100)), Utc::now()),
            vec![CouponRejection::ExcludedItemInCart]
        );
    }

    #[test]
    fn new_coupon_validation() {
        let now = Utc::now();
        let mut request = NewCoupon {
            code: "spring-25".into(),
            description: None,
            coupon_type: CouponType::Percentage,
            value: dec!(25),
            minimum_order_amount: Decimal::ZERO,
            maximum_discount_amount: None,
            usage_limit: Some(100),
            usage_limit_per_user: 1,
            valid_from: now,
            valid_until: now + Duration::days(30),
            first_time_user_only: false,
            scope: CouponScope::default(),
            created_by: None,
        };
        assert!(request.validate().is_ok());

        request.value = dec!(120);
        assert!(request.validate().is_err());

        request.value = dec!(25);
        request.valid_until = now - Duration::days(1);
        assert!(request.validate().is_err());

        request.valid_until = now + Duration::days(1);
        request.code = "BAD CODE!".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn scope_round_trips_through_target_rows() {
        let scope = CouponScope {
            applicable_products: vec![Uuid::new_v4()],
            excluded_categories: vec![Uuid::new_v4(), Uuid::new_v4()],
            ..CouponScope::default()
        };
        let coupon_id = Uuid::new_v4();
        let rows: Vec<coupon_target::Model> = scope
            .entries()
            .into_iter()
            .map(|(kind, target_id)| coupon_target::Model {
                id: Uuid::new_v4(),
                coupon_id,
                kind,
                target_id,
            })
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(CouponScope::from_targets(&rows), scope);
    }
}
