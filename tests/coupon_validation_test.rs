mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::{order_request, TestApp};
use rust_decimal_macros::dec;
use storefront_orders::{
    errors::ServiceError,
    models::CouponType,
    services::coupons::{CouponLine, CouponRejection, CouponScope, ValidateCouponRequest},
};
use uuid::Uuid;

fn lines(product_ids: &[Uuid]) -> Vec<CouponLine> {
    product_ids
        .iter()
        .map(|id| CouponLine {
            product_id: *id,
            category_id: None,
        })
        .collect()
}

#[tokio::test]
async fn validation_reports_every_failed_rule() {
    let app = TestApp::new().await;
    let mut request = TestApp::new_coupon("OLDNEWS", CouponType::Fixed, dec!(10));
    request.valid_from = Utc::now() - Duration::days(30);
    request.valid_until = Utc::now() - Duration::days(1);
    request.minimum_order_amount = dec!(100);
    app.seed_coupon(request).await;

    let err = app
        .coupons
        .validate_coupon(ValidateCouponRequest {
            code: "oldnews".into(),
            user_id: Some(app.customer()),
            lines: lines(&[Uuid::new_v4()]),
            cart_total: dec!(40),
        })
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::CouponRejected { ref reasons, .. }
            if reasons == &vec![CouponRejection::Expired, CouponRejection::MinimumOrderNotMet]
    );
    assert_eq!(err.to_response().details.map(|d| d.len()), Some(2));
}

#[tokio::test]
async fn validation_returns_the_discount_without_redeeming() {
    let app = TestApp::new().await;
    let mut request = TestApp::new_coupon("QUARTER", CouponType::Percentage, dec!(25));
    request.maximum_discount_amount = Some(dec!(30));
    let coupon = app.seed_coupon(request).await;

    let decision = app
        .coupons
        .validate_coupon(ValidateCouponRequest {
            code: "QUARTER".into(),
            user_id: None,
            lines: lines(&[Uuid::new_v4()]),
            cart_total: dec!(200),
        })
        .await
        .unwrap();
    assert_eq!(decision.discount, dec!(30));
    assert_eq!(decision.coupon_id, coupon.id);
    assert_eq!(app.coupon_usage_count(coupon.id).await, 0);
}

#[tokio::test]
async fn first_order_coupon_ignores_cancelled_orders() {
    let app = TestApp::new().await;
    let product = app.seed_product("PLANT", dec!(18), dec!(0), 10).await;
    let mut request = TestApp::new_coupon("WELCOME", CouponType::Fixed, dec!(3));
    request.first_time_user_only = true;
    app.seed_coupon(request).await;
    let buyer = app.customer();

    let check = |user_id| ValidateCouponRequest {
        code: "WELCOME".into(),
        user_id: Some(user_id),
        lines: lines(&[product.id]),
        cart_total: dec!(18),
    };

    let first = app
        .orders
        .create_order(order_request(buyer, &[(product.id, 1)]))
        .await
        .unwrap()
        .order;
    assert_matches!(
        app.coupons.validate_coupon(check(buyer)).await,
        Err(ServiceError::CouponRejected { ref reasons, .. })
            if reasons == &vec![CouponRejection::FirstOrderOnly]
    );

    app.orders
        .cancel_order(first.id, "ordered by mistake".into(), buyer)
        .await
        .unwrap();
    assert!(app.coupons.validate_coupon(check(buyer)).await.is_ok());
}

#[tokio::test]
async fn exclusion_beats_inclusion() {
    let app = TestApp::new().await;
    let included = Uuid::new_v4();
    let excluded = Uuid::new_v4();
    let mut request = TestApp::new_coupon("SHOES", CouponType::Percentage, dec!(15));
    request.scope = CouponScope {
        applicable_products: vec![included],
        excluded_products: vec![excluded],
        ..CouponScope::default()
    };
    app.seed_coupon(request).await;

    let validate = |products: Vec<Uuid>| ValidateCouponRequest {
        code: "SHOES".into(),
        user_id: None,
        lines: lines(&products),
        cart_total: dec!(100),
    };

    assert!(app.coupons.validate_coupon(validate(vec![included])).await.is_ok());
    assert_matches!(
        app.coupons.validate_coupon(validate(vec![included, excluded])).await,
        Err(ServiceError::CouponRejected { ref reasons, .. })
            if reasons == &vec![CouponRejection::ExcludedItemInCart]
    );
    assert_matches!(
        app.coupons.validate_coupon(validate(vec![Uuid::new_v4()])).await,
        Err(ServiceError::CouponRejected { ref reasons, .. })
            if reasons == &vec![CouponRejection::NotApplicableToCart]
    );

    let stored = app.coupons.get_coupon("shoes").await.unwrap();
    assert_eq!(stored.scope.applicable_products, vec![included]);
    assert_eq!(stored.scope.excluded_products, vec![excluded]);
}

#[tokio::test]
async fn coupon_administration() {
    let app = TestApp::new().await;
    let coupon = app
        .seed_coupon(TestApp::new_coupon("SPRING", CouponType::Fixed, dec!(5)))
        .await;
    assert_eq!(coupon.code, "SPRING");
    assert_eq!(coupon.used_count, 0);

    assert_matches!(
        app.coupons
            .create_coupon(TestApp::new_coupon("spring", CouponType::Fixed, dec!(7)))
            .await,
        Err(ServiceError::Conflict(_))
    );
    assert_matches!(
        app.coupons
            .create_coupon(TestApp::new_coupon("HALFOFF", CouponType::Percentage, dec!(150)))
            .await,
        Err(ServiceError::ValidationError(_))
    );

    let deactivated = app.coupons.deactivate_coupon(coupon.id).await.unwrap();
    assert!(!deactivated.is_active);
    assert_matches!(
        app.coupons
            .validate_coupon(ValidateCouponRequest {
                code: "SPRING".into(),
                user_id: None,
                lines: lines(&[Uuid::new_v4()]),
                cart_total: dec!(50),
            })
            .await,
        Err(ServiceError::CouponRejected { ref reasons, .. })
            if reasons == &vec![CouponRejection::Inactive]
    );
    assert_matches!(
        app.coupons.get_coupon("MISSING").await,
        Err(ServiceError::NotFound(_))
    );
}
