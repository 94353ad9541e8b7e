//! Racing checkouts and transitions must never oversell stock, over-redeem a
//! coupon, or let two writers both win on one order.

mod common;

use assert_matches::assert_matches;
use common::{order_request, TestApp};
use futures::future::join_all;
use rust_decimal_macros::dec;
use storefront_orders::{
    errors::ServiceError,
    models::{CouponType, OrderStatus},
    services::orders::TransitionOrderRequest,
};

#[tokio::test]
async fn last_units_go_to_exactly_one_buyer() {
    let app = TestApp::new().await;
    let product = app.seed_product("LIMITED", dec!(60), dec!(0), 3).await;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let orders = app.orders.clone();
        let request = order_request(app.customer(), &[(product.id, 2)]);
        tasks.push(tokio::spawn(async move { orders.create_order(request).await }));
    }

    let mut placed = 0;
    let mut short = 0;
    for result in join_all(tasks).await {
        match result.expect("task panicked") {
            Ok(_) => placed += 1,
            Err(ServiceError::InsufficientStock(_)) => short += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!((placed, short), (1, 1));

    let after = app.product(product.id).await;
    assert_eq!(after.stock, 1);
    assert_eq!(after.sold_count, 2);
}

#[tokio::test]
async fn coupon_limit_holds_under_concurrent_redemption() {
    let app = TestApp::new().await;
    let product = app.seed_product("GADGET", dec!(25), dec!(0), 100).await;
    let mut request = TestApp::new_coupon("FLASH3", CouponType::Fixed, dec!(5));
    request.usage_limit = Some(3);
    let coupon = app.seed_coupon(request).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let orders = app.orders.clone();
        let mut request = order_request(app.customer(), &[(product.id, 1)]);
        request.coupon_code = Some("FLASH3".into());
        tasks.push(tokio::spawn(async move { orders.create_order(request).await }));
    }

    let mut redeemed = 0;
    for result in join_all(tasks).await {
        match result.expect("task panicked") {
            Ok(details) => {
                assert_eq!(details.order.discount.round_dp(2), dec!(5.00));
                redeemed += 1;
            }
            Err(err) => assert_matches!(err, ServiceError::CouponRejected { .. }),
        }
    }
    assert_eq!(redeemed, 3);

    let stored = app.coupons.get_coupon("FLASH3").await.unwrap();
    assert_eq!(stored.coupon.used_count, 3);
    assert_eq!(app.coupon_usage_count(coupon.id).await, 3);
    // Rejected checkouts kept no stock.
    assert_eq!(app.product(product.id).await.stock, 97);
}

#[tokio::test]
async fn per_user_limit_holds_for_parallel_checkouts_by_one_user() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET", dec!(10), dec!(0), 100).await;
    let coupon = app
        .seed_coupon(TestApp::new_coupon("ONCE", CouponType::Percentage, dec!(20)))
        .await;
    let buyer = app.customer();

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let orders = app.orders.clone();
        let mut request = order_request(buyer, &[(product.id, 1)]);
        request.coupon_code = Some("ONCE".into());
        tasks.push(tokio::spawn(async move { orders.create_order(request).await }));
    }

    let mut redeemed = 0;
    for task in tasks {
        if task.await.expect("task panicked").is_ok() {
            redeemed += 1;
        }
    }
    assert_eq!(redeemed, 1);
    assert_eq!(app.coupon_usage_count(coupon.id).await, 1);
}

#[tokio::test]
async fn racing_cancel_and_ship_resolve_to_one_state() {
    let app = TestApp::new().await;
    let product = app.seed_product("BIKE", dec!(400), dec!(0), 2).await;
    let buyer = app.customer();
    let admin = app.admin_id;
    let order = app
        .orders
        .create_order(order_request(buyer, &[(product.id, 1)]))
        .await
        .unwrap()
        .order;
    app.orders
        .transition_order(
            order.id,
            TransitionOrderRequest {
                target: OrderStatus::Processing,
                note: None,
                actor_id: admin,
                shipment: None,
            },
        )
        .await
        .unwrap();

    let cancel = {
        let orders = app.orders.clone();
        tokio::spawn(async move {
            orders
                .cancel_order(order.id, "found it cheaper".into(), buyer)
                .await
        })
    };
    let ship = {
        let orders = app.orders.clone();
        tokio::spawn(async move {
            orders
                .transition_order(
                    order.id,
                    TransitionOrderRequest {
                        target: OrderStatus::Shipped,
                        note: None,
                        actor_id: admin,
                        shipment: None,
                    },
                )
                .await
        })
    };

    let outcomes = [
        cancel.await.expect("task panicked"),
        ship.await.expect("task panicked"),
    ];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for outcome in &outcomes {
        if let Err(err) = outcome {
            assert_matches!(
                err,
                ServiceError::InvalidTransition { .. } | ServiceError::ConcurrentModification(_)
            );
        }
    }

    let final_order = app.orders.get_order(order.id, admin).await.unwrap().order;
    let expected_stock = match final_order.status {
        OrderStatus::Cancelled => 2,
        OrderStatus::Shipped => 1,
        other => panic!("unexpected final status {other}"),
    };
    assert_eq!(app.product(product.id).await.stock, expected_stock);
    assert_eq!(app.history(order.id).await.len(), 3);
}
