mod common;

use assert_matches::assert_matches;
use common::{order_request, TestApp};
use rust_decimal_macros::dec;
use storefront_orders::{
    errors::{ErrorKind, ServiceError},
    models::{OrderStatus, PaymentStatus},
    services::{
        orders::TransitionOrderRequest,
        payments::{PaymentEvent, PaymentOutcome},
    },
};
use uuid::Uuid;

#[tokio::test]
async fn confirmation_completes_payment_and_confirms_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("PHONE", dec!(300), dec!(0), 5).await;
    let buyer = app.customer();
    let order = app
        .orders
        .create_order(order_request(buyer, &[(product.id, 1)]))
        .await
        .unwrap()
        .order;

    let confirmed = app
        .payments
        .reconcile_payment(PaymentEvent {
            order_id: order.id,
            user_id: buyer,
            provider_reference: Some("pi_3Nx".into()),
            outcome: PaymentOutcome::Confirmed,
        })
        .await
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    assert_eq!(confirmed.payment_status, PaymentStatus::Completed);
    assert_eq!(confirmed.transaction_id.as_deref(), Some("pi_3Nx"));
    assert!(confirmed.paid_at.is_some());

    let history = app.history(order.id).await;
    assert_eq!(history.last().map(|h| h.status), Some(OrderStatus::Confirmed));

    let again = app
        .payments
        .on_payment_confirmed(order.id, buyer, Some("pi_3Nx".into()))
        .await
        .unwrap_err();
    assert_matches!(again, ServiceError::Conflict(_));
    assert_eq!(again.kind(), ErrorKind::Conflict);
    assert_eq!(app.history(order.id).await.len(), history.len());
}

#[tokio::test]
async fn confirmation_after_processing_keeps_status() {
    let app = TestApp::new().await;
    let product = app.seed_product("TABLET", dec!(250), dec!(0), 5).await;
    let buyer = app.customer();
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
                actor_id: app.admin_id,
                shipment: None,
            },
        )
        .await
        .unwrap();

    let paid = app
        .payments
        .on_payment_confirmed(order.id, buyer, None)
        .await
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Processing);
    assert_eq!(paid.payment_status, PaymentStatus::Completed);
}

#[tokio::test]
async fn failure_cancels_and_releases_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("CAMERA", dec!(500), dec!(0), 2).await;
    let buyer = app.customer();
    let order = app
        .orders
        .create_order(order_request(buyer, &[(product.id, 2)]))
        .await
        .unwrap()
        .order;
    assert_eq!(app.product(product.id).await.stock, 0);

    let cancelled = app
        .payments
        .reconcile_payment(PaymentEvent {
            order_id: order.id,
            user_id: buyer,
            provider_reference: None,
            outcome: PaymentOutcome::Failed {
                reason: "card declined".into(),
            },
        })
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Failed);
    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("payment failed: card declined")
    );
    assert_eq!(app.product(product.id).await.stock, 2);

    let history = app.history(order.id).await;
    let last = history.last().unwrap();
    assert_eq!(last.status, OrderStatus::Cancelled);
    assert_eq!(last.note.as_deref(), Some("payment failed: card declined"));
}

#[tokio::test]
async fn failure_on_shipped_order_is_an_invalid_transition() {
    let app = TestApp::new().await;
    let product = app.seed_product("DRONE", dec!(700), dec!(0), 1).await;
    let buyer = app.customer();
    let order = app
        .orders
        .create_order(order_request(buyer, &[(product.id, 1)]))
        .await
        .unwrap()
        .order;
    for target in [OrderStatus::Processing, OrderStatus::Shipped] {
        app.orders
            .transition_order(
                order.id,
                TransitionOrderRequest {
                    target,
                    note: None,
                    actor_id: app.admin_id,
                    shipment: None,
                },
            )
            .await
            .unwrap();
    }
    let before = app.orders.get_order(order.id, buyer).await.unwrap().order;

    assert_matches!(
        app.payments
            .on_payment_failed(order.id, buyer, "chargeback".into())
            .await,
        Err(ServiceError::InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled
        })
    );
    let after = app.orders.get_order(order.id, buyer).await.unwrap().order;
    assert_eq!(after, before);
}

#[tokio::test]
async fn requester_must_own_the_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("WATCH", dec!(199), dec!(0), 3).await;
    let buyer = app.customer();
    let stranger = app.customer();
    let order = app
        .orders
        .create_order(order_request(buyer, &[(product.id, 1)]))
        .await
        .unwrap()
        .order;

    assert_matches!(
        app.payments
            .on_payment_confirmed(order.id, stranger, Some("pi_x".into()))
            .await,
        Err(ServiceError::Forbidden(_))
    );
    let untouched = app.orders.get_order(order.id, buyer).await.unwrap().order;
    assert_eq!(untouched.payment_status, PaymentStatus::Pending);
    assert_eq!(untouched.version, order.version);

    assert_matches!(
        app.payments
            .on_payment_confirmed(Uuid::new_v4(), buyer, None)
            .await,
        Err(ServiceError::NotFound(_))
    );

    // Admins may reconcile on a customer's behalf.
    let confirmed = app
        .payments
        .on_payment_confirmed(order.id, app.admin_id, Some("pi_admin".into()))
        .await
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
}
