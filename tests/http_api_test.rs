mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{TestApp, ADMIN_KEY};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

async fn send(
    router: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn checkout_body(promo_code: Option<&str>) -> Value {
    json!({
        "customerName": "Jane Wanjiku",
        "phoneNumber": "0712345678",
        "location": "Westlands, Nairobi",
        "items": [
            { "productId": "1", "name": "Chicken Burger", "price": 1000, "quantity": 2 }
        ],
        "deliveryFee": 150,
        "promoCode": promo_code,
        "paymentMethod": "till"
    })
}

#[tokio::test]
async fn till_order_round_trip_through_tracking() {
    let app = TestApp::new().await;

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/api/order",
        Some(checkout_body(None)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let order_id = body["orderId"].as_str().expect("orderId expected");
    assert!(order_id.starts_with("ORD-"));
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Till Number 6994591"));

    let (status, body) = send(
        app.router(),
        Method::GET,
        &format!("/api/order/{order_id}"),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let order = &body["order"];
    // subtotal 2000 + fee 150, no discount
    assert_eq!(order["totalAmount"], json!("2150"));
    assert_eq!(order["status"], json!("New"));
    assert_eq!(order["paymentStatus"], json!("Pending"));
    assert_eq!(order["customerName"], json!("Jane Wanjiku"));
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    // the tracking view must not leak the phone number
    assert!(order.get("phoneNumber").is_none());
}

#[tokio::test]
async fn promo_code_discounts_the_recomputed_total() {
    let app = TestApp::new().await;
    app.seed_promo("SAVE10", 10).await;

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/api/validate-promo",
        Some(json!({ "code": "save10", "phone": "" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["discountPercent"], json!(10));

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/api/order",
        Some(checkout_body(Some("save10"))),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["orderId"].as_str().unwrap().to_string();

    let (_, body) = send(
        app.router(),
        Method::GET,
        &format!("/api/order/{order_id}"),
        None,
        None,
    )
    .await;
    // round(2000 * 0.9) + 150
    assert_eq!(body["order"]["totalAmount"], json!("1950"));
}

#[tokio::test]
async fn client_submitted_totals_are_ignored() {
    let app = TestApp::new().await;

    let mut tampered = checkout_body(None);
    tampered["totalAmount"] = json!(1);
    tampered["discountAmount"] = json!(2000);

    let (status, body) = send(app.router(), Method::POST, "/api/order", Some(tampered), None).await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["orderId"].as_str().unwrap().to_string();

    let (_, body) = send(
        app.router(),
        Method::GET,
        &format!("/api/order/{order_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(body["order"]["totalAmount"], json!("2150"));
}

#[tokio::test]
async fn validation_failures_reject_before_persistence() {
    let app = TestApp::new().await;

    let mut empty_cart = checkout_body(None);
    empty_cart["items"] = json!([]);
    let (status, body) = send(
        app.router(),
        Method::POST,
        "/api/order",
        Some(empty_cart),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let mut blank_name = checkout_body(None);
    blank_name["customerName"] = json!("   ");
    let (status, _) = send(
        app.router(),
        Method::POST,
        "/api/order",
        Some(blank_name),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for bad_phone in ["12345", "0812345678", "07123456789"] {
        let mut body = checkout_body(None);
        body["phoneNumber"] = json!(bad_phone);
        let (status, response) =
            send(app.router(), Method::POST, "/api/order", Some(body), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "phone {bad_phone}");
        assert_eq!(response["success"], json!(false));
    }

    // nothing was persisted
    let orders = app.state.services.orders.list().await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn omitted_location_defaults_to_pick_up() {
    let app = TestApp::new().await;

    let mut body = checkout_body(None);
    body.as_object_mut().unwrap().remove("location");
    let (status, response) = send(app.router(), Method::POST, "/api/order", Some(body), None).await;
    assert_eq!(status, StatusCode::OK);

    let order_id = response["orderId"].as_str().unwrap();
    let (found, _) = app
        .state
        .services
        .orders
        .find_by_id(order_id)
        .await
        .unwrap()
        .expect("order must exist");
    assert_eq!(found.location, "Pick Up");
}

#[tokio::test]
async fn invalid_promo_is_distinct_from_no_discount() {
    let app = TestApp::new().await;

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/api/validate-promo",
        Some(json!({ "code": "BOGUS" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Invalid promo code"));

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/api/validate-promo",
        Some(json!({ "phone": "0712345678" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("No discount available"));
}

#[tokio::test]
async fn tracking_unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let (status, body) = send(app.router(), Method::GET, "/api/order/ORD-0", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn rating_updates_the_order() {
    let app = TestApp::new().await;
    let (_, body) = send(
        app.router(),
        Method::POST,
        "/api/order",
        Some(checkout_body(None)),
        None,
    )
    .await;
    let order_id = body["orderId"].as_str().unwrap().to_string();

    let (status, _) = send(
        app.router(),
        Method::POST,
        "/api/order/rate",
        Some(json!({ "id": order_id, "rating": 5, "feedback": "Great chips" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app.router(),
        Method::POST,
        "/api/order/rate",
        Some(json!({ "id": order_id, "rating": 9 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (found, _) = app
        .state
        .services
        .orders
        .find_by_id(&order_id)
        .await
        .unwrap()
        .expect("order must exist");
    assert_eq!(found.rating, Some(5));
}

#[tokio::test]
async fn admin_routes_require_the_api_key() {
    let app = TestApp::new().await;

    let (status, _) = send(app.router(), Method::GET, "/api/admin/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        app.router(),
        Method::GET,
        "/api/admin/orders",
        None,
        Some("wrong-key"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        app.router(),
        Method::GET,
        "/api/admin/orders",
        None,
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().is_some());
}

#[tokio::test]
async fn admin_update_and_delete_flow() {
    let app = TestApp::new().await;

    let (_, body) = send(
        app.router(),
        Method::POST,
        "/api/order",
        Some(checkout_body(None)),
        None,
    )
    .await;
    let first_id = body["orderId"].as_str().unwrap().to_string();

    tokio::time::sleep(Duration::from_millis(5)).await;
    let (_, body) = send(
        app.router(),
        Method::POST,
        "/api/order",
        Some(checkout_body(None)),
        None,
    )
    .await;
    let second_id = body["orderId"].as_str().unwrap().to_string();

    // newest first
    let (_, body) = send(
        app.router(),
        Method::GET,
        "/api/admin/orders",
        None,
        Some(ADMIN_KEY),
    )
    .await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], json!(second_id.clone()));
    assert_eq!(listed[1]["id"], json!(first_id.clone()));

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/api/admin/order/update",
        Some(json!({ "orderId": first_id, "status": "Out for Delivery", "assignedRiderId": "rider-7" })),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], json!("Out for Delivery"));
    assert_eq!(body["order"]["assignedRiderId"], json!("rider-7"));

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/api/admin/order/delete",
        Some(json!({ "orderId": first_id })),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (status, _) = send(
        app.router(),
        Method::GET,
        &format!("/api/order/{first_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app.router(),
        Method::POST,
        "/api/admin/order/delete",
        Some(json!({ "orderId": first_id })),
        Some(ADMIN_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoint_reports_database_state() {
    let app = TestApp::new().await;
    let (status, body) = send(app.router(), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
}
