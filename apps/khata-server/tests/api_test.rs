//! Router tests: requests go through the full route table against an
//! in-memory database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use khata_db::{Database, DbConfig, Engine, EngineConfig};
use khata_server::{router, AppState};

const OWNER: &str = "shop-api";

async fn spawn_app() -> Router {
    let db = Database::new(DbConfig::in_memory())
        .await
        .expect("Failed to open in-memory database");
    router(AppState::new(Engine::new(db, EngineConfig::default())))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-owner-id", OWNER)
        .header("x-user-id", "cashier-7");

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn create_product(app: &Router, name: &str, unit: &str, price: i64, stock: f64) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/products",
        Some(json!({
            "name": name,
            "unit": unit,
            "price_cents": price,
            "initial_stock": stock,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn create_customer(app: &Router, name: &str) -> String {
    let (status, body) = send(app, Method::POST, "/customers", Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_database() {
    let app = spawn_app().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_owner_header_is_rejected() {
    let app = spawn_app().await;
    let request = Request::builder().uri("/invoices").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn invoice_flow_over_http() {
    let app = spawn_app().await;
    let rice = create_product(&app, "Rice", "kg", 5_000, 10.0).await;
    let customer = create_customer(&app, "Priya Sharma").await;

    let (status, invoice) = send(
        &app,
        Method::POST,
        "/invoices",
        Some(json!({
            "customer_id": customer,
            "items": [{ "product_id": rice, "quantity": 2.5, "unit": "kg" }],
            "status": "final",
            "payment_method": "credit",
            "amount_paid_cents": 2_500,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    assert_eq!(invoice["invoice_number"], "INV-000001");
    assert_eq!(invoice["payment_method"], "due");
    assert_eq!(invoice["total_cents"], 12_500);
    assert_eq!(invoice["due_amount_cents"], 10_000);
    let id = invoice["id"].as_str().unwrap().to_string();

    let (_, product) = send(&app, Method::GET, &format!("/products/{rice}"), None).await;
    assert_eq!(product["current_stock"], 7.5);

    let (_, found) = send(&app, Method::GET, &format!("/customers/{customer}"), None).await;
    assert_eq!(found["amount_due_cents"], 10_000);

    let (status, payment) = send(
        &app,
        Method::POST,
        &format!("/customers/{customer}/payments"),
        Some(json!({ "amount_cents": 4_000, "payment_mode": "online" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{payment}");
    assert_eq!(payment["balance_after_cents"], 6_000);

    let (status, listed) = send(&app, Method::GET, "/invoices?status=final&search=INV", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);

    let (status, receipt) = send(&app, Method::GET, &format!("/invoices/{id}/receipt"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(receipt.as_str().unwrap().contains("INV-000001"));

    let (status, _) = send(&app, Method::DELETE, &format!("/invoices/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, product) = send(&app, Method::GET, &format!("/products/{rice}"), None).await;
    assert_eq!(product["current_stock"], 10.0);

    let (_, report) = send(&app, Method::GET, &format!("/customers/{customer}/balance"), None).await;
    assert_eq!(report["amount_due_cents"], -4_000);
    assert_eq!(report["consistent"], true);
}

#[tokio::test]
async fn insufficient_stock_maps_to_conflict() {
    let app = spawn_app().await;
    let pen = create_product(&app, "Pen", "piece", 1_000, 2.0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/invoices",
        Some(json!({
            "items": [{ "product_id": pen, "quantity": 5 }],
            "status": "final",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert!(body["message"].as_str().unwrap().contains("Pen"));

    let (_, listed) = send(&app, Method::GET, "/invoices", None).await;
    assert_eq!(listed["total"], 0);
}

#[tokio::test]
async fn unit_mismatch_maps_to_unprocessable() {
    let app = spawn_app().await;
    let milk = create_product(&app, "Milk", "liter", 5_400, 5.0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/invoices",
        Some(json!({
            "items": [{ "product_id": milk, "quantity": 500, "unit": "ml" }],
            "status": "final",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "UNIT_MISMATCH");
}

#[tokio::test]
async fn out_of_range_amounts_are_validation_errors() {
    let app = spawn_app().await;
    let pen = create_product(&app, "Pen", "piece", 1_000, 5.0).await;
    let customer = create_customer(&app, "Farhan Ali").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/invoices",
        Some(json!({
            "items": [{ "product_id": pen, "quantity": 1 }],
            "status": "final",
            "total_cents": i64::MIN,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/customers/{customer}/payments"),
        Some(json!({ "amount_cents": i64::MAX, "payment_mode": "cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, report) = send(&app, Method::GET, &format!("/customers/{customer}/balance"), None).await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["consistent"], true);
    assert_eq!(report["replayed_cents"], 0);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/invoices",
        Some(json!({ "items": "not a list" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn status_change_and_stock_routes() {
    let app = spawn_app().await;
    let soap = create_product(&app, "Soap", "piece", 3_500, 4.0).await;

    let (_, draft) = send(
        &app,
        Method::POST,
        "/invoices",
        Some(json!({ "items": [{ "product_id": soap, "quantity": 3 }] })),
    )
    .await;
    assert_eq!(draft["status"], "draft");
    let id = draft["id"].as_str().unwrap().to_string();

    let (status, finalized) = send(
        &app,
        Method::PUT,
        &format!("/invoices/{id}/status"),
        Some(json!({ "status": "final" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{finalized}");

    let (status, entry) = send(
        &app,
        Method::POST,
        &format!("/products/{soap}/stock"),
        Some(json!({ "quantity": 10, "reason": "Supplier delivery" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{entry}");
    assert_eq!(entry["new_stock"], 11.0);

    let (_, movements) = send(&app, Method::GET, &format!("/products/{soap}/movements"), None).await;
    let kinds: Vec<_> = movements
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["initial", "sale", "addition"]);

    let (_, replay) = send(&app, Method::GET, &format!("/products/{soap}/replay"), None).await;
    assert_eq!(replay["consistent"], true);
}

#[tokio::test]
async fn tax_settings_round_trip_into_invoices() {
    let app = spawn_app().await;
    let pen = create_product(&app, "Pen", "piece", 1_000, 10.0).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/settings/tax",
        Some(json!({ "enabled": true, "rate_bps": 1_800 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, invoice) = send(
        &app,
        Method::POST,
        "/invoices",
        Some(json!({ "items": [{ "product_id": pen, "quantity": 2 }] })),
    )
    .await;
    assert_eq!(invoice["subtotal_cents"], 2_000);
    assert_eq!(invoice["tax_cents"], 360);
    assert_eq!(invoice["total_cents"], 2_360);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/settings/tax",
        Some(json!({ "enabled": true, "rate_bps": 20_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
