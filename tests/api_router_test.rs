// Router-level tests that never reach Postgres: authentication, permission
// checks, request validation, health degradation, docs and CORS.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{setup_router_app, test_vars, TEST_CALLBACK_SECRET, UNREACHABLE_DATABASE_URL};
use serde_json::{json, Value};
use uuid::Uuid;
use wellness_market::{models::user::UserRole, services::JwtService, AppConfig};

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = setup_router_app();

    let response = app.get("/api/v1/wallet").send().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: Value = response.json().await;
    assert_eq!(body["status"], 401);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = setup_router_app();

    let response = app
        .get("/api/v1/appointments")
        .bearer("not.a.jwt")
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = setup_router_app();

    let mut vars = test_vars(UNREACHABLE_DATABASE_URL);
    vars.insert(
        "JWT_ACCESS_SECRET".to_string(),
        "some-other-deployment-secret-0123456789abcdef".to_string(),
    );
    let other = AppConfig::from_map(&vars).unwrap();
    let foreign = JwtService::from_app_config(&other)
        .generate_access_token(Uuid::new_v4(), "x@example.com", UserRole::Admin)
        .unwrap();

    let response = app.get("/api/v1/admin/dashboard").bearer(&foreign).send().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_write_without_token_is_unauthorized() {
    let app = setup_router_app();

    let response = app
        .post("/api/v1/businesses")
        .json(&json!({ "name": "Glow Studio", "city": "Istanbul" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_cannot_create_business() {
    let app = setup_router_app();
    let token = app.token_for(Uuid::new_v4(), UserRole::Customer);

    let response = app
        .post("/api/v1/businesses")
        .bearer(&token)
        .json(&json!({ "name": "Glow Studio", "city": "Istanbul" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_endpoints_forbidden_for_other_roles() {
    let app = setup_router_app();
    let customer = app.token_for(Uuid::new_v4(), UserRole::Customer);
    let business = app.token_for(Uuid::new_v4(), UserRole::Business);
    let target = Uuid::new_v4();

    for token in [&customer, &business] {
        let response = app.get("/api/v1/admin/dashboard").bearer(token).send().await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.get("/api/v1/admin/users").bearer(token).send().await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.get("/api/v1/admin/rewards").bearer(token).send().await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .post(&format!("/api/v1/admin/wallets/{}/adjust", target))
            .bearer(token)
            .json(&json!({ "amount": 1000, "description": "manual credit" }))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .post(&format!("/api/v1/admin/payments/{}/refund", target))
            .bearer(token)
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .post(&format!("/api/v1/admin/rewards/{}/payout", target))
            .bearer(token)
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_blank_names_rejected_on_update() {
    let app = setup_router_app();
    let token = app.token_for(Uuid::new_v4(), UserRole::Business);
    let id = Uuid::new_v4();

    let response = app
        .put(&format!("/api/v1/businesses/{}", id))
        .bearer(&token)
        .json(&json!({ "name": "   " }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put(&format!("/api/v1/businesses/{}", id))
        .bearer(&token)
        .json(&json!({ "city": "    " }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put(&format!("/api/v1/treatments/{}", id))
        .bearer(&token)
        .json(&json!({ "name": "   " }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put(&format!("/api/v1/products/{}", id))
        .bearer(&token)
        .json(&json!({ "name": "   " }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_validation() {
    let app = setup_router_app();

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "not-an-email",
            "password": "Str0ng!Pass",
            "full_name": "Ayse Demir"
        }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "ayse@example.com",
            "password": "weak",
            "full_name": "Ayse Demir"
        }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_cannot_self_assign_admin() {
    let app = setup_router_app();

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "sneaky@example.com",
            "password": "Str0ng!Pass",
            "full_name": "Sneaky",
            "role": "admin"
        }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_appointment_in_the_past_is_rejected() {
    let app = setup_router_app();
    let token = app.token_for(Uuid::new_v4(), UserRole::Customer);

    let response = app
        .post("/api/v1/appointments")
        .bearer(&token)
        .json(&json!({
            "treatment_id": Uuid::new_v4(),
            "scheduled_at": Utc::now() - Duration::hours(1)
        }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_line_validation() {
    let app = setup_router_app();
    let token = app.token_for(Uuid::new_v4(), UserRole::Customer);

    let response = app
        .post("/api/v1/orders")
        .bearer(&token)
        .json(&json!({ "items": [] }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post("/api/v1/orders")
        .bearer(&token)
        .json(&json!({ "items": [{ "product_id": Uuid::new_v4(), "quantity": 0 }] }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Duplicate lines merge to 120, over the per-line cap
    let product_id = Uuid::new_v4();
    let response = app
        .post("/api/v1/orders")
        .bearer(&token)
        .json(&json!({ "items": [
            { "product_id": product_id, "quantity": 60 },
            { "product_id": product_id, "quantity": 60 }
        ] }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_redeem_requires_whole_blocks() {
    let app = setup_router_app();
    let token = app.token_for(Uuid::new_v4(), UserRole::Customer);

    let response = app
        .post("/api/v1/points/redeem")
        .bearer(&token)
        .json(&json!({ "points": 150 }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_top_up_amount_bounds() {
    let app = setup_router_app();
    let token = app.token_for(Uuid::new_v4(), UserRole::Customer);

    let response = app
        .post("/api/v1/wallet/top-up")
        .bearer(&token)
        .json(&json!({ "amount": 50 }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payment_callback_signature_is_checked() {
    let app = setup_router_app();
    let uri = format!("/api/v1/payments/{}/callback", Uuid::new_v4());
    let body = json!({ "status": "success", "provider_payment_id": "prov-1" });

    let response = app.post(&uri).json(&body).send().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post(&uri)
        .header("x-payment-signature", "wrong-secret")
        .json(&body)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A valid signature gets past the check and fails on the database instead
    let response = app
        .post(&uri)
        .header("x-payment-signature", TEST_CALLBACK_SECRET)
        .json(&body)
        .send()
        .await;
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let app = setup_router_app();

    let response = app.get("/api/v1/health").send().await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json().await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["postgresql"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = setup_router_app();

    let response = app.get("/api/v1/docs/openapi.json").send().await;
    assert_eq!(response.status(), StatusCode::OK);

    let doc: Value = response.json().await;
    assert!(doc["openapi"].as_str().unwrap().starts_with("3."));
    assert!(doc["paths"]["/api/v1/appointments"]["post"].is_object());
    assert!(doc["paths"]["/api/v1/payments/{id}/callback"]["post"].is_object());
    assert!(doc["paths"]["/api/v1/admin/dashboard"]["get"].is_object());
    assert!(doc["components"]["schemas"]["Appointment"].is_object());
    assert!(doc["components"]["schemas"]["OrderPage"].is_object());
    assert_eq!(
        doc["paths"]["/api/v1/wallet/transactions"]["get"]["responses"]["200"]["content"]
            ["application/json"]["schema"]["$ref"],
        "#/components/schemas/WalletTransactionPage"
    );
    assert!(doc["components"]["schemas"]["WalletTransactionPage"].is_object());
    assert_eq!(
        doc["components"]["securitySchemes"]["bearerAuth"]["scheme"],
        "bearer"
    );
    assert!(doc["servers"][0]["url"].is_string());
}

#[tokio::test]
async fn test_swagger_ui_page() {
    let app = setup_router_app();

    let response = app.get("/api/v1/docs").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.contains("swagger-ui"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = setup_router_app();

    let response = app
        .options("/api/v1/appointments")
        .header("origin", "https://admin.example.com")
        .header("access-control-request-method", "POST")
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.header("access-control-allow-origin").as_deref(),
        Some("https://admin.example.com")
    );

    let response = app
        .options("/api/v1/appointments")
        .header("origin", "https://evil.example.com")
        .header("access-control-request-method", "POST")
        .send()
        .await;
    assert!(response.header("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = setup_router_app();

    let response = app.get("/api/v1/does-not-exist").send().await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
