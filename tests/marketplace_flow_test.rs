// End-to-end flows against a real Postgres. Set TEST_DATABASE_URL to run;
// without it every test returns early.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{setup_db_app, setup_db_app_with, unique_email, TestApp, TEST_CALLBACK_SECRET};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{json, Value};
use serial_test::serial;
use uuid::Uuid;
use wellness_market::{models::user::UserRole, schema::users};

struct Account {
    id: Uuid,
    token: String,
}

async fn register(app: &TestApp, prefix: &str, role: &str) -> Account {
    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": unique_email(prefix),
            "password": "Str0ng!Pass",
            "full_name": format!("{} user", prefix),
            "role": role
        }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await;
    Account {
        id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
        token: body["access_token"].as_str().unwrap().to_string(),
    }
}

async fn promote_to_admin(app: &TestApp, account: &Account) -> String {
    let mut conn = app.diesel_pool.get().await.unwrap();
    diesel::update(users::table.find(account.id))
        .set(users::role.eq("admin"))
        .execute(&mut conn)
        .await
        .unwrap();
    app.token_for(account.id, UserRole::Admin)
}

async fn wallet_balance(app: &TestApp, token: &str) -> i64 {
    let response = app.get("/api/v1/wallet").bearer(token).send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let wallet: Value = response.json().await;
    wallet["balance"].as_i64().unwrap()
}

/// Business with one 50.00 treatment
async fn open_salon(app: &TestApp, owner: &Account) -> (Uuid, Uuid) {
    let response = app
        .post("/api/v1/businesses")
        .bearer(&owner.token)
        .json(&json!({ "name": "Glow Studio", "city": "Istanbul" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let business: Value = response.json().await;
    let business_id: Uuid = business["id"].as_str().unwrap().parse().unwrap();

    let response = app
        .post(&format!("/api/v1/businesses/{}/treatments", business_id))
        .bearer(&owner.token)
        .json(&json!({
            "name": "Hydrating facial",
            "category": "skin-care",
            "price": 5000,
            "duration_minutes": 60
        }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let treatment: Value = response.json().await;

    (business_id, treatment["id"].as_str().unwrap().parse().unwrap())
}

async fn top_up(app: &TestApp, customer: &Account, amount: i64) {
    let response = app
        .post("/api/v1/wallet/top-up")
        .bearer(&customer.token)
        .json(&json!({ "amount": amount }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let payment: Value = response.json().await;
    assert_eq!(payment["status"], "pending");

    let response = app
        .post(&format!("/api/v1/payments/{}/callback", payment["id"].as_str().unwrap()))
        .header("x-payment-signature", TEST_CALLBACK_SECRET)
        .json(&json!({ "status": "success", "provider_payment_id": format!("prov-{}", Uuid::new_v4()) }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let settled: Value = response.json().await;
    assert_eq!(settled["status"], "completed");
}

/// Book the treatment `days_ahead` days out and have the owner confirm it
async fn book_confirmed(
    app: &TestApp,
    customer: &Account,
    owner: &Account,
    treatment_id: Uuid,
    days_ahead: i64,
) -> String {
    let response = app
        .post("/api/v1/appointments")
        .bearer(&customer.token)
        .json(&json!({
            "treatment_id": treatment_id,
            "scheduled_at": Utc::now() + Duration::days(days_ahead)
        }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let appointment: Value = response.json().await;
    let appointment_id = appointment["id"].as_str().unwrap().to_string();

    let response = app
        .post(&format!("/api/v1/appointments/{}/confirm", appointment_id))
        .bearer(&owner.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    appointment_id
}

#[tokio::test]
#[serial]
async fn test_booking_lifecycle_awards_points() {
    let Some(app) = setup_db_app().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let owner = register(&app, "owner", "business").await;
    let customer = register(&app, "customer", "customer").await;
    let (_, treatment_id) = open_salon(&app, &owner).await;

    let slot = Utc::now() + Duration::days(3);
    let response = app
        .post("/api/v1/appointments")
        .bearer(&customer.token)
        .json(&json!({ "treatment_id": treatment_id, "scheduled_at": slot }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let appointment: Value = response.json().await;
    assert_eq!(appointment["status"], "pending");
    assert_eq!(appointment["price"], 5000);
    let appointment_id = appointment["id"].as_str().unwrap().to_string();

    // Overlaps the first booking by 30 minutes
    let response = app
        .post("/api/v1/appointments")
        .bearer(&customer.token)
        .json(&json!({ "treatment_id": treatment_id, "scheduled_at": slot + Duration::minutes(30) }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Only the business side may confirm
    let response = app
        .post(&format!("/api/v1/appointments/{}/confirm", appointment_id))
        .bearer(&customer.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Pending cannot jump straight to completed
    let response = app
        .post(&format!("/api/v1/appointments/{}/complete", appointment_id))
        .bearer(&owner.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .post(&format!("/api/v1/appointments/{}/confirm", appointment_id))
        .bearer(&owner.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post(&format!("/api/v1/appointments/{}/complete", appointment_id))
        .bearer(&owner.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let completed: Value = response.json().await;
    assert_eq!(completed["status"], "completed");
    assert!(completed["completed_at"].is_string());

    // 50.00 at one point per currency unit
    let response = app.get("/api/v1/points").bearer(&customer.token).send().await;
    let points: Value = response.json().await;
    assert_eq!(points["balance"], 50);

    let response = app
        .get("/api/v1/points/transactions")
        .bearer(&customer.token)
        .send()
        .await;
    let history: Value = response.json().await;
    assert_eq!(history["total"], 1);
    assert_eq!(history["items"][0]["source"], "appointment");

    // Completed is final
    let response = app
        .post(&format!("/api/v1/appointments/{}/cancel", appointment_id))
        .bearer(&customer.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Both parties see the booking; strangers do not
    let stranger = register(&app, "stranger", "customer").await;
    let response = app
        .get(&format!("/api/v1/appointments/{}", appointment_id))
        .bearer(&stranger.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/api/v1/appointments").bearer(&owner.token).send().await;
    let listing: Value = response.json().await;
    assert_eq!(listing["total"], 1);
}

#[tokio::test]
#[serial]
async fn test_wallet_payment_issues_invoice_and_refund_cancels_it() {
    let Some(app) = setup_db_app().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let owner = register(&app, "owner", "business").await;
    let customer = register(&app, "customer", "customer").await;
    let admin_account = register(&app, "admin", "customer").await;
    let admin = promote_to_admin(&app, &admin_account).await;
    let (_, treatment_id) = open_salon(&app, &owner).await;

    let response = app
        .post("/api/v1/appointments")
        .bearer(&customer.token)
        .json(&json!({ "treatment_id": treatment_id, "scheduled_at": Utc::now() + Duration::days(5) }))
        .send()
        .await;
    let appointment: Value = response.json().await;
    let appointment_id = appointment["id"].as_str().unwrap().to_string();

    // Empty wallet cannot pay
    let pay = json!({ "purpose": "appointment", "appointment_id": appointment_id, "method": "wallet" });
    let response = app.post("/api/v1/payments").bearer(&customer.token).json(&pay).send().await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    top_up(&app, &customer, 10_000).await;
    assert_eq!(wallet_balance(&app, &customer.token).await, 10_000);

    let response = app.post("/api/v1/payments").bearer(&customer.token).json(&pay).send().await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let payment: Value = response.json().await;
    assert_eq!(payment["status"], "completed");
    let payment_id = payment["id"].as_str().unwrap().to_string();
    assert_eq!(wallet_balance(&app, &customer.token).await, 5_000);

    // Already paid
    let response = app.post("/api/v1/payments").bearer(&customer.token).json(&pay).send().await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Appointment payments are invoiced, top-ups are not
    let response = app.get("/api/v1/invoices").bearer(&customer.token).send().await;
    let invoices: Value = response.json().await;
    assert_eq!(invoices["total"], 1);
    let invoice = &invoices["items"][0];
    assert_eq!(invoice["total"], 5000);
    assert_eq!(
        invoice["net_amount"].as_i64().unwrap() + invoice["tax_amount"].as_i64().unwrap(),
        5000
    );
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    // Customers cannot refund
    let refund_uri = format!("/api/v1/admin/payments/{}/refund", payment_id);
    let response = app.post(&refund_uri).bearer(&customer.token).send().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.post(&refund_uri).bearer(&admin).send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let refunded: Value = response.json().await;
    assert_eq!(refunded["status"], "refunded");
    assert_eq!(wallet_balance(&app, &customer.token).await, 10_000);

    let response = app
        .get(&format!("/api/v1/invoices/{}", invoice_id))
        .bearer(&customer.token)
        .send()
        .await;
    let invoice: Value = response.json().await;
    assert_eq!(invoice["status"], "cancelled");

    // Refunding twice is a state conflict
    let response = app.post(&refund_uri).bearer(&admin).send().await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[serial]
async fn test_duplicate_callback_does_not_double_credit() {
    let Some(app) = setup_db_app().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let customer = register(&app, "customer", "customer").await;

    let response = app
        .post("/api/v1/wallet/top-up")
        .bearer(&customer.token)
        .json(&json!({ "amount": 2_500 }))
        .send()
        .await;
    let payment: Value = response.json().await;
    let callback_uri = format!("/api/v1/payments/{}/callback", payment["id"].as_str().unwrap());
    let body = json!({ "status": "success", "provider_payment_id": "prov-dup" });

    for _ in 0..3 {
        let response = app
            .post(&callback_uri)
            .header("x-payment-signature", TEST_CALLBACK_SECRET)
            .json(&body)
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(wallet_balance(&app, &customer.token).await, 2_500);

    // A late failure report cannot undo a completed payment
    let response = app
        .post(&callback_uri)
        .header("x-payment-signature", TEST_CALLBACK_SECRET)
        .json(&json!({ "status": "failure", "provider_payment_id": "prov-dup", "failure_reason": "late" }))
        .send()
        .await;
    let after: Value = response.json().await;
    assert_eq!(after["status"], "completed");
}

#[tokio::test]
#[serial]
async fn test_order_stock_and_cancellation() {
    let Some(app) = setup_db_app().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let owner = register(&app, "owner", "business").await;
    let customer = register(&app, "customer", "customer").await;
    let (business_id, _) = open_salon(&app, &owner).await;

    let response = app
        .post(&format!("/api/v1/businesses/{}/products", business_id))
        .bearer(&owner.token)
        .json(&json!({ "name": "Rose serum", "price": 1500, "stock": 3 }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let product: Value = response.json().await;
    let product_id = product["id"].as_str().unwrap().to_string();

    let response = app
        .post("/api/v1/orders")
        .bearer(&customer.token)
        .json(&json!({ "items": [{ "product_id": product_id, "quantity": 5 }] }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .post("/api/v1/orders")
        .bearer(&customer.token)
        .json(&json!({ "items": [{ "product_id": product_id, "quantity": 2 }] }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order: Value = response.json().await;
    assert_eq!(order["total"], 3000);
    assert_eq!(order["items"][0]["product_name"], "Rose serum");
    let order_id = order["id"].as_str().unwrap().to_string();

    // One unit left
    let response = app
        .get(&format!("/api/v1/businesses/{}/products", business_id))
        .send()
        .await;
    let products: Value = response.json().await;
    assert_eq!(products["items"][0]["stock"], 1);

    // Unpaid orders cannot ship
    let response = app
        .post(&format!("/api/v1/orders/{}/ship", order_id))
        .bearer(&owner.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .post(&format!("/api/v1/orders/{}/cancel", order_id))
        .bearer(&customer.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled: Value = response.json().await;
    assert_eq!(cancelled["status"], "cancelled");

    let response = app
        .get(&format!("/api/v1/businesses/{}/products", business_id))
        .send()
        .await;
    let products: Value = response.json().await;
    assert_eq!(products["items"][0]["stock"], 3);
}

#[tokio::test]
#[serial]
async fn test_admin_dashboard_and_adjustments() {
    let Some(app) = setup_db_app().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let customer = register(&app, "customer", "customer").await;
    let admin_account = register(&app, "admin", "customer").await;
    let admin = promote_to_admin(&app, &admin_account).await;

    let response = app
        .post(&format!("/api/v1/admin/wallets/{}/adjust", customer.id))
        .bearer(&admin)
        .json(&json!({ "amount": 1200, "description": "Goodwill credit" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let entry: Value = response.json().await;
    assert_eq!(entry["balance_after"], 1200);

    let response = app
        .post(&format!("/api/v1/admin/wallets/{}/adjust", customer.id))
        .bearer(&admin)
        .json(&json!({ "amount": -5000, "description": "Too much" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let response = app
        .post(&format!("/api/v1/admin/points/{}/adjust", customer.id))
        .bearer(&admin)
        .json(&json!({ "points": 200, "reason": "Launch bonus" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // 200 points is two blocks of 10.00
    let response = app
        .post("/api/v1/points/redeem")
        .bearer(&customer.token)
        .json(&json!({ "points": 200 }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let redemption: Value = response.json().await;
    assert_eq!(redemption["points_balance"], 0);
    assert_eq!(redemption["wallet_credit"], 2000);
    assert_eq!(redemption["wallet_balance"], 3200);

    // Admins cannot lock themselves out
    let response = app
        .patch(&format!("/api/v1/admin/users/{}", admin_account.id))
        .bearer(&admin)
        .json(&json!({ "is_active": false }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .patch(&format!("/api/v1/admin/users/{}", customer.id))
        .bearer(&admin)
        .json(&json!({ "is_active": false }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/api/v1/admin/dashboard").bearer(&admin).send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats: Value = response.json().await;
    assert!(stats["users_by_role"]["admin"].as_i64().unwrap() >= 1);
    assert!(stats["appointments_by_status"]["no_show"].is_i64());
    assert!(stats["wallet_float"].as_i64().unwrap() >= 3200);
}

#[tokio::test]
#[serial]
async fn test_milestones_accrue_and_pay_out_once() {
    let Some(app) = setup_db_app_with(&[("REWARD_MILESTONE_APPOINTMENTS", "2")]).await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let owner = register(&app, "owner", "business").await;
    let customer = register(&app, "customer", "customer").await;
    let admin_account = register(&app, "admin", "customer").await;
    let admin = promote_to_admin(&app, &admin_account).await;
    let (business_id, treatment_id) = open_salon(&app, &owner).await;

    for day in 1..=5 {
        let appointment_id = book_confirmed(&app, &customer, &owner, treatment_id, day).await;
        let response = app
            .post(&format!("/api/v1/appointments/{}/complete", appointment_id))
            .bearer(&owner.token)
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Five completions cross the second and fourth appointment
    let rewards_uri = format!("/api/v1/businesses/{}/rewards", business_id);
    let response = app.get(&rewards_uri).bearer(&owner.token).send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let rewards: Value = response.json().await;
    assert_eq!(rewards["summary"]["completed_appointments"], 5);
    assert_eq!(rewards["summary"]["rewarded_milestones"], 2);
    assert_eq!(rewards["summary"]["reward_balance"], 4000);
    assert_eq!(rewards["summary"]["appointments_to_next_milestone"], 1);
    assert_eq!(rewards["transactions"].as_array().unwrap().len(), 2);

    // Customers have no view into a salon's rewards
    let response = app.get(&rewards_uri).bearer(&customer.token).send().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .get("/api/v1/admin/rewards?with_balance=true&per_page=100")
        .bearer(&admin)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing: Value = response.json().await;
    let ours = listing["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item["business_id"] == business_id.to_string())
        .expect("business with a balance is listed");
    assert_eq!(ours["reward_balance"], 4000);

    let payout_uri = format!("/api/v1/admin/rewards/{}/payout", business_id);
    let response = app.post(&payout_uri).bearer(&owner.token).send().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.post(&payout_uri).bearer(&admin).send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let payout: Value = response.json().await;
    assert_eq!(payout["amount"], 4000);
    assert_eq!(payout["owner_id"], owner.id.to_string());
    assert_eq!(wallet_balance(&app, &owner.token).await, 4000);

    // Nothing left to pay
    let response = app.post(&payout_uri).bearer(&admin).send().await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(wallet_balance(&app, &owner.token).await, 4000);

    let response = app.get(&rewards_uri).bearer(&owner.token).send().await;
    let rewards: Value = response.json().await;
    assert_eq!(rewards["summary"]["reward_balance"], 0);
    assert_eq!(rewards["summary"]["rewarded_milestones"], 2);
    assert_eq!(rewards["transactions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
#[serial]
async fn test_racing_completions_award_points_once() {
    let Some(app) = setup_db_app().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let owner = register(&app, "owner", "business").await;
    let customer = register(&app, "customer", "customer").await;
    let (_, treatment_id) = open_salon(&app, &owner).await;
    let appointment_id = book_confirmed(&app, &customer, &owner, treatment_id, 2).await;

    let uri = format!("/api/v1/appointments/{}/complete", appointment_id);
    let (first, second) = tokio::join!(
        app.post(&uri).bearer(&owner.token).send(),
        app.post(&uri).bearer(&owner.token).send()
    );
    let mut statuses = [first.status(), second.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

    let response = app.get("/api/v1/points").bearer(&customer.token).send().await;
    let points: Value = response.json().await;
    assert_eq!(points["balance"], 50);
}

#[tokio::test]
#[serial]
async fn test_no_show_is_final_and_earns_nothing() {
    let Some(app) = setup_db_app().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let owner = register(&app, "owner", "business").await;
    let customer = register(&app, "customer", "customer").await;
    let (_, treatment_id) = open_salon(&app, &owner).await;

    // Pending bookings cannot be marked as no-show
    let response = app
        .post("/api/v1/appointments")
        .bearer(&customer.token)
        .json(&json!({ "treatment_id": treatment_id, "scheduled_at": Utc::now() + Duration::days(8) }))
        .send()
        .await;
    let pending: Value = response.json().await;
    let response = app
        .post(&format!("/api/v1/appointments/{}/no-show", pending["id"].as_str().unwrap()))
        .bearer(&owner.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let appointment_id = book_confirmed(&app, &customer, &owner, treatment_id, 4).await;
    let no_show_uri = format!("/api/v1/appointments/{}/no-show", appointment_id);

    let response = app.post(&no_show_uri).bearer(&customer.token).send().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.post(&no_show_uri).bearer(&owner.token).send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let marked: Value = response.json().await;
    assert_eq!(marked["status"], "no_show");

    let response = app
        .post(&format!("/api/v1/appointments/{}/complete", appointment_id))
        .bearer(&owner.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.get("/api/v1/points").bearer(&customer.token).send().await;
    let points: Value = response.json().await;
    assert_eq!(points["balance"], 0);
}

#[tokio::test]
#[serial]
async fn test_cash_payment_confirmed_by_owner() {
    let Some(app) = setup_db_app().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let owner = register(&app, "owner", "business").await;
    let customer = register(&app, "customer", "customer").await;
    let (_, treatment_id) = open_salon(&app, &owner).await;
    let appointment_id = book_confirmed(&app, &customer, &owner, treatment_id, 6).await;

    let response = app
        .post("/api/v1/payments")
        .bearer(&customer.token)
        .json(&json!({ "purpose": "appointment", "appointment_id": appointment_id, "method": "cash" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let payment: Value = response.json().await;
    assert_eq!(payment["status"], "pending");
    let confirm_uri = format!("/api/v1/payments/{}/confirm-cash", payment["id"].as_str().unwrap());

    // Pending cash is not yet invoiced
    let response = app.get("/api/v1/invoices").bearer(&customer.token).send().await;
    let invoices: Value = response.json().await;
    assert_eq!(invoices["total"], 0);

    let response = app.post(&confirm_uri).bearer(&customer.token).send().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.post(&confirm_uri).bearer(&owner.token).send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let confirmed: Value = response.json().await;
    assert_eq!(confirmed["status"], "completed");

    let response = app.post(&confirm_uri).bearer(&owner.token).send().await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.get("/api/v1/invoices").bearer(&customer.token).send().await;
    let invoices: Value = response.json().await;
    assert_eq!(invoices["total"], 1);
    assert_eq!(invoices["items"][0]["total"], 5000);

    // Cash never touches the wallet
    assert_eq!(wallet_balance(&app, &customer.token).await, 0);
}

#[tokio::test]
#[serial]
async fn test_card_paid_order_ships_and_delivers() {
    let Some(app) = setup_db_app().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let owner = register(&app, "owner", "business").await;
    let customer = register(&app, "customer", "customer").await;
    let (business_id, _) = open_salon(&app, &owner).await;

    let response = app
        .post(&format!("/api/v1/businesses/{}/products", business_id))
        .bearer(&owner.token)
        .json(&json!({ "name": "Argan oil", "price": 2500, "stock": 10 }))
        .send()
        .await;
    let product: Value = response.json().await;

    let response = app
        .post("/api/v1/orders")
        .bearer(&customer.token)
        .json(&json!({ "items": [{ "product_id": product["id"], "quantity": 2 }] }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order: Value = response.json().await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let order_uri = format!("/api/v1/orders/{}", order_id);

    let response = app
        .post("/api/v1/payments")
        .bearer(&customer.token)
        .json(&json!({ "purpose": "order", "order_id": order_id, "method": "card" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let payment: Value = response.json().await;
    assert_eq!(payment["status"], "pending");
    assert_eq!(payment["amount"], 5000);

    let response = app.get(&order_uri).bearer(&customer.token).send().await;
    let pending: Value = response.json().await;
    assert_eq!(pending["status"], "pending");

    let response = app
        .post(&format!("/api/v1/payments/{}/callback", payment["id"].as_str().unwrap()))
        .header("x-payment-signature", TEST_CALLBACK_SECRET)
        .json(&json!({ "status": "success", "provider_payment_id": format!("prov-{}", Uuid::new_v4()) }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get(&order_uri).bearer(&customer.token).send().await;
    let paid: Value = response.json().await;
    assert_eq!(paid["status"], "paid");

    // Paid orders are past the point of cancelling
    let response = app
        .post(&format!("{}/cancel", order_uri))
        .bearer(&customer.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Delivery needs shipping first
    let response = app
        .post(&format!("{}/deliver", order_uri))
        .bearer(&owner.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .post(&format!("{}/ship", order_uri))
        .bearer(&owner.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let shipped: Value = response.json().await;
    assert_eq!(shipped["status"], "shipped");

    let response = app
        .post(&format!("{}/deliver", order_uri))
        .bearer(&owner.token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let delivered: Value = response.json().await;
    assert_eq!(delivered["status"], "delivered");

    let response = app.get("/api/v1/invoices").bearer(&customer.token).send().await;
    let invoices: Value = response.json().await;
    assert_eq!(invoices["total"], 1);
}
