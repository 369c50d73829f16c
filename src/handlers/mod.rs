// HTTP handlers and route tables. Paths are relative to /api/v1.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod businesses;
pub mod docs;
pub mod health;
pub mod invoices;
pub mod orders;
pub mod payments;
pub mod points;
pub mod wallet;

use crate::{app::AppState, middleware::auth_middleware};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};

/// Routes reachable without a bearer token. Catalogue paths that also
/// accept writes live here too; their write handlers take
/// `AuthenticatedUser`, which rejects anonymous callers on its own.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route(
            "/businesses",
            get(businesses::list_businesses).post(businesses::create_business),
        )
        .route(
            "/businesses/{id}",
            get(businesses::get_business).put(businesses::update_business),
        )
        .route(
            "/businesses/{id}/treatments",
            get(businesses::list_treatments).post(businesses::create_treatment),
        )
        .route(
            "/businesses/{id}/products",
            get(businesses::list_products).post(businesses::create_product),
        )
        .route("/payments/{id}/callback", post(payments::payment_callback))
        .route("/health", get(health::health_check))
        .route("/docs", get(docs::serve_swagger_ui))
        .route("/docs/openapi.json", get(docs::serve_openapi_spec))
}

/// Routes behind `auth_middleware`
pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/businesses/{id}/rewards", get(businesses::business_rewards))
        .route("/treatments/{id}", put(businesses::update_treatment))
        .route("/products/{id}", put(businesses::update_product))
        // appointments
        .route(
            "/appointments",
            post(appointments::create_appointment).get(appointments::list_appointments),
        )
        .route("/appointments/{id}", get(appointments::get_appointment))
        .route("/appointments/{id}/confirm", post(appointments::confirm_appointment))
        .route("/appointments/{id}/complete", post(appointments::complete_appointment))
        .route("/appointments/{id}/no-show", post(appointments::no_show_appointment))
        .route("/appointments/{id}/cancel", post(appointments::cancel_appointment))
        // wallet and points
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/transactions", get(wallet::list_wallet_transactions))
        .route("/wallet/top-up", post(wallet::top_up_wallet))
        .route("/points", get(points::get_points))
        .route("/points/transactions", get(points::list_point_transactions))
        .route("/points/redeem", post(points::redeem_points))
        // payments and invoices
        .route(
            "/payments",
            post(payments::create_payment).get(payments::list_payments),
        )
        .route("/payments/{id}", get(payments::get_payment))
        .route("/payments/{id}/confirm-cash", post(payments::confirm_cash_payment))
        .route("/invoices", get(invoices::list_invoices))
        .route("/invoices/{id}", get(invoices::get_invoice))
        // orders
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/ship", post(orders::ship_order))
        .route("/orders/{id}/deliver", post(orders::deliver_order))
        .route("/orders/{id}/cancel", post(orders::cancel_order))
        // admin
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", patch(admin::update_user))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/wallets/{user_id}/adjust", post(admin::adjust_wallet))
        .route("/admin/points/{user_id}/adjust", post(admin::adjust_points))
        .route("/admin/payments/{id}/refund", post(admin::refund_payment))
        .route("/admin/rewards", get(admin::list_rewards))
        .route("/admin/rewards/{business_id}/payout", post(admin::payout_rewards))
        .route_layer(from_fn_with_state(state, auth_middleware))
}
