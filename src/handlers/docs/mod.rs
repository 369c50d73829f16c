// OpenAPI document and Swagger UI
pub mod swagger_ui;

pub use swagger_ui::serve_swagger_ui;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use utoipa::OpenApi;

use crate::{
    app::AppState,
    app_config::AppConfig,
    handlers::{admin, appointments, auth, businesses, health, invoices, orders, payments, points, wallet},
    models::{
        appointment::{Appointment, AppointmentStatus, CancelAppointmentRequest, CreateAppointmentRequest},
        auth::{LoginRequest, RefreshRequest, RegisterRequest, TokenResponse},
        business::{Business, CreateBusinessRequest, UpdateBusinessRequest},
        dashboard::DashboardStats,
        invoice::{Invoice, InvoiceStatus},
        order::{CreateOrderRequest, Order, OrderItem, OrderItemRequest, OrderStatus, OrderWithItems},
        pagination::{
            AppointmentPage, BusinessPage, InvoicePage, OrderPage, PaymentPage,
            PointTransactionPage, ProductPage, RewardSummaryPage, TreatmentPage, UserPage,
            WalletTransactionPage,
        },
        payment::{
            CallbackStatus, CreatePaymentRequest, Payment, PaymentCallbackRequest, PaymentMethod,
            PaymentPurpose, PaymentStatus,
        },
        points::{
            AdjustPointsRequest, PointSource, PointTransaction, PointsSummary, RedeemPointsRequest,
            RedemptionPolicy, RedemptionResult,
        },
        product::{CreateProductRequest, Product, UpdateProductRequest},
        reward::{BusinessRewards, PayoutResult, RewardKind, RewardSummary, RewardTransaction},
        treatment::{CreateTreatmentRequest, Treatment, UpdateTreatmentRequest},
        user::{AdminUserUpdateRequest, UserProfile, UserRole},
        wallet::{
            AdjustWalletRequest, TopUpRequest, TransactionKind, Wallet, WalletSource,
            WalletTransaction,
        },
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wellness Market API",
        description = "Beauty and wellness marketplace: bookings, product orders, wallet, loyalty points and business rewards",
        version = "1.0.0"
    ),
    paths(
        auth::register,
        auth::login,
        auth::refresh,
        auth::me,
        businesses::create_business,
        businesses::list_businesses,
        businesses::get_business,
        businesses::update_business,
        businesses::business_rewards,
        businesses::create_treatment,
        businesses::list_treatments,
        businesses::update_treatment,
        businesses::create_product,
        businesses::list_products,
        businesses::update_product,
        appointments::create_appointment,
        appointments::list_appointments,
        appointments::get_appointment,
        appointments::confirm_appointment,
        appointments::complete_appointment,
        appointments::no_show_appointment,
        appointments::cancel_appointment,
        wallet::get_wallet,
        wallet::list_wallet_transactions,
        wallet::top_up_wallet,
        points::get_points,
        points::list_point_transactions,
        points::redeem_points,
        payments::create_payment,
        payments::list_payments,
        payments::get_payment,
        payments::payment_callback,
        payments::confirm_cash_payment,
        invoices::list_invoices,
        invoices::get_invoice,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::ship_order,
        orders::deliver_order,
        orders::cancel_order,
        admin::list_users,
        admin::update_user,
        admin::dashboard,
        admin::adjust_wallet,
        admin::adjust_points,
        admin::refund_payment,
        admin::list_rewards,
        admin::payout_rewards,
        health::health_check,
    ),
    components(schemas(
        RegisterRequest, LoginRequest, RefreshRequest, TokenResponse,
        UserRole, UserProfile, AdminUserUpdateRequest,
        Business, CreateBusinessRequest, UpdateBusinessRequest,
        Treatment, CreateTreatmentRequest, UpdateTreatmentRequest,
        Product, CreateProductRequest, UpdateProductRequest,
        AppointmentStatus, Appointment, CreateAppointmentRequest, CancelAppointmentRequest,
        TransactionKind, WalletSource, Wallet, WalletTransaction, TopUpRequest, AdjustWalletRequest,
        PointSource, PointTransaction, RedemptionPolicy, PointsSummary, RedemptionResult,
        RedeemPointsRequest, AdjustPointsRequest,
        RewardKind, RewardTransaction, RewardSummary, BusinessRewards, PayoutResult,
        PaymentStatus, PaymentMethod, PaymentPurpose, Payment, CreatePaymentRequest,
        CallbackStatus, PaymentCallbackRequest,
        InvoiceStatus, Invoice,
        OrderStatus, Order, OrderItem, OrderWithItems, OrderItemRequest, CreateOrderRequest,
        DashboardStats,
        health::HealthResponse, health::HealthComponents, health::ComponentHealth,
        UserPage, BusinessPage, TreatmentPage, AppointmentPage, WalletTransactionPage,
        PointTransactionPage, RewardSummaryPage, PaymentPage, InvoicePage, ProductPage, OrderPage,
    )),
    tags(
        (name = "Authentication", description = "Registration, login and token refresh"),
        (name = "Businesses", description = "Business profiles"),
        (name = "Treatments", description = "Bookable treatments offered by a business"),
        (name = "Products", description = "Retail products sold by a business"),
        (name = "Appointments", description = "Booking and appointment lifecycle"),
        (name = "Wallet", description = "Prepaid wallet balance and ledger"),
        (name = "Points", description = "Loyalty points"),
        (name = "Rewards", description = "Business milestone rewards"),
        (name = "Payments", description = "Wallet, card and cash payments"),
        (name = "Invoices", description = "Invoices issued for settled payments"),
        (name = "Orders", description = "Product orders"),
        (name = "Admin", description = "Platform administration"),
        (name = "Health", description = "Service health checks")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI JSON at /api/v1/docs/openapi.json
pub async fn serve_openapi_spec(State(app_state): State<AppState>) -> Response {
    let doc = build_openapi_spec(app_state.config.as_ref());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::to_string(&doc).unwrap_or_default(),
    )
        .into_response()
}

/// Generated document plus the deployment-specific servers list and the
/// bearer security scheme.
pub fn build_openapi_spec(config: &AppConfig) -> serde_json::Value {
    let api_url = std::env::var("PUBLIC_API_URL")
        .unwrap_or_else(|_| format!("http://localhost:{}", config.server.port));

    let mut doc = serde_json::to_value(ApiDoc::openapi()).unwrap_or_else(|e| {
        tracing::error!("Failed to serialize OpenAPI document: {}", e);
        json!({})
    });

    if let serde_json::Value::Object(ref mut root) = doc {
        root.insert(
            "servers".to_string(),
            json!([{
                "url": api_url,
                "description": format!("Current server ({})", config.server.environment)
            }]),
        );

        let components = root
            .entry("components")
            .or_insert_with(|| json!({}));
        if let serde_json::Value::Object(components) = components {
            components.insert(
                "securitySchemes".to_string(),
                json!({
                    "bearerAuth": {
                        "type": "http",
                        "scheme": "bearer",
                        "bearerFormat": "JWT",
                        "description": "Access token from login, register or refresh"
                    }
                }),
            );
        }
    }

    doc
}
