// Businesses and their treatment and product catalogues

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::{AuthenticatedUser, OptionalUser},
    models::{
        business::{Business, BusinessListQuery, CreateBusinessRequest, UpdateBusinessRequest},
        pagination::Page,
        product::{CreateProductRequest, Product, ProductListQuery, UpdateProductRequest},
        reward::BusinessRewards,
        treatment::{
            CreateTreatmentRequest, Treatment, TreatmentListQuery, UpdateTreatmentRequest,
        },
    },
    services::{BusinessService, ProductService, RewardService, TreatmentService},
    utils::service_error::ServiceError,
};

#[utoipa::path(
    post,
    path = "/api/v1/businesses",
    tag = "Businesses",
    operation_id = "createBusiness",
    request_body = CreateBusinessRequest,
    responses(
        (status = 201, description = "Business created", body = Business),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Caller is not a business account")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_business(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateBusinessRequest>,
) -> Result<(StatusCode, Json<Business>), ServiceError> {
    let business = BusinessService::new(&state)
        .create_business(&user, request)
        .await?;
    Ok((StatusCode::CREATED, Json(business)))
}

#[utoipa::path(
    get,
    path = "/api/v1/businesses",
    tag = "Businesses",
    operation_id = "listBusinesses",
    params(BusinessListQuery),
    responses((status = 200, description = "Active businesses", body = BusinessPage))
)]
pub async fn list_businesses(
    State(state): State<AppState>,
    caller: OptionalUser,
    Query(query): Query<BusinessListQuery>,
) -> Result<Json<Page<Business>>, ServiceError> {
    let page = BusinessService::new(&state)
        .list_businesses(caller.user(), query)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/businesses/{id}",
    tag = "Businesses",
    operation_id = "getBusiness",
    params(("id" = Uuid, Path, description = "Business id")),
    responses(
        (status = 200, description = "Business", body = Business),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_business(
    State(state): State<AppState>,
    caller: OptionalUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Business>, ServiceError> {
    Ok(Json(BusinessService::new(&state).get_business(caller.user(), id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/businesses/{id}",
    tag = "Businesses",
    operation_id = "updateBusiness",
    params(("id" = Uuid, Path, description = "Business id")),
    request_body = UpdateBusinessRequest,
    responses(
        (status = 200, description = "Updated business", body = Business),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_business(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBusinessRequest>,
) -> Result<Json<Business>, ServiceError> {
    let business = BusinessService::new(&state)
        .update_business(&user, id, request)
        .await?;
    Ok(Json(business))
}

#[utoipa::path(
    get,
    path = "/api/v1/businesses/{id}/rewards",
    tag = "Rewards",
    operation_id = "getBusinessRewards",
    params(("id" = Uuid, Path, description = "Business id")),
    responses(
        (status = 200, description = "Reward summary and ledger", body = BusinessRewards),
        (status = 403, description = "Not the owner")
    ),
    security(("bearerAuth" = []))
)]
pub async fn business_rewards(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BusinessRewards>, ServiceError> {
    Ok(Json(RewardService::new(&state).business_rewards(&user, id).await?))
}

// ---- treatments ----

#[utoipa::path(
    post,
    path = "/api/v1/businesses/{id}/treatments",
    tag = "Treatments",
    operation_id = "createTreatment",
    params(("id" = Uuid, Path, description = "Business id")),
    request_body = CreateTreatmentRequest,
    responses(
        (status = 201, description = "Treatment created", body = Treatment),
        (status = 403, description = "Not the owner")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_treatment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateTreatmentRequest>,
) -> Result<(StatusCode, Json<Treatment>), ServiceError> {
    let treatment = TreatmentService::new(&state)
        .create_treatment(&user, id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(treatment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/businesses/{id}/treatments",
    tag = "Treatments",
    operation_id = "listTreatments",
    params(("id" = Uuid, Path, description = "Business id"), TreatmentListQuery),
    responses((status = 200, description = "Treatments", body = TreatmentPage))
)]
pub async fn list_treatments(
    State(state): State<AppState>,
    caller: OptionalUser,
    Path(id): Path<Uuid>,
    Query(query): Query<TreatmentListQuery>,
) -> Result<Json<Page<Treatment>>, ServiceError> {
    let page = TreatmentService::new(&state)
        .list_treatments(caller.user(), id, query)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    put,
    path = "/api/v1/treatments/{id}",
    tag = "Treatments",
    operation_id = "updateTreatment",
    params(("id" = Uuid, Path, description = "Treatment id")),
    request_body = UpdateTreatmentRequest,
    responses(
        (status = 200, description = "Updated treatment", body = Treatment),
        (status = 403, description = "Not the owner")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_treatment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTreatmentRequest>,
) -> Result<Json<Treatment>, ServiceError> {
    let treatment = TreatmentService::new(&state)
        .update_treatment(&user, id, request)
        .await?;
    Ok(Json(treatment))
}

// ---- products ----

#[utoipa::path(
    post,
    path = "/api/v1/businesses/{id}/products",
    tag = "Products",
    operation_id = "createProduct",
    params(("id" = Uuid, Path, description = "Business id")),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 403, description = "Not the owner")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ServiceError> {
    let product = ProductService::new(&state)
        .create_product(&user, id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/v1/businesses/{id}/products",
    tag = "Products",
    operation_id = "listProducts",
    params(("id" = Uuid, Path, description = "Business id"), ProductListQuery),
    responses((status = 200, description = "Products", body = ProductPage))
)]
pub async fn list_products(
    State(state): State<AppState>,
    caller: OptionalUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Page<Product>>, ServiceError> {
    let page = ProductService::new(&state)
        .list_products(caller.user(), id, query)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    tag = "Products",
    operation_id = "updateProduct",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = Product),
        (status = 403, description = "Not the owner")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ServiceError> {
    let product = ProductService::new(&state)
        .update_product(&user, id, request)
        .await?;
    Ok(Json(product))
}
