use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    catalog::Product,
    error::ApiError,
    orders::repo::{Order, OrderReceipt},
    state::AppState,
};

use super::dto::{CreateOrderRequest, OrderCreatedResponse, OrderFormResponse, ProductItem};
use super::service::place_order;

/// GET / — the order form: the currently selectable products.
#[instrument(skip(state))]
pub async fn order_form(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<OrderFormResponse>, ApiError> {
    let products = Product::list_active(&state.db).await?;
    let items = products
        .into_iter()
        .map(|p| ProductItem {
            id: p.id,
            name: p.name,
            price: p.price,
        })
        .collect();
    Ok(Json(OrderFormResponse { products: items }))
}

/// POST / — place an order. Redirects to the success view whatever the
/// confirmation-mail outcome was.
#[instrument(skip(state, payload))]
pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, HeaderMap, Json<OrderCreatedResponse>), ApiError> {
    let product_id = payload
        .product_id
        .ok_or_else(|| ApiError::validation("product", "Select a product"))?;

    let (order, notice) = place_order(&state, user_id, product_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/order/success/{}", order.order_id).parse().unwrap(),
    );

    Ok((
        StatusCode::SEE_OTHER,
        headers,
        Json(OrderCreatedResponse {
            order_id: order.order_id,
            total_amount: order.total_amount,
            status: order.status,
            created_at: order.created_at,
            notice,
        }),
    ))
}

/// GET /order/success/:order_id — the receipt, owner-only.
#[instrument(skip(state))]
pub async fn order_success(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderReceipt>, ApiError> {
    let receipt = Order::receipt_for_user(&state.db, &order_id, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(receipt))
}
