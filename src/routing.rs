//! Application router configuration.

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use crate::{
    AppState, Error,
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_endpoint,
        get_category_endpoint, update_category_endpoint,
    },
    endpoints,
    logging::{MAX_REQUEST_BODY_BYTES, logging_middleware},
    payment::{
        create_payment_endpoint, delete_payment_endpoint, get_payment_endpoint,
        get_payments_endpoint, update_payment_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTHCHECK, get(get_healthcheck))
        .route(
            endpoints::PAYMENTS,
            get(get_payments_endpoint).post(create_payment_endpoint),
        )
        .route(
            endpoints::PAYMENT,
            get(get_payment_endpoint)
                .patch(update_payment_endpoint)
                .delete(delete_payment_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(get_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            get(get_category_endpoint)
                .patch(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .fallback(get_404_not_found)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// Report that the server is up.
async fn get_healthcheck() -> Response {
    Json(json!({
        "status": "available",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
