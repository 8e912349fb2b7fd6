//! Route handlers for the payment API.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    Error,
    app_state::SQLiteRecordService,
    endpoints::{self, format_endpoint},
    payment::{NewPayment, PaymentId, PaymentPatch, PaymentQuery},
    sort::DEFAULT_SORT,
};

/// The query string accepted when listing payments.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListPaymentsParams {
    /// Only include payments whose name contains this text.
    pub name: String,
    /// Only include payments in the category with this name.
    pub category_name: String,
    /// The sort token, e.g. `price` or `-date`.
    pub sort: Option<String>,
}

/// Create a payment. Responds with `201 Created` and the payment's location.
pub async fn create_payment_endpoint(
    State(records): State<SQLiteRecordService>,
    body: Result<Json<NewPayment>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(new_payment) = body?;

    let payment = records.create_payment(new_payment).await?;
    let location = format_endpoint(endpoints::PAYMENT, payment.id);

    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(json!({ "payment": payment })),
    )
        .into_response())
}

/// Get a single payment.
pub async fn get_payment_endpoint(
    State(records): State<SQLiteRecordService>,
    payment_id: Result<Path<PaymentId>, PathRejection>,
) -> Result<Response, Error> {
    let Path(payment_id) = payment_id?;

    let payment = records.get_payment(payment_id).await?;

    Ok(Json(json!({ "payment": payment })).into_response())
}

/// List payments, filtered by name and category and ordered by a safelisted sort token.
pub async fn get_payments_endpoint(
    State(records): State<SQLiteRecordService>,
    params: Result<Query<ListPaymentsParams>, QueryRejection>,
) -> Result<Response, Error> {
    let Query(params) = params?;
    let query = PaymentQuery {
        name: params.name,
        category_name: params.category_name,
    };
    let sort = params.sort.unwrap_or_else(|| DEFAULT_SORT.to_owned());

    let payments = records.list_payments(query, &sort).await?;

    Ok(Json(json!({ "payments": payments })).into_response())
}

/// Partially update a payment. Fields missing from the body keep their value.
pub async fn update_payment_endpoint(
    State(records): State<SQLiteRecordService>,
    payment_id: Result<Path<PaymentId>, PathRejection>,
    body: Result<Json<PaymentPatch>, JsonRejection>,
) -> Result<Response, Error> {
    let Path(payment_id) = payment_id?;
    let Json(patch) = body?;

    let payment = records.update_payment(payment_id, patch).await?;

    Ok(Json(json!({ "payment": payment })).into_response())
}

/// Delete a payment.
pub async fn delete_payment_endpoint(
    State(records): State<SQLiteRecordService>,
    payment_id: Result<Path<PaymentId>, PathRejection>,
) -> Result<Response, Error> {
    let Path(payment_id) = payment_id?;

    records.delete_payment(payment_id).await?;
    tracing::info!("deleted payment {payment_id}");

    Ok(Json(json!({ "message": "payment successfully deleted" })).into_response())
}
