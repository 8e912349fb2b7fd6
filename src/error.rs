//! Defines the app level error type and its conversion to JSON error responses.

use std::time::Duration;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::{category::CategoryId, validation::Violations};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An update targeted a row that no longer existed when the write was made.
    ///
    /// This only detects rows that vanished between fetching and writing,
    /// concurrent updates to a row that still exists are last-writer-wins.
    #[error("the record was removed before the edit could be saved")]
    EditConflict,

    /// Client supplied data broke one or more field rules.
    #[error("the request failed validation: {0}")]
    Validation(Violations),

    /// The category ID used to create or update a payment did not match a valid category.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(CategoryId),

    /// Tried to delete a category that payments still refer to.
    #[error("the category {0} is still used by one or more payments")]
    CategoryInUse(CategoryId),

    /// The request body or query string could not be parsed.
    #[error("the request could not be parsed: {0}")]
    BadRequest(String),

    /// An unhandled/unexpected SQL error, including constraint violations
    /// such as a duplicate category name.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A storage operation did not finish within the query timeout.
    #[error("the storage operation did not finish within {0:?}")]
    StorageTimeout(Duration),

    /// The blocking task running a storage operation panicked or was cancelled.
    #[error("the storage task failed: {0}")]
    StorageTaskFailed(String),

    /// A storage operation was abandoned after its query timeout and stopped
    /// before writing anything further.
    #[error("the storage operation was cancelled")]
    QueryCancelled,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: rusqlite::ErrorCode::OperationInterrupted,
                    ..
                },
                _,
            ) => Error::QueryCancelled,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<Violations> for Error {
    fn from(violations: Violations) -> Self {
        Error::Validation(violations)
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

// An ID that cannot be parsed cannot refer to a record.
impl From<PathRejection> for Error {
    fn from(_: PathRejection) -> Self {
        Error::NotFound
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, error): (StatusCode, Value) = match self {
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                json!("the requested resource could not be found"),
            ),
            Error::EditConflict => (
                StatusCode::CONFLICT,
                json!("unable to update the record due to an edit conflict, please try again"),
            ),
            Error::Validation(violations) => (StatusCode::UNPROCESSABLE_ENTITY, json!(violations)),
            Error::InvalidCategory(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"category_id": "must refer to an existing category"}),
            ),
            Error::CategoryInUse(category_id) => (
                StatusCode::CONFLICT,
                json!(format!(
                    "the category {category_id} is still used by one or more payments, \
                    move or delete those payments first"
                )),
            ),
            Error::BadRequest(message) => (StatusCode::BAD_REQUEST, json!(message)),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("the server encountered a problem and could not process your request"),
                )
            }
        };

        (status_code, Json(json!({ "error": error }))).into_response()
    }
}
