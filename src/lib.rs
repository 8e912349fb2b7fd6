//! Finance tracker is a web service for recording payments and the
//! categories they belong to.
//!
//! This library provides a JSON REST API backed by a SQLite database.
//! Payments are created, listed, partially updated and deleted through the
//! [RecordService], which keeps the link between a payment and its category
//! consistent.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod category;
mod db;
mod endpoints;
mod error;
mod logging;
mod payment;
mod routing;
mod service;
mod sort;
mod validation;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, SQLiteRecordService};
pub use category::{
    Category, CategoryId, CategoryName, CategoryPatch, CategoryStore, SQLiteCategoryStore,
};
pub use db::{CancelToken, Cancellable, initialize as initialize_db};
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, MAX_REQUEST_BODY_BYTES, logging_middleware};
pub use payment::{
    MAX_NAME_BYTES, NewPayment, Payment, PaymentDraft, PaymentId, PaymentPatch, PaymentQuery,
    PaymentStore, SQLitePaymentStore,
};
pub use routing::build_router;
pub use service::{DEFAULT_QUERY_TIMEOUT, RecordService};
pub use sort::{CompiledSort, PAYMENT_SORT_SAFELIST, SortDirection, ValidatedSort};
pub use validation::Violations;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
