//! Helpers shared by the unit tests.

#![allow(missing_docs)]

use std::sync::{Arc, Mutex};

use axum::{body::Body, response::Response};
use rusqlite::Connection;
use serde_json::Value;

use crate::db::initialize;

/// Open an in-memory database with every table created.
pub(crate) fn must_create_test_connection() -> Arc<Mutex<Connection>> {
    let connection =
        Connection::open_in_memory().expect("could not create in-memory SQLite database");
    initialize(&connection).expect("could not initialize test DB");

    Arc::new(Mutex::new(connection))
}

/// Read the whole response body and parse it as JSON.
pub(crate) async fn parse_json_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("could not read response body");

    serde_json::from_slice(&body).expect("response body is not valid JSON")
}
