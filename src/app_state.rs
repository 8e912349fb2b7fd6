//! Implements a struct that holds the state of the REST server.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{
    Error,
    category::SQLiteCategoryStore,
    db::initialize,
    payment::SQLitePaymentStore,
    service::RecordService,
};

/// A [RecordService] backed by SQLite.
pub type SQLiteRecordService = RecordService<SQLiteCategoryStore, SQLitePaymentStore>;

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handles every payment and category operation.
    pub record_service: SQLiteRecordService,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// Every store call made while handling a request is abandoned after `query_timeout`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, query_timeout: Duration) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            record_service: RecordService::new(
                SQLiteCategoryStore::new(connection.clone()),
                SQLitePaymentStore::new(connection),
                query_timeout,
            ),
        })
    }
}

impl FromRef<AppState> for SQLiteRecordService {
    fn from_ref(state: &AppState) -> Self {
        state.record_service.clone()
    }
}
