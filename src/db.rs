//! Database setup and the shared connection helpers used by the SQLite stores.

use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
};

use rusqlite::{Connection, functions::FunctionFlags};

use crate::{Error, category::create_category_table, payment::create_payment_table};

/// The name of the SQL function that lowercases text with Unicode case folding.
///
/// SQLite's own `lower` and `LIKE` only fold ASCII letters.
pub(crate) const UNICODE_LOWER: &str = "unicode_lower";

/// How many virtual machine instructions SQLite runs between cancellation checks.
const CANCEL_CHECK_INTERVAL: i32 = 1000;

/// Create the tables for the domain models if they do not exist yet.
///
/// Foreign key enforcement is switched on for `connection`, which is what
/// stops a category from being deleted while payments still refer to it.
/// The [UNICODE_LOWER] function is registered as well.
///
/// # Errors
/// Returns an [Error::SqlError] if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;
    register_functions(connection)?;

    let transaction = connection.unchecked_transaction()?;
    create_category_table(&transaction)?;
    create_payment_table(&transaction)?;
    transaction.commit()?;

    Ok(())
}

fn register_functions(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |context| {
            let text: Option<String> = context.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )
}

/// Marks a single store call as abandoned.
///
/// Once cancelled, the call fails the next time it locks the connection and
/// any statement it is running is interrupted, so nothing more is written.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Abandon the store call holding this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [CancelToken::cancel] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A store whose calls can be abandoned part way through.
pub trait Cancellable {
    /// A copy of the store that stops touching the database once `token` is cancelled.
    fn with_cancel_token(&self, token: CancelToken) -> Self;
}

/// Acquire the lock on the shared database connection for a call holding `cancel`.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the mutex was poisoned and
/// [Error::QueryCancelled] if `cancel` was cancelled while waiting for the lock.
pub(crate) fn lock_connection<'a>(
    connection: &'a Mutex<Connection>,
    cancel: &CancelToken,
) -> Result<MutexGuard<'a, Connection>, Error> {
    let connection = connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    if cancel.is_cancelled() {
        return Err(Error::QueryCancelled);
    }

    // Replaces the handler left behind by the previous holder of the lock.
    let cancel = cancel.clone();
    connection.progress_handler(
        CANCEL_CHECK_INTERVAL,
        Some(move || cancel.is_cancelled()),
    )?;

    Ok(connection)
}

/// The number of rows changed by an `UPDATE` or `DELETE`.
pub(crate) type RowsAffected = usize;

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, thread, time::Duration};

    use rusqlite::Connection;

    use crate::Error;

    use super::{CancelToken, initialize, lock_connection};

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().expect("could not open database");

        initialize(&connection).expect("first initialize failed");
        initialize(&connection).expect("second initialize failed");
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let connection = Connection::open_in_memory().expect("could not open database");

        initialize(&connection).expect("could not initialize database");

        let enabled: bool = connection
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("could not read pragma");
        assert!(enabled);
    }

    #[test]
    fn unicode_lower_folds_non_ascii_letters() {
        let connection = Connection::open_in_memory().expect("could not open database");
        initialize(&connection).expect("could not initialize database");

        let lowered: String = connection
            .query_row("SELECT unicode_lower('КОФЕ Ünï')", [], |row| row.get(0))
            .expect("could not call unicode_lower");

        assert_eq!(lowered, "кофе ünï");
    }

    #[test]
    fn cancelled_call_cannot_lock_connection() {
        let connection = Mutex::new(Connection::open_in_memory().expect("could not open database"));
        let cancel = CancelToken::default();
        cancel.cancel();

        let result = lock_connection(&connection, &cancel);

        assert!(matches!(result, Err(Error::QueryCancelled)));
    }

    #[test]
    fn cancel_interrupts_running_statement() {
        let database = Mutex::new(Connection::open_in_memory().expect("could not open database"));
        let cancel = CancelToken::default();
        let canceller = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let connection = lock_connection(&database, &cancel).expect("could not lock connection");
        let result: Result<i64, Error> = connection
            .query_row(
                "WITH RECURSIVE counter(x) AS (
                    SELECT 1 UNION ALL SELECT x + 1 FROM counter WHERE x < 1000000000
                )
                SELECT count(*) FROM counter",
                [],
                |row| row.get(0),
            )
            .map_err(Error::from);

        assert_eq!(result, Err(Error::QueryCancelled));
    }

    #[test]
    fn uncancelled_token_leaves_queries_alone() {
        let connection = Mutex::new(Connection::open_in_memory().expect("could not open database"));

        let count: i64 = lock_connection(&connection, &CancelToken::default())
            .expect("could not lock connection")
            .query_row(
                "WITH RECURSIVE counter(x) AS (
                    SELECT 1 UNION ALL SELECT x + 1 FROM counter WHERE x < 10000
                )
                SELECT count(*) FROM counter",
                [],
                |row| row.get(0),
            )
            .expect("query should not be interrupted");

        assert_eq!(count, 10000);
    }
}
