//! Defines the payment store trait and its SQLite implementation.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row};

use crate::{
    Error,
    category::CategoryName,
    db::{CancelToken, Cancellable, RowsAffected, UNICODE_LOWER, lock_connection},
    payment::{Payment, PaymentDraft, PaymentId, PaymentQuery},
    sort::CompiledSort,
};

/// Handles the creation, retrieval, updating and deletion of payments.
///
/// IDs less than one never refer to a payment, implementations should return
/// [Error::NotFound] for them without touching the underlying storage.
pub trait PaymentStore {
    /// Create a new payment from `draft`.
    ///
    /// The category in `draft` must already exist, otherwise
    /// [Error::InvalidCategory] is returned.
    fn create(&self, draft: &PaymentDraft) -> Result<Payment, Error>;

    /// Retrieve a payment, including the name of its category.
    fn get(&self, id: PaymentId) -> Result<Payment, Error>;

    /// Retrieve the payments matching `query` in the order given by `sort`.
    ///
    /// No matches is an empty list, not an error.
    fn get_all(&self, query: &PaymentQuery, sort: &CompiledSort) -> Result<Vec<Payment>, Error>;

    /// Overwrite every mutable field of the payment `id` with `draft`.
    ///
    /// Returns [Error::EditConflict] if the payment no longer exists.
    fn update(&self, id: PaymentId, draft: &PaymentDraft) -> Result<(), Error>;

    /// Delete a payment. Returns [Error::NotFound] if nothing was deleted.
    fn delete(&self, id: PaymentId) -> Result<(), Error>;
}

/// Stores payments in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLitePaymentStore {
    connection: Arc<Mutex<Connection>>,
    cancel: CancelToken,
}

impl SQLitePaymentStore {
    /// Create a new payment store with a SQLite database.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            connection,
            cancel: CancelToken::default(),
        }
    }
}

impl Cancellable for SQLitePaymentStore {
    fn with_cancel_token(&self, token: CancelToken) -> Self {
        Self {
            connection: self.connection.clone(),
            cancel: token,
        }
    }
}

// The aliases let `ORDER BY` refer to safelisted sort columns by name.
const SELECT_PAYMENT: &str = "SELECT \
        payment.id AS id, \
        payment.name AS name, \
        payment.price AS price, \
        payment.date AS date, \
        payment.payment_type AS payment_type, \
        payment.comment AS comment, \
        payment.category_id AS category_id, \
        category.name AS category_name \
    FROM payment \
    INNER JOIN category ON category.id = payment.category_id";

impl PaymentStore for SQLitePaymentStore {
    fn create(&self, draft: &PaymentDraft) -> Result<Payment, Error> {
        let connection = lock_connection(&self.connection, &self.cancel)?;

        let id: PaymentId = connection
            .prepare(
                "INSERT INTO payment (name, payment_type, comment, category_id, price)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
            )?
            .query_row(
                (
                    &draft.name,
                    &draft.payment_type,
                    &draft.comment,
                    draft.category_id,
                    draft.price,
                ),
                |row| row.get(0),
            )
            .map_err(|error| map_category_error(error, draft))?;

        select_payment(id, &connection)
    }

    fn get(&self, id: PaymentId) -> Result<Payment, Error> {
        if id < 1 {
            return Err(Error::NotFound);
        }

        let connection = lock_connection(&self.connection, &self.cancel)?;
        select_payment(id, &connection)
    }

    fn get_all(&self, query: &PaymentQuery, sort: &CompiledSort) -> Result<Vec<Payment>, Error> {
        // Sort by the requested column, and then ID to keep the order stable for equal values.
        let sql = format!(
            "{SELECT_PAYMENT} \
            WHERE (?1 = '' OR {UNICODE_LOWER}(payment.name) LIKE '%' || ?2 || '%' ESCAPE '\\') \
            AND (?3 = '' OR category.name = ?3) \
            ORDER BY {}, payment.id ASC",
            sort.to_sql()
        );

        lock_connection(&self.connection, &self.cancel)?
            .prepare(&sql)?
            .query_map(
                (
                    &query.name,
                    escape_like_pattern(&query.name.to_lowercase()),
                    &query.category_name,
                ),
                map_payment_row,
            )?
            .map(|maybe_payment| maybe_payment.map_err(Error::from))
            .collect()
    }

    fn update(&self, id: PaymentId, draft: &PaymentDraft) -> Result<(), Error> {
        if id < 1 {
            return Err(Error::NotFound);
        }

        let rows_affected: RowsAffected = lock_connection(&self.connection, &self.cancel)?
            .execute(
                "UPDATE payment \
                SET name = ?1, payment_type = ?2, comment = ?3, category_id = ?4, price = ?5 \
                WHERE id = ?6",
                (
                    &draft.name,
                    &draft.payment_type,
                    &draft.comment,
                    draft.category_id,
                    draft.price,
                    id,
                ),
            )
            .map_err(|error| map_category_error(error, draft))?;

        if rows_affected == 0 {
            return Err(Error::EditConflict);
        }

        Ok(())
    }

    fn delete(&self, id: PaymentId) -> Result<(), Error> {
        if id < 1 {
            return Err(Error::NotFound);
        }

        let rows_affected: RowsAffected = lock_connection(&self.connection, &self.cancel)?
            .execute("DELETE FROM payment WHERE id = ?1", [id])?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}

/// Create the payment table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_payment_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS payment (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            payment_type TEXT NOT NULL,
            comment TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            price INTEGER NOT NULL,
            date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_payment_category ON payment(category_id);",
    )?;

    Ok(())
}

fn select_payment(id: PaymentId, connection: &Connection) -> Result<Payment, Error> {
    connection
        .prepare(&format!("{SELECT_PAYMENT} WHERE payment.id = :id"))?
        .query_row(&[(":id", &id)], map_payment_row)
        .map_err(Error::from)
}

/// Map a row selected with `SELECT_PAYMENT` to a [Payment].
fn map_payment_row(row: &Row) -> Result<Payment, rusqlite::Error> {
    let category_name: String = row.get(7)?;

    Ok(Payment {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        date: row.get(3)?,
        payment_type: row.get(4)?,
        comment: row.get(5)?,
        category_id: row.get(6)?,
        category_name: CategoryName::new_unchecked(&category_name),
    })
}

fn map_category_error(error: rusqlite::Error, draft: &PaymentDraft) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidCategory(draft.category_id),
        error => error.into(),
    }
}

/// Escape the `LIKE` wildcards in `text` so that it only matches literally.
fn escape_like_pattern(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
