//! Defines the category store trait and its SQLite implementation.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row};

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName},
    db::{CancelToken, Cancellable, RowsAffected, lock_connection},
};

/// Creates, retrieves, updates and deletes payment categories.
///
/// IDs less than one never refer to a category, implementations should return
/// [Error::NotFound] for them without touching the underlying storage.
pub trait CategoryStore {
    /// Create a new category and add it to the store.
    ///
    /// A duplicate name is a storage error.
    fn create(&self, name: CategoryName) -> Result<Category, Error>;

    /// Get a category by its ID.
    fn get(&self, category_id: CategoryId) -> Result<Category, Error>;

    /// Get a category by its exact name.
    fn get_by_name(&self, name: &str) -> Result<Category, Error>;

    /// Get all categories.
    fn get_all(&self) -> Result<Vec<Category>, Error>;

    /// Rename the category with the ID `category.id`.
    ///
    /// Returns [Error::EditConflict] if the category no longer exists.
    fn update(&self, category: &Category) -> Result<(), Error>;

    /// Delete a category by its ID.
    ///
    /// Returns [Error::NotFound] if nothing was deleted and
    /// [Error::CategoryInUse] if payments still refer to the category.
    fn delete(&self, category_id: CategoryId) -> Result<(), Error>;
}

/// Creates and retrieves payment categories to/from a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteCategoryStore {
    connection: Arc<Mutex<Connection>>,
    cancel: CancelToken,
}

impl SQLiteCategoryStore {
    /// Create a new category store with a SQLite database.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            connection,
            cancel: CancelToken::default(),
        }
    }
}

impl Cancellable for SQLiteCategoryStore {
    fn with_cancel_token(&self, token: CancelToken) -> Self {
        Self {
            connection: self.connection.clone(),
            cancel: token,
        }
    }
}

impl CategoryStore for SQLiteCategoryStore {
    fn create(&self, name: CategoryName) -> Result<Category, Error> {
        let connection = lock_connection(&self.connection, &self.cancel)?;

        connection
            .prepare("INSERT INTO category (name) VALUES (?1) RETURNING id, name;")?
            .query_row((name.as_ref(),), map_row)
            .map_err(|error| error.into())
    }

    fn get(&self, category_id: CategoryId) -> Result<Category, Error> {
        if category_id < 1 {
            return Err(Error::NotFound);
        }

        lock_connection(&self.connection, &self.cancel)?
            .prepare("SELECT id, name FROM category WHERE id = :id;")?
            .query_row(&[(":id", &category_id)], map_row)
            .map_err(|error| error.into())
    }

    fn get_by_name(&self, name: &str) -> Result<Category, Error> {
        lock_connection(&self.connection, &self.cancel)?
            .prepare("SELECT id, name FROM category WHERE name = :name;")?
            .query_row(&[(":name", &name)], map_row)
            .map_err(|error| error.into())
    }

    fn get_all(&self) -> Result<Vec<Category>, Error> {
        lock_connection(&self.connection, &self.cancel)?
            .prepare("SELECT id, name FROM category ORDER BY id ASC;")?
            .query_map([], map_row)?
            .map(|maybe_category| maybe_category.map_err(|error| error.into()))
            .collect()
    }

    fn update(&self, category: &Category) -> Result<(), Error> {
        if category.id < 1 {
            return Err(Error::NotFound);
        }

        let rows_affected: RowsAffected = lock_connection(&self.connection, &self.cancel)?
            .execute(
                "UPDATE category SET name = ?1 WHERE id = ?2",
                (category.name.as_ref(), category.id),
            )?;

        if rows_affected == 0 {
            return Err(Error::EditConflict);
        }

        Ok(())
    }

    fn delete(&self, category_id: CategoryId) -> Result<(), Error> {
        if category_id < 1 {
            return Err(Error::NotFound);
        }

        let rows_affected: RowsAffected = lock_connection(&self.connection, &self.cancel)?
            .execute("DELETE FROM category WHERE id = ?1", [category_id])
            .map_err(|error| match error {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error {
                        code: _,
                        extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                    },
                    _,
                ) => Error::CategoryInUse(category_id),
                error => error.into(),
            })?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let name = CategoryName::new_unchecked(&raw_name);

    Ok(Category { id, name })
}

#[cfg(test)]
mod category_store_tests {
    use std::{
        collections::HashSet,
        sync::{Arc, Mutex},
    };

    use rusqlite::Connection;

    use crate::{
        Error,
        category::{Category, CategoryName, CategoryStore, SQLiteCategoryStore},
        test_utils::must_create_test_connection,
    };

    fn get_test_store() -> SQLiteCategoryStore {
        SQLiteCategoryStore::new(must_create_test_connection())
    }

    /// A store over a database without any tables, so any query it runs fails with a SQL error.
    fn get_store_without_tables() -> SQLiteCategoryStore {
        let connection = Connection::open_in_memory().expect("could not open database");
        SQLiteCategoryStore::new(Arc::new(Mutex::new(connection)))
    }

    #[test]
    fn create_category_succeeds() {
        let store = get_test_store();
        let name = CategoryName::new("Categorically a category").unwrap();

        let category = store.create(name.clone()).expect("could not create category");

        assert!(category.id > 0);
        assert_eq!(category.name, name);
    }

    #[test]
    fn create_fails_on_duplicate_name() {
        let store = get_test_store();
        store
            .create(CategoryName::new_unchecked("Food"))
            .expect("could not create category");

        let result = store.create(CategoryName::new_unchecked("Food"));

        match result {
            Err(error) => assert!(matches!(error, Error::SqlError(_)), "got {error:?}"),
            Ok(category) => panic!("want storage error, got {category:?}"),
        }
    }

    #[test]
    fn get_category_succeeds() {
        let store = get_test_store();
        let inserted_category = store.create(CategoryName::new_unchecked("Foo")).unwrap();

        let selected_category = store.get(inserted_category.id);

        assert_eq!(Ok(inserted_category), selected_category);
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let store = get_test_store();
        let inserted_category = store.create(CategoryName::new_unchecked("Foo")).unwrap();

        let selected_category = store.get(inserted_category.id + 123);

        assert_eq!(selected_category, Err(Error::NotFound));
    }

    #[test]
    fn get_by_name_succeeds() {
        let store = get_test_store();
        let inserted_category = store.create(CategoryName::new_unchecked("Food")).unwrap();

        let selected_category = store.get_by_name("Food");

        assert_eq!(Ok(inserted_category), selected_category);
    }

    #[test]
    fn get_by_name_returns_not_found_for_unknown_name() {
        let store = get_test_store();

        assert_eq!(store.get_by_name("Nope"), Err(Error::NotFound));
    }

    #[test]
    fn get_all_categories() {
        let store = get_test_store();

        let inserted_categories = HashSet::from([
            store.create(CategoryName::new_unchecked("Foo")).unwrap(),
            store.create(CategoryName::new_unchecked("Bar")).unwrap(),
        ]);

        let selected_categories = store.get_all().expect("could not get categories");
        let selected_categories = HashSet::from_iter(selected_categories);

        assert_eq!(inserted_categories, selected_categories);
    }

    #[test]
    fn update_category_succeeds() {
        let store = get_test_store();
        let category = store.create(CategoryName::new_unchecked("Original")).unwrap();
        let renamed = Category {
            id: category.id,
            name: CategoryName::new_unchecked("Updated"),
        };

        store.update(&renamed).expect("could not update category");

        assert_eq!(store.get(category.id), Ok(renamed));
    }

    #[test]
    fn update_missing_category_is_an_edit_conflict() {
        let store = get_test_store();
        let missing = Category {
            id: 999999,
            name: CategoryName::new_unchecked("Updated"),
        };

        assert_eq!(store.update(&missing), Err(Error::EditConflict));
    }

    #[test]
    fn delete_twice_returns_not_found() {
        let store = get_test_store();
        let category = store.create(CategoryName::new_unchecked("ToDelete")).unwrap();

        assert_eq!(store.delete(category.id), Ok(()));
        assert_eq!(store.delete(category.id), Err(Error::NotFound));
        assert_eq!(store.get(category.id), Err(Error::NotFound));
    }

    #[test]
    fn non_positive_ids_do_not_query_storage() {
        let store = get_store_without_tables();
        let category = Category {
            id: 0,
            name: CategoryName::new_unchecked("Foo"),
        };

        assert_eq!(store.get(0), Err(Error::NotFound));
        assert_eq!(store.get(-1), Err(Error::NotFound));
        assert_eq!(store.update(&category), Err(Error::NotFound));
        assert_eq!(store.delete(-5), Err(Error::NotFound));
    }
}
