//! Categories group payments, e.g. 'Food', 'Rent', 'Salary'.

mod domain;
mod endpoints;
mod store;

pub use domain::{Category, CategoryId, CategoryName, CategoryPatch};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, get_categories_endpoint,
    get_category_endpoint, update_category_endpoint,
};
pub use store::{CategoryStore, SQLiteCategoryStore, create_category_table};
