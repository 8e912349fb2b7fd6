//! Payments record money spent, each one belonging to exactly one category.

mod domain;
mod endpoints;
mod store;

pub use domain::{
    MAX_NAME_BYTES, NewPayment, Payment, PaymentDraft, PaymentId, PaymentPatch, PaymentQuery,
};
pub use endpoints::{
    create_payment_endpoint, delete_payment_endpoint, get_payment_endpoint,
    get_payments_endpoint, update_payment_endpoint,
};
pub use store::{PaymentStore, SQLitePaymentStore, create_payment_table};
