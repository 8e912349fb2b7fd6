//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/payments/{payment_id}', use [format_endpoint].

/// Reports whether the server is up.
pub const HEALTHCHECK: &str = "/api/healthcheck";
/// The route to list and create payments.
pub const PAYMENTS: &str = "/api/payments";
/// The route to read, update and delete a single payment.
pub const PAYMENT: &str = "/api/payments/{payment_id}";
/// The route to list and create categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to read, update and delete a single category.
pub const CATEGORY: &str = "/api/categories/{category_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter starts with a left brace and ends with the next right brace,
/// for example '{payment_id}' in '/api/payments/{payment_id}'. Only the first
/// parameter is replaced.
///
/// If no parameter is found in `endpoint_path`, the original path is returned.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
