//! Route handlers for the category API.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    Error,
    app_state::SQLiteRecordService,
    category::{CategoryId, CategoryPatch},
    endpoints::{self, format_endpoint},
};

/// Form data for category creation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewCategoryData {
    /// The unique name of the category.
    pub name: String,
}

/// Create a category. Responds with `201 Created` and the category's location.
pub async fn create_category_endpoint(
    State(records): State<SQLiteRecordService>,
    body: Result<Json<NewCategoryData>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(data) = body?;

    let category = records.create_category(&data.name).await?;
    let location = format_endpoint(endpoints::CATEGORY, category.id);

    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(json!({ "category": category })),
    )
        .into_response())
}

/// Get a single category.
pub async fn get_category_endpoint(
    State(records): State<SQLiteRecordService>,
    category_id: Result<Path<CategoryId>, PathRejection>,
) -> Result<Response, Error> {
    let Path(category_id) = category_id?;

    let category = records.get_category(category_id).await?;

    Ok(Json(json!({ "category": category })).into_response())
}

/// List every category.
pub async fn get_categories_endpoint(
    State(records): State<SQLiteRecordService>,
) -> Result<Response, Error> {
    let categories = records.list_categories().await?;

    Ok(Json(json!({ "categories": categories })).into_response())
}

/// Rename a category.
pub async fn update_category_endpoint(
    State(records): State<SQLiteRecordService>,
    category_id: Result<Path<CategoryId>, PathRejection>,
    body: Result<Json<CategoryPatch>, JsonRejection>,
) -> Result<Response, Error> {
    let Path(category_id) = category_id?;
    let Json(patch) = body?;

    let category = records.update_category(category_id, patch).await?;

    Ok(Json(json!({ "category": category })).into_response())
}

/// Delete a category that no payments belong to.
pub async fn delete_category_endpoint(
    State(records): State<SQLiteRecordService>,
    category_id: Result<Path<CategoryId>, PathRejection>,
) -> Result<Response, Error> {
    let Path(category_id) = category_id?;

    records.delete_category(category_id).await?;
    tracing::info!("deleted category {category_id}");

    Ok(Json(json!({ "message": "category successfully deleted" })).into_response())
}

#[cfg(test)]
mod category_endpoint_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, build_router, endpoints, service::DEFAULT_QUERY_TIMEOUT};

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("could not open database");
        let state =
            AppState::new(connection, DEFAULT_QUERY_TIMEOUT).expect("could not create app state");

        TestServer::new(build_router(state))
    }

    async fn must_create_category(server: &TestServer, name: &str) -> Value {
        let response = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": name }))
            .await;
        response.assert_status(StatusCode::CREATED);

        response.json::<Value>()["category"].clone()
    }

    #[tokio::test]
    async fn create_and_get_category() {
        let server = get_test_server();
        let created = must_create_category(&server, "Food").await;

        let response = server
            .get(&format!("/api/categories/{}", created["id"]))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "category": created }));
    }

    #[tokio::test]
    async fn create_category_with_empty_name_is_unprocessable() {
        let server = get_test_server();

        let response = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_json(&json!({"error": {"name": "must be provided"}}));
    }

    #[tokio::test]
    async fn create_duplicate_category_is_internal_error() {
        let server = get_test_server();
        must_create_category(&server, "Food").await;

        let response = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Food" }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn list_categories() {
        let server = get_test_server();
        let food = must_create_category(&server, "Food").await;
        let rent = must_create_category(&server, "Rent").await;

        let response = server.get(endpoints::CATEGORIES).await;

        response.assert_status_ok();
        response.assert_json(&json!({ "categories": [food, rent] }));
    }

    #[tokio::test]
    async fn patch_category_renames_it() {
        let server = get_test_server();
        let created = must_create_category(&server, "Food").await;

        let response = server
            .patch(&format!("/api/categories/{}", created["id"]))
            .json(&json!({ "name": "Groceries" }))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["category"]["name"], "Groceries");
    }

    #[tokio::test]
    async fn delete_category_in_use_is_conflict() {
        let server = get_test_server();
        let payment = server
            .post(endpoints::PAYMENTS)
            .json(&json!({ "name": "Bread", "category_name": "Food" }))
            .await
            .json::<Value>();

        let response = server
            .delete(&format!(
                "/api/categories/{}",
                payment["payment"]["category_id"]
            ))
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn delete_unused_category_twice() {
        let server = get_test_server();
        let created = must_create_category(&server, "Food").await;
        let path = format!("/api/categories/{}", created["id"]);

        server.delete(&path).await.assert_status_ok();
        server
            .delete(&path)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
