use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use lambda_http::{http::StatusCode, Body, Error as LambdaError, Response};
use serde::Serialize;
use std::collections::BTreeSet;

use super::model::{Product, UpsertProductRequest};
use super::pipeline::{self, PageQuery, SortKey};
use super::store::{DynamoProductStore, ProductRepository};
use super::upsert::UpsertSequencer;
use crate::error::UpsertError;
use crate::media::model::PendingUpload;
use crate::media::uploader::S3ImageUploader;

#[derive(Serialize)]
struct ProductPage {
    items: Vec<Product>,
    total: usize,
    page: usize,
    page_count: usize,
}

/// HTTP Handler: GET /products?categories=a,b&sort=price_asc&page=2
/// Runs the filter/sort/paginate derivation over the full collection.
pub async fn list_products_handler(
    client: &DynamoClient,
    table_name: &str,
    categories: Option<&str>,
    sort: Option<&str>,
    page: Option<&str>,
) -> Result<Response<Body>, LambdaError> {
    let selected: BTreeSet<String> = categories
        .map(|raw| {
            raw.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let sort = match sort {
        None | Some("") => SortKey::default(),
        Some(raw) => match raw.parse() {
            Ok(key) => key,
            Err(()) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("unknown sort key '{}'", raw),
                )
            }
        },
    };

    let page = match page {
        None | Some("") => 0,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                return error_response(StatusCode::BAD_REQUEST, "page must be a number".to_string())
            }
        },
    };

    let store = DynamoProductStore::new(client.clone(), table_name);
    let products = match store.list().await {
        Ok(products) => products,
        Err(e) => {
            tracing::error!("Failed to list products: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let derived = pipeline::derive(&products, &PageQuery { categories: selected, sort, page });
    let body = ProductPage {
        total: derived.total(),
        page_count: derived.page_count(),
        page: derived.page,
        items: derived.page_items,
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&body)?.into())
        .map_err(Box::new)?)
}

/// HTTP Handler: GET /products/{id}
pub async fn get_product_handler(
    client: &DynamoClient,
    table_name: &str,
    id: &str,
) -> Result<Response<Body>, LambdaError> {
    let store = DynamoProductStore::new(client.clone(), table_name);
    match store.get(id).await {
        Ok(Some(product)) => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::to_string(&product)?.into())
            .map_err(Box::new)?),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Product not found".to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// HTTP Handler: POST /products and PATCH /products/{id}
/// Body carries the form draft, kept image references and any pending
/// files (base64). Runs the upsert sequencer.
pub async fn save_product_handler(
    dynamo: &DynamoClient,
    s3: &S3Client,
    table_name: &str,
    bucket: &str,
    id: Option<&str>,
    body: &[u8],
) -> Result<Response<Body>, LambdaError> {
    let request: UpsertProductRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", e),
            )
        }
    };

    let mut draft = request.draft;
    if let Some(id) = id {
        draft.id = Some(id.to_string());
    }

    let mut pending: Vec<PendingUpload> = Vec::with_capacity(request.pending_files.len());
    for file in &request.pending_files {
        match file.decode() {
            Ok(upload) => pending.push(upload),
            Err(_) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("file '{}' is not valid base64", file.file_name),
                )
            }
        }
    }

    let sequencer = UpsertSequencer::new(
        DynamoProductStore::new(dynamo.clone(), table_name),
        S3ImageUploader::new(s3.clone(), bucket),
    );

    match sequencer.submit(&draft, &pending).await {
        Ok(product) => {
            let status = if id.is_some() { StatusCode::OK } else { StatusCode::CREATED };
            Ok(Response::builder()
                .status(status)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::to_string(&product)?.into())
                .map_err(Box::new)?)
        }
        Err(e) => {
            tracing::warn!("Product save rejected: {}", e);
            error_response(upsert_status(&e), e.to_string())
        }
    }
}

/// HTTP Handler: PATCH /products/{id}/activity
pub async fn toggle_product_activity_handler(
    client: &DynamoClient,
    table_name: &str,
    id: &str,
) -> Result<Response<Body>, LambdaError> {
    let store = DynamoProductStore::new(client.clone(), table_name);
    match store.toggle_active(id).await {
        Ok(is_active) => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::json!({"id": id, "is_active": is_active}).to_string().into())
            .map_err(Box::new)?),
        Err(crate::error::StoreError::NotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "Product not found".to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// HTTP Handler: DELETE /products/{id}
pub async fn delete_product_handler(
    client: &DynamoClient,
    table_name: &str,
    id: &str,
) -> Result<Response<Body>, LambdaError> {
    let store = DynamoProductStore::new(client.clone(), table_name);
    match store.delete(id).await {
        Ok(()) => Ok(Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header("Access-Control-Allow-Origin", "*")
            .body(Body::Empty)
            .map_err(Box::new)?),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn upsert_status(err: &UpsertError) -> StatusCode {
    match err {
        UpsertError::Validation(_) => StatusCode::BAD_REQUEST,
        UpsertError::Upload(_) => StatusCode::BAD_GATEWAY,
        UpsertError::Write(_) => StatusCode::INTERNAL_SERVER_ERROR,
        UpsertError::InFlight => StatusCode::CONFLICT,
    }
}

fn error_response(status: StatusCode, message: String) -> Result<Response<Body>, LambdaError> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}
