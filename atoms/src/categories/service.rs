use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error as LambdaError, Response};
use std::collections::HashMap;

use super::model::Category;
use crate::error::StoreError;

/// Load every category, ordered by its display position.
pub async fn list_categories(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Vec<Category>, StoreError> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S("CATEGORY".to_string()))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("CATEGORY#".to_string()))
        .send()
        .await
        .map_err(|e| StoreError::Backend(format!("DynamoDB query error: {}", e)))?;

    let mut categories = Vec::new();
    for item in result.items() {
        if let Some(category) = item_to_category(item) {
            categories.push(category);
        }
    }
    categories.sort_by_key(|c| c.order);
    Ok(categories)
}

/// HTTP Handler: GET /categories
pub async fn list_categories_handler(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, LambdaError> {
    match list_categories(client, table_name).await {
        Ok(categories) => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::to_string(&categories)?.into())
            .map_err(Box::new)?),
        Err(e) => {
            tracing::error!("Failed to list categories: {}", e);
            Ok(Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::json!({"error": e.to_string()}).to_string().into())
                .map_err(Box::new)?)
        }
    }
}

fn item_to_category(item: &HashMap<String, AttributeValue>) -> Option<Category> {
    let sk = item.get("SK").and_then(|v| v.as_s().ok())?;
    let id = sk.strip_prefix("CATEGORY#")?;

    Some(Category {
        id: id.to_string(),
        name: item.get("name").and_then(|v| v.as_s().ok()).map(|s| s.to_string()).unwrap_or_default(),
        order: item.get("category_order").and_then(|v| v.as_n().ok()).and_then(|n| n.parse().ok()).unwrap_or(0),
    })
}
