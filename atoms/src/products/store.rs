use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;

use super::model::{Product, ProductRecord};
use crate::error::StoreError;
use crate::time::DateValue;

/// Persistence seam for products. The upsert sequencer and the HTTP
/// handlers only talk to this; tests use an in-memory fake.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Product>, StoreError>;
    async fn get(&self, id: &str) -> Result<Option<Product>, StoreError>;
    /// Backend assigns the identifier and both timestamps.
    async fn create(&self, record: ProductRecord) -> Result<Product, StoreError>;
    /// Merge-style field update; refreshes the update timestamp, keeps the
    /// insert timestamp.
    async fn update(&self, id: &str, record: ProductRecord) -> Result<Product, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    /// Flips the customer-facing visibility flag, returns the new value.
    async fn toggle_active(&self, id: &str) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct DynamoProductStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoProductStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self { client, table_name: table_name.into() }
    }
}

const PK: &str = "PRODUCT";

fn sk(id: &str) -> String {
    format!("PRODUCT#{}", id)
}

#[async_trait]
impl ProductRepository for DynamoProductStore {
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(PK.to_string()))
            .expression_attribute_values(":sk_prefix", AttributeValue::S("PRODUCT#".to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB query error: {}", e)))?;

        let mut products = Vec::new();
        for item in result.items() {
            if let Some(product) = item_to_product(item) {
                products.push(product);
            }
        }
        Ok(products)
    }

    async fn get(&self, id: &str) -> Result<Option<Product>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(PK.to_string()))
            .key("SK", AttributeValue::S(sk(id)))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB get_item error: {}", e)))?;

        Ok(result.item().and_then(item_to_product))
    }

    async fn create(&self, record: ProductRecord) -> Result<Product, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(PK.to_string()))
            .item("SK", AttributeValue::S(sk(&id)))
            .item("name", AttributeValue::S(record.name.clone()))
            .item("description", AttributeValue::S(record.description.clone()))
            .item("price", AttributeValue::N(record.price.to_string()))
            .item("categories", categories_attr(&record.categories))
            .item("main_image_url", AttributeValue::S(record.main_image_url.clone()))
            .item("image_urls", urls_attr(&record.image_urls))
            .item("is_active", AttributeValue::Bool(record.is_active))
            .item("insert_date", AttributeValue::S(now.clone()))
            .item("update_date", AttributeValue::S(now.clone()))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB put_item error: {}", e)))?;

        Ok(Product {
            id,
            name: record.name,
            description: record.description,
            price: record.price,
            categories: record.categories,
            main_image_url: record.main_image_url,
            image_urls: record.image_urls,
            is_active: record.is_active,
            insert_date: DateValue::Text(now.clone()),
            update_date: DateValue::Text(now),
        })
    }

    async fn update(&self, id: &str, record: ProductRecord) -> Result<Product, StoreError> {
        let now = chrono::Utc::now().to_rfc3339();

        // "name" is a DynamoDB reserved word, so everything goes through
        // expression attribute names for uniformity.
        let mut expr_names = HashMap::new();
        expr_names.insert("#name".to_string(), "name".to_string());
        expr_names.insert("#description".to_string(), "description".to_string());
        expr_names.insert("#price".to_string(), "price".to_string());
        expr_names.insert("#categories".to_string(), "categories".to_string());
        expr_names.insert("#main".to_string(), "main_image_url".to_string());
        expr_names.insert("#urls".to_string(), "image_urls".to_string());
        expr_names.insert("#active".to_string(), "is_active".to_string());
        expr_names.insert("#updated".to_string(), "update_date".to_string());

        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(PK.to_string()))
            .key("SK", AttributeValue::S(sk(id)))
            .update_expression(
                "SET #name = :name, #description = :description, #price = :price, \
                 #categories = :categories, #main = :main, #urls = :urls, \
                 #active = :active, #updated = :updated",
            )
            .expression_attribute_values(":name", AttributeValue::S(record.name))
            .expression_attribute_values(":description", AttributeValue::S(record.description))
            .expression_attribute_values(":price", AttributeValue::N(record.price.to_string()))
            .expression_attribute_values(":categories", categories_attr(&record.categories))
            .expression_attribute_values(":main", AttributeValue::S(record.main_image_url))
            .expression_attribute_values(":urls", urls_attr(&record.image_urls))
            .expression_attribute_values(":active", AttributeValue::Bool(record.is_active))
            .expression_attribute_values(":updated", AttributeValue::S(now));

        for (k, v) in expr_names {
            builder = builder.expression_attribute_names(k, v);
        }

        builder
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB update_item error: {}", e)))?;

        self.get(id).await?.ok_or(StoreError::NotFound("product"))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(PK.to_string()))
            .key("SK", AttributeValue::S(sk(id)))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB delete_item error: {}", e)))?;
        Ok(())
    }

    async fn toggle_active(&self, id: &str) -> Result<bool, StoreError> {
        let current = self.get(id).await?.ok_or(StoreError::NotFound("product"))?;
        let next = !current.is_active;

        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(PK.to_string()))
            .key("SK", AttributeValue::S(sk(id)))
            .update_expression("SET is_active = :active")
            .expression_attribute_values(":active", AttributeValue::Bool(next))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB update_item error: {}", e)))?;

        Ok(next)
    }
}

fn categories_attr(categories: &[String]) -> AttributeValue {
    AttributeValue::L(categories.iter().map(|c| AttributeValue::S(c.clone())).collect())
}

fn urls_attr(urls: &[String]) -> AttributeValue {
    AttributeValue::L(urls.iter().map(|u| AttributeValue::S(u.clone())).collect())
}

fn string_list(item: &HashMap<String, AttributeValue>, field: &str) -> Vec<String> {
    item.get(field)
        .and_then(|v| v.as_l().ok())
        .map(|list| {
            list.iter()
                .filter_map(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn item_to_product(item: &HashMap<String, AttributeValue>) -> Option<Product> {
    let sk = item.get("SK").and_then(|v| v.as_s().ok())?;
    let id = sk.strip_prefix("PRODUCT#")?;

    Some(Product {
        id: id.to_string(),
        name: item.get("name").and_then(|v| v.as_s().ok()).map(|s| s.to_string()).unwrap_or_default(),
        description: item.get("description").and_then(|v| v.as_s().ok()).map(|s| s.to_string()).unwrap_or_default(),
        price: item.get("price").and_then(|v| v.as_n().ok()).and_then(|n| n.parse().ok()).unwrap_or(0),
        categories: string_list(item, "categories"),
        main_image_url: item.get("main_image_url").and_then(|v| v.as_s().ok()).map(|s| s.to_string()).unwrap_or_default(),
        image_urls: string_list(item, "image_urls"),
        is_active: item.get("is_active").and_then(|v| v.as_bool().ok()).copied().unwrap_or(false),
        insert_date: item
            .get("insert_date")
            .and_then(|v| v.as_s().ok())
            .map(|s| DateValue::Text(s.to_string()))
            .unwrap_or(DateValue::Text(String::new())),
        update_date: item
            .get("update_date")
            .and_then(|v| v.as_s().ok())
            .map(|s| DateValue::Text(s.to_string()))
            .unwrap_or(DateValue::Text(String::new())),
    })
}
