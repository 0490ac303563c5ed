use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;

use super::model::InfoCard;
use super::sync::CardRow;
use crate::error::StoreError;
use crate::time::DateValue;

/// Persistence seam for info cards. The batch save is a single atomic
/// group: every delete and upsert lands, or none of them do.
#[async_trait]
pub trait InfoCardRepository: Send + Sync {
    /// All cards, ordered by `order` ascending.
    async fn list(&self) -> Result<Vec<InfoCard>, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    async fn apply_batch(&self, deletes: &[String], upserts: &[CardRow]) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DynamoInfoCardStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoInfoCardStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self { client, table_name: table_name.into() }
    }
}

const PK: &str = "INFO_CARD";

fn sk(id: &str) -> String {
    format!("INFO_CARD#{}", id)
}

#[async_trait]
impl InfoCardRepository for DynamoInfoCardStore {
    async fn list(&self) -> Result<Vec<InfoCard>, StoreError> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(PK.to_string()))
            .expression_attribute_values(":sk_prefix", AttributeValue::S("INFO_CARD#".to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB query error: {}", e)))?;

        let mut cards = Vec::new();
        for item in result.items() {
            if let Some(card) = item_to_card(item) {
                cards.push(card);
            }
        }
        cards.sort_by_key(|c| c.order);
        Ok(cards)
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

    async fn apply_batch(&self, deletes: &[String], upserts: &[CardRow]) -> Result<(), StoreError> {
        // DynamoDB rejects a transaction touching one item twice, so a
        // removal superseded by an upsert of the same id is dropped here;
        // the Put overwrites the item anyway.
        let deletes = effective_deletes(deletes, upserts);
        if deletes.is_empty() && upserts.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut items: Vec<TransactWriteItem> = Vec::with_capacity(deletes.len() + upserts.len());

        for id in deletes {
            let delete = Delete::builder()
                .table_name(&self.table_name)
                .key("PK", AttributeValue::S(PK.to_string()))
                .key("SK", AttributeValue::S(sk(id)))
                .build()
                .map_err(|e| StoreError::Backend(format!("transact delete build error: {}", e)))?;
            items.push(TransactWriteItem::builder().delete(delete).build());
        }

        for row in upserts {
            // Rows without an id are new cards; the id is assigned here,
            // never by the client.
            let id = row.id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let put = Put::builder()
                .table_name(&self.table_name)
                .item("PK", AttributeValue::S(PK.to_string()))
                .item("SK", AttributeValue::S(sk(&id)))
                .item("image_url", AttributeValue::S(row.image_url.clone()))
                .item("card_type", AttributeValue::S(row.card_type.clone()))
                .item("is_active", AttributeValue::Bool(row.is_active))
                .item("card_order", AttributeValue::N(row.order.to_string()))
                .item("update_date", AttributeValue::S(now.clone()))
                .build()
                .map_err(|e| StoreError::Backend(format!("transact put build error: {}", e)))?;
            items.push(TransactWriteItem::builder().put(put).build());
        }

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB transact_write_items error: {}", e)))?;

        Ok(())
    }
}

/// Removals whose id is not superseded by an upsert row in the same batch.
fn effective_deletes<'a>(deletes: &'a [String], upserts: &[CardRow]) -> Vec<&'a String> {
    deletes
        .iter()
        .filter(|id| !upserts.iter().any(|row| row.id.as_deref() == Some(id.as_str())))
        .collect()
}

fn item_to_card(item: &HashMap<String, AttributeValue>) -> Option<InfoCard> {
    let sk = item.get("SK").and_then(|v| v.as_s().ok())?;
    let id = sk.strip_prefix("INFO_CARD#")?;

    Some(InfoCard {
        id: id.to_string(),
        image_url: item.get("image_url").and_then(|v| v.as_s().ok()).map(|s| s.to_string()).unwrap_or_default(),
        card_type: item
            .get("card_type")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Standard".to_string()),
        is_active: item.get("is_active").and_then(|v| v.as_bool().ok()).copied().unwrap_or(true),
        order: item.get("card_order").and_then(|v| v.as_n().ok()).and_then(|n| n.parse().ok()).unwrap_or(0),
        update_date: item
            .get("update_date")
            .and_then(|v| v.as_s().ok())
            .map(|s| DateValue::Text(s.to_string())),
    })
}
