use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use lambda_http::{http::StatusCode, Body, Error as LambdaError, Response};

use super::model::{CardEntryPayload, SyncCardsRequest};
use super::store::{DynamoInfoCardStore, InfoCardRepository};
use super::sync::{CardEntry, CardSource, CardSyncSequencer};
use crate::error::UpsertError;
use crate::media::uploader::S3ImageUploader;

/// HTTP Handler: GET /info-cards[?active=true]
pub async fn list_info_cards_handler(
    client: &DynamoClient,
    table_name: &str,
    active_only: bool,
) -> Result<Response<Body>, LambdaError> {
    let store = DynamoInfoCardStore::new(client.clone(), table_name);
    match store.list().await {
        Ok(mut cards) => {
            if active_only {
                cards.retain(|c| c.is_active);
            }
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::to_string(&cards)?.into())
                .map_err(Box::new)?)
        }
        Err(e) => {
            tracing::error!("Failed to list info cards: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// HTTP Handler: PUT /info-cards
/// Takes the manager's whole working list plus the removed ids and runs
/// the all-or-nothing batch save.
pub async fn sync_info_cards_handler(
    dynamo: &DynamoClient,
    s3: &S3Client,
    table_name: &str,
    bucket: &str,
    body: &[u8],
) -> Result<Response<Body>, LambdaError> {
    let request: SyncCardsRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", e),
            )
        }
    };

    let mut entries = Vec::with_capacity(request.entries.len());
    for (index, payload) in request.entries.iter().enumerate() {
        match to_entry(payload) {
            Ok(entry) => entries.push(entry),
            Err(message) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("entry {}: {}", index, message),
                )
            }
        }
    }

    let store = DynamoInfoCardStore::new(dynamo.clone(), table_name);
    let uploader = S3ImageUploader::new(s3.clone(), bucket);
    let sequencer = CardSyncSequencer::new(store.clone(), uploader);

    match sequencer.submit(&entries, &request.deleted_ids).await {
        Ok(()) => {
            let cards = store.list().await.unwrap_or_default();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::to_string(&cards)?.into())
                .map_err(Box::new)?)
        }
        Err(e) => {
            tracing::warn!("Info card sync rejected: {}", e);
            let status = match &e {
                UpsertError::Validation(_) => StatusCode::BAD_REQUEST,
                UpsertError::Upload(_) => StatusCode::BAD_GATEWAY,
                UpsertError::Write(_) => StatusCode::INTERNAL_SERVER_ERROR,
                UpsertError::InFlight => StatusCode::CONFLICT,
            };
            error_response(status, e.to_string())
        }
    }
}

fn to_entry(payload: &CardEntryPayload) -> Result<CardEntry, String> {
    let source = match (&payload.pending_file, &payload.image_url) {
        (Some(file), _) => CardSource::Pending(
            file.decode().map_err(|_| "file data is not valid base64".to_string())?,
        ),
        (None, Some(url)) => CardSource::Remote { url: url.clone() },
        (None, None) => return Err("needs either image_url or pending_file".to_string()),
    };

    Ok(CardEntry {
        id: payload.id.clone().filter(|id| !id.is_empty()),
        source,
        card_type: payload
            .card_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Standard".to_string()),
        is_active: payload.is_active.unwrap_or(true),
    })
}

fn error_response(status: StatusCode, message: String) -> Result<Response<Body>, LambdaError> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}
