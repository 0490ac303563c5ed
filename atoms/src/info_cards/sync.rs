use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::try_join_all;

use super::store::InfoCardRepository;
use crate::error::UpsertError;
use crate::media::model::PendingUpload;
use crate::media::uploader::ImageUploader;

const UPLOAD_FOLDER: &str = "info-cards";

/// Image half of a working-list entry: either already durable or still a
/// local file awaiting upload.
#[derive(Debug, Clone)]
pub enum CardSource {
    Remote { url: String },
    Pending(PendingUpload),
}

/// One element of the manager's working list, in display order.
#[derive(Debug, Clone)]
pub struct CardEntry {
    /// Present when the card already exists in the store.
    pub id: Option<String>,
    pub source: CardSource,
    pub card_type: String,
    pub is_active: bool,
}

/// Final persisted shape of an entry; `order` is its index in the working
/// list at save time.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRow {
    pub id: Option<String>,
    pub image_url: String,
    pub card_type: String,
    pub is_active: bool,
    pub order: i64,
}

/// Orders the steps of an info-card list save: upload every pending file
/// (concurrently, any failure aborts before anything is written), then
/// apply removals and upserts as a single atomic batch. A save in flight
/// blocks further submissions, same as the product sequencer. After a
/// successful save `order` is exactly the dense 0..n-1 sequence.
pub struct CardSyncSequencer<R, U> {
    repo: R,
    uploader: U,
    in_flight: AtomicBool,
}

impl<R: InfoCardRepository, U: ImageUploader> CardSyncSequencer<R, U> {
    pub fn new(repo: R, uploader: U) -> Self {
        Self { repo, uploader, in_flight: AtomicBool::new(false) }
    }

    pub async fn submit(
        &self,
        entries: &[CardEntry],
        deleted_ids: &[String],
    ) -> Result<(), UpsertError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(UpsertError::InFlight);
        }
        let result = self.run(entries, deleted_ids).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run(&self, entries: &[CardEntry], deleted_ids: &[String]) -> Result<(), UpsertError> {
        let uploads = entries.iter().enumerate().filter_map(|(index, entry)| {
            if let CardSource::Pending(file) = &entry.source {
                Some(async move {
                    self.uploader
                        .upload(file, UPLOAD_FOLDER)
                        .await
                        .map(|url| (index, url))
                })
            } else {
                None
            }
        });
        let uploaded: HashMap<usize, String> = try_join_all(uploads).await?.into_iter().collect();

        let mut rows = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let image_url = match &entry.source {
                CardSource::Remote { url } if !url.is_empty() => url.clone(),
                CardSource::Remote { .. } => {
                    return Err(UpsertError::Validation(format!(
                        "card at position {} has no image",
                        index
                    )))
                }
                CardSource::Pending(file) => match uploaded.get(&index) {
                    Some(url) => url.clone(),
                    // try_join_all returned, so every pending index is present;
                    // this arm guards against a miswired caller.
                    None => {
                        return Err(UpsertError::Upload(crate::error::UploadError {
                            file_name: file.file_name.clone(),
                            reason: "upload result missing".to_string(),
                        }))
                    }
                },
            };

            rows.push(CardRow {
                id: entry.id.clone(),
                image_url,
                card_type: entry.card_type.clone(),
                is_active: entry.is_active,
                order: index as i64,
            });
        }

        self.repo.apply_batch(deleted_ids, &rows).await?;
        tracing::info!(
            "Synced info cards: {} upserts, {} deletes",
            rows.len(),
            deleted_ids.len()
        );
        Ok(())
    }
}
