use serde::{Deserialize, Serialize};

use crate::media::model::PendingFilePayload;
use crate::time::DateValue;

// ========== INFO CARD ==========
/// A storefront info card (shipping policy, contact info, ...) shown on
/// product pages in `order` sequence.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InfoCard {
    pub id: String,
    pub image_url: String,
    /// Free-text label identifying the card.
    pub card_type: String,
    pub is_active: bool,
    /// Position in the display sequence; dense 0..n-1 after every save.
    pub order: i64,
    pub update_date: Option<DateValue>,
}

/// One element of the working list in PUT /info-cards. Either an already
/// persisted/uploaded image URL or a pending local file, never both.
#[derive(Debug, Deserialize, Clone)]
pub struct CardEntryPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub pending_file: Option<PendingFilePayload>,
}

/// Body of PUT /info-cards: the whole working list in display order plus
/// the ids removed in the UI since the last load.
#[derive(Debug, Deserialize)]
pub struct SyncCardsRequest {
    pub entries: Vec<CardEntryPayload>,
    #[serde(default)]
    pub deleted_ids: Vec<String>,
}
