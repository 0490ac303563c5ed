use serde::{Deserialize, Serialize};

use crate::media::model::PendingFilePayload;
use crate::time::DateValue;

// ========== PRODUCT ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Smallest currency unit, e.g. whole dong.
    pub price: u64,
    pub categories: Vec<String>,
    pub main_image_url: String,
    pub image_urls: Vec<String>,
    pub is_active: bool,
    pub insert_date: DateValue,
    pub update_date: DateValue,
}

/// One image slot on the edit form: a remote URL plus the main/cover flag.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageRef {
    pub url: String,
    #[serde(default)]
    pub is_main: bool,
}

/// What the admin form submits. Price arrives as the formatted display
/// string ("150.000 ₫"); the sequencer parses it back to a number.
#[derive(Debug, Deserialize, Clone)]
pub struct ProductDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Image references already known to the form (kept across edits).
    #[serde(default)]
    pub image_refs: Vec<ImageRef>,
}

fn default_active() -> bool {
    true
}

/// The fields the store persists. Identifier is deliberately absent:
/// creates let the backend assign one, updates carry it separately.
#[derive(Debug, Serialize, Clone)]
pub struct ProductRecord {
    pub name: String,
    pub description: String,
    pub price: u64,
    pub categories: Vec<String>,
    pub main_image_url: String,
    pub image_urls: Vec<String>,
    pub is_active: bool,
}

/// Body of POST /products and PATCH /products/{id}.
#[derive(Debug, Deserialize)]
pub struct UpsertProductRequest {
    #[serde(flatten)]
    pub draft: ProductDraft,
    #[serde(default)]
    pub pending_files: Vec<PendingFilePayload>,
}
