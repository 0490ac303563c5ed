use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// A locally-selected file that has not been transferred to blob storage
/// yet. Lives only between selection and a successful upload (or removal);
/// never persisted.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Local preview reference shown in the form while the file is pending.
    pub preview_url: Option<String>,
}

/// Wire form of a pending file inside an upsert request body.
#[derive(Debug, Deserialize, Clone)]
pub struct PendingFilePayload {
    pub file_name: String,
    pub data_base64: String,
}

impl PendingFilePayload {
    pub fn decode(&self) -> Result<PendingUpload, base64::DecodeError> {
        Ok(PendingUpload {
            file_name: self.file_name.clone(),
            bytes: BASE64.decode(&self.data_base64)?,
            preview_url: None,
        })
    }
}

// ========== STANDALONE UPLOAD ==========
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub data_base64: String,
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_folder() -> String {
    "product-images".to_string()
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}
