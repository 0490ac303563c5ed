// Re-export model types and the uploader seam
pub mod http;
pub mod model;
pub mod uploader;

pub use model::{PendingFilePayload, PendingUpload, UploadRequest, UploadResponse};
pub use uploader::{ImageUploader, S3ImageUploader};
pub use http::*;
