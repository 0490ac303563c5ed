use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

use super::model::PendingUpload;
use crate::error::UploadError;

/// One binary file plus a destination folder hint in, a durable public
/// URL out. The sequencers only know this seam; tests swap in fakes.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, file: &PendingUpload, folder: &str) -> Result<String, UploadError>;
}

#[derive(Clone)]
pub struct S3ImageUploader {
    client: S3Client,
    bucket: String,
}

impl S3ImageUploader {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }
}

#[async_trait]
impl ImageUploader for S3ImageUploader {
    async fn upload(&self, file: &PendingUpload, folder: &str) -> Result<String, UploadError> {
        // Millisecond prefix keeps keys unique across same-named files,
        // matching how the storefront always named its storage refs.
        let key = format!(
            "{}/{}_{}",
            folder,
            chrono::Utc::now().timestamp_millis(),
            file.file_name
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type_for(&file.file_name))
            .body(ByteStream::from(file.bytes.clone()))
            .send()
            .await
            .map_err(|e| UploadError {
                file_name: file.file_name.clone(),
                reason: format!("S3 put_object error: {}", e),
            })?;

        tracing::info!("Uploaded {} ({} bytes)", key, file.bytes.len());
        Ok(format!("https://{}.s3.amazonaws.com/{}", self.bucket, key))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "svg" => "image/svg+xml",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for("a.PNG"), "image/png");
        assert_eq!(content_type_for("b.jpg"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "image/jpeg");
    }
}
