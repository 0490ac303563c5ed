use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::try_join_all;

use super::model::{ImageRef, Product, ProductDraft, ProductRecord};
use super::store::ProductRepository;
use crate::error::UpsertError;
use crate::media::model::PendingUpload;
use crate::media::uploader::ImageUploader;

const UPLOAD_FOLDER: &str = "product-images";

/// Orders the steps of a product form submission: validate, upload any
/// pending local files, merge image references, write. A submission in
/// flight blocks further submissions (no duplicate writes); pending files
/// are only borrowed, so a failed attempt leaves them selected for retry.
pub struct UpsertSequencer<R, U> {
    repo: R,
    uploader: U,
    in_flight: AtomicBool,
}

impl<R: ProductRepository, U: ImageUploader> UpsertSequencer<R, U> {
    pub fn new(repo: R, uploader: U) -> Self {
        Self { repo, uploader, in_flight: AtomicBool::new(false) }
    }

    pub async fn submit(
        &self,
        draft: &ProductDraft,
        pending: &[PendingUpload],
    ) -> Result<Product, UpsertError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(UpsertError::InFlight);
        }
        let result = self.run(draft, pending).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run(
        &self,
        draft: &ProductDraft,
        pending: &[PendingUpload],
    ) -> Result<Product, UpsertError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(UpsertError::Validation("name is required".to_string()));
        }
        let price = parse_price(&draft.price)?;
        if draft.categories.is_empty() {
            return Err(UpsertError::Validation(
                "at least one category is required".to_string(),
            ));
        }

        // All uploads run concurrently; one failure aborts the whole
        // submission before anything is written.
        let uploaded: Vec<String> = if pending.is_empty() {
            Vec::new()
        } else {
            try_join_all(
                pending
                    .iter()
                    .map(|file| self.uploader.upload(file, UPLOAD_FOLDER)),
            )
            .await?
        };

        let refs = merge_image_refs(&draft.image_refs, &uploaded);
        if refs.is_empty() {
            return Err(UpsertError::Validation(
                "a product needs at least one image".to_string(),
            ));
        }
        let main_image_url = refs
            .iter()
            .find(|r| r.is_main)
            .map(|r| r.url.clone())
            .unwrap_or_else(|| refs[0].url.clone());

        let record = ProductRecord {
            name: name.to_string(),
            description: draft.description.trim().to_string(),
            price,
            categories: draft.categories.clone(),
            main_image_url,
            image_urls: refs.into_iter().map(|r| r.url).collect(),
            is_active: draft.is_active,
        };

        let saved = match draft.id.as_deref() {
            // Editing: update the existing record in place.
            Some(id) if !id.is_empty() => self.repo.update(id, record).await?,
            // Creating: no client-side placeholder id goes over the wire;
            // the backend assigns one.
            _ => self.repo.create(record).await?,
        };
        tracing::info!("Saved product {}", saved.id);
        Ok(saved)
    }
}

/// Keep the already-valid remote references (with whatever main flag the
/// form set), append freshly uploaded URLs after them, and fall back to
/// "first one is main" when nothing is flagged.
pub fn merge_image_refs(existing: &[ImageRef], uploaded: &[String]) -> Vec<ImageRef> {
    let mut refs: Vec<ImageRef> = existing
        .iter()
        .filter(|r| r.url.starts_with("http"))
        .cloned()
        .collect();
    refs.extend(uploaded.iter().map(|url| ImageRef { url: url.clone(), is_main: false }));

    if !refs.is_empty() && !refs.iter().any(|r| r.is_main) {
        refs[0].is_main = true;
    }
    refs
}

/// The form shows the price formatted ("150.000 ₫"); only the digits carry
/// meaning on the way back.
pub fn parse_price(formatted: &str) -> Result<u64, UpsertError> {
    let digits: String = formatted.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(UpsertError::Validation("price is required".to_string()));
    }
    digits
        .parse()
        .map_err(|_| UpsertError::Validation("price is out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, UploadError};
    use crate::time::DateValue;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct MemoryRepo {
        products: Mutex<HashMap<String, Product>>,
        writes: AtomicUsize,
    }

    impl MemoryRepo {
        fn count(&self) -> usize {
            self.products.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProductRepository for Arc<MemoryRepo> {
        async fn list(&self) -> Result<Vec<Product>, StoreError> {
            Ok(self.products.lock().unwrap().values().cloned().collect())
        }

        async fn get(&self, id: &str) -> Result<Option<Product>, StoreError> {
            Ok(self.products.lock().unwrap().get(id).cloned())
        }

        async fn create(&self, record: ProductRecord) -> Result<Product, StoreError> {
            let id = format!("p{}", self.writes.fetch_add(1, Ordering::SeqCst));
            let product = Product {
                id: id.clone(),
                name: record.name,
                description: record.description,
                price: record.price,
                categories: record.categories,
                main_image_url: record.main_image_url,
                image_urls: record.image_urls,
                is_active: record.is_active,
                insert_date: DateValue::Millis(0),
                update_date: DateValue::Millis(0),
            };
            self.products.lock().unwrap().insert(id, product.clone());
            Ok(product)
        }

        async fn update(&self, id: &str, record: ProductRecord) -> Result<Product, StoreError> {
            let mut products = self.products.lock().unwrap();
            let existing = products.get_mut(id).ok_or(StoreError::NotFound("product"))?;
            existing.name = record.name;
            existing.description = record.description;
            existing.price = record.price;
            existing.categories = record.categories;
            existing.main_image_url = record.main_image_url;
            existing.image_urls = record.image_urls;
            existing.is_active = record.is_active;
            existing.update_date = DateValue::Millis(1);
            Ok(existing.clone())
        }

        async fn delete(&self, id: &str) -> Result<(), StoreError> {
            self.products.lock().unwrap().remove(id);
            Ok(())
        }

        async fn toggle_active(&self, id: &str) -> Result<bool, StoreError> {
            let mut products = self.products.lock().unwrap();
            let existing = products.get_mut(id).ok_or(StoreError::NotFound("product"))?;
            existing.is_active = !existing.is_active;
            Ok(existing.is_active)
        }
    }

    /// Uploader whose n-th call fails; successful calls mint predictable URLs.
    struct FlakyUploader {
        fail_at: Option<usize>,
        calls: AtomicUsize,
    }

    impl FlakyUploader {
        fn ok() -> Self {
            Self { fail_at: None, calls: AtomicUsize::new(0) }
        }

        fn failing_at(n: usize) -> Self {
            Self { fail_at: Some(n), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ImageUploader for FlakyUploader {
        async fn upload(&self, file: &PendingUpload, folder: &str) -> Result<String, UploadError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(call) {
                return Err(UploadError {
                    file_name: file.file_name.clone(),
                    reason: "connection reset".to_string(),
                });
            }
            Ok(format!("https://cdn.example/{}/{}", folder, file.file_name))
        }
    }

    /// Uploader that signals when entered and then parks until released,
    /// so a test can hold a submission open.
    struct GatedUploader {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl ImageUploader for GatedUploader {
        async fn upload(&self, file: &PendingUpload, folder: &str) -> Result<String, UploadError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(format!("https://cdn.example/{}/{}", folder, file.file_name))
        }
    }

    fn draft(name: &str, price: &str) -> ProductDraft {
        ProductDraft {
            id: None,
            name: name.to_string(),
            description: "  a bouquet  ".to_string(),
            price: price.to_string(),
            categories: vec!["bouquets".to_string()],
            is_active: true,
            image_refs: Vec::new(),
        }
    }

    fn pending(name: &str) -> PendingUpload {
        PendingUpload {
            file_name: name.to_string(),
            bytes: vec![1, 2, 3],
            preview_url: Some(format!("blob:{}", name)),
        }
    }

    #[tokio::test]
    async fn create_uploads_then_writes() {
        let repo = Arc::new(MemoryRepo::default());
        let seq = UpsertSequencer::new(repo.clone(), FlakyUploader::ok());

        let files = vec![pending("a.jpg"), pending("b.jpg")];
        let saved = seq.submit(&draft("Bó hoa", "150.000 ₫"), &files).await.unwrap();

        assert_eq!(saved.price, 150_000);
        assert_eq!(saved.description, "a bouquet");
        assert_eq!(saved.image_urls.len(), 2);
        // No main was flagged, so the first merged reference becomes main.
        assert_eq!(saved.main_image_url, saved.image_urls[0]);
        assert_eq!(repo.count(), 1);
    }

    #[tokio::test]
    async fn failed_upload_means_no_write_and_files_stay_pending() {
        // Scenario: two pending files, the second transfer rejects.
        let repo = Arc::new(MemoryRepo::default());
        let seq = UpsertSequencer::new(repo.clone(), FlakyUploader::failing_at(1));

        let files = vec![pending("a.jpg"), pending("b.jpg")];
        let err = seq.submit(&draft("Bó hoa", "120.000 ₫"), &files).await.unwrap_err();

        assert!(matches!(err, UpsertError::Upload(_)));
        assert_eq!(repo.count(), 0, "no document write may happen");
        // The caller still owns both files untouched and can resubmit.
        assert_eq!(files.len(), 2);

        let retried = seq.submit(&draft("Bó hoa", "120.000 ₫"), &files).await;
        assert!(retried.is_ok(), "resubmission after a failed batch must work");
    }

    #[tokio::test]
    async fn existing_main_flag_survives_the_merge() {
        let repo = Arc::new(MemoryRepo::default());
        let seq = UpsertSequencer::new(repo.clone(), FlakyUploader::ok());

        let mut d = draft("Bó hoa", "90.000");
        d.image_refs = vec![
            ImageRef { url: "https://cdn.example/old1.jpg".to_string(), is_main: false },
            ImageRef { url: "https://cdn.example/old2.jpg".to_string(), is_main: true },
        ];
        let saved = seq.submit(&d, &[pending("new.jpg")]).await.unwrap();

        assert_eq!(saved.main_image_url, "https://cdn.example/old2.jpg");
        assert_eq!(saved.image_urls.len(), 3);
    }

    #[tokio::test]
    async fn update_goes_to_the_existing_identifier() {
        let repo = Arc::new(MemoryRepo::default());
        let seq = UpsertSequencer::new(repo.clone(), FlakyUploader::ok());

        let created = seq.submit(&draft("Bó hoa", "100"), &[pending("a.jpg")]).await.unwrap();

        let mut edit = draft("Bó hoa mới", "200");
        edit.id = Some(created.id.clone());
        edit.image_refs = vec![ImageRef { url: created.main_image_url.clone(), is_main: true }];
        let updated = seq.submit(&edit, &[]).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Bó hoa mới");
        assert_eq!(repo.count(), 1, "an edit must not create a second record");
    }

    #[tokio::test]
    async fn no_images_at_all_is_a_validation_error() {
        let repo = Arc::new(MemoryRepo::default());
        let seq = UpsertSequencer::new(repo.clone(), FlakyUploader::ok());

        let err = seq.submit(&draft("Bó hoa", "100"), &[]).await.unwrap_err();
        assert!(matches!(err, UpsertError::Validation(_)));
        assert_eq!(repo.count(), 0);
    }

    #[tokio::test]
    async fn invalid_form_aborts_before_any_side_effect() {
        let repo = Arc::new(MemoryRepo::default());
        let uploader = FlakyUploader::ok();
        let seq = UpsertSequencer::new(repo.clone(), uploader);

        let err = seq.submit(&draft("   ", "100"), &[pending("a.jpg")]).await.unwrap_err();
        assert!(matches!(err, UpsertError::Validation(_)));
        assert_eq!(seq.uploader.calls.load(Ordering::SeqCst), 0, "nothing may upload");

        let err = seq.submit(&draft("ok", "abc"), &[pending("a.jpg")]).await.unwrap_err();
        assert!(matches!(err, UpsertError::Validation(_)));
    }

    #[tokio::test]
    async fn second_submission_while_one_is_outstanding_is_suppressed() {
        let repo = Arc::new(MemoryRepo::default());
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let uploader = GatedUploader { entered: entered.clone(), release: release.clone() };
        let seq = Arc::new(UpsertSequencer::new(repo.clone(), uploader));

        let first = {
            let seq = seq.clone();
            tokio::spawn(async move {
                seq.submit(&draft("Bó hoa", "100"), &[pending("a.jpg")]).await
            })
        };

        // Wait until the first submission is provably inside the upload step.
        entered.notified().await;
        let err = seq.submit(&draft("Another", "200"), &[]).await.unwrap_err();
        assert!(matches!(err, UpsertError::InFlight));

        release.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(repo.count(), 1);
    }

    #[test]
    fn price_parsing_strips_formatting() {
        assert_eq!(parse_price("150.000 ₫").unwrap(), 150_000);
        assert_eq!(parse_price("1,200,500").unwrap(), 1_200_500);
        assert!(matches!(parse_price(""), Err(UpsertError::Validation(_))));
        assert!(matches!(parse_price("₫ -"), Err(UpsertError::Validation(_))));
    }

    #[test]
    fn merge_drops_non_http_refs_and_defaults_main() {
        let existing = vec![
            ImageRef { url: String::new(), is_main: false },
            ImageRef { url: "https://cdn.example/kept.jpg".to_string(), is_main: false },
        ];
        let uploaded = vec!["https://cdn.example/new.jpg".to_string()];
        let merged = merge_image_refs(&existing, &uploaded);
        assert_eq!(merged.len(), 2);
        assert!(merged[0].is_main);
        assert_eq!(merged[0].url, "https://cdn.example/kept.jpg");
    }
}
