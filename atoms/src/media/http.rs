use lambda_http::{http::StatusCode, Body, Error as LambdaError, Response};

use super::model::{PendingFilePayload, UploadRequest, UploadResponse};
use super::uploader::ImageUploader;

/// HTTP Handler: POST /uploads
/// Accepts one base64-encoded file and returns its public URL.
pub async fn upload_handler<U: ImageUploader>(
    uploader: &U,
    body: &[u8],
) -> Result<Response<Body>, LambdaError> {
    let request: UploadRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    let payload = PendingFilePayload {
        file_name: request.file_name,
        data_base64: request.data_base64,
    };
    let file = match payload.decode() {
        Ok(file) => file,
        Err(_) => return bad_request("file data is not valid base64".to_string()),
    };

    match uploader.upload(&file, &request.folder).await {
        Ok(url) => Ok(Response::builder()
            .status(StatusCode::CREATED)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(serde_json::to_string(&UploadResponse { url })?.into())
            .map_err(Box::new)?),
        Err(e) => {
            tracing::error!("Upload failed: {}", e);
            Ok(Response::builder()
                .status(StatusCode::BAD_GATEWAY)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::json!({"error": e.to_string()}).to_string().into())
                .map_err(Box::new)?)
        }
    }
}

fn bad_request(message: String) -> Result<Response<Body>, LambdaError> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}
