use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::AppError;

/// Pushes a stored file to remote storage. Best effort: failures are
/// reported to the caller but never undo the local record.
#[async_trait]
pub trait CloudUploader: Send + Sync {
    /// Returns the remote id of the uploaded file.
    async fn upload(
        &self,
        file_path: &Path,
        folder: &str,
        employee: &str,
    ) -> Result<String, AppError>;
}

/// Used when no upload endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUploader;

#[async_trait]
impl CloudUploader for NoopUploader {
    async fn upload(&self, file_path: &Path, folder: &str, _: &str) -> Result<String, AppError> {
        debug!(file = %file_path.display(), folder, "Upload skipped, no endpoint configured");
        Ok(String::new())
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

/// POSTs file bytes to `<endpoint>/<folder>/<file name>`.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    endpoint: String,
    token: Option<String>,
    max_attempts: u32,
    client: reqwest::Client,
}

impl HttpUploader {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        HttpUploader {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token,
            max_attempts: 3,
            client,
        }
    }

    fn headers(&self, employee: &str) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| AppError::UploadFailure(format!("invalid auth header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        let owner = HeaderValue::from_str(employee)
            .map_err(|e| AppError::UploadFailure(format!("invalid employee header: {e}")))?;
        headers.insert("X-Employee", owner);
        Ok(headers)
    }
}

#[async_trait]
impl CloudUploader for HttpUploader {
    #[instrument(name = "cloud_upload", skip(self, file_path), fields(file = %file_path.display()))]
    async fn upload(
        &self,
        file_path: &Path,
        folder: &str,
        employee: &str,
    ) -> Result<String, AppError> {
        let name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::UploadFailure("file has no name".into()))?;
        let bytes = actix_web::rt::task::spawn_blocking({
            let path = file_path.to_path_buf();
            move || std::fs::read(path)
        })
        .await
        .map_err(|e| AppError::UploadFailure(e.to_string()))?
        .map_err(|e| AppError::UploadFailure(format!("cannot read {name}: {e}")))?;

        let url = format!("{}/{}/{}", self.endpoint, folder.trim_matches('/'), name);
        let headers = self.headers(employee)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .post(&url)
                .headers(headers.clone())
                .body(bytes.clone())
                .send()
                .await;

            let failure = match result {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<UploadResponse>()
                        .await
                        .map(|r| r.id)
                        .map_err(|e| AppError::UploadFailure(format!("bad upload response: {e}")));
                }
                Ok(resp) => format!("upload returned {}", resp.status()),
                Err(e) => format!("upload request failed: {e}"),
            };

            if attempt >= self.max_attempts {
                return Err(AppError::UploadFailure(failure));
            }
            warn!(attempt, url = %url, reason = %failure, "Upload attempt failed, retrying");
            actix_web::rt::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
        }
    }
}
