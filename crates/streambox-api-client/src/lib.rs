//! HTTP client for the Streambox ingestion API.
//!
//! Covers login, single and batch video uploads with streamed bodies, and the
//! read endpoints. The folder uploader drives uploads through the
//! [`submission`] loop.

pub mod submission;

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streambox_core::models::{BatchItemMetadata, BatchUploadResponse, MediaAssetResponse};
use tokio_util::io::ReaderStream;

pub use submission::{
    BatchItem, ItemStatus, SubmissionLoop, SubmissionObserver, SubmissionPolicy,
    SubmissionSummary, Submitter, TracingObserver,
};

/// Path of the login endpoint, relative to the API base URL.
pub const LOGIN_PATH: &str = "/auth/login";

/// Called with `(bytes_sent, bytes_total)` while a request body streams.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// No credentials; only the login endpoint accepts this.
    Anonymous,
    /// `Authorization: Bearer {token}`
    Bearer(String),
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

/// One video to send, with its optional sibling thumbnail.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub path: PathBuf,
    pub content_type: String,
    pub thumbnail: Option<PathBuf>,
    pub title: String,
    pub description: String,
    pub genre: Option<String>,
}

impl VideoUpload {
    /// File name shown in progress and summaries.
    pub fn filename(&self) -> String {
        file_name_of(&self.path)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string()
}

fn image_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// HTTP client for the ingestion API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    /// `base_url` is the API root, e.g. `http://localhost:4000/api/v0`.
    pub fn new(base_url: String, auth: Auth) -> Result<Self> {
        // Uploads of large videos are bounded by the server, not by a client timeout.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Exchange admin credentials for a token and return an authenticated client.
    pub async fn login(base_url: String, email: &str, password: &str) -> Result<Self> {
        let anonymous = Self::new(base_url, Auth::Anonymous)?;
        let response: LoginResponse = anonymous
            .post_json(LOGIN_PATH, &LoginRequest { email, password })
            .await
            .context("Authentication failed")?;

        let token = response
            .token
            .filter(|t| !t.trim().is_empty())
            .context("Authentication failed: no token received")?;

        Ok(Self {
            auth: Auth::Bearer(token),
            ..anonymous
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Anonymous => request,
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
        }
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut request = self.apply_auth(self.client.get(self.build_url(path)));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        Self::parse_response(response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.apply_auth(self.client.post(self.build_url(path)).json(body));
        let response = request.send().await.context("Failed to send request")?;
        Self::parse_response(response).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let request = self.apply_auth(self.client.post(self.build_url(path)).multipart(form));
        let response = request.send().await.context("Failed to send request")?;
        Self::parse_response(response).await
    }

    /// Upload one video (and its thumbnail) to `POST /videos`.
    ///
    /// File bodies are streamed from disk; `progress` receives the running
    /// byte count across both files.
    pub async fn upload_video(
        &self,
        upload: &VideoUpload,
        progress: Option<ProgressFn>,
    ) -> Result<MediaAssetResponse> {
        let thumbnail_len = match &upload.thumbnail {
            Some(path) => file_len(path).await?,
            None => 0,
        };
        let total = file_len(&upload.path).await? + thumbnail_len;
        let sent = Arc::new(AtomicU64::new(0));

        let video = streamed_part(
            &upload.path,
            &upload.content_type,
            total,
            sent.clone(),
            progress.clone(),
        )
        .await?;

        let mut form = Form::new()
            .part("video", video)
            .text("title", upload.title.clone())
            .text("description", upload.description.clone());
        if let Some(genre) = &upload.genre {
            form = form.text("genre", genre.clone());
        }
        if let Some(path) = &upload.thumbnail {
            let thumbnail =
                streamed_part(path, image_content_type(path), total, sent, progress).await?;
            form = form.part("thumbnail", thumbnail);
        }

        self.post_multipart("/videos", form).await
    }

    /// Upload several videos in one `POST /videos/batch` request.
    pub async fn upload_batch(&self, uploads: &[VideoUpload]) -> Result<BatchUploadResponse> {
        let mut form = Form::new();
        let mut metadata = Vec::with_capacity(uploads.len());
        let mut thumbnails = 0usize;

        for upload in uploads {
            let len = file_len(&upload.path).await?;
            let video =
                streamed_part(&upload.path, &upload.content_type, len, Default::default(), None)
                    .await?;
            form = form.part("videos", video);

            let thumbnail_index = match &upload.thumbnail {
                Some(path) => {
                    let len = file_len(path).await?;
                    let part = streamed_part(
                        path,
                        image_content_type(path),
                        len,
                        Default::default(),
                        None,
                    )
                    .await?;
                    form = form.part("thumbnails", part);
                    thumbnails += 1;
                    Some(thumbnails - 1)
                }
                None => None,
            };

            metadata.push(BatchItemMetadata {
                title: upload.title.clone(),
                description: Some(upload.description.clone()),
                genre: upload.genre.clone(),
                thumbnail_index,
            });
        }

        let metadata =
            serde_json::to_string(&metadata).context("Failed to encode batch metadata")?;
        form = form.text("metadata", metadata);

        self.post_multipart("/videos/batch", form).await
    }

    /// Most recent assets, newest first.
    pub async fn list_videos(&self, limit: Option<u32>) -> Result<Vec<MediaAssetResponse>> {
        let query: Vec<(&str, String)> = limit
            .map(|l| vec![("limit", l.to_string())])
            .unwrap_or_default();
        self.get("/videos", &query).await
    }

    pub async fn get_video(&self, id: &str) -> Result<MediaAssetResponse> {
        self.get(&format!("/videos/{}", urlencoding::encode(id)), &[])
            .await
    }
}

async fn file_len(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(metadata.len())
}

/// Multipart part whose body streams the file and reports progress.
async fn streamed_part(
    path: &Path,
    content_type: &str,
    total: u64,
    sent: Arc<AtomicU64>,
    progress: Option<ProgressFn>,
) -> Result<Part> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let len = file
        .metadata()
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?
        .len();

    let stream = ReaderStream::new(file).inspect(move |chunk| {
        if let Ok(bytes) = chunk {
            let so_far = sent.fetch_add(bytes.len() as u64, Ordering::Relaxed) + bytes.len() as u64;
            if let Some(report) = &progress {
                report(so_far, total);
            }
        }
    });

    Part::stream_with_length(reqwest::Body::wrap_stream(stream), len)
        .file_name(file_name_of(path))
        .mime_str(content_type)
        .context("Invalid content type")
}
