use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{extract_detail, TransportError};
use super::types::{Asset, SearchRequest, SearchResponse, StatusReport, SubmitResponse};
use super::{ProgressFn, Transport};
use crate::config::{AudioSettings, ClientConfig};
use crate::kernel::session::{JobId, JobMode};

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    // Uploads get a much longer timeout than polls and searches.
    upload_client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(TransportError::from_reqwest)?;
        let upload_client = Client::builder()
            .timeout(config.upload_timeout())
            .build()
            .map_err(TransportError::from_reqwest)?;

        Ok(Self {
            client,
            upload_client,
            base_url: config.base().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn upload_url(&self, mode: JobMode) -> String {
        format!("{}/{}/videos", self.base_url, mode.path_segment())
    }

    pub fn status_url(&self, mode: JobMode, job_id: &JobId) -> String {
        format!("{}/{}/status", self.upload_url(mode), job_id)
    }

    pub fn search_url(&self, mode: JobMode, job_id: &JobId) -> String {
        format!("{}/{}/search", self.upload_url(mode), job_id)
    }

    pub async fn health(&self) -> Result<(), TransportError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(TransportError::Http {
                status: status.as_u16(),
                detail: extract_detail(&body),
            })
        }
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, TransportError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                detail: extract_detail(&body),
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Streams the asset in fixed chunks, reporting the share handed to the
/// connection so far.
fn progress_body(bytes: Arc<Vec<u8>>, progress: ProgressFn) -> reqwest::Body {
    let total = bytes.len().max(1);
    let chunks: Vec<Vec<u8>> = bytes
        .chunks(UPLOAD_CHUNK_BYTES)
        .map(|chunk| chunk.to_vec())
        .collect();

    let mut sent = 0usize;
    let mut last_reported: Option<u8> = None;
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        let percent = ((sent * 100) / total).min(100) as u8;
        if last_reported != Some(percent) {
            last_reported = Some(percent);
            progress(percent);
        }
        Ok::<_, std::io::Error>(chunk)
    });

    reqwest::Body::wrap_stream(stream)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(
        &self,
        mode: JobMode,
        asset: &Asset,
        audio: Option<&AudioSettings>,
        progress: ProgressFn,
    ) -> Result<JobId, TransportError> {
        if asset.is_empty() {
            return Err(TransportError::InvalidAsset(format!("{} is empty", asset.file_name)));
        }

        info!(
            "Uploading {} ({} bytes) as {} job",
            asset.file_name,
            asset.len(),
            mode
        );

        let part = multipart::Part::stream_with_length(
            progress_body(asset.bytes.clone(), progress),
            asset.len() as u64,
        )
        .file_name(asset.file_name.clone())
        .mime_str(&asset.mime)
        .map_err(|e| TransportError::InvalidAsset(e.to_string()))?;

        let mut form = multipart::Form::new().part("file", part);
        if mode == JobMode::Audio {
            if let Some(settings) = audio {
                form = form
                    .text("language", settings.language.clone())
                    .text("model_size", settings.model_size.as_str());
            }
        }

        let resp = self
            .upload_client
            .post(self.upload_url(mode))
            .multipart(form)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let body: SubmitResponse = Self::decode(resp).await?;
        if body.job_id.trim().is_empty() {
            return Err(TransportError::Decode("empty job_id".to_string()));
        }
        Ok(JobId(body.job_id))
    }

    async fn fetch_status(&self, mode: JobMode, job_id: &JobId) -> Result<StatusReport, TransportError> {
        let resp = self
            .client
            .get(self.status_url(mode, job_id))
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        let report: StatusReport = Self::decode(resp).await?;
        debug!(
            "Status {}: stage={} progress={} ready={}",
            job_id,
            report.stage(),
            report.progress_percent(),
            report.ready
        );
        Ok(report)
    }

    async fn search(
        &self,
        mode: JobMode,
        job_id: &JobId,
        request: &SearchRequest,
    ) -> Result<SearchResponse, TransportError> {
        let resp = self
            .client
            .post(self.search_url(mode, job_id))
            .json(request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        Self::decode(resp).await
    }
}
