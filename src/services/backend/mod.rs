//! Transport to the indexing backend.
//!
//! Three request kinds, all routed under `{base}/{mode}/videos`: submit a
//! video (multipart), fetch job status, run a search.

mod client;
mod error;
mod types;

pub use client::HttpTransport;
pub use error::{extract_detail, TransportError};
pub use types::{Asset, SearchRequest, SearchResponse, StatusReport, SubmitResponse};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::AudioSettings;
use crate::kernel::session::{JobId, JobMode};

/// Upload progress sink, called with a percentage in 0..=100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Upload an asset and start a job. `audio` is only sent for AUDIO jobs.
    async fn submit(
        &self,
        mode: JobMode,
        asset: &Asset,
        audio: Option<&AudioSettings>,
        progress: ProgressFn,
    ) -> Result<JobId, TransportError>;

    async fn fetch_status(&self, mode: JobMode, job_id: &JobId) -> Result<StatusReport, TransportError>;

    async fn search(
        &self,
        mode: JobMode,
        job_id: &JobId,
        request: &SearchRequest,
    ) -> Result<SearchResponse, TransportError>;
}
