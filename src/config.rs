use std::path::PathBuf;
use std::time::Duration;

use crate::model::DetailKind;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub karton_result_api_url: Option<String>,
    pub triage_url: String,
    pub triage_api_key: String,
    pub request_timeout: Duration,
    pub cache_db_path: PathBuf,
    pub ttp_context_path: PathBuf,
    /// Detail form fetched for every triage result record.
    pub record_detail_kind: DetailKind,
}
