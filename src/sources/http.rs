use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use tracing::{debug, info};

use super::{ReportSource, TriageSource};
use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::model::DetailKind;

fn build_client(config: &PipelineConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("failed to build http client")
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

fn read_json(response: Response) -> Result<Value, FetchError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound);
    }
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(FetchError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<Value>()?)
}

pub struct KartonClient {
    base_url: String,
    client: Client,
}

impl KartonClient {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let base_url = config
            .karton_result_api_url
            .clone()
            .context("karton result api url is not set")?;
        Ok(Self {
            base_url,
            client: build_client(config)?,
        })
    }
}

impl ReportSource for KartonClient {
    fn fetch_report(&self, submission_id: &str) -> Result<Value, FetchError> {
        let url = join_url(&self.base_url, &format!("submissions/{submission_id}"));
        debug!(url = %url, "requesting karton result");
        read_json(self.client.get(url).send()?)
    }
}

pub struct TriageClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl TriageClient {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.triage_url.clone(),
            api_key: config.triage_api_key.clone(),
            client: build_client(config)?,
        })
    }
}

impl TriageSource for TriageClient {
    fn fetch_detail(&self, triage_id: &str, kind: DetailKind) -> Result<Value, FetchError> {
        let path = match kind {
            DetailKind::Overview => format!("samples/{triage_id}/overview.json"),
            DetailKind::Report => format!("samples/{triage_id}/behavioral1/report_triage.json"),
        };
        let url = join_url(&self.base_url, &path);
        info!(triage_id, kind = kind.as_str(), "retrieving triage detail");
        read_json(self.client.get(url).bearer_auth(&self.api_key).send()?)
    }
}
