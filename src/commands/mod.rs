pub mod forget;
pub mod naturalize;
pub mod normalize;
pub mod process;
pub mod status;

use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{CacheArgs, UpstreamArgs};
use crate::config::PipelineConfig;
use crate::model::DetailKind;
use crate::preprocess::{Enricher, Naturalizer, Section, TechniqueReference};

fn pipeline_config(cache: &CacheArgs, upstream: &UpstreamArgs) -> PipelineConfig {
    PipelineConfig {
        karton_result_api_url: upstream.karton_result_api_url.clone(),
        triage_url: upstream.triage_url.clone(),
        triage_api_key: upstream.triage_api_key.clone(),
        request_timeout: Duration::from_secs(upstream.timeout_secs),
        cache_db_path: cache.resolved_db_path(),
        ttp_context_path: upstream
            .ttp_context_path
            .clone()
            .unwrap_or_else(|| cache.default_ttp_context_path()),
        record_detail_kind: if upstream.rich_triage {
            DetailKind::Report
        } else {
            DetailKind::Overview
        },
    }
}

fn build_enricher(config: &PipelineConfig) -> Result<Enricher> {
    let reference = TechniqueReference::load(&config.ttp_context_path)?;
    Enricher::new(Arc::new(reference))
}

fn build_naturalizer(upstream: &UpstreamArgs) -> Naturalizer {
    let sections = upstream
        .sections
        .iter()
        .map(|&section| Section::from(section))
        .collect();
    Naturalizer::with_sections(sections)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut out, value).context("failed to write json to stdout")?;
    writeln!(out).context("failed to write to stdout")?;
    out.flush().context("failed to flush stdout")
}

fn print_sentences(sentences: &[String]) -> Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    for sentence in sentences {
        writeln!(out, "{sentence}").context("failed to write to stdout")?;
    }
    out.flush().context("failed to flush stdout")
}
