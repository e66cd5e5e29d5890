use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{CacheStore, FreshnessCache};
use crate::error::{FetchError, PipelineError};
use crate::filter::{FilterOutcome, filter};
use crate::model::DetailKind;
use crate::preprocess::{Enricher, Naturalizer, Preprocessor, ReportNormalizer};
use crate::sources::{ReportSource, TriageSource, is_valid_submission_id};

pub struct Pipeline<R, T, S> {
    reports: R,
    normalizer: ReportNormalizer<T>,
    naturalizer: Naturalizer,
    enricher: Enricher,
    cache: FreshnessCache<S>,
}

impl<R, T, S> Pipeline<R, T, S>
where
    R: ReportSource,
    T: TriageSource,
    S: CacheStore,
{
    pub fn new(
        reports: R,
        triage: T,
        store: S,
        naturalizer: Naturalizer,
        enricher: Enricher,
        record_detail_kind: DetailKind,
    ) -> Self {
        Self {
            reports,
            normalizer: ReportNormalizer::new(triage, record_detail_kind),
            naturalizer,
            enricher,
            cache: FreshnessCache::new(store),
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &FreshnessCache<S> {
        &self.cache
    }

    pub fn process(
        &self,
        submission_id: &str,
        pattern: &str,
        use_regex: bool,
        force_recompute: bool,
    ) -> Result<FilterOutcome, PipelineError> {
        let sentences = self.sentences(submission_id, force_recompute)?;
        filter(&sentences, pattern, use_regex)
    }

    pub fn sentences(
        &self,
        submission_id: &str,
        force_recompute: bool,
    ) -> Result<Vec<String>, PipelineError> {
        self.cache
            .get_or_compute(submission_id, force_recompute, || {
                let raw = fetch_raw_report(&self.reports, submission_id)?;
                info!(submission_id, "retrieved karton result");
                self.preprocess(raw)
            })
    }

    pub fn preprocess(&self, raw: Value) -> Result<Vec<String>, PipelineError> {
        let structure = self.normalizer.process(raw)?;
        let sentences = self.naturalizer.process(structure)?;
        self.enricher.process(sentences)
    }
}

/// Fetches a raw report, telling "not finished yet" apart from "wrong id" on 404.
pub fn fetch_raw_report<R: ReportSource>(
    reports: &R,
    submission_id: &str,
) -> Result<Value, PipelineError> {
    match reports.fetch_report(submission_id) {
        Ok(raw) => Ok(raw),
        Err(FetchError::NotFound) if is_valid_submission_id(submission_id) => {
            Err(PipelineError::NotFound(submission_id.to_string()))
        }
        Err(FetchError::NotFound) => {
            warn!(submission_id, "provided id is not a valid UUID");
            Err(PipelineError::InvalidIdentifier(submission_id.to_string()))
        }
        Err(err) => Err(PipelineError::Upstream {
            submission_id: submission_id.to_string(),
            reason: err.to_string(),
        }),
    }
}
