use serde_json::Value;
use uuid::Uuid;

use crate::error::FetchError;
use crate::model::DetailKind;

mod http;

pub use http::{KartonClient, TriageClient};

pub trait ReportSource {
    fn fetch_report(&self, submission_id: &str) -> Result<Value, FetchError>;
}

pub trait TriageSource {
    fn fetch_detail(&self, triage_id: &str, kind: DetailKind) -> Result<Value, FetchError>;
}

impl<T: ReportSource + ?Sized> ReportSource for &T {
    fn fetch_report(&self, submission_id: &str) -> Result<Value, FetchError> {
        (**self).fetch_report(submission_id)
    }
}

impl<T: TriageSource + ?Sized> TriageSource for &T {
    fn fetch_detail(&self, triage_id: &str, kind: DetailKind) -> Result<Value, FetchError> {
        (**self).fetch_detail(triage_id, kind)
    }
}

/// Submission ids are canonical lowercase, hyphenated version 4 UUIDs.
pub fn is_valid_submission_id(candidate: &str) -> bool {
    match Uuid::parse_str(candidate) {
        Ok(parsed) => {
            parsed.get_version_num() == 4 && parsed.hyphenated().to_string() == candidate
        }
        Err(_) => false,
    }
}
