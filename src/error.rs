use thiserror::Error;

/// Secondary lookups (triage detail, technique context) never produce one of
/// these; they are logged and the pipeline continues with what it has.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("submission id {0} is unknown upstream and is not a valid UUID")]
    InvalidIdentifier(String),

    #[error("submission {0} not found, the analysis is probably not finished yet")]
    NotFound(String),

    #[error("failed to retrieve submission {submission_id}: {reason}")]
    Upstream {
        submission_id: String,
        reason: String,
    },

    #[error("malformed report: {0}")]
    MalformedReport(String),

    #[error("structural error: {0}")]
    Structural(String),

    #[error("invalid filter pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("resource not found")]
    NotFound,

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cached entry for {0}")]
    NotFound(String),

    #[error("sqlite failure: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode cached sentences: {0}")]
    Encode(#[from] serde_json::Error),
}
