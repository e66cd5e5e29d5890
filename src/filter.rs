use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "sentences", rename_all = "snake_case")]
pub enum FilterOutcome {
    Matches(Vec<String>),
    NoMatches,
}

impl FilterOutcome {
    pub fn sentences(&self) -> &[String] {
        match self {
            Self::Matches(sentences) => sentences,
            Self::NoMatches => &[],
        }
    }

    #[cfg(test)]
    pub fn into_sentences(self) -> Vec<String> {
        match self {
            Self::Matches(sentences) => sentences,
            Self::NoMatches => Vec::new(),
        }
    }
}

pub fn filter(
    sentences: &[String],
    pattern: &str,
    use_regex: bool,
) -> Result<FilterOutcome, PipelineError> {
    let selected: Vec<String> = if use_regex {
        let regex = Regex::new(pattern).map_err(|source| PipelineError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        sentences
            .iter()
            .filter(|sentence| regex.is_match(sentence))
            .cloned()
            .collect()
    } else {
        let needle = pattern.to_lowercase();
        sentences
            .iter()
            .filter(|sentence| sentence.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    };

    if selected.is_empty() {
        warn!(pattern, use_regex, total = sentences.len(), "filter matched no sentences");
        return Ok(FilterOutcome::NoMatches);
    }
    Ok(FilterOutcome::Matches(selected))
}
