use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracing::{error, info};

use super::Preprocessor;
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TechniqueContext {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct TechniqueReference {
    techniques: HashMap<String, TechniqueContext>,
}

impl TechniqueReference {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("failed to read technique table {}", path.display()))?;
        let techniques: HashMap<String, TechniqueContext> = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse technique table {}", path.display()))?;

        info!(path = %path.display(), count = techniques.len(), "loaded technique table");
        Ok(Self { techniques })
    }

    pub fn get(&self, technique_id: &str) -> Option<&TechniqueContext> {
        self.techniques.get(technique_id)
    }

    pub fn len(&self) -> usize {
        self.techniques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }
}

impl FromIterator<(String, TechniqueContext)> for TechniqueReference {
    fn from_iter<I: IntoIterator<Item = (String, TechniqueContext)>>(iter: I) -> Self {
        Self {
            techniques: iter.into_iter().collect(),
        }
    }
}

pub struct Enricher {
    reference: Arc<TechniqueReference>,
    technique_pattern: Regex,
}

impl Enricher {
    pub fn new(reference: Arc<TechniqueReference>) -> Result<Self> {
        let technique_pattern = Regex::new(r"T\d{4}(?:\.\d{3})?")
            .context("failed to compile technique id regex")?;
        Ok(Self {
            reference,
            technique_pattern,
        })
    }

    pub fn technique_ids(&self, sentences: &[String]) -> BTreeSet<String> {
        sentences
            .iter()
            .flat_map(|sentence| self.technique_pattern.find_iter(sentence))
            .map(|found| found.as_str().to_string())
            .collect()
    }

    fn context_sentences(&self, sentences: &[String]) -> Vec<String> {
        let mut context = Vec::new();
        for technique_id in self.technique_ids(sentences) {
            let Some(technique) = self.reference.get(&technique_id) else {
                error!(technique_id = %technique_id, "no context information found for technique");
                continue;
            };
            context.push(format!(
                "TTP {technique_id} has the name {} and the description {}",
                technique.name, technique.description
            ));
        }
        context
    }
}

impl Preprocessor for Enricher {
    type Input = Vec<String>;
    type Output = Vec<String>;

    fn process(&self, mut sentences: Vec<String>) -> Result<Vec<String>, PipelineError> {
        let context = self.context_sentences(&sentences);
        info!(added = context.len(), "enriched sentences with technique context");
        sentences.extend(context);
        Ok(sentences)
    }
}
