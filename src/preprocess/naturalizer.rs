use tracing::{debug, error, warn};

use super::Preprocessor;
use crate::error::PipelineError;
use crate::model::CanonicalStructure;
use crate::value::{Node, Scalar};

const VALUE_PLACEHOLDER: &str = "<value>";
const DEFAULT_HEADLINE: &str = "with data ";

/// Identifying fields searched, in order, when a mapping needs a headline.
const HEADLINE_FIELDS: [(&str, &str); 4] = [
    ("sha256", "#sha256 <value> "),
    ("label", "<value> "),
    ("name", "<value> "),
    ("description", "<value> "),
];

const KEY_HEADLINES: [(&str, &str); 3] = [
    ("signatures", "has the signature <value> "),
    ("indicators", "with the indicator <value> "),
    ("analysis", "has an analysis "),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Section {
    Configs,
    Hierarchy,
    Results,
    TriageResults,
}

impl Section {
    pub fn key(self) -> &'static str {
        match self {
            Self::Configs => "configs",
            Self::Hierarchy => "hierarchy",
            Self::Results => "results",
            Self::TriageResults => "triage_results",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Naturalizer {
    sections: Vec<Section>,
}

impl Default for Naturalizer {
    fn default() -> Self {
        Self {
            sections: vec![Section::TriageResults],
        }
    }
}

impl Naturalizer {
    pub fn with_sections(mut sections: Vec<Section>) -> Self {
        if sections.is_empty() {
            return Self::default();
        }
        sections.sort();
        sections.dedup();
        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Missing sections are logged and skipped; the rest are still emitted.
    pub fn naturalize(&self, structure: &Node) -> Vec<String> {
        let mut sentences = Vec::new();

        for section in &self.sections {
            let Some(node) = structure.get(section.key()) else {
                error!(key = section.key(), "naturalize could not find the data for the key");
                continue;
            };
            let emitted = match section {
                Section::Configs => self.naturalize_configs(node),
                Section::Hierarchy => self.naturalize_hierarchy(node),
                Section::Results => self.naturalize_results(node),
                Section::TriageResults => self.naturalize_triage_results(node),
            };
            debug!(key = section.key(), count = emitted.len(), "naturalized section");
            sentences.extend(emitted);
        }

        sentences
    }

    pub fn naturalize_triage_results(&self, triage_results: &Node) -> Vec<String> {
        let Node::Map(entries) = triage_results else {
            warn!("triage results are not a mapping");
            return Vec::new();
        };

        let mut sentences = Vec::new();
        for (triage_id, detail) in entries {
            if is_blank(detail) {
                warn!(triage_id = %triage_id, "skipping empty triage detail");
                continue;
            }
            sentences.extend(self.naturalize_triage_detail(detail));
        }
        sentences
    }

    pub fn naturalize_triage_detail(&self, detail: &Node) -> Vec<String> {
        let mut sentences = Vec::new();
        descend(detail, &search_headline(detail), &mut sentences);
        sentences
    }

    pub fn naturalize_configs(&self, configs: &Node) -> Vec<String> {
        let Node::Map(entries) = configs else {
            warn!("configs are not a mapping");
            return Vec::new();
        };

        let mut sentences = Vec::new();
        for (hash, config) in entries {
            descend(config, &format!("#sha256 {hash} has a config "), &mut sentences);
        }
        sentences
    }

    pub fn naturalize_results(&self, results: &Node) -> Vec<String> {
        let Node::Map(producers) = results else {
            warn!("results are not a mapping");
            return Vec::new();
        };

        let mut sentences = Vec::new();
        for (producer, records) in producers {
            let Node::List(records) = records else {
                continue;
            };
            for record in records {
                let Some(data) = record.get("data") else {
                    continue;
                };
                let payload_id = record
                    .get("payload_id")
                    .and_then(Node::as_text)
                    .unwrap_or("unknown");
                let prefix = format!("The {producer} result for payload {payload_id} ");
                descend(data, &prefix, &mut sentences);
            }
        }
        sentences
    }

    pub fn naturalize_hierarchy(&self, hierarchy: &Node) -> Vec<String> {
        let Node::Map(entries) = hierarchy else {
            warn!("hierarchy is not a mapping");
            return Vec::new();
        };

        let mut sentences = Vec::with_capacity(entries.len() * 2);
        for (key, node) in entries {
            let (label, hash) = if key == "root" {
                let hash = node
                    .get("sha256")
                    .and_then(Node::as_text)
                    .unwrap_or("unknown");
                ("root", hash)
            } else {
                ("child", key.as_str())
            };
            sentences.push(describe_payload(label, hash, node));
            sentences.push(describe_children(label, hash, node, hierarchy));
        }
        sentences
    }
}

impl Preprocessor for Naturalizer {
    type Input = CanonicalStructure;
    type Output = Vec<String>;

    fn process(&self, structure: CanonicalStructure) -> Result<Vec<String>, PipelineError> {
        let tree = Node::from_serialize(&structure)?;
        Ok(self.naturalize(&tree))
    }
}

fn describe_payload(label: &str, hash: &str, node: &Node) -> String {
    let node_type = non_empty_text(node.get("type")).unwrap_or("unknown");
    let mut sentence = format!("The {label} payload {hash} has the type {node_type}");

    if let Some(file_magic) = non_empty_text(node.get("file_magic")) {
        sentence.push_str(&format!(" and the file magic {file_magic}"));
    }
    if let Some(Node::List(families)) = node.get("families") {
        let families = families
            .iter()
            .map(render_leaf)
            .collect::<Vec<String>>()
            .join(", ");
        sentence.push_str(&format!(" and belongs to the families {families}"));
    }

    sentence
}

fn describe_children(label: &str, hash: &str, node: &Node, hierarchy: &Node) -> String {
    let children: Vec<&str> = match node.get("children") {
        Some(Node::List(children)) => children.iter().filter_map(Node::as_text).collect(),
        _ => Vec::new(),
    };

    let noun = if children.len() == 1 { "child" } else { "children" };
    let mut sentence = format!("The {label} payload {hash} has {} {noun}", children.len());
    if children.is_empty() {
        return sentence;
    }

    let mut type_counts: Vec<(&str, usize)> = Vec::new();
    for child in &children {
        let child_type = non_empty_text(hierarchy.get(child).and_then(|node| node.get("type")))
            .unwrap_or("unknown");
        match type_counts.iter_mut().find(|(seen, _)| *seen == child_type) {
            Some((_, count)) => *count += 1,
            None => type_counts.push((child_type, 1)),
        }
    }
    // Stable sort keeps first-encountered order among equal counts.
    type_counts.sort_by(|left, right| right.1.cmp(&left.1));

    let breakdown = type_counts
        .iter()
        .map(|(child_type, count)| format!("{count} of type {child_type}"))
        .collect::<Vec<String>>()
        .join(", ");
    sentence.push_str(": ");
    sentence.push_str(&breakdown);
    sentence
}

fn non_empty_text(node: Option<&Node>) -> Option<&str> {
    node.and_then(Node::as_text).filter(|text| !text.is_empty())
}

pub(super) fn is_leaf(node: &Node) -> bool {
    match node {
        Node::Scalar(_) => true,
        Node::Map(entries) => entries.iter().all(|(_, value)| !value.is_container()),
        Node::List(items) => {
            items.iter().all(|item| !item.is_container())
                || (items.len() == 1 && is_leaf(&items[0]))
        }
    }
}

pub(super) fn render_leaf(node: &Node) -> String {
    match node {
        Node::Scalar(scalar) => scalar.to_string(),
        Node::Map(entries) => entries
            .iter()
            .map(|(key, value)| format!("{key}: {}, ", render_leaf(value)))
            .collect(),
        Node::List(items) if items.len() == 1 && items[0].is_container() => render_leaf(&items[0]),
        Node::List(items) => items
            .iter()
            .map(|item| format!("{}, ", render_leaf(item)))
            .collect(),
    }
}

fn is_blank(node: &Node) -> bool {
    match node {
        Node::Scalar(Scalar::Null) => true,
        Node::Scalar(Scalar::Text(text)) => text.is_empty(),
        Node::Scalar(_) => false,
        Node::List(items) => items.iter().all(is_blank),
        Node::Map(entries) => entries.iter().all(|(_, value)| is_blank(value)),
    }
}

pub(super) fn search_headline(node: &Node) -> String {
    for (field, template) in HEADLINE_FIELDS {
        if let Some(value) = node.get(field) {
            let headline = template.replace(VALUE_PLACEHOLDER, &render_leaf(value));
            debug!(headline = %headline, "found headline");
            return headline;
        }
    }

    warn!("could not find a headline in the data, using default headline");
    DEFAULT_HEADLINE.to_string()
}

pub(super) fn build_headline(node: &Node, key: Option<&str>) -> String {
    let Some(key) = key else {
        return match node {
            Node::Map(_) => "with ".to_string(),
            Node::List(_) => "containing ".to_string(),
            Node::Scalar(_) => "with value ".to_string(),
        };
    };

    match KEY_HEADLINES.iter().find(|(keyword, _)| *keyword == key) {
        Some((_, template)) if template.contains(VALUE_PLACEHOLDER) => {
            template.replace(VALUE_PLACEHOLDER, search_headline(node).trim_end())
        }
        Some((_, template)) => template.to_string(),
        None => format!("with {key} "),
    }
}

pub(super) fn descend(node: &Node, prefix: &str, sentences: &mut Vec<String>) {
    if node.is_empty_container() {
        return;
    }
    if is_leaf(node) {
        sentences.push(format!("{prefix}{}", render_leaf(node)));
        return;
    }

    match node {
        Node::Map(entries) => {
            for (key, value) in entries {
                match value {
                    // Each mapping in a list gets its own headline, even a lone one.
                    Node::List(items) if matches!(items.first(), Some(Node::Map(_))) => {
                        for entry in items {
                            let mut headline = build_headline(entry, Some(key));
                            // Entries without an identifying field continue the parent prefix.
                            if headline.contains(DEFAULT_HEADLINE) {
                                headline.clear();
                            }
                            descend(entry, &format!("{prefix}{headline}"), sentences);
                        }
                    }
                    _ => {
                        let headline = build_headline(value, Some(key));
                        descend(value, &format!("{prefix}{headline}"), sentences);
                    }
                }
            }
        }
        Node::List(items) => {
            for item in items {
                let headline = build_headline(item, None);
                descend(item, &format!("{prefix}{headline}"), sentences);
            }
        }
        Node::Scalar(_) => {}
    }
}
