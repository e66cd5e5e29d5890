use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use super::Preprocessor;
use crate::error::PipelineError;
use crate::model::{
    CanonicalStructure, ConfigRecord, DetailKind, Hierarchy, HierarchyNode, Iocs, ResultRecord,
    TriageDetail,
};
use crate::sources::TriageSource;

const TRIAGE_PRODUCER: &str = "triage";
const PRODUCER_PREFIX: &str = "karton-";
const MAX_KEPT_INDICATORS: usize = 10;
const MAX_INDICATOR_CHARS: usize = 500;
const REVERSE_DNS_SUFFIXES: [&str; 2] = ["in-addr.arpa", "ip6.arpa"];

pub struct ReportNormalizer<T> {
    triage: T,
    record_detail_kind: DetailKind,
}

impl<T: TriageSource> ReportNormalizer<T> {
    pub fn new(triage: T, record_detail_kind: DetailKind) -> Self {
        Self {
            triage,
            record_detail_kind,
        }
    }

    fn normalize_results(
        &self,
        run: &mut NormalizeRun<'_, T>,
        payload_results: &Map<String, Value>,
    ) -> Result<BTreeMap<String, Vec<ResultRecord>>, PipelineError> {
        let mut results = BTreeMap::new();

        for (producer, entries) in payload_results {
            let Some(entries) = entries.as_array() else {
                warn!(producer = %producer, "payload result is not a list, skipping");
                continue;
            };
            if entries.is_empty() {
                continue;
            }

            let mut records = Vec::with_capacity(entries.len());
            for entry in entries {
                records.push(self.shape_record(run, producer, entry)?);
            }
            results.insert(producer.clone(), records);
        }

        Ok(results)
    }

    fn shape_record(
        &self,
        run: &mut NormalizeRun<'_, T>,
        producer_key: &str,
        entry: &Value,
    ) -> Result<ResultRecord, PipelineError> {
        let created_by = str_field(entry, "created_by");
        let producer = if created_by.is_empty() {
            producer_key
        } else {
            created_by
        };
        let producer = producer.strip_prefix(PRODUCER_PREFIX).unwrap_or(producer);

        let mut record = ResultRecord {
            payload_type: str_field(entry, "payload_type").to_string(),
            producer: producer.to_string(),
            payload_id: str_field(entry, "payload_id").to_string(),
            timestamp: str_field(entry, "created_at").to_string(),
            data: Value::Object(Map::new()),
        };

        if record.producer == TRIAGE_PRODUCER {
            let triage_id = entry
                .pointer("/data/submission_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty());
            match triage_id {
                Some(triage_id) => {
                    let detail = run.detail(triage_id, self.record_detail_kind);
                    record.data = serde_json::to_value(detail)?;
                    run.note_triage_id(triage_id);
                }
                None => error!(
                    payload_id = %record.payload_id,
                    "failed to extract submission id from triage result entry"
                ),
            }
        } else if let Some(data) = entry.get("data") {
            record.data = data.clone();
        }

        Ok(record)
    }
}

impl<T: TriageSource> Preprocessor for ReportNormalizer<T> {
    type Input = Value;
    type Output = CanonicalStructure;

    fn process(&self, raw: Value) -> Result<CanonicalStructure, PipelineError> {
        let payload_results = required_object(&raw, "payload_results")?;
        let payloads = required_object(&raw, "payloads")?;

        info!(count = payloads.len(), "building payload hierarchy");
        let (hierarchy, configs) = build_hierarchy(payloads)?;

        let mut run = NormalizeRun::new(&self.triage);
        info!(count = payload_results.len(), "processing payload results");
        let results = self.normalize_results(&mut run, payload_results)?;

        let triage_ids = std::mem::take(&mut run.triage_ids);
        let mut triage_results = BTreeMap::new();
        for triage_id in triage_ids {
            let detail = run.detail(&triage_id, DetailKind::Report);
            triage_results.insert(triage_id, detail);
        }

        info!(
            nodes = hierarchy.nodes.len() + 1,
            producers = results.len(),
            configs = configs.len(),
            triage_results = triage_results.len(),
            "normalized report"
        );

        Ok(CanonicalStructure {
            hierarchy,
            results,
            configs,
            triage_results,
        })
    }
}

struct NormalizeRun<'a, T> {
    triage: &'a T,
    fetched: HashMap<(String, DetailKind), TriageDetail>,
    triage_ids: Vec<String>,
}

impl<'a, T: TriageSource> NormalizeRun<'a, T> {
    fn new(triage: &'a T) -> Self {
        Self {
            triage,
            fetched: HashMap::new(),
            triage_ids: Vec::new(),
        }
    }

    fn note_triage_id(&mut self, triage_id: &str) {
        if !self.triage_ids.iter().any(|seen| seen == triage_id) {
            self.triage_ids.push(triage_id.to_string());
        }
    }

    fn detail(&mut self, triage_id: &str, kind: DetailKind) -> TriageDetail {
        let key = (triage_id.to_string(), kind);
        if let Some(detail) = self.fetched.get(&key) {
            return detail.clone();
        }

        let detail = match self.triage.fetch_detail(triage_id, kind) {
            Ok(document) => parse_triage_detail(&document, kind),
            Err(err) => {
                error!(
                    triage_id,
                    kind = kind.as_str(),
                    error = %err,
                    "failed to retrieve triage detail"
                );
                TriageDetail::default()
            }
        };
        self.fetched.insert(key, detail.clone());
        detail
    }
}

fn required_object<'a>(
    raw: &'a Value,
    key: &str,
) -> Result<&'a Map<String, Value>, PipelineError> {
    raw.get(key)
        .and_then(Value::as_object)
        .filter(|entries| !entries.is_empty())
        .ok_or_else(|| PipelineError::MalformedReport(format!("missing or empty `{key}`")))
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Karton attributes are usually lists; a single string is accepted as well.
fn attribute_text(attributes: Option<&Value>, key: &str) -> String {
    match attributes.and_then(|attrs| attrs.get(key)) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<&str>>()
            .join(", "),
        _ => String::new(),
    }
}

pub(super) fn build_hierarchy(
    payloads: &Map<String, Value>,
) -> Result<(Hierarchy, BTreeMap<String, ConfigRecord>), PipelineError> {
    let roots: Vec<(&String, &Value)> = payloads
        .iter()
        .filter(|(_, payload)| {
            payload.get("parent_payload_id").and_then(Value::as_str) == Some("")
        })
        .collect();

    let (root_hash, root_payload) = match roots.as_slice() {
        [only] => *only,
        [] => {
            return Err(PipelineError::Structural(
                "no payload without a parent, cannot locate the hierarchy root".to_string(),
            ));
        }
        many => {
            let candidates = many
                .iter()
                .map(|(hash, _)| hash.as_str())
                .collect::<Vec<&str>>()
                .join(", ");
            return Err(PipelineError::Structural(format!(
                "{} root payload candidates: {candidates}",
                many.len()
            )));
        }
    };

    let mut root = hierarchy_node(root_payload);
    root.sha256 = Some(root_hash.clone());

    let mut nodes = BTreeMap::new();
    let mut configs = BTreeMap::new();
    let mut edges = Vec::new();

    for (hash, payload) in payloads {
        if hash == root_hash {
            continue;
        }
        let payload_type = str_field(payload, "payload_type");
        if payload_type.is_empty() || payload_type == "memdump" {
            continue;
        }

        nodes.insert(hash.clone(), hierarchy_node(payload));
        if payload_type == "config" {
            configs.insert(hash.clone(), parse_config(payload));
        }
        edges.push((hash.clone(), str_field(payload, "parent_payload_id")));
    }

    // Linking happens after every node exists, so map order cannot drop edges.
    for (hash, parent) in edges {
        if parent == root_hash.as_str() {
            root.children.push(hash);
        } else if let Some(node) = nodes.get_mut(parent) {
            node.children.push(hash);
        } else {
            error!(payload = %hash, parent = %parent, "failed to find parent payload");
        }
    }

    Ok((Hierarchy { root, nodes }, configs))
}

fn hierarchy_node(payload: &Value) -> HierarchyNode {
    let attributes = payload.get("attributes");
    let families = attributes
        .and_then(|attrs| attrs.get("families"))
        .and_then(Value::as_array)
        .filter(|families| !families.is_empty())
        .cloned();

    HierarchyNode {
        created_by: str_field(payload, "created_by").to_string(),
        file_magic: attribute_text(attributes, "file-magic"),
        node_type: attribute_text(attributes, "type"),
        families,
        children: Vec::new(),
        sha256: None,
    }
}

pub(super) fn parse_config(payload: &Value) -> ConfigRecord {
    let attributes = payload.get("attributes");

    let mut family = attribute_text(attributes, "family");
    if family.is_empty() {
        family = attributes
            .and_then(|attrs| attrs.get("families"))
            .and_then(Value::as_array)
            .and_then(|families| families.first())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }
    let vetted = payload
        .get("vetted")
        .or_else(|| attributes.and_then(|attrs| attrs.get("vetted")))
        .cloned()
        .unwrap_or(Value::Bool(false));

    let mut fields = Map::new();
    fields.insert("family".to_string(), Value::String(family));
    fields.insert(
        "type".to_string(),
        Value::String(attribute_text(attributes, "type")),
    );
    fields.insert("vetted".to_string(), vetted);
    fields.insert(
        "created_by".to_string(),
        Value::String(str_field(payload, "created_by").to_string()),
    );

    let body = ["data", "content", "config"]
        .iter()
        .find_map(|key| payload.get(*key))
        .map(decode_config_body);

    match body {
        Some(Value::Object(decoded)) => {
            for (key, value) in decoded {
                fields.insert(key, value);
            }
        }
        Some(raw) => {
            fields.insert("data".to_string(), raw);
        }
        None => {}
    }

    ConfigRecord(fields)
}

/// Config bodies may arrive JSON-encoded inside a string.
fn decode_config_body(body: &Value) -> Value {
    match body {
        Value::String(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
        }
        other => other.clone(),
    }
}

pub(super) fn parse_triage_detail(document: &Value, kind: DetailKind) -> TriageDetail {
    let sample = document.get("sample").unwrap_or(&Value::Null);
    let signatures = document
        .get("signatures")
        .and_then(Value::as_array)
        .map(|signatures| match kind {
            DetailKind::Overview => signatures.clone(),
            DetailKind::Report => signatures.iter().map(prune_signature).collect(),
        })
        .unwrap_or_default();

    TriageDetail {
        analysis: document
            .get("analysis")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        sha256: str_field(sample, "sha256").to_string(),
        timestamp: str_field(sample, "completed").to_string(),
        id: str_field(sample, "id").to_string(),
        signatures: Some(signatures),
        iocs: Some(collect_iocs(document)),
    }
}

fn prune_signature(signature: &Value) -> Value {
    let mut signature = signature.clone();
    let Some(indicators) = signature
        .get_mut("indicators")
        .and_then(Value::as_array_mut)
    else {
        return signature;
    };

    let is_rule_match = indicators
        .iter()
        .any(|indicator| indicator.get("yara_rule").is_some());

    if indicators.len() > MAX_KEPT_INDICATORS || is_rule_match {
        indicators.clear();
    } else {
        for indicator in indicators.iter_mut() {
            truncate_strings(indicator);
        }
    }

    signature
}

fn truncate_strings(value: &mut Value) {
    match value {
        Value::String(text) => {
            if text.chars().count() > MAX_INDICATOR_CHARS {
                *text = text.chars().take(MAX_INDICATOR_CHARS).collect();
            }
        }
        Value::Array(items) => items.iter_mut().for_each(truncate_strings),
        Value::Object(entries) => entries.values_mut().for_each(truncate_strings),
        _ => {}
    }
}

fn collect_iocs(document: &Value) -> Iocs {
    let mut iocs = Iocs::default();
    let targets = document
        .get("targets")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for target in targets {
        let Some(found) = target.get("iocs") else {
            continue;
        };
        for domain in string_list(found, "domains") {
            if !REVERSE_DNS_SUFFIXES.iter().any(|suffix| domain.contains(suffix)) {
                push_unique(&mut iocs.domains, domain);
            }
        }
        for ip in string_list(found, "ips") {
            push_unique(&mut iocs.ips, ip);
        }
        for url in string_list(found, "urls") {
            push_unique(&mut iocs.urls, url);
        }
        for email in string_list(found, "emails") {
            push_unique(&mut iocs.emails, email);
        }
    }

    iocs
}

fn string_list<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a str> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn push_unique(list: &mut Vec<String>, candidate: &str) {
    if !list.iter().any(|existing| existing == candidate) {
        list.push(candidate.to_string());
    }
}
