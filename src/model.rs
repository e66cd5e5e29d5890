use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    Overview,
    Report,
}

impl DetailKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Report => "report",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub payload_type: String,
    #[serde(rename = "type")]
    pub producer: String,
    pub payload_id: String,
    pub timestamp: String,
    pub data: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub created_by: String,
    pub file_magic: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub families: Option<Vec<Value>>,
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Payload tree rooted at the submitted sample. Serialized as a single
/// mapping with the root under `"root"` and every other node under its hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub root: HierarchyNode,
    #[serde(flatten)]
    pub nodes: BTreeMap<String, HierarchyNode>,
}

impl Hierarchy {
    #[cfg(test)]
    pub fn get(&self, hash: &str) -> Option<&HierarchyNode> {
        if hash == "root" {
            return Some(&self.root);
        }
        self.nodes.get(hash)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigRecord(pub Map<String, Value>);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Iocs {
    pub ips: Vec<String>,
    pub urls: Vec<String>,
    pub domains: Vec<String>,
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriageDetail {
    pub analysis: Map<String, Value>,
    pub sha256: String,
    pub timestamp: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iocs: Option<Iocs>,
}

impl TriageDetail {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStructure {
    pub hierarchy: Hierarchy,
    pub results: BTreeMap<String, Vec<ResultRecord>>,
    pub configs: BTreeMap<String, ConfigRecord>,
    pub triage_results: BTreeMap<String, TriageDetail>,
}
