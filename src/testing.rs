use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use crate::error::FetchError;
use crate::model::DetailKind;
use crate::sources::{ReportSource, TriageSource};

#[derive(Default)]
pub struct FakeReports {
    reports: HashMap<String, Value>,
    failing_status: Option<u16>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeReports {
    pub fn with_report(mut self, submission_id: &str, report: Value) -> Self {
        self.reports.insert(submission_id.to_string(), report);
        self
    }

    pub fn failing_with(mut self, status: u16) -> Self {
        self.failing_status = Some(status);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ReportSource for FakeReports {
    fn fetch_report(&self, submission_id: &str) -> Result<Value, FetchError> {
        self.calls.borrow_mut().push(submission_id.to_string());
        if let Some(status) = self.failing_status {
            return Err(FetchError::Status {
                status,
                body: "upstream exploded".to_string(),
            });
        }
        self.reports
            .get(submission_id)
            .cloned()
            .ok_or(FetchError::NotFound)
    }
}

#[derive(Default)]
pub struct FakeTriage {
    details: HashMap<String, Value>,
    pub calls: RefCell<Vec<(String, DetailKind)>>,
}

impl FakeTriage {
    pub fn with_detail(mut self, triage_id: &str, detail: Value) -> Self {
        self.details.insert(triage_id.to_string(), detail);
        self
    }

    pub fn calls_for(&self, triage_id: &str, kind: DetailKind) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|(id, called_kind)| id == triage_id && *called_kind == kind)
            .count()
    }
}

impl TriageSource for FakeTriage {
    fn fetch_detail(&self, triage_id: &str, kind: DetailKind) -> Result<Value, FetchError> {
        self.calls
            .borrow_mut()
            .push((triage_id.to_string(), kind));
        self.details.get(triage_id).cloned().ok_or(FetchError::Status {
            status: 403,
            body: "forbidden".to_string(),
        })
    }
}

pub const SUBMISSION_ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

/// Karton result with a triage record, a yara record, a config and a memdump.
pub fn sample_report() -> Value {
    serde_json::json!({
        "payload_results": {
            "triage": [{
                "created_by": "karton-triage",
                "payload_type": "sample",
                "payload_id": "rootsha",
                "created_at": "2024-05-01T10:00:00",
                "data": {"submission_id": "abc"}
            }],
            "yara": [{
                "created_by": "karton-yara",
                "payload_type": "sample",
                "payload_id": "rootsha",
                "created_at": "2024-05-01T10:00:01",
                "data": {"matches": ["agenttesla_strings"]}
            }],
            "classifier": []
        },
        "payloads": {
            "rootsha": {
                "parent_payload_id": "",
                "payload_type": "sample",
                "created_by": "karton-dashboard",
                "attributes": {
                    "type": ["PE32"],
                    "file-magic": ["PE32 executable (GUI) Intel 80386"],
                    "families": ["agenttesla"]
                }
            },
            "dumpsha": {
                "parent_payload_id": "rootsha",
                "payload_type": "memdump",
                "attributes": {"type": ["dump"]}
            },
            "cfgsha": {
                "parent_payload_id": "rootsha",
                "payload_type": "config",
                "created_by": "karton-config-extractor",
                "attributes": {"type": ["config"], "family": ["agenttesla"]},
                "data": "{\"c2\": [\"smtp://evil.com\"], \"family\": \"agenttesla\"}"
            }
        }
    })
}

pub fn sample_triage_detail() -> Value {
    serde_json::json!({
        "sample": {"sha256": "deadbeef", "completed": "t1", "id": "abc"},
        "analysis": {"score": 10, "tags": ["family:agenttesla", "trojan"]},
        "signatures": [{
            "label": "powershell",
            "name": "Uses PowerShell",
            "score": 5,
            "ttp": ["T1059.001"]
        }],
        "targets": [
            {"iocs": {"domains": ["evil.com", "10.0.0.1.in-addr.arpa"], "ips": ["10.0.0.1"]}},
            {"iocs": {"domains": ["evil.com"], "ips": ["10.0.0.1", "10.0.0.2"]}}
        ]
    })
}

pub fn sample_technique_reference() -> crate::preprocess::TechniqueReference {
    [(
        "T1059.001".to_string(),
        crate::preprocess::TechniqueContext {
            name: "PowerShell".to_string(),
            description: "Adversaries may abuse PowerShell commands and scripts for execution."
                .to_string(),
        },
    )]
    .into_iter()
    .collect()
}

/// Sentences produced for [`sample_triage_detail`] in traversal order.
pub fn expected_triage_sentences() -> Vec<String> {
    [
        "#sha256 deadbeef has an analysis with score 10",
        "#sha256 deadbeef has an analysis with tags family:agenttesla, trojan, ",
        "#sha256 deadbeef with sha256 deadbeef",
        "#sha256 deadbeef with timestamp t1",
        "#sha256 deadbeef with id abc",
        "#sha256 deadbeef has the signature powershell with label powershell",
        "#sha256 deadbeef has the signature powershell with name Uses PowerShell",
        "#sha256 deadbeef has the signature powershell with score 5",
        "#sha256 deadbeef has the signature powershell with ttp T1059.001, ",
        "#sha256 deadbeef with iocs with ips 10.0.0.1, 10.0.0.2, ",
        "#sha256 deadbeef with iocs with domains evil.com, ",
    ]
    .iter()
    .map(|sentence| sentence.to_string())
    .collect()
}
