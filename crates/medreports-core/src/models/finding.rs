use std::fmt;

use serde::{Deserialize, Serialize};

/// One interpreted test result, as produced by the response normalizer.
///
/// `status` carries the text the model produced. Structured responses are
/// kept verbatim; labelled-block responses are upper-cased. Use
/// [`Finding::status_kind`] to classify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub explanation: String,
}

fn default_status() -> String {
    FindingStatus::Unknown.as_str().to_string()
}

impl Finding {
    pub fn status_kind(&self) -> FindingStatus {
        FindingStatus::from_label(&self.status).unwrap_or(FindingStatus::Unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingStatus {
    Normal,
    Concerning,
    Abnormal,
    Unknown,
}

impl FindingStatus {
    pub const ALL: [FindingStatus; 4] = [
        FindingStatus::Normal,
        FindingStatus::Concerning,
        FindingStatus::Abnormal,
        FindingStatus::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FindingStatus::Normal => "NORMAL",
            FindingStatus::Concerning => "CONCERNING",
            FindingStatus::Abnormal => "ABNORMAL",
            FindingStatus::Unknown => "UNKNOWN",
        }
    }

    /// Case-sensitive lookup. `"normal"` is not a status label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-status tallies over a list of findings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingCounts {
    pub total: u32,
    pub normal: u32,
    pub concerning: u32,
    pub abnormal: u32,
}

impl FindingCounts {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = FindingStatus>,
    {
        let mut counts = FindingCounts::default();
        for status in statuses {
            counts.total += 1;
            match status {
                FindingStatus::Normal => counts.normal += 1,
                FindingStatus::Concerning => counts.concerning += 1,
                FindingStatus::Abnormal => counts.abnormal += 1,
                FindingStatus::Unknown => {}
            }
        }
        counts
    }

    pub fn from_findings(findings: &[Finding]) -> Self {
        Self::from_statuses(findings.iter().map(Finding::status_kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(status: &str) -> Finding {
        Finding {
            name: "Glucose".to_string(),
            value: "95 mg/dL".to_string(),
            status: status.to_string(),
            explanation: String::new(),
        }
    }

    #[test]
    fn status_lookup_is_case_sensitive() {
        assert_eq!(FindingStatus::from_label("NORMAL"), Some(FindingStatus::Normal));
        assert_eq!(FindingStatus::from_label("normal"), None);
        assert_eq!(finding("Normal").status_kind(), FindingStatus::Unknown);
        assert_eq!(finding("ABNORMAL").status_kind(), FindingStatus::Abnormal);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let f: Finding = serde_json::from_str(r#"{"name":"Hemoglobin"}"#).unwrap();
        assert_eq!(f.name, "Hemoglobin");
        assert_eq!(f.value, "");
        assert_eq!(f.status, "UNKNOWN");
    }

    #[test]
    fn counts_ignore_unknown_but_include_it_in_total() {
        let findings = vec![
            finding("NORMAL"),
            finding("NORMAL"),
            finding("CONCERNING"),
            finding("ABNORMAL"),
            finding("borderline"),
        ];
        let counts = FindingCounts::from_findings(&findings);
        assert_eq!(
            counts,
            FindingCounts {
                total: 5,
                normal: 2,
                concerning: 1,
                abnormal: 1,
            }
        );
    }
}
