use serde::{Deserialize, Serialize};

use super::finding::{Finding, FindingCounts};

/// The normalized output of one model response: a patient-facing summary
/// plus findings in the order they appeared in the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub findings: Vec<Finding>,
}

impl AnalysisResult {
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn counts(&self) -> FindingCounts {
        FindingCounts::from_findings(&self.findings)
    }
}
