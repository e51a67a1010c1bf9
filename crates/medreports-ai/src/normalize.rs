//! Normalization of explanation-model output into an [`AnalysisResult`].
//!
//! The model is asked for a JSON array of findings followed by a plain-text
//! summary, but it does not always comply. Parsing degrades through three
//! tiers and never fails:
//!
//! 1. **Structured array.** The text between the first `[` and the last `]`
//!    (inclusive) is decoded as a JSON array of findings. Whatever follows
//!    the last `]` is the summary. A successful decode is final, even when
//!    the array is empty.
//! 2. **Labelled blocks.** The text is split on `---` and each block is
//!    searched for `**TEST_NAME:**`, `**VALUE:**`, `**STATUS:**` and
//!    `**EXPLANATION:**` labels. Blocks whose name is missing or no longer
//!    than three characters are dropped.
//! 3. **Plain text.** If no block survives, the whole text becomes the
//!    summary with `**` and `##` markers removed.
//!
//! Tier 1 grabs from the *first* `[` to the *last* `]`, so brackets in
//! trailing prose are over-captured. Such input fails to decode and falls
//! through to tier 2.

use std::sync::LazyLock;

use medreports_core::models::analysis::AnalysisResult;
use medreports_core::models::finding::{Finding, FindingStatus};
use regex::Regex;
use tracing::debug;

/// Which parsing tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    StructuredArray,
    LabelledBlocks,
    PlainText,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::StructuredArray => "structured_array",
            Tier::LabelledBlocks => "labelled_blocks",
            Tier::PlainText => "plain_text",
        }
    }
}

/// Outcome of the tier-1 decode attempt.
#[derive(Debug)]
enum ArrayDecode<'a> {
    Decoded { findings: Vec<Finding>, rest: &'a str },
    Failed,
}

/// Normalize raw model text into a summary plus ordered findings.
pub fn normalize(raw: &str) -> AnalysisResult {
    normalize_with_tier(raw).0
}

/// Like [`normalize`], also reporting which tier produced the result.
pub fn normalize_with_tier(raw: &str) -> (AnalysisResult, Tier) {
    if let ArrayDecode::Decoded { findings, rest } = decode_structured(raw) {
        let summary = rest.trim_start_matches(['\n', '\r']).trim().to_string();
        return (AnalysisResult { summary, findings }, Tier::StructuredArray);
    }

    debug!(len = raw.len(), "structured decode failed, trying labelled blocks");

    let findings = parse_labelled_blocks(raw);
    if !findings.is_empty() {
        return (
            AnalysisResult {
                summary: String::new(),
                findings,
            },
            Tier::LabelledBlocks,
        );
    }

    debug!("no labelled blocks found, using plain text");

    (
        AnalysisResult {
            summary: strip_markup(raw),
            findings: Vec::new(),
        },
        Tier::PlainText,
    )
}

fn decode_structured(raw: &str) -> ArrayDecode<'_> {
    let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) else {
        return ArrayDecode::Failed;
    };
    if end <= start {
        return ArrayDecode::Failed;
    }

    match serde_json::from_str::<Vec<Finding>>(&raw[start..=end]) {
        Ok(findings) => ArrayDecode::Decoded {
            findings,
            rest: &raw[end + 1..],
        },
        Err(e) => {
            debug!(error = %e, "bracketed text is not a findings array");
            ArrayDecode::Failed
        }
    }
}

type FieldSetter = fn(&mut Finding, &str);

/// Label table for tier 2. Each label is matched independently within a
/// block; the first occurrence wins.
const LABELS: [(&str, FieldSetter); 4] = [
    ("TEST_NAME", set_name),
    ("VALUE", set_value),
    ("STATUS", set_status),
    ("EXPLANATION", set_explanation),
];

fn set_name(f: &mut Finding, v: &str) {
    f.name = v.to_string();
}

fn set_value(f: &mut Finding, v: &str) {
    f.value = v.to_string();
}

fn set_status(f: &mut Finding, v: &str) {
    f.status = v.to_uppercase();
}

fn set_explanation(f: &mut Finding, v: &str) {
    f.explanation = v.to_string();
}

/// `**LABEL:**` followed by text up to the next `**` or the end of the block.
static LABEL_PATTERNS: LazyLock<Vec<(Regex, FieldSetter)>> = LazyLock::new(|| {
    LABELS
        .iter()
        .map(|(label, setter)| {
            let pattern = format!(r"\*\*{label}:\*\*\s*([^*]+)(?:\*\*|\z)");
            let re = Regex::new(&pattern).expect("label patterns are valid regexes");
            (re, *setter)
        })
        .collect()
});

fn parse_labelled_blocks(raw: &str) -> Vec<Finding> {
    raw.split("---")
        .filter(|block| !block.trim().is_empty())
        .map(parse_block)
        .filter(|f| f.name.chars().count() > 3)
        .collect()
}

fn parse_block(block: &str) -> Finding {
    let mut finding = Finding {
        name: String::new(),
        value: String::new(),
        status: FindingStatus::Unknown.as_str().to_string(),
        explanation: String::new(),
    };

    for (re, set) in LABEL_PATTERNS.iter() {
        if let Some(m) = re.captures(block).and_then(|c| c.get(1)) {
            set(&mut finding, m.as_str().trim());
        }
    }

    finding
}

fn strip_markup(raw: &str) -> String {
    raw.replace("**", "").replace("##", "")
}
