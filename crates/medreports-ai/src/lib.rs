//! medreports-ai
//!
//! Remote model invocation (OCR and explanation) and normalization of the
//! explanation text into structured findings.

pub mod client;
pub mod error;
pub mod explain;
pub mod normalize;
pub mod ocr;
