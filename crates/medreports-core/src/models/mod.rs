pub mod analysis;
pub mod finding;
pub mod preferences;
pub mod processing_log;
pub mod report;
pub mod stats;
