pub mod auth;
pub mod findings;
pub mod health;
pub mod pages;
pub mod preferences;
pub mod reports;
pub mod stats;
