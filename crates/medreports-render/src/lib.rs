//! medreports-render
//!
//! Server-rendered HTML pages.

pub mod error;
pub mod render;
pub mod views;
