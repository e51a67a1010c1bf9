//! medreports-auth
//!
//! Supabase session tokens, session cookies and the OAuth PKCE sign-in
//! flow.

pub mod client;
pub mod error;
pub mod flows;
pub mod jwt;
pub mod session;

pub use jsonwebtoken;
