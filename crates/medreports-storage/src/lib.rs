//! medreports-storage
//!
//! Report persistence. A thin PostgREST (Supabase) client, the
//! [`store::ReportStore`] trait the server depends on, and two
//! implementations: [`supabase::SupabaseStore`] and [`memory::MemoryStore`].

pub mod client;
pub mod error;
pub mod memory;
pub mod rows;
pub mod store;
pub mod supabase;
