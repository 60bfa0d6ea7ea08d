//! Supabase adapters: PostgREST for the points table, GoTrue for sign-in.

pub mod supabase_auth;
pub mod supabase_rest;

pub use supabase_auth::SupabaseAuth;
pub use supabase_rest::SupabaseStore;
