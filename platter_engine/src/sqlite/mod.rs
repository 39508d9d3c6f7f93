//! SQLite backend for the order engine.
//!
//! Schema migrations live in `migrations/` and are embedded into the binary with `sqlx::migrate!`.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
