//! SQLite backend for the compliance engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
