//! # SQLite database methods
//!
//! "Low-level" SQLite interactions for the compliance ledger.
//!
//! All of these are simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection`. Callers can obtain a connection from a pool, or open a transaction
//! and pass `&mut *tx` when several calls must be atomic.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod accounts;
pub mod audit;
pub mod commissions;
pub mod deposits;
pub mod debts;
pub mod disputes;
pub mod exchange_rates;
pub mod orders;
pub mod refunds;
pub mod sellers;

const SQLITE_DB_URL: &str = "sqlite://data/compliance.db";

pub fn db_url() -> String {
    let result = env::var("SCE_DATABASE_URL").unwrap_or_else(|_| {
        info!("SCE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
