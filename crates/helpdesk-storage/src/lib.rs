//! Storage layer for helpdesk
//!
//! This crate provides:
//! - SQLite ticket store (sqlx)
//! - In-memory ticket store (dashmap)
//! - Migrations

pub mod db;
pub mod error;
pub mod memory;
pub mod models;

pub use db::Storage;
pub use error::{Result, StorageError};
pub use memory::MemoryStore;
