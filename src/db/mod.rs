//! SQLite storage.
//!
//! This module provides:
//! - Database initialization and schema migrations
//! - SQLite pragma configuration
//! - Repository layer for transaction and group persistence

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
