//! libr-rs: a personal book library tracker.
//!
//! Users sign up, log in, and keep a record of the books they own,
//! searching and filtering by title, author, genre, year, and read
//! status. Every book belongs to exactly one user and is never visible
//! to anyone else.
//!
//! # Features
//!
//! - Credential-based signup and login with server-side sessions
//! - Ownership-scoped book create/edit/delete
//! - Case-insensitive substring search across book fields
//! - Read/unread tracking with whole-library counts
//! - CLI user management

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and user management.
pub mod auth;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// Library queries and book mutations.
pub mod library;
/// HTTP server.
pub mod server;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
