mod schema;

pub use schema::Database;

use chrono::{DateTime, Utc};

/// User account.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Username for login.
    pub username: String,
    /// Argon2 password hash.
    pub password_hash: String,
    /// Account creation timestamp.
    pub created_at: i64,
    /// Last login timestamp.
    pub last_login: Option<i64>,
}

/// Authentication session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session token.
    pub token: String,
    /// User ID.
    pub user_id: String,
    /// Expiration timestamp.
    pub expires_at: i64,
}

/// A tracked book in a user's library.
#[derive(Debug, Clone)]
pub struct Book {
    /// Unique book ID.
    pub id: String,
    /// Owning user ID. Every book has exactly one owner.
    pub owner_id: String,
    /// Book title.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Genre label.
    pub genre: String,
    /// Publication year.
    pub year: i64,
    /// Whether the owner has read the book.
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Convert timestamp to DateTime.
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}
