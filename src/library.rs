//! Library queries and book mutations, always scoped to a single owner.

use crate::db::{Book, Database, now_timestamp};
use crate::error::{AppError, Result};

/// Maximum length for the title and author fields.
const MAX_TEXT_LEN: usize = 100;

/// Maximum length for the genre field.
const MAX_GENRE_LEN: usize = 50;

/// Read-status restriction for library listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadStatus {
    /// No restriction.
    #[default]
    All,
    /// Only books marked as read.
    Read,
    /// Only books not yet read.
    Unread,
}

impl ReadStatus {
    /// Parse a query-string value; anything unrecognized means no filter.
    pub fn parse(value: &str) -> Self {
        match value {
            "read" => ReadStatus::Read,
            "unread" => ReadStatus::Unread,
            _ => ReadStatus::All,
        }
    }

    /// Query-string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ReadStatus::All => "all",
            ReadStatus::Read => "read",
            ReadStatus::Unread => "unread",
        }
    }
}

/// Search filters for a library listing. Empty strings match everything.
#[derive(Debug, Clone, Default)]
pub struct BookFilters {
    /// Substring match against the title, case-insensitive.
    pub title: String,
    /// Substring match against the author, case-insensitive.
    pub author: String,
    /// Substring match against the genre, case-insensitive.
    pub genre: String,
    /// Substring match against the decimal form of the year.
    pub year: String,
    /// Read-status restriction, applied after the field filters.
    pub status: ReadStatus,
}

impl BookFilters {
    /// Whether a book passes the four field filters (status not included).
    fn matches_fields(&self, book: &Book) -> bool {
        contains_ci(&book.title, &self.title)
            && contains_ci(&book.author, &self.author)
            && contains_ci(&book.genre, &self.genre)
            && book.year.to_string().contains(self.year.as_str())
    }
}

/// Case-insensitive substring test; an empty needle matches everything.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Raw book form fields, as submitted.
#[derive(Debug, Clone, Default)]
pub struct BookInput {
    /// Title field.
    pub title: String,
    /// Author field.
    pub author: String,
    /// Genre field.
    pub genre: String,
    /// Year field, not yet parsed.
    pub year: String,
    /// Read checkbox.
    pub is_read: bool,
}

/// Validated book fields ready to persist.
struct BookFields {
    title: String,
    author: String,
    genre: String,
    year: i64,
    is_read: bool,
}

impl BookInput {
    /// Validate all fields, decoupled from any rendering concern.
    fn validate(&self) -> Result<BookFields> {
        let title = required_text("Title", &self.title, MAX_TEXT_LEN)?;
        let author = required_text("Author", &self.author, MAX_TEXT_LEN)?;
        let genre = required_text("Genre", &self.genre, MAX_GENRE_LEN)?;

        let year = self
            .year
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::Validation("Year must be a whole number".to_string()))?;

        Ok(BookFields {
            title,
            author,
            genre,
            year,
            is_read: self.is_read,
        })
    }
}

/// Trim a required text field and enforce its length bound.
fn required_text(name: &str, value: &str, max_len: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", name)));
    }
    if value.len() > max_len {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            name, max_len
        )));
    }
    Ok(value.to_string())
}

/// A filtered library listing with whole-library read counts.
#[derive(Debug)]
pub struct LibraryView {
    /// Books passing the filters, ordered by title.
    pub books: Vec<Book>,
    /// Read books across the whole library, ignoring filters.
    pub read_count: usize,
    /// Unread books across the whole library, ignoring filters.
    pub unread_count: usize,
}

/// Book queries and mutations for a single owner.
pub struct LibraryService {
    db: Database,
}

impl LibraryService {
    /// Create a new library service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// List an owner's books with filters applied.
    ///
    /// The read/unread counts always describe the whole library, not the
    /// filtered view.
    pub fn list(&self, owner_id: &str, filters: &BookFilters) -> Result<LibraryView> {
        let all = self.db.list_user_books(owner_id)?;

        let read_count = all.iter().filter(|b| b.is_read).count();
        let unread_count = all.len() - read_count;

        let mut books: Vec<Book> = all
            .into_iter()
            .filter(|b| filters.matches_fields(b))
            .collect();

        match filters.status {
            ReadStatus::All => {}
            ReadStatus::Read => books.retain(|b| b.is_read),
            ReadStatus::Unread => books.retain(|b| !b.is_read),
        }

        Ok(LibraryView {
            books,
            read_count,
            unread_count,
        })
    }

    /// Create a book owned by `owner_id`.
    pub fn create(&self, owner_id: &str, input: &BookInput) -> Result<Book> {
        let fields = input.validate()?;
        let now = now_timestamp();

        let book = Book {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: fields.title,
            author: fields.author,
            genre: fields.genre,
            year: fields.year,
            is_read: fields.is_read,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_book(&book)?;
        Ok(book)
    }

    /// Fetch a single book, restricted to its owner.
    ///
    /// A book owned by someone else yields the same NotFound as a missing
    /// id, so ids cannot be probed across accounts.
    pub fn get(&self, owner_id: &str, book_id: &str) -> Result<Book> {
        self.db
            .get_user_book(owner_id, book_id)?
            .ok_or_else(|| AppError::NotFound(book_id.to_string()))
    }

    /// Update a book's fields, restricted to its owner.
    pub fn update(&self, owner_id: &str, book_id: &str, input: &BookInput) -> Result<Book> {
        let mut book = self.get(owner_id, book_id)?;
        let fields = input.validate()?;

        book.title = fields.title;
        book.author = fields.author;
        book.genre = fields.genre;
        book.year = fields.year;
        book.is_read = fields.is_read;
        book.updated_at = now_timestamp();

        // The row can vanish between the lookup and the write.
        if !self.db.update_book(&book)? {
            return Err(AppError::NotFound(book_id.to_string()));
        }
        Ok(book)
    }

    /// Delete a book, restricted to its owner.
    pub fn delete(&self, owner_id: &str, book_id: &str) -> Result<()> {
        if self.db.delete_user_book(owner_id, book_id)? {
            Ok(())
        } else {
            Err(AppError::NotFound(book_id.to_string()))
        }
    }
}
