use crate::auth::AuthService;
use crate::config::Config;
use crate::db::{Database, Session, User, now_timestamp};
use crate::error::AppError;
use crate::library::{BookFilters, BookInput, LibraryService, ReadStatus};

fn test_db() -> Database {
    Database::open_memory().unwrap()
}

fn auth_service(db: &Database) -> AuthService {
    AuthService::new(db.clone(), 30, true)
}

fn library(db: &Database) -> LibraryService {
    LibraryService::new(db.clone())
}

fn create_user(db: &Database, id: &str, username: &str) {
    let user = User {
        id: id.to_string(),
        username: username.to_string(),
        password_hash: "hash".to_string(),
        created_at: now_timestamp(),
        last_login: None,
    };
    db.create_user(&user).unwrap();
}

fn book_input(title: &str, author: &str, genre: &str, year: &str, is_read: bool) -> BookInput {
    BookInput {
        title: title.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
        year: year.to_string(),
        is_read,
    }
}

fn filters(title: &str, author: &str, genre: &str, year: &str, status: ReadStatus) -> BookFilters {
    BookFilters {
        title: title.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
        year: year.to_string(),
        status,
    }
}

// ========== DATABASE ==========

#[test]
fn db_create_and_get_user() {
    let db = test_db();
    create_user(&db, "user-1", "alice");

    let found = db.get_user_by_username("alice").unwrap().unwrap();
    assert_eq!(found.id, "user-1");
    assert_eq!(found.username, "alice");

    let found_by_id = db.get_user_by_id("user-1").unwrap().unwrap();
    assert_eq!(found_by_id.username, "alice");
}

#[test]
fn db_duplicate_username_is_username_taken() {
    let db = test_db();
    create_user(&db, "user-1", "alice");

    let duplicate = User {
        id: "user-2".to_string(),
        username: "alice".to_string(),
        password_hash: "hash2".to_string(),
        created_at: now_timestamp(),
        last_login: None,
    };

    let err = db.create_user(&duplicate).unwrap_err();
    assert!(matches!(err, AppError::UsernameTaken(_)));
}

#[test]
fn db_delete_user() {
    let db = test_db();
    create_user(&db, "user-1", "bob");

    assert!(db.delete_user("bob").unwrap());
    assert!(db.get_user_by_username("bob").unwrap().is_none());
}

#[test]
fn db_create_and_delete_session() {
    let db = test_db();
    create_user(&db, "user-1", "alice");

    let session = Session {
        token: "token123".to_string(),
        user_id: "user-1".to_string(),
        expires_at: now_timestamp() + 3600,
    };
    db.create_session(&session).unwrap();

    let found = db.get_session("token123").unwrap().unwrap();
    assert_eq!(found.user_id, "user-1");

    db.delete_session("token123").unwrap();
    assert!(db.get_session("token123").unwrap().is_none());
}

#[test]
fn db_expired_sessions_cleanup() {
    let db = test_db();
    create_user(&db, "user-1", "alice");

    let expired = Session {
        token: "expired".to_string(),
        user_id: "user-1".to_string(),
        expires_at: now_timestamp() - 3600,
    };
    let valid = Session {
        token: "valid".to_string(),
        user_id: "user-1".to_string(),
        expires_at: now_timestamp() + 3600,
    };

    db.create_session(&expired).unwrap();
    db.create_session(&valid).unwrap();

    assert_eq!(db.cleanup_expired_sessions().unwrap(), 1);
    assert!(db.get_session("expired").unwrap().is_none());
    assert!(db.get_session("valid").unwrap().is_some());
}

#[test]
fn db_book_lookup_is_owner_scoped() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    create_user(&db, "user-2", "bob");

    let lib = library(&db);
    let book = lib
        .create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", false))
        .unwrap();

    assert!(db.get_user_book("user-1", &book.id).unwrap().is_some());
    assert!(db.get_user_book("user-2", &book.id).unwrap().is_none());
}

// ========== AUTH ==========

#[test]
fn auth_signup_creates_user_and_session() {
    let db = test_db();
    let auth = auth_service(&db);

    let (user, token) = auth.signup("alice", "password123", "password123").unwrap();
    assert_eq!(user.username, "alice");
    assert!(!token.is_empty());

    let resolved = auth.validate_token(&token).unwrap().unwrap();
    assert_eq!(resolved.id, user.id);
}

#[test]
fn auth_signup_password_mismatch_creates_nothing() {
    let db = test_db();
    let auth = auth_service(&db);

    let err = auth.signup("alice", "password123", "different").unwrap_err();
    assert!(matches!(err, AppError::PasswordMismatch));

    assert!(db.get_user_by_username("alice").unwrap().is_none());
}

#[test]
fn auth_signup_username_taken_keeps_existing_credential() {
    let db = test_db();
    let auth = auth_service(&db);

    auth.signup("alice", "password1", "password1").unwrap();

    let err = auth.signup("alice", "password2", "password2").unwrap_err();
    assert!(matches!(err, AppError::UsernameTaken(_)));

    // The original credential still works, the attempted one does not.
    assert!(auth.login("alice", "password1").is_ok());
    assert!(matches!(
        auth.login("alice", "password2").unwrap_err(),
        AppError::InvalidCredentials
    ));
}

#[test]
fn auth_login_hides_which_part_was_wrong() {
    let db = test_db();
    let auth = auth_service(&db);

    auth.signup("alice", "password123", "password123").unwrap();

    let unknown_user = auth.login("nobody", "password123").unwrap_err();
    let wrong_password = auth.login("alice", "wrong").unwrap_err();

    assert!(matches!(unknown_user, AppError::InvalidCredentials));
    assert!(matches!(wrong_password, AppError::InvalidCredentials));
}

#[test]
fn auth_validate_token() {
    let db = test_db();
    let auth = auth_service(&db);

    let (_, token) = auth.signup("alice", "password123", "password123").unwrap();

    let user = auth.validate_token(&token).unwrap().unwrap();
    assert_eq!(user.username, "alice");

    assert!(auth.validate_token("invalid_token").unwrap().is_none());
}

#[test]
fn auth_expired_session_is_anonymous() {
    let db = test_db();
    let auth = auth_service(&db);
    create_user(&db, "user-1", "alice");

    let session = Session {
        token: "stale".to_string(),
        user_id: "user-1".to_string(),
        expires_at: now_timestamp() - 60,
    };
    db.create_session(&session).unwrap();

    assert!(auth.validate_token("stale").unwrap().is_none());
    // The expired session is deleted on touch.
    assert!(db.get_session("stale").unwrap().is_none());
}

#[test]
fn auth_logout_ends_session() {
    let db = test_db();
    let auth = auth_service(&db);

    let (_, token) = auth.signup("bob", "password123", "password123").unwrap();

    auth.logout(&token).unwrap();
    assert!(auth.validate_token(&token).unwrap().is_none());
}

#[test]
fn auth_logout_without_session_is_noop() {
    let db = test_db();
    let auth = auth_service(&db);

    auth.logout("no_such_token").unwrap();
}

#[test]
fn auth_registration_disabled() {
    let db = test_db();
    let auth = AuthService::new(db, 30, false);

    assert!(auth.signup("alice", "password123", "password123").is_err());
}

#[test]
fn auth_change_password() {
    let db = test_db();
    let auth = auth_service(&db);

    auth.create_user("alice", "oldpass").unwrap();
    auth.change_password("alice", "newpass").unwrap();

    assert!(auth.login("alice", "oldpass").is_err());
    assert!(auth.login("alice", "newpass").is_ok());
}

#[test]
fn auth_short_password_rejected() {
    let db = test_db();
    let auth = auth_service(&db);

    assert!(auth.signup("alice", "abc", "abc").is_err());
}

#[test]
fn auth_invalid_username_rejected() {
    let db = test_db();
    let auth = auth_service(&db);

    assert!(auth.create_user("user@email", "password").is_err());
    assert!(auth.create_user("user name", "password").is_err());
    assert!(auth.create_user("", "password").is_err());
}

// ========== LIBRARY ==========

#[test]
fn library_create_and_get() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    let book = lib
        .create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", false))
        .unwrap();
    assert_eq!(book.owner_id, "user-1");
    assert_eq!(book.year, 1965);
    assert!(!book.is_read);

    let found = lib.get("user-1", &book.id).unwrap();
    assert_eq!(found.title, "Dune");
}

#[test]
fn library_create_validates_fields() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    let missing_title = lib.create("user-1", &book_input("", "Herbert", "SciFi", "1965", false));
    assert!(matches!(missing_title.unwrap_err(), AppError::Validation(_)));

    let bad_year = lib.create("user-1", &book_input("Dune", "Herbert", "SciFi", "next year", false));
    assert!(matches!(bad_year.unwrap_err(), AppError::Validation(_)));

    let long_genre = "g".repeat(51);
    let too_long = lib.create("user-1", &book_input("Dune", "Herbert", &long_genre, "1965", false));
    assert!(matches!(too_long.unwrap_err(), AppError::Validation(_)));
}

#[test]
fn library_list_empty_filters_returns_all() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    lib.create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", true))
        .unwrap();
    lib.create("user-1", &book_input("Emma", "Austen", "Classic", "1815", false))
        .unwrap();
    lib.create("user-1", &book_input("It", "King", "Horror", "1986", false))
        .unwrap();

    let view = lib.list("user-1", &BookFilters::default()).unwrap();
    assert_eq!(view.books.len(), 3);
}

#[test]
fn library_title_filter_is_case_insensitive_substring() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    create_user(&db, "user-2", "bob");
    let lib = library(&db);

    lib.create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", false))
        .unwrap();

    let view = lib
        .list("user-1", &filters("dun", "", "", "", ReadStatus::All))
        .unwrap();
    assert_eq!(view.books.len(), 1);
    assert_eq!(view.books[0].title, "Dune");

    // Another user never sees it, filters or not.
    let other = lib.list("user-2", &BookFilters::default()).unwrap();
    assert!(other.books.is_empty());
}

#[test]
fn library_field_filters_are_and_combined() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    lib.create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", false))
        .unwrap();
    lib.create("user-1", &book_input("Dune Messiah", "Herbert", "SciFi", "1969", false))
        .unwrap();

    let both = lib
        .list("user-1", &filters("dune", "herb", "", "", ReadStatus::All))
        .unwrap();
    assert_eq!(both.books.len(), 2);

    let mismatch = lib
        .list("user-1", &filters("dune", "austen", "", "", ReadStatus::All))
        .unwrap();
    assert!(mismatch.books.is_empty());
}

#[test]
fn library_year_filter_matches_substring() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    lib.create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", false))
        .unwrap();

    let hit = lib
        .list("user-1", &filters("", "", "", "96", ReadStatus::All))
        .unwrap();
    assert_eq!(hit.books.len(), 1);

    let miss = lib
        .list("user-1", &filters("", "", "", "2000", ReadStatus::All))
        .unwrap();
    assert!(miss.books.is_empty());
}

#[test]
fn library_status_filter_restricts_by_is_read() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    lib.create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", true))
        .unwrap();
    lib.create("user-1", &book_input("Emma", "Austen", "Classic", "1815", true))
        .unwrap();
    lib.create("user-1", &book_input("It", "King", "Horror", "1986", false))
        .unwrap();

    let read = lib
        .list("user-1", &filters("", "", "", "", ReadStatus::Read))
        .unwrap();
    assert_eq!(read.books.len(), 2);
    assert!(read.books.iter().all(|b| b.is_read));

    let unread = lib
        .list("user-1", &filters("", "", "", "", ReadStatus::Unread))
        .unwrap();
    assert_eq!(unread.books.len(), 1);
    assert!(unread.books.iter().all(|b| !b.is_read));
}

#[test]
fn library_counts_describe_whole_library_not_filtered_view() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    lib.create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", true))
        .unwrap();
    lib.create("user-1", &book_input("Emma", "Austen", "Classic", "1815", true))
        .unwrap();
    lib.create("user-1", &book_input("It", "King", "Horror", "1986", false))
        .unwrap();

    // A narrow filter plus a status restriction leaves one visible book,
    // but the counts still describe all three.
    let view = lib
        .list("user-1", &filters("emma", "", "", "", ReadStatus::Read))
        .unwrap();
    assert_eq!(view.books.len(), 1);
    assert_eq!(view.read_count, 2);
    assert_eq!(view.unread_count, 1);
    assert_eq!(view.read_count + view.unread_count, 3);

    // Even when nothing matches at all.
    let empty = lib
        .list("user-1", &filters("zzz", "", "", "", ReadStatus::All))
        .unwrap();
    assert!(empty.books.is_empty());
    assert_eq!(empty.read_count, 2);
    assert_eq!(empty.unread_count, 1);
}

#[test]
fn library_ownership_isolation() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    create_user(&db, "user-2", "bob");
    let lib = library(&db);

    let book = lib
        .create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", false))
        .unwrap();

    // bob's list never contains alice's book
    let view = lib.list("user-2", &BookFilters::default()).unwrap();
    assert!(view.books.is_empty());

    // bob mutating alice's book gets the same error as a bogus id
    let update = lib.update(
        "user-2",
        &book.id,
        &book_input("Mine", "Me", "Theft", "2024", false),
    );
    assert!(matches!(update.unwrap_err(), AppError::NotFound(_)));

    let delete = lib.delete("user-2", &book.id);
    assert!(matches!(delete.unwrap_err(), AppError::NotFound(_)));

    let get = lib.get("user-2", &book.id);
    assert!(matches!(get.unwrap_err(), AppError::NotFound(_)));

    // alice's book is untouched
    let untouched = lib.get("user-1", &book.id).unwrap();
    assert_eq!(untouched.title, "Dune");
}

#[test]
fn library_update_changes_fields() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    let book = lib
        .create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", false))
        .unwrap();

    let updated = lib
        .update(
            "user-1",
            &book.id,
            &book_input("Dune", "Frank Herbert", "SciFi", "1965", true),
        )
        .unwrap();
    assert_eq!(updated.author, "Frank Herbert");
    assert!(updated.is_read);

    let found = lib.get("user-1", &book.id).unwrap();
    assert_eq!(found.author, "Frank Herbert");
    assert!(found.is_read);
}

#[test]
fn library_update_validates_fields() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    let book = lib
        .create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", false))
        .unwrap();

    let err = lib
        .update("user-1", &book.id, &book_input("Dune", "Herbert", "SciFi", "abc", false))
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // The stored book is unchanged.
    let found = lib.get("user-1", &book.id).unwrap();
    assert_eq!(found.year, 1965);
}

#[test]
fn library_update_missing_book_is_not_found() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    let err = lib
        .update("user-1", "no-such-id", &book_input("X", "Y", "Z", "2000", false))
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn library_delete_twice_is_not_found() {
    let db = test_db();
    create_user(&db, "user-1", "alice");
    let lib = library(&db);

    let book = lib
        .create("user-1", &book_input("Dune", "Herbert", "SciFi", "1965", false))
        .unwrap();

    lib.delete("user-1", &book.id).unwrap();

    let err = lib.delete("user-1", &book.id).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn read_status_parse() {
    assert_eq!(ReadStatus::parse("read"), ReadStatus::Read);
    assert_eq!(ReadStatus::parse("unread"), ReadStatus::Unread);
    assert_eq!(ReadStatus::parse("all"), ReadStatus::All);
    assert_eq!(ReadStatus::parse(""), ReadStatus::All);
    assert_eq!(ReadStatus::parse("bogus"), ReadStatus::All);
}

// ========== CONFIG ==========

#[test]
fn config_parse_toml() {
    let toml = r#"
[server]
bind = "127.0.0.1:9090"
title = "Test Library"

[database]
path = "/tmp/test.db"

[auth]
registration = "disabled"
session_days = 7
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.server.bind.port(), 9090);
    assert_eq!(config.server.title, "Test Library");
    assert!(!config.auth.registration_enabled());
    assert_eq!(config.auth.session_days, 7);
}

#[test]
fn config_default_values() {
    let config = Config::default();
    assert_eq!(config.server.bind.port(), 8080);
    assert_eq!(config.server.title, "My Library");
    assert!(config.auth.registration_enabled());
    assert_eq!(config.auth.session_days, 30);
}

#[test]
fn config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, Config::generate_default()).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.server.bind.port(), 8080);
    assert!(config.auth.registration_enabled());
}

#[test]
fn db_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("libr.db");

    {
        let db = Database::open(&path).unwrap();
        create_user(&db, "user-1", "alice");
    }

    let reopened = Database::open(&path).unwrap();
    assert!(reopened.get_user_by_username("alice").unwrap().is_some());
}
