//! HTTP request handlers.

use crate::db::{Book, User};
use crate::error::{AppError, Result};
use crate::library::{BookFilters, BookInput, ReadStatus};
use crate::server::AppState;
use axum::{
    extract::{Form, Path, Query, State},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

/// Name of the session cookie.
const SESSION_COOKIE: &str = "libr_session";

// ============================================================================
// SESSION HELPERS
// ============================================================================

/// Extract the session token from the Cookie header.
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;

    cookies
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Resolve the request's identity. None is anonymous, not a failure.
fn session_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>> {
    match extract_session_token(headers) {
        Some(token) => state.auth.validate_token(&token),
        None => Ok(None),
    }
}

/// Resolve the identity, or produce the response that ends the request:
/// anonymous callers are redirected to the login page.
fn require_user(state: &AppState, headers: &HeaderMap) -> std::result::Result<User, Response> {
    match session_user(state, headers) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(Redirect::to("/login").into_response()),
        Err(e) => Err(e.into_response()),
    }
}

/// Session cookie value for Set-Cookie.
fn session_cookie(token: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    )
}

/// Redirect carrying a Set-Cookie header.
fn redirect_with_cookie(location: &str, cookie: String) -> Response {
    ([(header::SET_COOKIE, cookie)], Redirect::to(location)).into_response()
}

// ============================================================================
// HTML RENDERING
// ============================================================================

/// Escape text for embedding in HTML.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap page content in the shared layout.
fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; max-width: 700px; margin: 2rem auto; padding: 0 1rem; }}
        h1 {{ color: #333; }}
        a {{ color: #0066cc; }}
        .error {{ background: #fdecea; color: #b71c1c; padding: 0.5rem 1rem; border-radius: 4px; }}
        .stats {{ background: #f5f5f5; padding: 1rem; border-radius: 8px; margin: 1rem 0; }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ text-align: left; padding: 0.4rem 0.6rem; border-bottom: 1px solid #ddd; }}
        form.inline {{ display: inline; }}
        label {{ display: block; margin-top: 0.5rem; }}
        input[type=text], input[type=password] {{ width: 100%; max-width: 20rem; }}
    </style>
</head>
<body>
{body}
</body>
</html>"#,
        title = escape_html(title),
        body = body,
    ))
}

/// Inline error banner, empty when there is no error.
fn error_banner(error: Option<&str>) -> String {
    match error {
        Some(message) => format!(r#"<p class="error">{}</p>"#, escape_html(message)),
        None => String::new(),
    }
}

// ============================================================================
// AUTH PAGES
// ============================================================================

/// Landing page; authenticated users go straight to their library.
pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match session_user(&state, &headers) {
        Ok(Some(_)) => Redirect::to("/books").into_response(),
        Ok(None) => {
            let title = &state.config.server.title;
            page(
                title,
                &format!(
                    r#"<h1>{}</h1>
<p>Track the books you own and the ones you have read.</p>
<p><a href="/login">Log in</a> or <a href="/signup">sign up</a> to get started.</p>"#,
                    escape_html(title)
                ),
            )
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Signup form fields.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    username: String,
    password: String,
    confirm_password: String,
}

/// Render the signup form.
fn render_signup(error: Option<&str>) -> Html<String> {
    page(
        "Sign up",
        &format!(
            r#"<h1>Sign up</h1>
{error}
<form method="post" action="/signup">
    <label>Username <input type="text" name="username" required></label>
    <label>Password <input type="password" name="password" required></label>
    <label>Confirm password <input type="password" name="confirm_password" required></label>
    <p><button type="submit">Sign up</button></p>
</form>
<p>Already have an account? <a href="/login">Log in</a>.</p>"#,
            error = error_banner(error),
        ),
    )
}

/// Signup page.
pub async fn signup_page() -> Html<String> {
    render_signup(None)
}

/// Perform signup.
pub async fn signup_submit(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Response {
    match state
        .auth
        .signup(&form.username, &form.password, &form.confirm_password)
    {
        Ok((user, token)) => {
            tracing::info!(username = %user.username, "New signup");
            redirect_with_cookie(
                "/books",
                session_cookie(&token, state.auth.session_max_age()),
            )
        }
        Err(
            e @ (AppError::PasswordMismatch
            | AppError::UsernameTaken(_)
            | AppError::Validation(_)),
        ) => render_signup(Some(&e.to_string())).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Login form fields.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

/// Render the login form.
fn render_login(error: Option<&str>) -> Html<String> {
    page(
        "Log in",
        &format!(
            r#"<h1>Log in</h1>
{error}
<form method="post" action="/login">
    <label>Username <input type="text" name="username" required></label>
    <label>Password <input type="password" name="password" required></label>
    <p><button type="submit">Log in</button></p>
</form>
<p>No account yet? <a href="/signup">Sign up</a>.</p>"#,
            error = error_banner(error),
        ),
    )
}

/// Login page.
pub async fn login_page() -> Html<String> {
    render_login(None)
}

/// Perform login.
pub async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match state.auth.login(&form.username, &form.password) {
        Ok((user, token)) => {
            tracing::info!(username = %user.username, "Login");
            redirect_with_cookie(
                "/books",
                session_cookie(&token, state.auth.session_max_age()),
            )
        }
        Err(AppError::InvalidCredentials) => {
            render_login(Some(&AppError::InvalidCredentials.to_string())).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// End the session and clear the cookie. Safe to call without a session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_session_token(&headers)
        && let Err(e) = state.auth.logout(&token)
    {
        return e.into_response();
    }

    redirect_with_cookie("/", session_cookie("", 0))
}

// ============================================================================
// LIBRARY PAGES
// ============================================================================

/// Query parameters for the library listing.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    genre: String,
    #[serde(default)]
    year: String,
    #[serde(default)]
    status: String,
}

impl FilterParams {
    fn into_filters(self) -> BookFilters {
        BookFilters {
            title: self.title,
            author: self.author,
            genre: self.genre,
            year: self.year,
            status: ReadStatus::parse(&self.status),
        }
    }
}

/// Build a /books query string for a status tab, preserving text filters.
fn filter_query(filters: &BookFilters, status: ReadStatus) -> String {
    format!(
        "title={}&author={}&genre={}&year={}&status={}",
        urlencoding::encode(&filters.title),
        urlencoding::encode(&filters.author),
        urlencoding::encode(&filters.genre),
        urlencoding::encode(&filters.year),
        status.as_str(),
    )
}

/// List and filter the current user's books.
pub async fn books_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FilterParams>,
) -> Response {
    let user = match require_user(&state, &headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let filters = params.into_filters();
    let view = match state.library.list(&user.id, &filters) {
        Ok(view) => view,
        Err(e) => return e.into_response(),
    };

    let mut rows = String::new();
    for book in &view.books {
        rows.push_str(&format!(
            "<tr><td><a href=\"/books/{id}\">{title}</a></td><td>{author}</td><td>{genre}</td><td>{year}</td><td>{status}</td></tr>\n",
            id = book.id,
            title = escape_html(&book.title),
            author = escape_html(&book.author),
            genre = escape_html(&book.genre),
            year = book.year,
            status = if book.is_read { "read" } else { "unread" },
        ));
    }
    if view.books.is_empty() {
        rows.push_str("<tr><td colspan=\"5\">No books found.</td></tr>\n");
    }

    let tabs = [ReadStatus::All, ReadStatus::Read, ReadStatus::Unread]
        .into_iter()
        .map(|status| {
            if status == filters.status {
                format!("<strong>{}</strong>", status.as_str())
            } else {
                format!(
                    r#"<a href="/books?{}">{}</a>"#,
                    filter_query(&filters, status),
                    status.as_str()
                )
            }
        })
        .collect::<Vec<_>>()
        .join(" | ");

    let body = format!(
        r#"<h1>{username}'s library</h1>
<div class="stats">Read: <strong>{read_count}</strong> &middot; Unread: <strong>{unread_count}</strong></div>
<form method="get" action="/books">
    <input type="text" name="title" placeholder="Title" value="{title}">
    <input type="text" name="author" placeholder="Author" value="{author}">
    <input type="text" name="genre" placeholder="Genre" value="{genre}">
    <input type="text" name="year" placeholder="Year" value="{year}">
    <input type="hidden" name="status" value="{status}">
    <button type="submit">Search</button>
</form>
<p>Status: {tabs}</p>
<table>
<tr><th>Title</th><th>Author</th><th>Genre</th><th>Year</th><th>Status</th></tr>
{rows}</table>
<p><a href="/books/new">Add a book</a></p>
<form class="inline" method="post" action="/logout"><button type="submit">Log out</button></form>"#,
        username = escape_html(&user.username),
        read_count = view.read_count,
        unread_count = view.unread_count,
        title = escape_html(&filters.title),
        author = escape_html(&filters.author),
        genre = escape_html(&filters.genre),
        year = escape_html(&filters.year),
        status = filters.status.as_str(),
        tabs = tabs,
        rows = rows,
    );

    page(&state.config.server.title, &body).into_response()
}

// ============================================================================
// BOOK FORMS
// ============================================================================

/// Book form fields, as submitted.
#[derive(Debug, Deserialize)]
pub struct BookFormData {
    title: String,
    author: String,
    genre: String,
    year: String,
    // Checkbox; present only when checked.
    is_read: Option<String>,
}

impl BookFormData {
    fn into_input(self) -> BookInput {
        BookInput {
            title: self.title,
            author: self.author,
            genre: self.genre,
            year: self.year,
            is_read: self.is_read.is_some(),
        }
    }
}

/// Form values for an existing book.
fn book_to_input(book: &Book) -> BookInput {
    BookInput {
        title: book.title.clone(),
        author: book.author.clone(),
        genre: book.genre.clone(),
        year: book.year.to_string(),
        is_read: book.is_read,
    }
}

/// Render a book form with the given values.
fn render_book_form(
    heading: &str,
    action: &str,
    submit: &str,
    input: &BookInput,
    error: Option<&str>,
    footer: &str,
) -> Html<String> {
    page(
        heading,
        &format!(
            r#"<h1>{heading}</h1>
{error}
<form method="post" action="{action}">
    <label>Title <input type="text" name="title" value="{title}" required></label>
    <label>Author <input type="text" name="author" value="{author}" required></label>
    <label>Genre <input type="text" name="genre" value="{genre}" required></label>
    <label>Year <input type="text" name="year" value="{year}" required></label>
    <label><input type="checkbox" name="is_read"{checked}> Read</label>
    <p><button type="submit">{submit}</button></p>
</form>
{footer}
<p><a href="/books">Back to library</a></p>"#,
            heading = escape_html(heading),
            error = error_banner(error),
            action = action,
            title = escape_html(&input.title),
            author = escape_html(&input.author),
            genre = escape_html(&input.genre),
            year = escape_html(&input.year),
            checked = if input.is_read { " checked" } else { "" },
            submit = submit,
            footer = footer,
        ),
    )
}

/// Delete button shown on the edit page.
fn delete_form(book_id: &str) -> String {
    format!(
        r#"<form class="inline" method="post" action="/books/{}/delete"><button type="submit">Delete</button></form>"#,
        book_id
    )
}

/// New book page.
pub async fn book_new_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_user(&state, &headers) {
        return resp;
    }

    render_book_form(
        "Add a book",
        "/books/new",
        "Create",
        &BookInput::default(),
        None,
        "",
    )
    .into_response()
}

/// Create a book.
pub async fn book_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<BookFormData>,
) -> Response {
    let user = match require_user(&state, &headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let input = form.into_input();
    match state.library.create(&user.id, &input) {
        Ok(book) => {
            tracing::info!(username = %user.username, title = %book.title, "Book created");
            Redirect::to("/books").into_response()
        }
        Err(e @ AppError::Validation(_)) => render_book_form(
            "Add a book",
            "/books/new",
            "Create",
            &input,
            Some(&e.to_string()),
            "",
        )
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// View/edit page for a single book.
pub async fn book_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let user = match require_user(&state, &headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.library.get(&user.id, &id) {
        Ok(book) => render_book_form(
            &book.title,
            &format!("/books/{}", book.id),
            "Save",
            &book_to_input(&book),
            None,
            &delete_form(&book.id),
        )
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Apply an edit to a single book.
pub async fn book_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<BookFormData>,
) -> Response {
    let user = match require_user(&state, &headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let input = form.into_input();
    match state.library.update(&user.id, &id, &input) {
        Ok(_) => Redirect::to("/books").into_response(),
        Err(e @ AppError::Validation(_)) => render_book_form(
            "Edit book",
            &format!("/books/{}", id),
            "Save",
            &input,
            Some(&e.to_string()),
            &delete_form(&id),
        )
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete a book.
pub async fn book_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let user = match require_user(&state, &headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.library.delete(&user.id, &id) {
        Ok(()) => {
            tracing::info!(username = %user.username, book_id = %id, "Book deleted");
            Redirect::to("/books").into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_session_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; libr_session=tok123; lang=en"),
        );

        assert_eq!(extract_session_token(&headers), Some("tok123".to_string()));

        let empty = HeaderMap::new();
        assert_eq!(extract_session_token(&empty), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Dune" & 'more'</b>"#),
            "&lt;b&gt;&quot;Dune&quot; &amp; &#39;more&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_filter_query_encodes_values() {
        let filters = BookFilters {
            title: "war & peace".to_string(),
            author: String::new(),
            genre: String::new(),
            year: String::new(),
            status: ReadStatus::All,
        };

        let query = filter_query(&filters, ReadStatus::Read);
        assert!(query.contains("title=war%20%26%20peace"));
        assert!(query.ends_with("status=read"));
    }
}
