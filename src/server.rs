//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let book_routes = Router::new()
        .route("/", get(handlers::books_list))
        .route(
            "/new",
            get(handlers::book_new_page).post(handlers::book_create),
        )
        .route(
            "/{id}",
            get(handlers::book_page).post(handlers::book_update),
        )
        .route("/{id}/delete", post(handlers::book_delete));

    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/signup",
            get(handlers::signup_page).post(handlers::signup_submit),
        )
        .route(
            "/login",
            get(handlers::login_page).post(handlers::login_submit),
        )
        .route("/logout", post(handlers::logout))
        .nest("/books", book_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
