use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// The todo API. All records are scoped to the caller; requests without a resolvable
/// identity get 401, and ids owned by someone else get 404.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Profile of the caller as stored by the identity provider.
        .route("/me", get(handlers::get_me))
        // GET /todos?completed=&category=&priority=
        // POST /todos
        .route(
            "/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        // GET /todos/stats
        // Totals plus per-priority and per-category counts of pending todos.
        .route("/todos/stats", get(handlers::get_stats))
        // GET/PATCH/DELETE /todos/{id}
        .route(
            "/todos/{id}",
            get(handlers::get_todo)
                .patch(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        // POST /todos/{id}/toggle
        .route("/todos/{id}/toggle", post(handlers::toggle_todo))
}
