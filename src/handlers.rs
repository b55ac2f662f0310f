use crate::{
    AppState,
    auth::AuthUser,
    error::{ErrorBody, TodoError, TodoResult},
    models::{CreateTodoRequest, Todo, TodoFilter, TodoStats, UpdateTodoRequest, UserProfile},
    service::TodoService,
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use uuid::Uuid;

// The service accepts titles as given; trimming and the non-blank rule live at this boundary.
fn normalize_title(title: String) -> TodoResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TodoError::BlankTitle);
    }
    Ok(trimmed.to_string())
}

// Blank descriptions are dropped rather than stored. On a patch that means "leave as is".
fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

// --- Handlers ---
//
// Extractors that can fail on client input are taken as `Result`, so the caller is checked
// first and a malformed request still answers with the JSON error body.

/// get_me
///
/// Returns the caller's profile as recorded by the identity provider.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn get_me(
    caller: AuthUser,
    State(state): State<AppState>,
) -> TodoResult<Json<UserProfile>> {
    let user = state
        .repo
        .get_user(caller.id)
        .await?
        .ok_or(TodoError::NotAuthenticated)?;
    Ok(Json(user.into()))
}

/// list_todos
///
/// Lists the caller's todos, newest first, optionally narrowed by one filter.
#[utoipa::path(
    get,
    path = "/todos",
    params(TodoFilter),
    responses(
        (status = 200, description = "Caller's todos", body = [Todo]),
        (status = 400, description = "Malformed filter", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn list_todos(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    filter: Result<Query<TodoFilter>, QueryRejection>,
) -> TodoResult<Json<Vec<Todo>>> {
    TodoService::authorize(caller.as_ref())?;
    let Query(filter) = filter?;
    let todos = state.todos.list(caller.as_ref(), filter).await?;
    Ok(Json(todos))
}

/// create_todo
///
/// Creates a todo owned by the caller. Blank titles are rejected with 422.
#[utoipa::path(
    post,
    path = "/todos",
    request_body = CreateTodoRequest,
    responses(
        (status = 201, description = "Created", body = Todo),
        (status = 400, description = "Malformed body", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 422, description = "Blank title", body = ErrorBody)
    )
)]
pub async fn create_todo(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> TodoResult<(StatusCode, Json<Todo>)> {
    TodoService::authorize(caller.as_ref())?;
    let Json(mut payload) = payload?;
    payload.title = normalize_title(payload.title)?;
    payload.description = normalize_description(payload.description);
    let todo = state.todos.create(caller.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

/// get_todo
///
/// Fetches a single todo. Records owned by other users are reported as 404.
#[utoipa::path(
    get,
    path = "/todos/{id}",
    params(("id" = Uuid, Path, description = "Todo ID")),
    responses(
        (status = 200, description = "Found", body = Todo),
        (status = 404, description = "Not found or not yours", body = ErrorBody)
    )
)]
pub async fn get_todo(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> TodoResult<Json<Todo>> {
    TodoService::authorize(caller.as_ref())?;
    let Path(id) = id?;
    Ok(Json(state.todos.get(caller.as_ref(), id).await?))
}

/// update_todo
///
/// Partial update: only the fields present in the body are changed.
#[utoipa::path(
    patch,
    path = "/todos/{id}",
    params(("id" = Uuid, Path, description = "Todo ID")),
    request_body = UpdateTodoRequest,
    responses(
        (status = 200, description = "Updated", body = Todo),
        (status = 400, description = "Malformed id or body", body = ErrorBody),
        (status = 404, description = "Not found or not yours", body = ErrorBody),
        (status = 422, description = "Blank title", body = ErrorBody)
    )
)]
pub async fn update_todo(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    patch: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> TodoResult<Json<Todo>> {
    TodoService::authorize(caller.as_ref())?;
    let Path(id) = id?;
    let Json(mut patch) = patch?;
    patch.title = patch.title.map(normalize_title).transpose()?;
    patch.description = normalize_description(patch.description);
    let todo = state.todos.update(caller.as_ref(), id, patch).await?;
    Ok(Json(todo))
}

/// toggle_todo
///
/// Flips the completion state and returns the updated record.
#[utoipa::path(
    post,
    path = "/todos/{id}/toggle",
    params(("id" = Uuid, Path, description = "Todo ID")),
    responses(
        (status = 200, description = "Toggled", body = Todo),
        (status = 404, description = "Not found or not yours", body = ErrorBody)
    )
)]
pub async fn toggle_todo(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> TodoResult<Json<Todo>> {
    TodoService::authorize(caller.as_ref())?;
    let Path(id) = id?;
    Ok(Json(state.todos.toggle(caller.as_ref(), id).await?))
}

/// delete_todo
#[utoipa::path(
    delete,
    path = "/todos/{id}",
    params(("id" = Uuid, Path, description = "Todo ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not yours", body = ErrorBody)
    )
)]
pub async fn delete_todo(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> TodoResult<StatusCode> {
    TodoService::authorize(caller.as_ref())?;
    let Path(id) = id?;
    state.todos.delete(caller.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// get_stats
///
/// Dashboard counters for the caller.
#[utoipa::path(
    get,
    path = "/todos/stats",
    responses(
        (status = 200, description = "Stats", body = TodoStats),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn get_stats(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
) -> TodoResult<Json<TodoStats>> {
    Ok(Json(state.todos.stats(caller.as_ref()).await?))
}
