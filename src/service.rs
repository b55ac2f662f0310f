use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{TodoError, TodoResult},
    models::{CreateTodoRequest, Todo, TodoFilter, TodoQuery, TodoStats, UpdateTodoRequest},
    repository::RepositoryState,
};

/// TodoService
///
/// Owner-scoped access to todos. Every operation starts from the caller identity (or its
/// absence) and goes through the same guard:
///
/// * [`TodoService::authorize`] turns a missing caller into `NotAuthenticated`.
/// * [`TodoService::owned`] additionally loads a record and turns "missing" and "owned by
///   someone else" into the same `NotFound`.
///
/// Persistence, indexing and per-call atomicity belong to the repository.
#[derive(Clone)]
pub struct TodoService {
    repo: RepositoryState,
}

impl TodoService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Resolves the owner id every todo operation is scoped to.
    pub fn authorize(caller: Option<&AuthUser>) -> TodoResult<Uuid> {
        caller.map(|user| user.id).ok_or(TodoError::NotAuthenticated)
    }

    /// Loads `id` on behalf of `caller`, failing with `NotFound` unless the caller owns it.
    pub async fn owned(&self, caller: Option<&AuthUser>, id: Uuid) -> TodoResult<(Uuid, Todo)> {
        let owner_id = Self::authorize(caller)?;
        match self.repo.get_todo(id).await? {
            Some(todo) if todo.owner_id == owner_id => Ok((owner_id, todo)),
            _ => Err(TodoError::NotFound),
        }
    }

    /// list
    ///
    /// Lists the caller's todos, newest first. One filter is honored per call, picked by
    /// `TodoQuery::from`.
    pub async fn list(&self, caller: Option<&AuthUser>, filter: TodoFilter) -> TodoResult<Vec<Todo>> {
        let owner_id = Self::authorize(caller)?;
        let query = TodoQuery::from(filter);
        Ok(self.repo.list_todos(owner_id, query).await?)
    }

    pub async fn get(&self, caller: Option<&AuthUser>, id: Uuid) -> TodoResult<Todo> {
        let (_, todo) = self.owned(caller, id).await?;
        Ok(todo)
    }

    /// create
    ///
    /// Inserts a new, incomplete todo owned by the caller. The title is stored as given.
    pub async fn create(&self, caller: Option<&AuthUser>, req: CreateTodoRequest) -> TodoResult<Todo> {
        let owner_id = Self::authorize(caller)?;
        let todo = Todo::new(owner_id, req, Utc::now());
        self.repo.insert_todo(&todo).await?;
        tracing::debug!(todo_id = %todo.id, owner_id = %owner_id, "todo created");
        Ok(todo)
    }

    /// update
    ///
    /// Applies the fields present in `patch`. An empty patch returns the record untouched.
    pub async fn update(
        &self,
        caller: Option<&AuthUser>,
        id: Uuid,
        patch: UpdateTodoRequest,
    ) -> TodoResult<Todo> {
        let (owner_id, current) = self.owned(caller, id).await?;
        if patch.is_empty() {
            return Ok(current);
        }
        let updated = self
            .repo
            .update_todo(id, owner_id, &patch)
            .await?
            // Deleted between the ownership check and the write.
            .ok_or(TodoError::NotFound)?;
        tracing::debug!(todo_id = %id, "todo updated");
        Ok(updated)
    }

    /// toggle
    ///
    /// Flips completion. `completed_at` is stamped when the todo becomes complete and
    /// cleared when it becomes pending again.
    pub async fn toggle(&self, caller: Option<&AuthUser>, id: Uuid) -> TodoResult<Todo> {
        let (owner_id, _) = self.owned(caller, id).await?;
        let toggled = self
            .repo
            .toggle_todo(id, owner_id, Utc::now())
            .await?
            .ok_or(TodoError::NotFound)?;
        tracing::debug!(todo_id = %id, completed = toggled.completed, "todo toggled");
        Ok(toggled)
    }

    pub async fn delete(&self, caller: Option<&AuthUser>, id: Uuid) -> TodoResult<()> {
        let (owner_id, _) = self.owned(caller, id).await?;
        if !self.repo.delete_todo(id, owner_id).await? {
            return Err(TodoError::NotFound);
        }
        tracing::debug!(todo_id = %id, "todo deleted");
        Ok(())
    }

    /// stats
    ///
    /// Aggregates over the caller's full todo set at call time.
    pub async fn stats(&self, caller: Option<&AuthUser>) -> TodoResult<TodoStats> {
        let owner_id = Self::authorize(caller)?;
        let todos = self.repo.list_todos(owner_id, TodoQuery::All).await?;
        Ok(TodoStats::tally(&todos))
    }
}
