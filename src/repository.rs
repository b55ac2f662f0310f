use crate::error::RepositoryError;
use crate::models::{Todo, TodoQuery, TodoRow, UpdateTodoRequest, User, UserRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence collaborator behind the todo service. Implementations provide indexed
/// lookups by owner, by (owner, completed), by (owner, category) and by (owner, priority),
/// and make each call atomic on its own.
///
/// Every todo-mutating method is additionally scoped by `owner_id`, so a row owned by
/// someone else behaves exactly like a missing row.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>>;

    // --- Todos ---
    async fn insert_todo(&self, todo: &Todo) -> RepositoryResult<()>;
    async fn get_todo(&self, id: Uuid) -> RepositoryResult<Option<Todo>>;
    // Newest-first by creation.
    async fn list_todos(&self, owner_id: Uuid, query: TodoQuery) -> RepositoryResult<Vec<Todo>>;
    // Only the fields present in `patch` are written.
    async fn update_todo(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &UpdateTodoRequest,
    ) -> RepositoryResult<Option<Todo>>;
    // Flips `completed` in one step, stamping `completed_at` with `now` or clearing it.
    async fn toggle_todo(
        &self,
        id: Uuid,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Option<Todo>>;
    // Returns true if a row was removed.
    async fn delete_todo(&self, id: Uuid, owner_id: Uuid) -> RepositoryResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const TODO_COLUMNS: &str = "id, owner_id, title, description, completed, priority, category, \
                            due_date, completed_at, tags, created_at";

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are checked at runtime so the crate builds
/// without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations (`migrations/`).
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, name, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn insert_todo(&self, todo: &Todo) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO todos (id, owner_id, title, description, completed, priority, category,
                               due_date, completed_at, tags, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(todo.id)
        .bind(todo.owner_id)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(todo.priority.as_str())
        .bind(todo.category.as_str())
        .bind(todo.due_date)
        .bind(todo.completed_at)
        .bind(&todo.tags)
        .bind(todo.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_todo(&self, id: Uuid) -> RepositoryResult<Option<Todo>> {
        let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = $1");
        let row = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Todo::try_from).transpose()?)
    }

    /// list_todos
    ///
    /// Builds the owner-scoped query with QueryBuilder so every filter value is bound.
    /// The combined (completed, category) lookup is a real compound predicate, ordered like the others.
    async fn list_todos(&self, owner_id: Uuid, query: TodoQuery) -> RepositoryResult<Vec<Todo>> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {TODO_COLUMNS} FROM todos WHERE owner_id = "));
        builder.push_bind(owner_id);

        match query {
            TodoQuery::All => {}
            TodoQuery::Completed(completed) => {
                builder.push(" AND completed = ");
                builder.push_bind(completed);
            }
            TodoQuery::Category(category) => {
                builder.push(" AND category = ");
                builder.push_bind(category.as_str());
            }
            TodoQuery::Priority(priority) => {
                builder.push(" AND priority = ");
                builder.push_bind(priority.as_str());
            }
            TodoQuery::CompletedInCategory(completed, category) => {
                builder.push(" AND completed = ");
                builder.push_bind(completed);
                builder.push(" AND category = ");
                builder.push_bind(category.as_str());
            }
        }

        builder.push(" ORDER BY created_at DESC");

        let rows = builder
            .build_query_as::<TodoRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(Todo::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// update_todo
    ///
    /// `COALESCE` keeps the stored value for every field the patch leaves out.
    async fn update_todo(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &UpdateTodoRequest,
    ) -> RepositoryResult<Option<Todo>> {
        let sql = format!(
            r#"
            UPDATE todos
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                priority = COALESCE($5, priority),
                category = COALESCE($6, category),
                due_date = COALESCE($7, due_date),
                tags = COALESCE($8, tags)
            WHERE id = $1 AND owner_id = $2
            RETURNING {TODO_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(&patch.title)
            .bind(&patch.description)
            .bind(patch.priority.map(|p| p.as_str()))
            .bind(patch.category.map(|c| c.as_str()))
            .bind(patch.due_date)
            .bind(&patch.tags)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Todo::try_from).transpose()?)
    }

    /// toggle_todo
    ///
    /// The right-hand sides read the pre-update `completed`, so both columns flip together.
    async fn toggle_todo(
        &self,
        id: Uuid,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Option<Todo>> {
        let sql = format!(
            r#"
            UPDATE todos
            SET completed = NOT completed,
                completed_at = CASE WHEN completed THEN NULL ELSE $3 END
            WHERE id = $1 AND owner_id = $2
            RETURNING {TODO_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, TodoRow>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Todo::try_from).transpose()?)
    }

    async fn delete_todo(&self, id: Uuid, owner_id: Uuid) -> RepositoryResult<bool> {
        let res = sqlx::query("DELETE FROM todos WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[derive(Default)]
struct MemoryTables {
    users: HashMap<Uuid, User>,
    todos: Vec<Todo>,
}

/// InMemoryRepository
///
/// `Repository` kept entirely in process memory. Used by the test suites and for local runs
/// without a `DATABASE_URL`. Each call takes the lock once, which makes it atomic.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<MemoryTables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user, standing in for the external identity provider.
    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert_todo(&self, todo: &Todo) -> RepositoryResult<()> {
        self.tables.write().await.todos.push(todo.clone());
        Ok(())
    }

    async fn get_todo(&self, id: Uuid) -> RepositoryResult<Option<Todo>> {
        let tables = self.tables.read().await;
        Ok(tables.todos.iter().find(|t| t.id == id).cloned())
    }

    async fn list_todos(&self, owner_id: Uuid, query: TodoQuery) -> RepositoryResult<Vec<Todo>> {
        let tables = self.tables.read().await;
        let mut todos: Vec<Todo> = tables
            .todos
            .iter()
            .rev()
            .filter(|t| t.owner_id == owner_id && query.matches(t))
            .cloned()
            .collect();
        // Stable, so equal timestamps keep the latest insert first.
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(todos)
    }

    async fn update_todo(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &UpdateTodoRequest,
    ) -> RepositoryResult<Option<Todo>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .todos
            .iter_mut()
            .find(|t| t.id == id && t.owner_id == owner_id)
            .map(|todo| {
                todo.apply(patch);
                todo.clone()
            }))
    }

    async fn toggle_todo(
        &self,
        id: Uuid,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Option<Todo>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .todos
            .iter_mut()
            .find(|t| t.id == id && t.owner_id == owner_id)
            .map(|todo| {
                todo.set_completed(!todo.completed, now);
                todo.clone()
            }))
    }

    async fn delete_todo(&self, id: Uuid, owner_id: Uuid) -> RepositoryResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.todos.len();
        tables
            .todos
            .retain(|t| !(t.id == id && t.owner_id == owner_id));
        Ok(tables.todos.len() < before)
    }
}
