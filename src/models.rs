use std::{fmt, str::FromStr};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Enumerations ---

/// Role
///
/// Role assigned to a user by the external identity provider. This service only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    User,
    Member,
}

/// Priority
///
/// Urgency level of a todo. Declared from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Category
///
/// Fixed set of buckets a todo can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Category {
    Personal,
    Work,
    Shopping,
    Health,
    Learning,
    Other,
}

/// UnknownVariant
///
/// Returned when a stored text column does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// Enums are persisted as lowercase TEXT, the same spelling serde uses on the wire.
macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

text_enum!(Role, "role", { Admin => "admin", User => "user", Member => "member" });
text_enum!(Priority, "priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});
text_enum!(Category, "category", {
    Personal => "personal",
    Work => "work",
    Shopping => "shopping",
    Health => "health",
    Learning => "learning",
    Other => "other",
});

// --- Core Application Schemas ---

// Postgres TIMESTAMPTZ keeps microseconds. Timestamps are cut to that precision before
// they are stored, so a freshly built record equals the row read back later.
fn stored_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

/// User
///
/// Identity record owned by the external auth provider (`users` table).
/// Looked up on every authenticated request to confirm the caller still exists.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// Todo
///
/// A task owned by exactly one user. `completed_at` is present exactly when `completed` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Todo {
    pub id: Uuid,
    /// Set at creation from the caller identity, never updated afterwards.
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub category: Category,
    #[ts(type = "string | null")]
    pub due_date: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Todo {
    /// Builds a fresh, incomplete todo for `owner_id`.
    pub fn new(owner_id: Uuid, req: CreateTodoRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: req.title,
            description: req.description,
            completed: false,
            priority: req.priority,
            category: req.category,
            due_date: req.due_date.map(stored_precision),
            completed_at: None,
            tags: req.tags,
            created_at: stored_precision(now),
        }
    }

    /// Applies every field present in `patch`. Absent fields are left untouched.
    pub fn apply(&mut self, patch: &UpdateTodoRequest) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(stored_precision(due_date));
        }
        if let Some(tags) = &patch.tags {
            self.tags = Some(tags.clone());
        }
    }

    /// Sets `completed` and keeps `completed_at` in lockstep with it.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        self.completed_at = completed.then(|| stored_precision(now));
    }
}

/// TodoRow
///
/// Raw database row (internal use). Enum columns are TEXT and parsed into `Todo` afterwards.
#[derive(Debug, Clone, FromRow)]
pub struct TodoRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: String,
    pub category: String,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TodoRow> for Todo {
    type Error = UnknownVariant;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        Ok(Todo {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            priority: row.priority.parse()?,
            category: row.category.parse()?,
            due_date: row.due_date,
            completed_at: row.completed_at,
            tags: row.tags,
            created_at: row.created_at,
        })
    }
}

/// UserRow
///
/// Raw `users` row. `role` is TEXT.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = UnknownVariant;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role.as_deref().map(str::parse).transpose()?,
        })
    }
}

// --- Request Payloads (Input Schemas) ---

/// CreateTodoRequest
///
/// Input payload for POST /todos. The owner is never part of the payload; it comes from the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// UpdateTodoRequest
///
/// Partial update payload for PATCH /todos/{id}. A missing field means "leave as is"; there is
/// no way to clear an optional field through this payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UpdateTodoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UpdateTodoRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// TodoFilter
///
/// Query parameters for GET /todos.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, IntoParams, TS, ToSchema)]
#[into_params(parameter_in = Query)]
#[ts(export)]
pub struct TodoFilter {
    pub completed: Option<bool>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
}

/// TodoQuery
///
/// The single index-shaped lookup a `TodoFilter` resolves to. Only one filter is honored per
/// call; see `TodoQuery::from` for the precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoQuery {
    All,
    Completed(bool),
    Category(Category),
    Priority(Priority),
    CompletedInCategory(bool, Category),
}

impl From<TodoFilter> for TodoQuery {
    fn from(filter: TodoFilter) -> Self {
        match filter {
            TodoFilter {
                completed: Some(completed),
                category: Some(category),
                ..
            } => TodoQuery::CompletedInCategory(completed, category),
            TodoFilter {
                completed: Some(completed),
                ..
            } => TodoQuery::Completed(completed),
            TodoFilter {
                category: Some(category),
                ..
            } => TodoQuery::Category(category),
            TodoFilter {
                priority: Some(priority),
                ..
            } => TodoQuery::Priority(priority),
            _ => TodoQuery::All,
        }
    }
}

impl TodoQuery {
    pub fn matches(&self, todo: &Todo) -> bool {
        match *self {
            TodoQuery::All => true,
            TodoQuery::Completed(completed) => todo.completed == completed,
            TodoQuery::Category(category) => todo.category == category,
            TodoQuery::Priority(priority) => todo.priority == priority,
            TodoQuery::CompletedInCategory(completed, category) => {
                todo.completed == completed && todo.category == category
            }
        }
    }
}

// --- Dashboard & Profile Schemas (Output) ---

/// PriorityBreakdown
///
/// Number of *incomplete* todos per priority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PriorityBreakdown {
    pub urgent: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

/// CategoryBreakdown
///
/// Number of *incomplete* todos per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoryBreakdown {
    pub work: i64,
    pub personal: i64,
    pub shopping: i64,
    pub health: i64,
    pub learning: i64,
    pub other: i64,
}

/// TodoStats
///
/// Output schema for GET /todos/stats. `pending` is always `total - completed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TodoStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub by_priority: PriorityBreakdown,
    pub by_category: CategoryBreakdown,
}

impl TodoStats {
    /// Scans the full set of a user's todos. No counters are persisted.
    pub fn tally<'a>(todos: impl IntoIterator<Item = &'a Todo>) -> Self {
        let mut stats = TodoStats::default();
        for todo in todos {
            stats.total += 1;
            if todo.completed {
                stats.completed += 1;
                continue;
            }
            match todo.priority {
                Priority::Urgent => stats.by_priority.urgent += 1,
                Priority::High => stats.by_priority.high += 1,
                Priority::Medium => stats.by_priority.medium += 1,
                Priority::Low => stats.by_priority.low += 1,
            }
            match todo.category {
                Category::Work => stats.by_category.work += 1,
                Category::Personal => stats.by_category.personal += 1,
                Category::Shopping => stats.by_category.shopping += 1,
                Category::Health => stats.by_category.health += 1,
                Category::Learning => stats.by_category.learning += 1,
                Category::Other => stats.by_category.other += 1,
            }
        }
        stats.pending = stats.total - stats.completed;
        stats
    }
}

/// UserProfile
///
/// Output schema for the authenticated user's profile (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}
