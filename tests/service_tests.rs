use std::sync::Arc;

use todo_service::{
    InMemoryRepository, TodoService,
    auth::AuthUser,
    error::TodoError,
    models::{Category, CreateTodoRequest, Priority, TodoFilter, UpdateTodoRequest},
};
use uuid::Uuid;

// --- Test Utilities ---

const ALICE: Uuid = Uuid::from_u128(0xA);
const BOB: Uuid = Uuid::from_u128(0xB);

fn caller(id: Uuid) -> AuthUser {
    AuthUser { id, role: None }
}

fn service() -> TodoService {
    TodoService::new(Arc::new(InMemoryRepository::new()))
}

fn new_todo(title: &str, priority: Priority, category: Category) -> CreateTodoRequest {
    CreateTodoRequest {
        title: title.to_string(),
        description: None,
        priority,
        category,
        due_date: None,
        tags: None,
    }
}

// --- Tests ---

#[tokio::test]
async fn test_buy_milk_lifecycle() {
    let svc = service();
    let alice = caller(ALICE);

    let created = svc
        .create(Some(&alice), new_todo("Buy milk", Priority::Medium, Category::Shopping))
        .await
        .unwrap();
    assert_eq!(created.owner_id, ALICE);
    assert!(!created.completed);
    assert!(created.completed_at.is_none());

    let listed = svc.list(Some(&alice), TodoFilter::default()).await.unwrap();
    assert!(listed.iter().any(|t| t.id == created.id && !t.completed));
    let total_before = svc.stats(Some(&alice)).await.unwrap().total;

    let done = svc.toggle(Some(&alice), created.id).await.unwrap();
    assert!(done.completed);
    assert!(done.completed_at.is_some());

    let undone = svc.toggle(Some(&alice), created.id).await.unwrap();
    assert!(!undone.completed);
    assert!(undone.completed_at.is_none());

    svc.delete(Some(&alice), created.id).await.unwrap();
    let listed = svc.list(Some(&alice), TodoFilter::default()).await.unwrap();
    assert!(listed.iter().all(|t| t.id != created.id));
    assert_eq!(svc.stats(Some(&alice)).await.unwrap().total, total_before - 1);
}

#[tokio::test]
async fn test_non_owner_gets_not_found() {
    let svc = service();
    let alice = caller(ALICE);
    let bob = caller(BOB);

    let todo = svc
        .create(Some(&alice), new_todo("Private", Priority::High, Category::Work))
        .await
        .unwrap();

    let patch = UpdateTodoRequest {
        title: Some("Hijacked".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        svc.update(Some(&bob), todo.id, patch).await,
        Err(TodoError::NotFound)
    ));
    assert!(matches!(svc.toggle(Some(&bob), todo.id).await, Err(TodoError::NotFound)));
    assert!(matches!(svc.delete(Some(&bob), todo.id).await, Err(TodoError::NotFound)));
    assert!(matches!(svc.get(Some(&bob), todo.id).await, Err(TodoError::NotFound)));

    // Bob sees none of Alice's records.
    assert!(svc.list(Some(&bob), TodoFilter::default()).await.unwrap().is_empty());

    let still_there = svc.get(Some(&alice), todo.id).await.unwrap();
    assert_eq!(still_there, todo);
}

#[tokio::test]
async fn test_missing_caller_is_not_authenticated() {
    let svc = service();
    let id = Uuid::new_v4();

    assert!(matches!(
        svc.list(None, TodoFilter::default()).await,
        Err(TodoError::NotAuthenticated)
    ));
    assert!(matches!(
        svc.create(None, new_todo("x", Priority::Low, Category::Other)).await,
        Err(TodoError::NotAuthenticated)
    ));
    assert!(matches!(
        svc.update(None, id, UpdateTodoRequest::default()).await,
        Err(TodoError::NotAuthenticated)
    ));
    assert!(matches!(svc.toggle(None, id).await, Err(TodoError::NotAuthenticated)));
    assert!(matches!(svc.delete(None, id).await, Err(TodoError::NotAuthenticated)));
    assert!(matches!(svc.stats(None).await, Err(TodoError::NotAuthenticated)));
}

#[tokio::test]
async fn test_deleted_todo_is_gone_for_every_operation() {
    let svc = service();
    let alice = caller(ALICE);
    let todo = svc
        .create(Some(&alice), new_todo("Ephemeral", Priority::Low, Category::Personal))
        .await
        .unwrap();

    svc.delete(Some(&alice), todo.id).await.unwrap();

    assert!(matches!(svc.get(Some(&alice), todo.id).await, Err(TodoError::NotFound)));
    assert!(matches!(
        svc.update(Some(&alice), todo.id, UpdateTodoRequest::default()).await,
        Err(TodoError::NotFound)
    ));
    assert!(matches!(svc.toggle(Some(&alice), todo.id).await, Err(TodoError::NotFound)));
    assert!(matches!(svc.delete(Some(&alice), todo.id).await, Err(TodoError::NotFound)));
}

#[tokio::test]
async fn test_update_applies_only_present_fields() {
    let svc = service();
    let alice = caller(ALICE);
    let mut req = new_todo("Read book", Priority::Low, Category::Learning);
    req.description = Some("Chapter 1".to_string());
    req.tags = Some(vec!["books".to_string()]);
    let todo = svc.create(Some(&alice), req).await.unwrap();

    let unchanged = svc
        .update(Some(&alice), todo.id, UpdateTodoRequest::default())
        .await
        .unwrap();
    assert_eq!(unchanged, todo);

    let patch = UpdateTodoRequest {
        priority: Some(Priority::Urgent),
        ..Default::default()
    };
    let updated = svc.update(Some(&alice), todo.id, patch).await.unwrap();
    assert_eq!(updated.priority, Priority::Urgent);
    assert_eq!(updated.title, "Read book");
    assert_eq!(updated.description.as_deref(), Some("Chapter 1"));
    assert_eq!(updated.tags, Some(vec!["books".to_string()]));
    assert_eq!(updated.owner_id, ALICE);
    assert_eq!(updated.created_at, todo.created_at);
}

#[tokio::test]
async fn test_update_does_not_touch_completion() {
    let svc = service();
    let alice = caller(ALICE);
    let todo = svc
        .create(Some(&alice), new_todo("Run", Priority::Medium, Category::Health))
        .await
        .unwrap();
    let done = svc.toggle(Some(&alice), todo.id).await.unwrap();

    let patch = UpdateTodoRequest {
        title: Some("Run 5k".to_string()),
        ..Default::default()
    };
    let updated = svc.update(Some(&alice), todo.id, patch).await.unwrap();
    assert!(updated.completed);
    assert_eq!(updated.completed_at, done.completed_at);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let svc = service();
    let alice = caller(ALICE);
    let mut ids = Vec::new();
    for title in ["first", "second", "third"] {
        let todo = svc
            .create(Some(&alice), new_todo(title, Priority::Low, Category::Other))
            .await
            .unwrap();
        ids.push(todo.id);
    }
    ids.reverse();

    let listed: Vec<Uuid> = svc
        .list(Some(&alice), TodoFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn test_list_filters() {
    let svc = service();
    let alice = caller(ALICE);

    let groceries = svc
        .create(Some(&alice), new_todo("Groceries", Priority::High, Category::Shopping))
        .await
        .unwrap();
    let report = svc
        .create(Some(&alice), new_todo("Report", Priority::Urgent, Category::Work))
        .await
        .unwrap();
    let shoes = svc
        .create(Some(&alice), new_todo("Shoes", Priority::Low, Category::Shopping))
        .await
        .unwrap();
    svc.toggle(Some(&alice), shoes.id).await.unwrap();

    let titles = |todos: Vec<todo_service::models::Todo>| -> Vec<String> {
        todos.into_iter().map(|t| t.title).collect()
    };

    let pending = svc
        .list(Some(&alice), TodoFilter { completed: Some(false), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(titles(pending), vec!["Report", "Groceries"]);

    let shopping = svc
        .list(Some(&alice), TodoFilter { category: Some(Category::Shopping), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(titles(shopping), vec!["Shoes", "Groceries"]);

    let urgent = svc
        .list(Some(&alice), TodoFilter { priority: Some(Priority::Urgent), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(urgent.len(), 1);
    assert_eq!(urgent[0].id, report.id);

    let pending_shopping = svc
        .list(
            Some(&alice),
            TodoFilter {
                completed: Some(false),
                category: Some(Category::Shopping),
                priority: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(pending_shopping.len(), 1);
    assert_eq!(pending_shopping[0].id, groceries.id);

    // `completed` outranks `priority`: the priority filter is ignored.
    let completed_with_priority = svc
        .list(
            Some(&alice),
            TodoFilter {
                completed: Some(true),
                category: None,
                priority: Some(Priority::Urgent),
            },
        )
        .await
        .unwrap();
    assert_eq!(titles(completed_with_priority), vec!["Shoes"]);
}

#[tokio::test]
async fn test_stats_count_pending_buckets_only() {
    let svc = service();
    let alice = caller(ALICE);

    let a = svc
        .create(Some(&alice), new_todo("a", Priority::Urgent, Category::Work))
        .await
        .unwrap();
    svc.create(Some(&alice), new_todo("b", Priority::Urgent, Category::Work))
        .await
        .unwrap();
    svc.create(Some(&alice), new_todo("c", Priority::Low, Category::Health))
        .await
        .unwrap();
    svc.toggle(Some(&alice), a.id).await.unwrap();

    // Another user's data never leaks into the counts.
    svc.create(Some(&caller(BOB)), new_todo("d", Priority::High, Category::Work))
        .await
        .unwrap();

    let stats = svc.stats(Some(&alice)).await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, stats.total - stats.completed);
    assert_eq!(stats.by_priority.urgent, 1);
    assert_eq!(stats.by_priority.low, 1);
    assert_eq!(stats.by_priority.high, 0);
    assert_eq!(stats.by_category.work, 1);
    assert_eq!(stats.by_category.health, 1);
}

#[tokio::test]
async fn test_completed_at_tracks_completed() {
    let svc = service();
    let alice = caller(ALICE);
    let todo = svc
        .create(Some(&alice), new_todo("Flip", Priority::Medium, Category::Other))
        .await
        .unwrap();

    for _ in 0..4 {
        let t = svc.toggle(Some(&alice), todo.id).await.unwrap();
        assert_eq!(t.completed, t.completed_at.is_some());
    }
    let listed = svc.list(Some(&alice), TodoFilter::default()).await.unwrap();
    assert!(listed.iter().all(|t| t.completed == t.completed_at.is_some()));
}
