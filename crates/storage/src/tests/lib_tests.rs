use super::*;

#[tokio::test]
async fn creates_todo_unchecked_with_fresh_timestamps() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let before = Utc::now();
    let todo = storage.create_todo("Buy milk").await.expect("create");

    assert_eq!(todo.title, "Buy milk");
    assert!(!todo.is_completed);
    assert_eq!(todo.version, 0);
    assert_eq!(todo.created_at, todo.updated_at);
    assert!(todo.updated_at >= before);

    let listed = storage.list_todos().await.expect("list");
    assert_eq!(listed, vec![todo]);
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn lists_todos_in_creation_order() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = storage.create_todo("first").await.expect("first");
    let second = storage.create_todo("second").await.expect("second");

    let ids: Vec<_> = storage
        .list_todos()
        .await
        .expect("list")
        .into_iter()
        .map(|todo| todo.id)
        .collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn toggling_back_and_forth_advances_updated_at() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let todo = storage.create_todo("laundry").await.expect("create");

    let SetCompletedOutcome::Applied(checked) = storage
        .set_completed(todo.id, true, None)
        .await
        .expect("check")
    else {
        panic!("first toggle should apply");
    };
    assert!(checked.is_completed);
    assert!(checked.updated_at > todo.created_at);

    let SetCompletedOutcome::Applied(unchecked) = storage
        .set_completed(todo.id, false, None)
        .await
        .expect("uncheck")
    else {
        panic!("second toggle should apply");
    };
    assert!(!unchecked.is_completed);
    assert!(unchecked.updated_at > checked.updated_at);
    assert_eq!(unchecked.created_at, todo.created_at);

    let loaded = storage
        .load_todo(todo.id)
        .await
        .expect("load")
        .expect("exists");
    assert_eq!(loaded, unchecked);
}

#[tokio::test]
async fn repeated_set_completed_is_accepted_each_time() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let todo = storage.create_todo("water plants").await.expect("create");

    let mut last_updated = todo.updated_at;
    for expected_version in 1..=2 {
        match storage
            .set_completed(todo.id, true, None)
            .await
            .expect("set")
        {
            SetCompletedOutcome::Applied(updated) => {
                assert!(updated.is_completed);
                assert_eq!(updated.version, expected_version);
                assert!(updated.updated_at > last_updated);
                last_updated = updated.updated_at;
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

#[tokio::test]
async fn stale_version_is_rejected_without_changes() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let todo = storage.create_todo("pay rent").await.expect("create");

    let applied = storage
        .set_completed(todo.id, false, Some(2))
        .await
        .expect("newer");
    assert!(matches!(applied, SetCompletedOutcome::Applied(ref t) if t.version == 2));

    let stale = storage
        .set_completed(todo.id, true, Some(1))
        .await
        .expect("older");
    let SetCompletedOutcome::Stale { current } = stale else {
        panic!("older version should be stale");
    };
    assert!(!current.is_completed);
    assert_eq!(current.version, 2);

    let equal = storage
        .set_completed(todo.id, true, Some(2))
        .await
        .expect("equal");
    assert!(matches!(equal, SetCompletedOutcome::Stale { .. }));

    let loaded = storage
        .load_todo(todo.id)
        .await
        .expect("load")
        .expect("exists");
    assert!(!loaded.is_completed);
}

#[tokio::test]
async fn set_completed_on_missing_todo_reports_not_found() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let outcome = storage
        .set_completed(TodoId::new(), true, None)
        .await
        .expect("query");
    assert_eq!(outcome, SetCompletedOutcome::NotFound);
}

#[tokio::test]
async fn completion_survives_reopening_the_database() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("todos.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    let todo = storage.create_todo("Buy milk").await.expect("create");
    storage
        .set_completed(todo.id, true, None)
        .await
        .expect("toggle");
    storage.pool().close().await;
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let todos = reopened.list_todos().await.expect("list");
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].title, "Buy milk");
    assert!(todos[0].is_completed);
    assert!(todos[0].updated_at > todos[0].created_at);
}

async fn file_storage(temp_root: &tempfile::TempDir) -> Storage {
    let db_path = temp_root.path().join("todos.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));
    Storage::new(&database_url).await.expect("db")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_of_different_todos_all_apply() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let storage = file_storage(&temp_root).await;

    let mut ids = Vec::new();
    for index in 0..20 {
        let todo = storage
            .create_todo(&format!("Task {index}"))
            .await
            .expect("create");
        ids.push(todo.id);
    }

    let handles: Vec<_> = ids
        .iter()
        .map(|id| {
            let storage = storage.clone();
            let id = *id;
            tokio::spawn(async move { storage.set_completed(id, true, Some(1)).await })
        })
        .collect();
    for handle in handles {
        let outcome = handle.await.expect("join").expect("toggle");
        assert!(
            matches!(outcome, SetCompletedOutcome::Applied(_)),
            "unexpected outcome: {outcome:?}"
        );
    }

    let todos = storage.list_todos().await.expect("list");
    assert!(todos.iter().all(|todo| todo.is_completed && todo.version == 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tokenless_toggles_of_one_todo_each_bump_the_version() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let storage = file_storage(&temp_root).await;
    let todo = storage.create_todo("Shared").await.expect("create");

    let handles: Vec<_> = (0..16)
        .map(|index| {
            let storage = storage.clone();
            tokio::spawn(async move { storage.set_completed(todo.id, index % 2 == 0, None).await })
        })
        .collect();
    for handle in handles {
        let outcome = handle.await.expect("join").expect("toggle");
        assert!(matches!(outcome, SetCompletedOutcome::Applied(_)));
    }

    let stored = storage
        .load_todo(todo.id)
        .await
        .expect("load")
        .expect("todo exists");
    assert_eq!(stored.version, 16);
}

#[tokio::test]
async fn negative_stored_version_is_an_error_not_zero() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let todo = storage.create_todo("Corrupt").await.expect("create");
    sqlx::query("UPDATE todos SET version = -1 WHERE id = ?")
        .bind(todo.id.to_string())
        .execute(storage.pool())
        .await
        .expect("corrupt row");

    let error = storage.load_todo(todo.id).await.expect_err("malformed row");
    assert!(error.to_string().contains("malformed version -1"));
    assert!(storage.set_completed(todo.id, true, None).await.is_err());
}

#[test]
fn updated_at_never_moves_backwards() {
    let previous = Utc::now();
    let earlier = previous - Duration::seconds(5);
    assert!(next_updated_at(previous, earlier) > previous);
    assert!(next_updated_at(previous, previous) > previous);

    let later = previous + Duration::seconds(5);
    assert_eq!(next_updated_at(previous, later), later);
}

#[test]
fn memory_urls_have_no_file_path() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/todos.db?mode=rwc"),
        Some(PathBuf::from("./data/todos.db"))
    );
}
