//! The composed store end to end: slices, remote data and persistence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use serde_json::json;
use sliceflow_query::{ApiAction, Method, QueryError, RequestId};
use sliceflow_testing::{helpers::init_tracing, test_clock, InMemoryStorage, MockTransport, SequentialIdGenerator};
use std::sync::Arc;
use std::time::Duration;
use workbench::counter::CounterAction;
use workbench::employee::{Employee, EmployeeAction, EmployeeId};
use workbench::posts::{self, CommentDraft, CommentRequest, Post, GET_POSTS, POST_COMMENT};
use workbench::users::{UserAction, UserState};
use workbench::{build_store, AppAction, AppDependencies, AppStore, COUNT_KEY, EMPLOYEE_KEY};

const WAIT: Duration = Duration::from_secs(5);

fn store_with(transport: MockTransport, storage: &Arc<InMemoryStorage>) -> (AppStore, Arc<MockTransport>) {
    init_tracing();
    let transport = Arc::new(transport);
    let store = build_store(AppDependencies {
        transport: Arc::clone(&transport) as _,
        storage: Arc::clone(storage) as _,
        ids: Arc::new(SequentialIdGenerator::new("emp")),
        clock: Arc::new(test_clock()),
    });
    (store, transport)
}

fn posts_json(n: u64) -> serde_json::Value {
    json!((1..=n)
        .map(|id| json!({ "userId": 1, "id": id, "title": format!("title {id}"), "body": "text" }))
        .collect::<Vec<_>>())
}

#[tokio::test]
async fn test_counter_changes_are_persisted() {
    let storage = Arc::new(InMemoryStorage::new());
    let (store, _) = store_with(MockTransport::new(), &storage);

    let _ = store.send(CounterAction::Increment { by: 3 }.into()).await.unwrap();
    let _ = store.send(CounterAction::Decrement { by: 1 }.into()).await.unwrap();

    assert_eq!(storage.value(COUNT_KEY).as_deref(), Some("2"));
    assert_eq!(storage.write_count(), 2);

    // Rejected input leaves the count alone, so nothing is written
    let _ = store.send(CounterAction::Set { value: "x".to_string() }.into()).await.unwrap();
    assert_eq!(storage.write_count(), 2);
    assert!(store.state(|s| s.counter_data.last_error.is_some()).await);
}

#[tokio::test]
async fn test_employee_list_is_persisted_as_json() {
    let storage = Arc::new(InMemoryStorage::new());
    let (store, _) = store_with(MockTransport::new(), &storage);

    let _ = store
        .send(EmployeeAction::Add { name: "Alice".to_string() }.into())
        .await
        .unwrap();
    let _ = store.send(EmployeeAction::Add { name: "Bob".to_string() }.into()).await.unwrap();
    let _ = store
        .send(
            EmployeeAction::Remove {
                id: EmployeeId::new("emp-1"),
            }
            .into(),
        )
        .await
        .unwrap();

    let persisted: serde_json::Value = serde_json::from_str(&storage.value(EMPLOYEE_KEY).unwrap()).unwrap();
    assert_eq!(persisted, json!([{ "id": "emp-2", "name": "Bob" }]));
    assert!(storage.value(COUNT_KEY).is_none());
}

#[tokio::test]
async fn test_store_starts_from_persisted_state() {
    let storage = Arc::new(InMemoryStorage::with_entries([
        (COUNT_KEY, "7"),
        (EMPLOYEE_KEY, r#"[{"id":"x","employeeName":"Carol"}]"#),
    ]));
    let (store, _) = store_with(MockTransport::new(), &storage);

    assert_eq!(store.state(|s| s.counter_data.count).await, 7);
    let names = store
        .state(|s| s.employee_data.employees.iter().map(|e| e.name.clone()).collect::<Vec<_>>())
        .await;
    assert_eq!(names, vec!["Carol"]);
    assert_eq!(storage.write_count(), 0);
}

#[tokio::test]
async fn test_write_failure_does_not_block_dispatch() {
    let storage = Arc::new(InMemoryStorage::new());
    storage.fail_writes(true);
    let (store, _) = store_with(MockTransport::new(), &storage);

    let result = store.send(CounterAction::Increment { by: 1 }.into()).await;

    assert!(result.is_ok());
    assert_eq!(store.state(|s| s.counter_data.count).await, 1);
    assert!(storage.value(COUNT_KEY).is_none());
}

#[tokio::test]
async fn test_user_fetch_fulfills() {
    let storage = Arc::new(InMemoryStorage::new());
    let transport = MockTransport::new().respond(
        "/users",
        json!([{ "id": 1, "name": "Leanne Graham", "username": "Bret", "email": "Sincere@april.biz" }]),
    );
    let (store, _) = store_with(transport, &storage);

    let settled = store
        .send_and_wait_for(
            UserAction::Fetch.into(),
            |a| matches!(a, AppAction::User(UserAction::Fulfilled { .. })),
            WAIT,
        )
        .await
        .unwrap();
    assert!(matches!(settled, AppAction::User(UserAction::Fulfilled { generation: 1, .. })));

    let users = store.state(|s| UserState::clone(&s.user_data)).await;
    assert!(!users.is_loading);
    assert!(users.error.is_none());
    assert_eq!(users.users.len(), 1);
    assert_eq!(users.users[0].username, "Bret");
}

#[tokio::test]
async fn test_user_fetch_failure_records_error() {
    let storage = Arc::new(InMemoryStorage::new());
    let transport = MockTransport::new().fail("/users", QueryError::Request("connection refused".to_string()));
    let (store, _) = store_with(transport, &storage);

    let _ = store
        .send_and_wait_for(
            UserAction::Fetch.into(),
            |a| matches!(a, AppAction::User(UserAction::Rejected { .. })),
            WAIT,
        )
        .await
        .unwrap();

    let users = store.state(|s| UserState::clone(&s.user_data)).await;
    assert!(!users.is_loading);
    assert!(users.users.is_empty());
    assert!(users.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_posts_are_fetched_once_then_served_from_cache() {
    let storage = Arc::new(InMemoryStorage::new());
    let (store, transport) = store_with(MockTransport::new().respond("/posts", posts_json(12)), &storage);
    let path = "/posts".to_string();

    let mut handle = store.send(GET_POSTS.initiate(&path).into()).await.unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();
    let cached = store.snapshot().await;

    let mut handle = store.send(GET_POSTS.initiate(&path).into()).await.unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();

    assert_eq!(transport.requests().len(), 1);
    assert!(Arc::ptr_eq(&cached, &store.snapshot().await));

    let result = GET_POSTS.select(&cached.base_api, &path);
    assert!(result.is_success);
    let all: Vec<Post> = result.data.unwrap();
    assert_eq!(all.len(), 12);
    assert_eq!(posts::first_page(&all).len(), posts::PAGE_SIZE);
}

#[tokio::test]
async fn test_comment_mutation_posts_json_body() {
    let storage = Arc::new(InMemoryStorage::new());
    let transport = MockTransport::new().respond("/posts", json!({ "id": 101 }));
    let (store, transport) = store_with(transport, &storage);

    let post = Post {
        user_id: 3,
        id: 21,
        title: "t".to_string(),
        body: "b".to_string(),
    };
    let request_id = RequestId::new();
    let request = CommentRequest {
        path: "/posts".to_string(),
        body: CommentDraft::for_post(&post, "hello"),
    };

    let mut handle = store
        .send(POST_COMMENT.initiate(request_id, &request).into())
        .await
        .unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, Method::Post);
    assert_eq!(
        sent[0].body,
        Some(json!({ "title": "t", "id": 21, "comment": "hello", "body": "b", "userId": 3 }))
    );

    let result = store.state(|s| POST_COMMENT.select(&s.base_api, &request_id)).await;
    assert!(result.is_success);
    assert_eq!(result.data, Some(json!({ "id": 101 })));
}

#[tokio::test]
async fn test_unknown_post_is_an_error() {
    let storage = Arc::new(InMemoryStorage::new());
    let (store, _) = store_with(MockTransport::new(), &storage);
    let path = posts::post_path(999);

    let mut handle = store
        .send(posts::GET_POST_BY_ID.initiate(&path).into())
        .await
        .unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();

    let result = store.state(|s| posts::GET_POST_BY_ID.select(&s.base_api, &path)).await;
    assert!(result.is_error);
    assert!(result.data.is_none());
}

#[tokio::test]
async fn test_added_employee_survives_reload_with_same_id() {
    let storage = Arc::new(InMemoryStorage::new());
    let (store, _) = store_with(MockTransport::new(), &storage);

    let _ = store
        .send(EmployeeAction::Add { name: "Carol".to_string() }.into())
        .await
        .unwrap();
    let added = store.state(|s| s.employee_data.employees.clone()).await;
    assert_eq!(added.len(), 1);
    store.shutdown(WAIT).await.unwrap();

    let (reloaded, _) = store_with(MockTransport::new(), &storage);
    let restored = reloaded.state(|s| s.employee_data.employees.clone()).await;

    assert_eq!(restored, added);
    assert_eq!(restored[0].name, "Carol");
}

#[tokio::test]
async fn test_replace_all_is_persisted() {
    let storage = Arc::new(InMemoryStorage::new());
    let (store, _) = store_with(MockTransport::new(), &storage);
    let _ = store
        .send(EmployeeAction::Add { name: "Alice".to_string() }.into())
        .await
        .unwrap();

    let replacement = vec![Employee {
        id: EmployeeId::new("z"),
        name: "Zoe".to_string(),
    }];
    let _ = store
        .send(
            EmployeeAction::ReplaceAll {
                employees: replacement.clone(),
            }
            .into(),
        )
        .await
        .unwrap();

    let persisted: Vec<Employee> = serde_json::from_str(&storage.value(EMPLOYEE_KEY).unwrap()).unwrap();
    assert_eq!(persisted, replacement);

    let _ = store
        .send(EmployeeAction::ReplaceAll { employees: Vec::new() }.into())
        .await
        .unwrap();
    assert_eq!(storage.value(EMPLOYEE_KEY).as_deref(), Some("[]"));
}

#[tokio::test]
async fn test_counter_dispatch_shares_employee_slice() {
    let storage = Arc::new(InMemoryStorage::new());
    let (store, _) = store_with(MockTransport::new(), &storage);
    let _ = store
        .send(EmployeeAction::Add { name: "Alice".to_string() }.into())
        .await
        .unwrap();
    let before = store.snapshot().await;

    let _ = store.send(CounterAction::Increment { by: 1 }.into()).await.unwrap();
    let after = store.snapshot().await;

    assert!(!Arc::ptr_eq(&before, &after));
    assert!(Arc::ptr_eq(&before.employee_data, &after.employee_data));
    assert!(Arc::ptr_eq(&before.base_api, &after.base_api));
    assert_eq!(before.counter_data.count, 0);
    assert_eq!(after.counter_data.count, 1);
}

#[allow(clippy::ptr_arg)] // endpoint selectors take `&Arg`
async fn first_post_title(store: &AppStore, path: &String) -> Option<String> {
    store
        .state(|s| GET_POSTS.select(&s.base_api, path).data)
        .await
        .and_then(|posts| posts.first().map(|p| p.title.clone()))
}

#[tokio::test]
async fn test_response_issued_before_reset_is_discarded() {
    let storage = Arc::new(InMemoryStorage::new());
    let transport = MockTransport::new()
        .respond_after(
            "/posts",
            Duration::from_millis(100),
            Ok(json!([{ "userId": 1, "id": 1, "title": "old", "body": "" }])),
        )
        .respond("/posts", json!([{ "userId": 1, "id": 1, "title": "new", "body": "" }]));
    let (store, _) = store_with(transport, &storage);
    let path = "/posts".to_string();
    let mut slow = store.send(GET_POSTS.initiate(&path).into()).await.unwrap();
    let _ = store.send(ApiAction::Reset.into()).await.unwrap();
    let mut fast = store.send(GET_POSTS.initiate(&path).into()).await.unwrap();

    fast.wait_with_timeout(WAIT).await.unwrap();
    assert_eq!(first_post_title(&store, &path).await.as_deref(), Some("new"));

    slow.wait_with_timeout(WAIT).await.unwrap();
    assert_eq!(first_post_title(&store, &path).await.as_deref(), Some("new"));
}

#[tokio::test]
async fn test_read_mutation_result_can_be_removed() {
    let storage = Arc::new(InMemoryStorage::new());
    let (store, _) = store_with(MockTransport::new().respond("/posts", json!({ "id": 101 })), &storage);
    let request_id = RequestId::new();
    let request = CommentRequest {
        path: "/posts".to_string(),
        body: CommentDraft::for_post(
            &Post {
                user_id: 1,
                id: 1,
                title: "t".to_string(),
                body: "b".to_string(),
            },
            "hi",
        ),
    };

    let mut handle = store
        .send(POST_COMMENT.initiate(request_id, &request).into())
        .await
        .unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();
    assert!(store.state(|s| POST_COMMENT.select(&s.base_api, &request_id).is_success).await);

    let _ = store.send(POST_COMMENT.remove_result(request_id).into()).await.unwrap();

    assert!(store.state(|s| s.base_api.mutations.is_empty()).await);
    assert!(store.state(|s| POST_COMMENT.select(&s.base_api, &request_id).is_uninitialized).await);
}
