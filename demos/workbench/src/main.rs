//! Workbench binary
//!
//! Runs a scripted tour over every feature against the configured API and
//! prints what each step left in the store.

use anyhow::Context;
use sliceflow_core::environment::SystemClock;
use sliceflow_query::{HttpTransport, RequestId};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workbench::counter::{CounterAction, CounterState};
use workbench::employee::{EmployeeAction, UuidIdGenerator};
use workbench::posts::{self, CommentDraft, CommentRequest, GET_POSTS, GET_POST_BY_ID, POST_COMMENT};
use workbench::users::{UserAction, UserState};
use workbench::{build_store, AppAction, AppDependencies, AppStore, FileStorage, WorkbenchConfig};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkbenchConfig::load().context("loading configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        api = %config.api_base_url,
        storage = %config.storage_path.display(),
        "Starting workbench"
    );

    let transport = HttpTransport::with_timeout(config.api_base_url.as_str(), config.request_timeout())
        .context("building HTTP client")?;

    let store = build_store(AppDependencies {
        transport: Arc::new(transport),
        storage: Arc::new(FileStorage::new(&config.storage_path)),
        ids: Arc::new(UuidIdGenerator),
        clock: Arc::new(SystemClock),
    });

    println!("=== Workbench ===\n");

    counter_tour(&store).await?;
    employee_tour(&store).await?;
    users_tour(&store).await?;
    posts_tour(&store).await?;

    store.shutdown(SETTLE_TIMEOUT).await.context("shutting down store")?;
    println!("\nDone.");
    Ok(())
}

async fn counter_tour(store: &AppStore) -> anyhow::Result<()> {
    println!("--- Counter ---");
    println!("Restored count: {}", store.state(|s| s.counter_data.count).await);

    for action in [
        CounterAction::Increment { by: 1 },
        CounterAction::Increment { by: 5 },
        CounterAction::Decrement { by: 2 },
        CounterAction::Set { value: "oops".to_string() },
    ] {
        println!(">>> {action:?}");
        let _ = store.send(AppAction::Counter(action)).await?;
        let counter = store.state(|s| CounterState::clone(&s.counter_data)).await;
        match counter.last_error {
            Some(error) => println!("    count = {} (rejected: {error})", counter.count),
            None => println!("    count = {}", counter.count),
        }
    }
    Ok(())
}

async fn employee_tour(store: &AppStore) -> anyhow::Result<()> {
    println!("\n--- Employees ---");

    for name in ["Alice", "Bob"] {
        let _ = store
            .send(AppAction::Employee(EmployeeAction::Add { name: name.to_string() }))
            .await?;
    }

    let first = store.state(|s| s.employee_data.employees.first().map(|e| e.id.clone())).await;
    if let Some(id) = first {
        let _ = store
            .send(AppAction::Employee(EmployeeAction::Update {
                id,
                name: "Alice Liddell".to_string(),
            }))
            .await?;
    }

    for employee in store.state(|s| s.employee_data.employees.clone()).await {
        println!("{}  {}", employee.id, employee.name);
    }
    Ok(())
}

async fn users_tour(store: &AppStore) -> anyhow::Result<()> {
    println!("\n--- Users ---");

    let settled = store
        .send_and_wait_for(
            AppAction::User(UserAction::Fetch),
            |a| matches!(a, AppAction::User(UserAction::Fulfilled { .. } | UserAction::Rejected { .. })),
            SETTLE_TIMEOUT,
        )
        .await?;
    tracing::debug!(?settled, "User fetch settled");

    let users = store.state(|s| UserState::clone(&s.user_data)).await;
    if let Some(error) = users.error {
        println!("Fetch failed: {error}");
    }
    for user in users.users {
        println!("{:>3}  {} <{}>", user.id, user.name, user.email);
    }
    Ok(())
}

async fn posts_tour(store: &AppStore) -> anyhow::Result<()> {
    println!("\n--- Posts ---");

    let list_path = "/posts".to_string();
    let mut handle = store.send(AppAction::Api(GET_POSTS.initiate(&list_path))).await?;
    handle.wait_with_timeout(SETTLE_TIMEOUT).await?;

    let posts = store.state(|s| GET_POSTS.select(&s.base_api, &list_path)).await;
    if let Some(error) = &posts.error {
        println!("Listing failed: {error}");
    }
    for post in posts::first_page(posts.data.as_deref().unwrap_or_default()) {
        println!("{:>3}  {}", post.id, post.title);
    }

    let detail_path = posts::post_path(1);
    let mut handle = store.send(AppAction::Api(GET_POST_BY_ID.initiate(&detail_path))).await?;
    handle.wait_with_timeout(SETTLE_TIMEOUT).await?;

    let Some(post) = store.state(|s| GET_POST_BY_ID.select(&s.base_api, &detail_path)).await.data else {
        println!("Post 1 unavailable");
        return Ok(());
    };
    println!("\n{}\n{}", post.title, post.body);

    let request_id = RequestId::new();
    let request = CommentRequest {
        path: list_path,
        body: CommentDraft::for_post(&post, "Great read"),
    };
    let mut handle = store
        .send(AppAction::Api(POST_COMMENT.initiate(request_id, &request)))
        .await?;
    handle.wait_with_timeout(SETTLE_TIMEOUT).await?;

    let result = store.state(|s| POST_COMMENT.select(&s.base_api, &request_id)).await;
    match (result.data, result.error) {
        (Some(created), _) => println!("Comment accepted: {created}"),
        (None, Some(error)) => println!("Comment failed: {error}"),
        (None, None) => println!("Comment still pending"),
    }
    Ok(())
}
