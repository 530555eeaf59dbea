mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tldr_pages::core::clock::ManualClock;
use tldr_pages::core::{Principal, SummaryRecord, TaskStatus};
use tldr_pages::errors::SummaryError;
use tldr_pages::queue::{InMemoryQueue, TaskQueue};
use tldr_pages::rate_limit::RateLimiter;
use tldr_pages::service::{RequestBudget, TaskService};
use tldr_pages::store::RecordStore;
use tldr_pages::store::memory::{InMemoryRateLimitStore, InMemoryRecordStore};

struct Fixture {
    store: Arc<InMemoryRecordStore>,
    queue: Arc<InMemoryQueue>,
    service: TaskService,
}

fn fixture(max: u32) -> Fixture {
    let store = Arc::new(InMemoryRecordStore::new());
    let queue = Arc::new(InMemoryQueue::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let limiter = RateLimiter::with_clock(Arc::new(InMemoryRateLimitStore::new()), clock.clone());
    let service = TaskService::new(store.clone(), queue.clone())
        .with_clock(clock)
        .with_rate_limit(
            limiter,
            RequestBudget {
                max,
                window: Duration::from_secs(86_400),
            },
        );
    Fixture {
        store,
        queue,
        service,
    }
}

#[tokio::test]
async fn test_create_task_persists_then_enqueues() {
    let f = fixture(10);
    let user = Principal::User("u1".into());

    let id = f
        .service
        .create_task(&user, "https://example.com/page")
        .await
        .unwrap();

    let stored = f.store.snapshot(&id).unwrap();
    assert_eq!(stored.status, TaskStatus::Requested);
    assert_eq!(stored.source_url, "https://example.com/page");
    assert_eq!(stored.owner_id.as_deref(), Some("u1"));
    assert_eq!(stored.created_at, 1_700_000_000);

    let msgs = f.queue.dequeue(10).await.unwrap();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].task_id, id);
}

#[tokio::test]
async fn test_create_task_rejects_bad_urls() {
    let f = fixture(10);
    for url in ["", "   ", "not a url", "ftp://example.com/file"] {
        let err = f
            .service
            .create_task(&Principal::Service, url)
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::InvalidArgument(_)), "{url}");
    }
    assert!(f.store.is_empty());
    assert_eq!(f.queue.visible_len(), 0);
}

#[tokio::test]
async fn test_create_task_is_rate_limited_per_user() {
    let f = fixture(2);
    let user = Principal::User("u1".into());
    f.service.create_task(&user, "https://a.example").await.unwrap();
    f.service.create_task(&user, "https://b.example").await.unwrap();

    let err = f
        .service
        .create_task(&user, "https://c.example")
        .await
        .unwrap_err();
    assert!(matches!(err, SummaryError::TooManyRequests(_)));
    assert_eq!(f.store.len(), 2);

    // The service credential is never limited.
    f.service
        .create_task(&Principal::Service, "https://d.example")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_task_is_scoped_to_owner() {
    let f = fixture(10);
    let owner = Principal::User("owner".into());
    let id = f
        .service
        .create_task(&owner, "https://example.com")
        .await
        .unwrap();

    assert_eq!(f.service.get_task(&owner, &id).await.unwrap().id, id);
    assert_eq!(f.service.get_task(&Principal::Service, &id).await.unwrap().id, id);
    assert!(matches!(
        f.service
            .get_task(&Principal::User("other".into()), &id)
            .await,
        Err(SummaryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_tasks_defaults_and_filters() {
    let f = fixture(100);
    for i in 0..12 {
        f.service
            .create_task(&Principal::User("u1".into()), &format!("https://e.example/{i}"))
            .await
            .unwrap();
    }

    let page = f
        .service
        .list_tasks(&Principal::Service, None, None, None)
        .await
        .unwrap();
    assert_eq!(page.records.len(), 10);
    assert!(page.next_cursor.is_some());

    let requested = f
        .service
        .list_tasks(&Principal::Service, Some("requested"), None, Some(50))
        .await
        .unwrap();
    assert_eq!(requested.records.len(), 12);
    assert_eq!(requested.next_cursor, None);

    assert!(matches!(
        f.service
            .list_tasks(&Principal::Service, Some("bogus"), None, None)
            .await,
        Err(SummaryError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_list_tasks_hides_other_users_records() {
    let f = fixture(100);
    let alice = Principal::User("alice".into());
    let bob = Principal::User("bob".into());
    f.service.create_task(&alice, "https://a.example").await.unwrap();
    f.service.create_task(&bob, "https://b.example").await.unwrap();

    let page = f.service.list_tasks(&alice, None, None, None).await.unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].owner_id.as_deref(), Some("alice"));
}

async fn seed_owned(store: &InMemoryRecordStore, id: &str, owner: &str) {
    let record = SummaryRecord::new_requested(
        id,
        format!("https://{owner}.example/{id}"),
        Some(owner.to_string()),
        1_700_000_000,
    );
    store.create(&record).await.unwrap();
}

#[tokio::test]
async fn test_list_tasks_skips_other_owners_across_pages() {
    let f = fixture(3);
    for i in 0..30 {
        seed_owned(&f.store, &format!("o{i:02}"), "other").await;
    }
    seed_owned(&f.store, "zz", "u1").await;
    let user = Principal::User("u1".into());

    let page = f.service.list_tasks(&user, None, None, None).await.unwrap();
    let ids: Vec<_> = page.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["zz"]);
    assert_eq!(page.next_cursor, None);

    // One call spent one unit of budget.
    assert!(f.service.list_tasks(&user, None, None, None).await.is_ok());
    assert!(f.service.list_tasks(&user, None, None, None).await.is_ok());
    assert!(matches!(
        f.service.list_tasks(&user, None, None, None).await,
        Err(SummaryError::TooManyRequests(_))
    ));
}

#[tokio::test]
async fn test_list_tasks_resumes_after_last_owned_record() {
    let f = fixture(100);
    for i in 0..20 {
        let owner = if i == 5 || i == 17 { "u1" } else { "other" };
        seed_owned(&f.store, &format!("o{i:02}"), owner).await;
    }
    seed_owned(&f.store, "zz", "u1").await;
    let user = Principal::User("u1".into());

    let first = f
        .service
        .list_tasks(&user, Some("requested"), None, Some(2))
        .await
        .unwrap();
    let ids: Vec<_> = first.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["o05", "o17"]);
    let token = first.next_cursor.expect("more records remain");

    let second = f
        .service
        .list_tasks(&user, Some("requested"), Some(&token), Some(2))
        .await
        .unwrap();
    let ids: Vec<_> = second.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["zz"]);
    assert_eq!(second.next_cursor, None);
}
