mod common;

use std::time::{Duration, Instant};

use common::{Harness, Scrape, StubScraper, StubSummarizer};
use tldr_pages::core::TaskStatus;
use tldr_pages::queue::TaskQueue;
use tldr_pages::worker::TaskOutcome;
use tldr_pages::worker::pool::{CANCELLED_REASON, PANICKED_REASON};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_empty_queue_is_a_no_op() {
    let h = Harness::new(
        StubScraper::always(Scrape::page("T", "C")),
        StubSummarizer::replying("S"),
    );
    let report = h.pool(10, TIMEOUT).run_cycle().await.unwrap();
    assert!(report.is_empty());
    assert_eq!(h.scraper.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_one_failure_does_not_affect_the_batch() {
    let h = Harness::new(
        StubScraper::always(Scrape::page("T", "C"))
            .with_url("https://b.example", Scrape::Fail("HTTP 503".into())),
        StubSummarizer::replying("Summary"),
    );
    h.submit("a", "https://a.example").await;
    h.submit("b", "https://b.example").await;
    h.submit("c", "https://c.example").await;

    let report = h.pool(10, TIMEOUT).run_cycle().await.unwrap();

    assert_eq!(report.tasks.len(), 3);
    assert_eq!(report.completed(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.acknowledged(), 3);

    assert_eq!(h.record("a").status, TaskStatus::Complete);
    assert_eq!(h.record("c").status, TaskStatus::Complete);
    let b = h.record("b");
    assert_eq!(b.status, TaskStatus::Failed);
    assert!(b.failure_reason.unwrap().contains("HTTP 503"));

    assert_eq!(h.queue.visible_len(), 0);
    assert_eq!(h.queue.in_flight_len(), 0);
}

#[tokio::test]
async fn test_deadline_fails_a_hung_task() {
    let h = Harness::new(
        StubScraper::always(Scrape::page("T", "C"))
            .with_url("https://slow.example", Scrape::Hang),
        StubSummarizer::replying("Summary"),
    );
    h.submit("slow", "https://slow.example").await;
    h.submit("fast", "https://fast.example").await;

    let started = Instant::now();
    let report = h.pool(10, Duration::from_secs(1)).run_cycle().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");

    let slow = h.record("slow");
    assert_eq!(slow.status, TaskStatus::Failed);
    assert_eq!(
        slow.failure_reason.as_deref(),
        Some("Task timed out after 1s")
    );
    assert_eq!(h.record("fast").status, TaskStatus::Complete);
    assert_eq!(report.acknowledged(), 2);
    assert_eq!(h.queue.in_flight_len(), 0);
}

#[tokio::test]
async fn test_batch_size_bounds_each_cycle() {
    let h = Harness::new(
        StubScraper::always(Scrape::page("T", "C")),
        StubSummarizer::replying("S"),
    );
    for i in 0..5 {
        h.submit(&format!("t{i}"), "https://example.com").await;
    }

    let pool = h.pool(2, TIMEOUT);
    let first = pool.run_cycle().await.unwrap();
    assert_eq!(first.tasks.len(), 2);
    assert_eq!(h.queue.visible_len(), 3);

    let rest = pool.run_until_empty().await.unwrap();
    let sizes: Vec<usize> = rest.iter().map(|c| c.tasks.len()).collect();
    assert_eq!(sizes, vec![2, 1]);
    for i in 0..5 {
        assert_eq!(h.record(&format!("t{i}")).status, TaskStatus::Complete);
    }
}

#[tokio::test]
async fn test_redelivered_message_is_rejected_and_deleted() {
    let h = Harness::new(
        StubScraper::always(Scrape::page("T", "C")),
        StubSummarizer::replying("S"),
    );
    h.submit("t1", "https://example.com").await;
    let pool = h.pool(10, TIMEOUT);
    pool.run_cycle().await.unwrap();
    let completed = h.record("t1");

    // At-least-once delivery: the same id arrives again.
    h.queue.enqueue("t1").await.unwrap();
    let report = pool.run_cycle().await.unwrap();

    assert!(matches!(
        report.outcome_of("t1"),
        Some(TaskOutcome::Rejected { .. })
    ));
    assert_eq!(report.acknowledged(), 1);
    assert_eq!(h.record("t1"), completed);
    assert_eq!(h.scraper.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_id_is_rejected_and_deleted() {
    let h = Harness::new(
        StubScraper::always(Scrape::page("T", "C")),
        StubSummarizer::replying("S"),
    );
    h.queue.enqueue("ghost").await.unwrap();

    let report = h.pool(10, TIMEOUT).run_cycle().await.unwrap();
    assert_eq!(report.rejected(), 1);
    assert_eq!(report.acknowledged(), 1);
    assert_eq!(h.queue.in_flight_len(), 0);
}

#[tokio::test]
async fn test_shutdown_cancels_running_units() {
    let h = Harness::new(StubScraper::always(Scrape::Hang), StubSummarizer::replying("S"));
    h.submit("t1", "https://example.com").await;

    let pool = h.pool(10, Duration::from_secs(30));
    let shutdown = pool.shutdown_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.cancel();
    });

    let started = Instant::now();
    let report = pool.run_cycle().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(
        report.outcome_of("t1"),
        Some(&TaskOutcome::Failed {
            reason: CANCELLED_REASON.to_string()
        })
    );
    assert_eq!(h.record("t1").status, TaskStatus::Failed);

    // A cancelled pool runs no further cycles.
    h.submit("t2", "https://example.com").await;
    assert!(pool.run_cycle().await.unwrap().is_empty());
    assert_eq!(h.record("t2").status, TaskStatus::Requested);
}

#[tokio::test]
async fn test_panicked_unit_is_reported_and_left_on_the_queue() {
    let h = Harness::new(
        StubScraper::always(Scrape::page("T", "C"))
            .with_url("https://boom.example", Scrape::Panic),
        StubSummarizer::replying("Summary"),
    );
    h.submit("boom", "https://boom.example").await;
    h.submit("ok", "https://ok.example").await;

    let report = h.pool(10, TIMEOUT).run_cycle().await.unwrap();

    assert_eq!(report.tasks.len(), 2);
    assert_eq!(report.outcome_of("ok"), Some(&TaskOutcome::Completed));
    assert_eq!(
        report.outcome_of("boom"),
        Some(&TaskOutcome::Abandoned {
            reason: PANICKED_REASON.to_string()
        })
    );
    let unacked: Vec<_> = report.unacknowledged().map(|t| t.task_id.as_str()).collect();
    assert_eq!(unacked, vec!["boom"]);

    // The claimed record is not left `processing`.
    let boom = h.record("boom");
    assert_eq!(boom.status, TaskStatus::Failed);
    assert_eq!(boom.failure_reason.as_deref(), Some(PANICKED_REASON));
    assert_eq!(h.record("ok").status, TaskStatus::Complete);
    assert_eq!(h.queue.in_flight_len(), 1);
}
