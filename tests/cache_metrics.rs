mod common;

use std::collections::HashSet;

use metrics_util::debugging::DebuggingRecorder;
use sqlx::SqlitePool;
use yatube::application::feed::FeedScope;
use yatube::cache::CacheConfig;

use common::TestApp;

#[sqlx::test(migrations = "./migrations")]
async fn feed_reads_and_writes_emit_cache_metrics(pool: SqlitePool) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let app = TestApp::with_cache(
        pool,
        CacheConfig {
            capacity: 1,
            ..Default::default()
        },
    );
    let author = app.user("SteveJ").await;
    app.post(&author, "metrics", None).await;

    // miss, then hit
    app.feed.get_page(FeedScope::All, 1).await.expect("feed");
    app.feed.get_page(FeedScope::All, 1).await.expect("feed");
    // a second feed evicts the first at capacity one
    app.feed
        .get_page(FeedScope::ByAuthor("SteveJ".to_string()), 1)
        .await
        .expect("feed");
    // the author feed is cached, so a new post invalidates it
    app.post(&author, "metrics again", None).await;

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "yatube_feed_cache_hit_total",
        "yatube_feed_cache_miss_total",
        "yatube_feed_cache_evict_total",
        "yatube_feed_cache_invalidated_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
