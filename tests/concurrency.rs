//! Concurrent requests sharing one engine.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fixtures::{QUERY, build_engine, documents, quiet_config};
use futures::future::join_all;
use rerank::MockScorer;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_keep_their_own_order() {
    let mock = MockScorer::new().with_latency(Duration::from_millis(5));
    let engine = Arc::new(build_engine(quiet_config().with_batch_size(3), &mock).await);

    let tasks = (0..8).map(|i| {
        let engine = engine.clone();
        tokio::spawn(async move {
            let query = format!("{QUERY} {i}");
            let docs = documents(7);
            let response = engine.get_scores(&query, &docs).await.unwrap();
            (query, docs, response)
        })
    });

    for joined in join_all(tasks).await {
        let (query, docs, response) = joined.unwrap();
        assert!(response.is_complete());
        for (doc, score) in docs.iter().zip(&response.scores) {
            assert_eq!(*score, Some(MockScorer::expected_score(&query, doc)));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_backoff_never_grows_batch_size() {
    let mock = MockScorer::new().with_max_batch(2);
    let engine = Arc::new(build_engine(quiet_config().with_batch_size(16), &mock).await);

    let tasks = (0..4).map(|i| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .get_scores(&format!("query {i}"), &documents(16))
                .await
                .unwrap()
        })
    });

    for joined in join_all(tasks).await {
        assert!(joined.unwrap().is_complete());
    }

    assert_eq!(engine.working_batch_size(), 2);
    let successful = mock.batch_sizes().iter().filter(|&&n| n <= 2).count();
    assert_eq!(successful, 4 * 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shared_cache_across_concurrent_requests() {
    let mock = MockScorer::new();
    let engine = Arc::new(build_engine(quiet_config(), &mock).await);
    let docs = documents(5);

    engine.get_scores(QUERY, &docs).await.unwrap();
    let before = mock.call_count();

    let tasks = (0..4).map(|_| {
        let engine = engine.clone();
        let docs = docs.clone();
        tokio::spawn(async move { engine.get_scores(QUERY, &docs).await.unwrap() })
    });

    for joined in join_all(tasks).await {
        assert_eq!(joined.unwrap().stats.cache_hits, 5);
    }
    assert_eq!(mock.call_count(), before);
}
