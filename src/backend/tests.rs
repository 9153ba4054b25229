use super::*;
use std::sync::Arc;
use std::time::Duration;

fn docs(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

fn backend(mock: &MockScorer) -> ScoringBackend {
    ScoringBackend::new(Arc::new(mock.clone()), None)
}

#[test]
fn test_state_transitions_are_forward_only() {
    use BackendState::*;

    assert!(Uninitialized.can_transition_to(Warming));
    assert!(Warming.can_transition_to(ReadyCompiled));
    assert!(Warming.can_transition_to(ReadyFallback));
    assert!(ReadyCompiled.can_transition_to(ReadyFallback));

    assert!(!ReadyFallback.can_transition_to(ReadyCompiled));
    assert!(!ReadyCompiled.can_transition_to(Warming));
    assert!(!Warming.can_transition_to(Uninitialized));
    assert!(!ReadyFallback.can_transition_to(ReadyFallback));
}

#[test]
fn test_state_display() {
    assert_eq!(BackendState::ReadyCompiled.to_string(), "ready_compiled");
    assert!(BackendState::ReadyFallback.is_ready());
    assert!(!BackendState::Warming.is_ready());
}

#[test]
fn test_scorer_error_into_batch_error() {
    assert_eq!(
        BatchError::from(ScorerError::resource_exhausted("oom")),
        BatchError::ResourceExhausted {
            reason: "oom".to_string()
        }
    );
    assert!(matches!(
        BatchError::from(ScorerError::compilation_unavailable("nope")),
        BatchError::ComputationFailed { .. }
    ));
}

#[tokio::test]
async fn test_new_backend_is_uninitialized() {
    let mock = MockScorer::new();
    let backend = backend(&mock);

    assert_eq!(backend.state(), BackendState::Uninitialized);
    assert_eq!(backend.execution_path(), ExecutionPath::Fallback);
    assert_eq!(backend.compile_attempts(), 0);
}

#[tokio::test]
async fn test_initialize_without_compile_or_warmup() {
    let mock = MockScorer::new();
    let backend = backend(&mock);

    let report = backend.initialize(false, false).await;

    assert_eq!(report.state, BackendState::ReadyFallback);
    assert!(!report.canary_ok);
    assert_eq!(mock.call_count(), 0);
    assert_eq!(mock.compile_calls(), 0);
}

#[tokio::test]
async fn test_initialize_warmup_runs_canary_on_fallback() {
    let mock = MockScorer::new();
    let backend = backend(&mock);

    let report = backend.initialize(false, true).await;

    assert_eq!(report.state, BackendState::ReadyFallback);
    assert!(report.canary_ok);
    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query, crate::constants::CANARY_QUERY);
    assert_eq!(calls[0].documents.len(), 2);
}

#[tokio::test]
async fn test_compile_unavailable_demotes_to_fallback() {
    let mock = MockScorer::new().with_compile(CompileBehavior::Unavailable);
    let backend = backend(&mock);

    let report = backend.initialize(true, true).await;

    assert_eq!(report.state, BackendState::ReadyFallback);
    assert_eq!(backend.compile_attempts(), 1);
    assert_eq!(mock.compile_calls(), 1);
    assert_eq!(mock.calls_on(MockPath::Fallback), 1);
}

#[tokio::test]
async fn test_compile_success_serves_compiled_path() {
    let mock = MockScorer::new().with_compile(CompileBehavior::Succeeds);
    let backend = backend(&mock);

    let report = backend.initialize(true, true).await;
    assert_eq!(report.state, BackendState::ReadyCompiled);
    assert!(report.canary_ok);
    assert_eq!(backend.execution_path(), ExecutionPath::Compiled);

    let scores = backend
        .score(Arc::from("q"), docs(&["a", "b"]))
        .await
        .expect("compiled scoring");

    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0], MockScorer::expected_score("q", "a"));
    assert_eq!(mock.calls_on(MockPath::Compiled), 2);
    assert_eq!(mock.calls_on(MockPath::Fallback), 0);
}

#[tokio::test]
async fn test_compiled_canary_wrong_shape_demotes() {
    let mock = MockScorer::new().with_compile(CompileBehavior::WrongShape);
    let backend = backend(&mock);

    let report = backend.initialize(true, false).await;

    assert_eq!(report.state, BackendState::ReadyFallback);
    assert_eq!(backend.execution_path(), ExecutionPath::Fallback);
}

#[tokio::test]
async fn test_compiled_runtime_failure_demotes_without_rerunning_batch() {
    let mock = MockScorer::new().with_compile(CompileBehavior::FailsAfterCanary);
    let backend = backend(&mock);

    backend.initialize(true, false).await;
    assert_eq!(backend.state(), BackendState::ReadyCompiled);

    let err = backend
        .score(Arc::from("q"), docs(&["a", "b", "c"]))
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::ComputationFailed { .. }));
    assert_eq!(backend.state(), BackendState::ReadyFallback);
    assert_eq!(mock.calls_on(MockPath::Compiled), 2);
    assert_eq!(mock.calls_on(MockPath::Fallback), 0);

    let scores = backend
        .score(Arc::from("q"), docs(&["d"]))
        .await
        .expect("fallback scoring");
    assert_eq!(scores.len(), 1);
    assert_eq!(mock.calls_on(MockPath::Compiled), 2);
    assert_eq!(mock.calls_on(MockPath::Fallback), 1);
    assert_eq!(mock.compile_calls(), 1);
}

#[tokio::test]
async fn test_slow_compiled_canary_ignores_request_deadline() {
    let mock = MockScorer::new()
        .with_compile(CompileBehavior::Succeeds)
        .with_latency(Duration::from_millis(60));
    let backend = ScoringBackend::new(Arc::new(mock.clone()), Some(Duration::from_millis(20)));

    let report = backend.initialize(true, false).await;

    assert_eq!(report.state, BackendState::ReadyCompiled);
    assert!(report.canary_ok);
    assert_eq!(backend.execution_path(), ExecutionPath::Compiled);
}

#[tokio::test]
async fn test_slow_warmup_canary_ignores_request_deadline() {
    let mock = MockScorer::new().with_latency(Duration::from_millis(60));
    let backend = ScoringBackend::new(Arc::new(mock.clone()), Some(Duration::from_millis(20)));

    let report = backend.initialize(false, true).await;
    assert!(report.canary_ok);

    let err = backend
        .score(Arc::from("q"), docs(&["a"]))
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::DeadlineExceeded { .. }));
}

#[tokio::test]
async fn test_initialize_is_idempotent_once_ready() {
    let mock = MockScorer::new().with_compile(CompileBehavior::Unavailable);
    let backend = backend(&mock);

    backend.initialize(true, true).await;
    let calls = mock.call_count();
    let report = backend.initialize(true, true).await;

    assert_eq!(report.state, BackendState::ReadyFallback);
    assert_eq!(mock.call_count(), calls);
    assert_eq!(mock.compile_calls(), 1);
}

#[tokio::test]
async fn test_warmup_failure_is_not_fatal() {
    let mock = MockScorer::new();
    mock.push_response(MockResponse::ComputationFailed("cold start".into()));
    let backend = backend(&mock);

    let report = backend.initialize(false, true).await;

    assert_eq!(report.state, BackendState::ReadyFallback);
    assert!(!report.canary_ok);
    assert!(backend.score(Arc::from("q"), docs(&["a"])).await.is_ok());
}

#[tokio::test]
async fn test_score_maps_resource_exhaustion() {
    let mock = MockScorer::new().with_max_batch(2);
    let backend = backend(&mock);
    backend.initialize(false, false).await;

    let err = backend
        .score(Arc::from("q"), docs(&["a", "b", "c"]))
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::ResourceExhausted { .. }));
    assert_eq!(backend.state(), BackendState::ReadyFallback);
}

#[tokio::test]
async fn test_score_rejects_wrong_length_output() {
    let mock = MockScorer::new();
    mock.push_response(MockResponse::Scores(vec![0.5]));
    let backend = backend(&mock);
    backend.initialize(false, false).await;

    let err = backend
        .score(Arc::from("q"), docs(&["a", "b"]))
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::ComputationFailed { .. }));
}

#[tokio::test]
async fn test_score_deadline_exceeded() {
    let mock = MockScorer::new().with_latency(Duration::from_millis(300));
    let backend = ScoringBackend::new(Arc::new(mock.clone()), Some(Duration::from_millis(20)));
    backend.initialize(false, false).await;

    let err = backend
        .score(Arc::from("q"), docs(&["a"]))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BatchError::DeadlineExceeded {
            timeout: Duration::from_millis(20)
        }
    );
}

#[tokio::test]
async fn test_compiled_resource_exhaustion_does_not_demote() {
    let mock = MockScorer::new()
        .with_compile(CompileBehavior::Succeeds)
        .with_max_batch(2);
    let backend = backend(&mock);
    backend.initialize(true, false).await;

    let err = backend
        .score(Arc::from("q"), docs(&["a", "b", "c"]))
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::ResourceExhausted { .. }));
    assert_eq!(backend.state(), BackendState::ReadyCompiled);
}
