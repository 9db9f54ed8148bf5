//! End-to-end orchestrator flow: start, evaluate, hide, export.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sift_core::{
    AiStatus, CuratorConfig, CuratorHandle, Decision, Directive, EmbeddingProvider,
    EvaluationRequest, Event, FeedObserver, HashedEmbedder, MemoryStore, Orchestrator,
    PersistentStore, ProviderFactory, StartOutcome, TargetId, WireMessage,
};

/// Observer recording every delivered directive.
#[derive(Default)]
struct RecordingObserver {
    directives: Mutex<Vec<(TargetId, Directive)>>,
}

impl RecordingObserver {
    fn delivered(&self) -> Vec<(TargetId, Directive)> {
        self.directives.lock().unwrap().clone()
    }
}

impl FeedObserver for RecordingObserver {
    fn ping(&self, _: TargetId) -> BoxFuture<'_, sift_core::Result<()>> {
        async { Ok(()) }.boxed()
    }

    fn send(&self, target: TargetId, directive: Directive) -> BoxFuture<'_, sift_core::Result<()>> {
        async move {
            self.directives.lock().unwrap().push((target, directive));
            Ok(())
        }
        .boxed()
    }

    fn reinject(&self, _: TargetId) -> BoxFuture<'_, sift_core::Result<()>> {
        async { Ok(()) }.boxed()
    }
}

/// Instant local factory; no endpoint, so no probe.
struct InstantFactory {
    builds: AtomicU32,
    fail_always: bool,
}

impl InstantFactory {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            builds: AtomicU32::new(0),
            fail_always: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            builds: AtomicU32::new(0),
            fail_always: true,
        })
    }
}

impl ProviderFactory for InstantFactory {
    fn endpoint(&self) -> String {
        String::new()
    }

    fn import(&self) -> BoxFuture<'_, sift_core::Result<()>> {
        async { Ok(()) }.boxed()
    }

    fn build(&self) -> BoxFuture<'_, sift_core::Result<Arc<dyn EmbeddingProvider>>> {
        async move {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if self.fail_always {
                return Err(sift_core::Error::Network("connection refused".to_string()));
            }
            let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashedEmbedder::new(64));
            Ok(provider)
        }
        .boxed()
    }
}

fn test_config() -> CuratorConfig {
    CuratorConfig {
        retry_backoff_secs: 1,
        grace_period_ms: 1,
        ..CuratorConfig::default()
    }
}

fn spawn(
    config: CuratorConfig,
    store: Arc<dyn PersistentStore>,
    observer: Arc<RecordingObserver>,
    factory: Arc<InstantFactory>,
) -> CuratorHandle {
    Orchestrator::spawn(config, store, observer, factory)
}

async fn wait_for(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    mut predicate: impl FnMut(&Event) -> bool,
) -> Event {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected event did not arrive")
}

#[tokio::test]
async fn start_is_declined_off_the_feed() {
    let handle = spawn(
        test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingObserver::default()),
        InstantFactory::new(),
    );

    let outcome = handle
        .start(Some("https://example.com/news".to_string()), None)
        .await
        .unwrap();
    assert!(matches!(outcome, StartOutcome::Declined { .. }));

    let outcome = handle.start(None, None).await.unwrap();
    assert!(matches!(outcome, StartOutcome::Declined { .. }));

    let status = handle.status().await.unwrap();
    assert!(!status.is_running);
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let handle = spawn(
        test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingObserver::default()),
        InstantFactory::new(),
    );

    let first = handle
        .start(Some("https://x.com/home".to_string()), Some(1))
        .await
        .unwrap();
    assert_eq!(first, StartOutcome::Started);

    let second = handle
        .start(Some("https://x.com/home".to_string()), Some(1))
        .await
        .unwrap();
    assert_eq!(second, StartOutcome::AlreadyRunning);

    handle.stop().await.unwrap();
    handle.stop().await.unwrap();
    let status = handle.status().await.unwrap();
    assert!(!status.is_running);
}

#[tokio::test]
async fn evaluation_logs_broadcasts_and_hides() {
    let store = Arc::new(MemoryStore::new());
    let observer = Arc::new(RecordingObserver::default());
    let handle = spawn(
        test_config(),
        store.clone(),
        observer.clone(),
        InstantFactory::new(),
    );
    let mut events = handle.subscribe();

    handle
        .set_interests(vec!["rust".to_string()], None, None)
        .await
        .unwrap();
    handle
        .start(Some("https://x.com/home".to_string()), Some(7))
        .await
        .unwrap();
    wait_for(&mut events, |e| matches!(e, Event::AiReady)).await;

    handle
        .evaluate(EvaluationRequest {
            id: "spam-1".to_string(),
            text: Some("Buy now! limited offer just for you".to_string()),
            image_urls: vec![],
            video_frames: vec![],
        })
        .await
        .unwrap();

    let activity = wait_for(&mut events, |e| matches!(e, Event::ActivityLog { .. })).await;
    match activity {
        Event::ActivityLog { decision, .. } => assert_eq!(decision, Decision::Hide),
        _ => unreachable!(),
    }

    // Hide directive reaches the observer.
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let delivered = observer.delivered();
            if delivered
                .iter()
                .any(|(t, d)| *t == 7 && matches!(d, Directive::Hide { id } if id == "spam-1"))
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("hide directive was not delivered");

    let log = handle.export_log().await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].id, "spam-1");
    assert_eq!(log[0].decision, Decision::Hide);

    // Decisions are persisted under the curation log key.
    let persisted = store.get("curationLog").unwrap().unwrap();
    assert_eq!(persisted.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn evaluation_is_ignored_while_stopped() {
    let handle = spawn(
        test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingObserver::default()),
        InstantFactory::new(),
    );

    handle
        .evaluate(EvaluationRequest {
            id: "t1".to_string(),
            text: Some("anything at all".to_string()),
            image_urls: vec![],
            video_frames: vec![],
        })
        .await
        .unwrap();

    let log = handle.export_log().await.unwrap();
    assert!(log.is_empty());
}

#[tokio::test]
async fn provider_readiness_enables_semantic_classification() {
    let handle = spawn(
        test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingObserver::default()),
        InstantFactory::new(),
    );
    let mut events = handle.subscribe();

    handle
        .set_interests(vec!["rust programming".to_string()], None, None)
        .await
        .unwrap();
    handle
        .start(Some("https://x.com/home".to_string()), None)
        .await
        .unwrap();
    wait_for(&mut events, |e| matches!(e, Event::AiReady)).await;

    let result = handle
        .classify(Some("rust programming".to_string()))
        .await
        .unwrap();
    assert!(!result.is_uninteresting);
    assert!(result.similarity.is_some());

    let status = handle.status().await.unwrap();
    assert!(status.ai_ready);
    assert_eq!(status.ai_status, AiStatus::Ready);
}

#[tokio::test]
async fn model_failure_degrades_to_fallback_and_schedules_one_retry() {
    let factory = InstantFactory::failing();
    let handle = spawn(
        test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingObserver::default()),
        factory.clone(),
    );
    let mut events = handle.subscribe();

    handle
        .set_interests(vec!["ai".to_string()], None, None)
        .await
        .unwrap();
    handle
        .start(Some("https://x.com/home".to_string()), None)
        .await
        .unwrap();

    let failed = wait_for(&mut events, |e| matches!(e, Event::AiLoadFailed { .. })).await;
    match failed {
        Event::AiLoadFailed { category, .. } => assert_eq!(category, "NetworkError"),
        _ => unreachable!(),
    }
    assert_eq!(factory.builds.load(Ordering::SeqCst), 1);

    // Curation still classifies via the fallback tier.
    let result = handle
        .classify(Some("great ai research thread".to_string()))
        .await
        .unwrap();
    assert!(!result.is_uninteresting);
    assert!(result.similarity.is_none());

    // The single deferred retry fires after the backoff gap.
    wait_for(&mut events, |e| matches!(e, Event::AiLoadFailed { .. })).await;
    assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn manual_retry_resets_and_reacquires() {
    let factory = InstantFactory::failing();
    let handle = spawn(
        test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingObserver::default()),
        factory.clone(),
    );
    let mut events = handle.subscribe();

    handle
        .start(Some("https://x.com/home".to_string()), None)
        .await
        .unwrap();
    wait_for(&mut events, |e| matches!(e, Event::AiLoadFailed { .. })).await;
    let before = factory.builds.load(Ordering::SeqCst);

    handle.retry_model_load().await.unwrap();
    wait_for(&mut events, |e| matches!(e, Event::AiLoadFailed { .. })).await;
    assert!(factory.builds.load(Ordering::SeqCst) > before);
}

#[tokio::test]
async fn deferred_interest_recompute_applies_on_ready() {
    let handle = spawn(
        test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingObserver::default()),
        InstantFactory::new(),
    );
    let mut events = handle.subscribe();

    // Interests set before the provider exists; tier 1 must still work
    // after readiness without another SET_INTERESTS.
    handle
        .set_interests(vec!["quantum computing".to_string()], None, None)
        .await
        .unwrap();
    handle
        .start(Some("https://x.com/home".to_string()), None)
        .await
        .unwrap();
    wait_for(&mut events, |e| matches!(e, Event::AiReady)).await;

    let result = handle
        .classify(Some("quantum computing".to_string()))
        .await
        .unwrap();
    assert!(result.similarity.is_some());
    assert!(!result.is_uninteresting);
}

#[tokio::test]
async fn wire_dispatch_answers_every_tag_and_rejects_unknown() {
    let handle = spawn(
        test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingObserver::default()),
        InstantFactory::new(),
    );

    let reply = handle
        .dispatch_wire(WireMessage::StatusRequest)
        .await
        .unwrap();
    assert_eq!(reply["isRunning"], false);

    let reply = handle
        .dispatch_wire(WireMessage::Classify {
            id: "c1".to_string(),
            text: Some("What I had for breakfast".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(reply["id"], "c1");
    assert_eq!(reply["isUninteresting"], true);

    let unknown: WireMessage = serde_json::from_str(r#"{"type":"NOT_A_MESSAGE"}"#).unwrap();
    let err = handle.dispatch_wire(unknown).await.unwrap_err();
    assert!(err.to_string().contains("unknown message"));
}

#[tokio::test]
async fn interests_are_rehydrated_from_the_store() {
    let store = Arc::new(MemoryStore::new());
    {
        let handle = spawn(
            test_config(),
            store.clone(),
            Arc::new(RecordingObserver::default()),
            InstantFactory::new(),
        );
        handle
            .set_interests(vec!["Finance".to_string()], None, None)
            .await
            .unwrap();
        // Let the orchestrator process the command before tearing down.
        handle.status().await.unwrap();
    }

    let handle = spawn(
        test_config(),
        store,
        Arc::new(RecordingObserver::default()),
        InstantFactory::new(),
    );
    let result = handle
        .classify(Some("the finance newsletter dropped".to_string()))
        .await
        .unwrap();
    assert!(!result.is_uninteresting);
    assert!(result.reason.contains("finance"));
}
