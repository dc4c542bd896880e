// Polling publisher
//
// A fixed-interval timer drives publish cycles: fetch the detail snapshot,
// serialize it, push it to the topic. Cycles are guarded by an in-flight
// flag: a tick that fires while a cycle is still running is skipped
// outright -- no queueing. The flag is released through a scoped guard so
// a failed cycle can never wedge the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fibridge_api::FiClient;

use crate::error::BridgeError;
use crate::publish::Publish;

/// Non-blocking re-entrancy guard: at most one cycle runs at a time,
/// extra ticks are skipped rather than queued.
#[derive(Debug, Default, Clone)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim the flag. `None` means a cycle is already running.
    pub fn try_begin(&self) -> Option<CycleGuard> {
        if self.0.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(CycleGuard(Arc::clone(&self.0)))
        }
    }

    /// Whether a cycle currently holds the flag.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the in-flight flag on drop, on every exit path including
/// panics and failed cycles.
#[derive(Debug)]
pub struct CycleGuard(Arc<AtomicBool>);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fixed-interval publish loop.
pub struct Poller {
    client: Arc<FiClient>,
    sink: Arc<dyn Publish>,
    topic: String,
    interval: Duration,
    in_flight: InFlight,
}

impl Poller {
    pub fn new(
        client: Arc<FiClient>,
        sink: Arc<dyn Publish>,
        topic: String,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            sink,
            topic,
            interval,
            in_flight: InFlight::new(),
        }
    }

    /// One publish cycle: fetch, serialize, publish, log.
    async fn run_cycle(
        client: &FiClient,
        sink: &dyn Publish,
        topic: &str,
    ) -> Result<(), BridgeError> {
        let snapshot = client.fetch_details().await?;
        let payload = serde_json::to_string(&snapshot)?;
        sink.publish(topic, &payload).await?;
        info!(
            topic,
            bases = snapshot.bases.len(),
            pets = snapshot.pets.len(),
            at = %Utc::now().to_rfc3339(),
            "published detail snapshot"
        );
        Ok(())
    }

    /// Handle one timer tick.
    ///
    /// Skips silently when a cycle is in flight; otherwise spawns the
    /// cycle and returns its handle. Cycle failures are logged and do not
    /// stop the loop.
    pub fn tick(&self) -> Option<JoinHandle<()>> {
        let guard = self.in_flight.try_begin()?;
        let client = Arc::clone(&self.client);
        let sink = Arc::clone(&self.sink);
        let topic = self.topic.clone();

        Some(tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = Self::run_cycle(&client, sink.as_ref(), &topic).await {
                warn!(error = %e, "publish cycle failed");
            }
        }))
    }

    /// Drive ticks until cancelled. The first tick fires after one full
    /// interval, not immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    // The loop never joins cycles; the guard serializes them.
                    let _ = self.tick();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::{Mutex, Notify};
    use tokio_util::sync::CancellationToken;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use fibridge_api::FiClient;

    use super::{InFlight, Poller};
    use crate::error::BridgeError;
    use crate::publish::Publish;

    // ── Fakes ───────────────────────────────────────────────────────

    /// Records every publish.
    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Publish for RecordingSink {
        async fn publish(&self, topic: &str, payload: &str) -> Result<(), BridgeError> {
            self.published
                .lock()
                .await
                .push((topic.into(), payload.into()));
            Ok(())
        }
    }

    /// Blocks inside publish until released, to hold a cycle in flight.
    /// Signals `entered` on the way in so tests can synchronize on the
    /// cycle actually reaching the sink.
    #[derive(Default)]
    struct BlockingSink {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Publish for BlockingSink {
        async fn publish(&self, _topic: &str, _payload: &str) -> Result<(), BridgeError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    /// Signals every successful publish.
    #[derive(Default)]
    struct NotifyingSink {
        published: Notify,
    }

    #[async_trait]
    impl Publish for NotifyingSink {
        async fn publish(&self, _topic: &str, _payload: &str) -> Result<(), BridgeError> {
            self.published.notify_one();
            Ok(())
        }
    }

    /// Always fails, for guard-release-on-error coverage.
    struct FailingSink;

    #[async_trait]
    impl Publish for FailingSink {
        async fn publish(&self, _topic: &str, _payload: &str) -> Result<(), BridgeError> {
            Err(BridgeError::Publish("broker gone".into()))
        }
    }

    fn mock_client(server: &MockServer) -> Arc<FiClient> {
        let base_url = Url::parse(&server.uri()).unwrap();
        Arc::new(FiClient::with_client(
            reqwest::Client::new(),
            base_url,
            "pets@example.com".into(),
            "hunter2".to_string().into(),
        ))
    }

    fn detail_body() -> serde_json::Value {
        json!({
            "data": { "currentUser": { "userHouseholds": [
                { "household": { "bases": [{"id": "b1"}], "pets": [{"id": "p1"}] } }
            ]}}
        })
    }

    // ── Guard tests ─────────────────────────────────────────────────

    #[test]
    fn in_flight_claims_once() {
        let flag = InFlight::new();

        let guard = flag.try_begin();
        assert!(guard.is_some());
        assert!(flag.is_set());
        assert!(flag.try_begin().is_none());

        drop(guard);
        assert!(!flag.is_set());
        assert!(flag.try_begin().is_some());
    }

    // ── Cycle tests ─────────────────────────────────────────────────

    #[tokio::test]
    async fn tick_publishes_snapshot_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body()))
            .mount(&server)
            .await;

        let sink = Arc::new(RecordingSink::default());
        let poller = Poller::new(
            mock_client(&server),
            Arc::clone(&sink) as Arc<dyn Publish>,
            "tryfi/details".into(),
            std::time::Duration::from_millis(10),
        );

        poller.tick().unwrap().await.unwrap();

        let published = sink.published.lock().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "tryfi/details");
        assert_eq!(
            published[0].1,
            r#"{"bases":[{"id":"b1"}],"pets":[{"id":"p1"}]}"#
        );
    }

    #[tokio::test]
    async fn overlapping_tick_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body()))
            .mount(&server)
            .await;

        let sink = Arc::new(BlockingSink::default());
        let poller = Poller::new(
            mock_client(&server),
            Arc::clone(&sink) as Arc<dyn Publish>,
            "tryfi/details".into(),
            std::time::Duration::from_millis(10),
        );

        let first = poller.tick().unwrap();

        // Wait until the first cycle is blocked inside publish, then a
        // second tick must be a no-op.
        sink.entered.notified().await;
        assert!(poller.tick().is_none());

        sink.release.notify_one();
        first.await.unwrap();

        // Once the cycle completes the next tick runs again.
        assert!(poller.tick().is_some());
    }

    #[tokio::test]
    async fn failed_cycle_releases_the_guard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body()))
            .mount(&server)
            .await;

        let poller = Poller::new(
            mock_client(&server),
            Arc::new(FailingSink) as Arc<dyn Publish>,
            "tryfi/details".into(),
            std::time::Duration::from_millis(10),
        );

        poller.tick().unwrap().await.unwrap();

        // The sink failed, but the flag must not stay stuck.
        assert!(poller.tick().is_some());
    }

    #[tokio::test]
    async fn cycle_relogins_on_expired_session() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body()))
            .with_priority(5)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let sink = Arc::new(RecordingSink::default());
        let poller = Poller::new(
            mock_client(&server),
            Arc::clone(&sink) as Arc<dyn Publish>,
            "tryfi/details".into(),
            std::time::Duration::from_millis(10),
        );

        poller.tick().unwrap().await.unwrap();

        let published = sink.published.lock().await;
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].1,
            r#"{"bases":[{"id":"b1"}],"pets":[{"id":"p1"}]}"#
        );
    }

    #[tokio::test]
    async fn run_loop_publishes_until_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body()))
            .mount(&server)
            .await;

        let sink = Arc::new(NotifyingSink::default());
        let poller = Poller::new(
            mock_client(&server),
            Arc::clone(&sink) as Arc<dyn Publish>,
            "tryfi/details".into(),
            std::time::Duration::from_millis(10),
        );

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let handle = tokio::spawn(async move { poller.run(loop_cancel).await });

        // At least one interval-driven cycle reaches the sink, and the
        // loop winds down cleanly on cancellation.
        sink.published.notified().await;
        cancel.cancel();
        handle.await.unwrap();
    }
}
