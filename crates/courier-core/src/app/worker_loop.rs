//! Worker loop: drain the queued backlog on a fixed schedule.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use crate::domain::{StatusChange, TaskRecord, UpdateError};
use crate::ports::{DownstreamClient, TaskStore};

/// The background worker.
///
/// One tick: snapshot `list_queued()`, then drive each task strictly
/// sequentially through processing -> {done, failed} via the downstream
/// client. Sequential on purpose: it bounds load on the downstream and
/// keeps the single-writer discipline trivially true.
///
/// The timer lives on one dedicated tokio task and uses
/// `MissedTickBehavior::Delay`, so a tick that outlasts the interval simply
/// delays the next one; ticks can never overlap.
pub struct Worker {
    store: Arc<dyn TaskStore>,
    client: Arc<dyn DownstreamClient>,
    interval: Duration,
}

/// Handle to a spawned worker.
/// - `request_shutdown()` で新しい tick の開始を止める
/// - `shutdown_and_join()` で進行中の tick の完了を待つ
pub struct WorkerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Worker {
    pub fn new(
        store: Arc<dyn TaskStore>,
        client: Arc<dyn DownstreamClient>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            client,
            interval,
        }
    }

    /// Spawn the worker on its own tokio task.
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle { shutdown_tx, join }
    }

    async fn run(self, shutdown_rx: &mut watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    // Err は sender（WorkerHandle）が drop された合図なので停止。
                    // それ以外は次のループ先頭でフラグを判定
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            self.tick().await;
        }
    }

    /// One scan-and-process cycle. Public so tests (and one-shot tools) can
    /// drive the worker without the timer.
    pub async fn tick(&self) {
        let snapshot = match self.store.list_queued().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                // Nothing durable happened; the next tick simply rescans.
                error!(error = %err, "queued scan failed, skipping tick");
                return;
            }
        };
        if snapshot.is_empty() {
            return;
        }

        debug!(tasks = snapshot.len(), "draining queued tasks");
        // Tasks created after this snapshot wait for the next tick.
        for task in snapshot {
            self.process_one(task).await;
        }

        if let Ok(counts) = self.store.counts().await {
            debug!(?counts, "tick complete");
        }
    }

    /// Drive a single task to a terminal state. Every failure here is
    /// per-task: logged, recorded where possible, and never allowed to
    /// abort the rest of the tick.
    async fn process_one(&self, task: TaskRecord) {
        let id = task.id;

        // Persist "processing" before the call, so a crash mid-call leaves
        // a visible processing state instead of silently re-running.
        match self.store.update(id, StatusChange::Processing).await {
            Ok(()) => {}
            Err(UpdateError::Stale(stale)) => {
                // Already picked up or resolved; the snapshot was behind.
                debug!(task = %id, %stale, "skipping stale task");
                return;
            }
            Err(UpdateError::Missing(_)) => {
                debug!(task = %id, "record vanished after snapshot, skipping");
                return;
            }
            Err(UpdateError::Store(err)) => {
                error!(task = %id, error = %err, "could not mark task processing");
                return;
            }
        }

        let change = match self.client.invoke(&task.main_url, &task.meme_url).await {
            Ok(response) => StatusChange::Done(response),
            Err(err) => {
                warn!(task = %id, error = %err, "downstream call failed");
                StatusChange::Failed(err.to_string())
            }
        };

        if let Err(err) = self.store.update(id, change).await {
            // The task keeps whatever state was last durably written.
            error!(task = %id, error = %err, "could not record task outcome");
        }
    }
}

impl WorkerHandle {
    /// Request shutdown. Does not cancel an in-flight downstream call; it
    /// stops new ticks from starting.
    pub fn request_shutdown(&self) {
        // ignore send error: receiver may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for the loop to finish its current tick.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DownstreamError, StoreError, TaskId, TaskStatus};
    use crate::impls::InMemoryTaskStore;
    use crate::ports::StatusCounts;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use ulid::Ulid;

    /// Downstream stub: outcome keyed by main_url.
    struct StubClient {
        outcomes: HashMap<String, Result<Value, u16>>,
    }

    impl StubClient {
        fn new() -> Self {
            Self {
                outcomes: HashMap::new(),
            }
        }

        fn ok(mut self, main_url: &str, response: Value) -> Self {
            self.outcomes.insert(main_url.to_string(), Ok(response));
            self
        }

        fn fail(mut self, main_url: &str, status: u16) -> Self {
            self.outcomes.insert(main_url.to_string(), Err(status));
            self
        }
    }

    #[async_trait]
    impl DownstreamClient for StubClient {
        async fn invoke(&self, main_url: &str, _meme_url: &str) -> Result<Value, DownstreamError> {
            match self.outcomes.get(main_url) {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(status)) => Err(DownstreamError::Status(*status)),
                None => Err(DownstreamError::InvalidBody),
            }
        }
    }

    /// Store wrapper that refuses to persist terminal outcomes.
    struct NoTerminalWritesStore {
        inner: InMemoryTaskStore,
    }

    #[async_trait]
    impl TaskStore for NoTerminalWritesStore {
        async fn create(&self, record: TaskRecord) -> Result<TaskId, StoreError> {
            self.inner.create(record).await
        }

        async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>, StoreError> {
            self.inner.get(id).await
        }

        async fn list_queued(&self) -> Result<Vec<TaskRecord>, StoreError> {
            self.inner.list_queued().await
        }

        async fn update(&self, id: TaskId, change: StatusChange) -> Result<(), UpdateError> {
            if !matches!(change, StatusChange::Processing) {
                return Err(UpdateError::Store(StoreError::Io(std::io::Error::other(
                    "disk full",
                ))));
            }
            self.inner.update(id, change).await
        }

        async fn counts(&self) -> Result<StatusCounts, StoreError> {
            self.inner.counts().await
        }
    }

    async fn enqueue(store: &dyn TaskStore, main_url: &str) -> TaskId {
        let id = TaskId::from_ulid(Ulid::new());
        let record = TaskRecord::new(id, main_url, "http://meme", Utc::now()).unwrap();
        store.create(record).await.unwrap()
    }

    fn worker(store: Arc<dyn TaskStore>, client: StubClient) -> Worker {
        Worker::new(store, Arc::new(client), Duration::from_secs(3))
    }

    #[tokio::test]
    async fn tick_drives_a_queued_task_to_done() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let id = enqueue(store.as_ref(), "http://a").await;
        let worker = worker(
            Arc::clone(&store),
            StubClient::new().ok("http://a", json!({"ok": true})),
        );

        worker.tick().await;

        let got = store.get(id).await.unwrap().unwrap();
        assert_eq!(got.status, TaskStatus::Done);
        assert_eq!(got.response, Some(json!({"ok": true})));
        assert!(got.error.is_none());
    }

    #[tokio::test]
    async fn tick_records_a_downstream_failure() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let id = enqueue(store.as_ref(), "http://a").await;
        let worker = worker(Arc::clone(&store), StubClient::new().fail("http://a", 502));

        worker.tick().await;

        let got = store.get(id).await.unwrap().unwrap();
        assert_eq!(got.status, TaskStatus::Failed);
        assert_eq!(got.error.as_deref(), Some("downstream returned status 502"));
        assert!(got.response.is_none());
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_rest_of_the_tick() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let bad = enqueue(store.as_ref(), "http://bad").await;
        let good = enqueue(store.as_ref(), "http://good").await;
        let worker = worker(
            Arc::clone(&store),
            StubClient::new()
                .fail("http://bad", 500)
                .ok("http://good", json!({"n": 1})),
        );

        worker.tick().await;

        assert_eq!(
            store.get(bad).await.unwrap().unwrap().status,
            TaskStatus::Failed
        );
        assert_eq!(
            store.get(good).await.unwrap().unwrap().status,
            TaskStatus::Done
        );
    }

    #[tokio::test]
    async fn tasks_wait_for_a_tick_before_moving() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let id = enqueue(store.as_ref(), "http://a").await;

        // No tick has run; the record is still queued with no outcome.
        let got = store.get(id).await.unwrap().unwrap();
        assert_eq!(got.status, TaskStatus::Queued);
        assert!(got.response.is_none() && got.error.is_none());
    }

    #[tokio::test]
    async fn terminal_snapshot_entries_are_skipped() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let id = enqueue(store.as_ref(), "http://a").await;
        store.update(id, StatusChange::Processing).await.unwrap();
        store
            .update(id, StatusChange::Done(json!({"done": "already"})))
            .await
            .unwrap();
        let worker = worker(
            Arc::clone(&store),
            StubClient::new().ok("http://a", json!({"done": "again"})),
        );

        // Feed the worker a stale snapshot entry directly: the defensive
        // Stale branch must leave the terminal record untouched.
        let stale = TaskRecord::new(id, "http://a", "http://meme", Utc::now()).unwrap();
        worker.process_one(stale).await;

        let got = store.get(id).await.unwrap().unwrap();
        assert_eq!(got.status, TaskStatus::Done);
        assert_eq!(got.response, Some(json!({"done": "already"})));
    }

    #[tokio::test]
    async fn persistence_failure_leaves_last_written_state_and_continues() {
        let store: Arc<dyn TaskStore> = Arc::new(NoTerminalWritesStore {
            inner: InMemoryTaskStore::new(),
        });
        let a = enqueue(store.as_ref(), "http://a").await;
        let b = enqueue(store.as_ref(), "http://b").await;
        let worker = worker(
            Arc::clone(&store),
            StubClient::new()
                .ok("http://a", json!({}))
                .ok("http://b", json!({})),
        );

        worker.tick().await;

        // Terminal writes failed, so both tasks keep the last durably
        // written state (processing) -- and the second task was still
        // attempted.
        assert_eq!(
            store.get(a).await.unwrap().unwrap().status,
            TaskStatus::Processing
        );
        assert_eq!(
            store.get(b).await.unwrap().unwrap().status,
            TaskStatus::Processing
        );
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_worker_ticks_on_schedule_and_shuts_down() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let id = enqueue(store.as_ref(), "http://a").await;
        let handle = Worker::new(
            Arc::clone(&store),
            Arc::new(StubClient::new().ok("http://a", json!({"ok": true}))),
            Duration::from_secs(3),
        )
        .spawn();

        // Paused clock: sleeping auto-advances time past the first tick.
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(
            store.get(id).await.unwrap().unwrap().status,
            TaskStatus::Done
        );

        handle.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_loop() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let handle = Worker::new(
            Arc::clone(&store),
            Arc::new(StubClient::new()),
            Duration::from_secs(3),
        )
        .spawn();

        // Drop the shutdown sender without requesting shutdown: the loop
        // must exit instead of spinning on a closed channel. Under the
        // paused clock a spinning loop never yields to the timeout below.
        let WorkerHandle { shutdown_tx, join } = handle;
        drop(shutdown_tx);

        tokio::time::timeout(Duration::from_secs(30), join)
            .await
            .expect("worker loop should exit when its handle is dropped")
            .unwrap();
    }
}
