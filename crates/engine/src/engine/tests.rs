use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Notify;
use trigger_cache::{CacheError, KvStore, MemoryStore};
use trigger_core::{KeyNamespace, ManualClock, Parameters, TaskDefinition};
use trigger_notify::webhook::WebhookChannel;
use trigger_notify::{Channel, Dispatcher};

use crate::background::BackgroundExecutor;
use crate::engine::TriggerEngine;
use crate::outcome::TaskOutcome;
use crate::runner::{CommandError, CommandRunner};

// ── Fixtures ────────────────────────────────────────────────────────

/// Mock command runner that counts invocations.
#[derive(Default)]
struct MockRunner {
    calls: AtomicUsize,
    /// Fail the first N calls, then succeed.
    fail_first: usize,
    always_fail: bool,
    panics: bool,
    delay: Duration,
    /// When set, each call waits for a permit before finishing.
    gate: Option<Arc<Notify>>,
}

impl MockRunner {
    fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            always_fail: true,
            ..Self::default()
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn execute(&self, _command: &str, _parameters: &Parameters) -> Result<(), CommandError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("runner exploded");
        }
        if self.always_fail || n <= self.fail_first {
            return Err(CommandError::Failed(format!("attempt {n} failed")));
        }
        Ok(())
    }
}

/// Local webhook endpoint collecting every posted payload.
struct EventSink {
    url: String,
    payloads: Arc<Mutex<Vec<Value>>>,
}

impl EventSink {
    async fn start() -> Self {
        let payloads: Arc<Mutex<Vec<Value>>> = Arc::default();
        let sink = payloads.clone();
        let app = Router::new().route(
            "/hook",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(body);
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            url: format!("http://{addr}/hook"),
            payloads,
        }
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(vec![Channel::Webhook(WebhookChannel::new(
            Some(self.url.clone()),
            None,
        ))])
    }

    /// Posted `text` lines, e.g. "Scheduled Task success: backup".
    fn texts(&self) -> Vec<String> {
        self.payloads
            .lock()
            .unwrap()
            .iter()
            .map(|p| p["text"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn messages(&self) -> Vec<String> {
        self.payloads
            .lock()
            .unwrap()
            .iter()
            .map(|p| {
                p["attachments"][0]["fields"][2]["value"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    fn count(&self, event: &str) -> usize {
        let prefix = format!("Scheduled Task {event}:");
        self.texts().iter().filter(|t| t.starts_with(&prefix)).count()
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn backup(interval_minutes: u64) -> TaskDefinition {
    TaskDefinition::new(
        "backup",
        "backup:run",
        Duration::from_secs(interval_minutes * 60),
    )
}

struct Harness {
    engine: TriggerEngine,
    mem: Arc<MemoryStore>,
    store: Arc<dyn KvStore>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new(tasks: Vec<TaskDefinition>, runner: Arc<dyn CommandRunner>) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let mem = Arc::new(MemoryStore::new());
        let store: Arc<dyn KvStore> = mem.clone();
        let engine = TriggerEngine::new(tasks, runner)
            .with_clock(clock.clone())
            .with_namespace(KeyNamespace::new("st"))
            .with_dispatcher(Dispatcher::new(vec![Channel::Log]));
        Self {
            engine,
            mem,
            store,
            clock,
        }
    }

    fn with(mut self, f: impl FnOnce(TriggerEngine) -> TriggerEngine) -> Self {
        self.engine = f(self.engine);
        self
    }

    async fn get(&self, task: &str, field: &str) -> Option<String> {
        self.mem.get(&format!("st:{task}:{field}")).await.unwrap()
    }

    async fn put(&self, task: &str, field: &str, value: &str) {
        self.mem
            .set(&format!("st:{task}:{field}"), value, None)
            .await
            .unwrap();
    }

    async fn set_last_run(&self, task: &str, at: DateTime<Utc>) {
        self.put(task, "last_run", &at.timestamp().to_string()).await;
    }

    async fn run(&self, task: &str) -> TaskOutcome {
        let report = self.engine.evaluate(&self.store).await;
        report.outcome(task).cloned().unwrap_or_else(|| {
            panic!("no outcome for {task} in {report:?}");
        })
    }
}

fn minutes(m: i64) -> TimeDelta {
    TimeDelta::minutes(m)
}

// ── Interval, lock and quota ────────────────────────────────────────

#[tokio::test]
async fn first_run_executes_and_records() {
    let sink = EventSink::start().await;
    let runner = MockRunner::ok();
    let h = Harness::new(vec![backup(60)], runner.clone()).with(|e| e.with_dispatcher(sink.dispatcher()));

    assert_eq!(h.run("backup").await, TaskOutcome::Succeeded);
    assert_eq!(runner.call_count(), 1);
    assert_eq!(h.get("backup", "last_run").await, Some(t0().timestamp().to_string()));
    assert_eq!(h.get("backup", "lock").await, None, "lock released");
    assert_eq!(sink.texts(), vec!["Scheduled Task success: backup"]);
    assert_eq!(sink.messages(), vec!["Task executed successfully"]);
}

#[tokio::test]
async fn first_run_ignores_interval_length() {
    let runner = MockRunner::ok();
    let h = Harness::new(vec![backup(60 * 24 * 365)], runner.clone());
    assert_eq!(h.run("backup").await, TaskOutcome::Succeeded);
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn interval_boundary_is_exclusive() {
    let runner = MockRunner::ok();
    let h = Harness::new(vec![backup(60)], runner.clone());

    h.set_last_run("backup", t0() - minutes(60)).await;
    assert_eq!(h.run("backup").await, TaskOutcome::NotDue);
    assert_eq!(runner.call_count(), 0);

    h.set_last_run("backup", t0() - minutes(60) - TimeDelta::seconds(1)).await;
    assert_eq!(h.run("backup").await, TaskOutcome::Succeeded);
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn recent_run_is_a_noop() {
    let runner = MockRunner::ok();
    let h = Harness::new(vec![backup(60)], runner.clone());
    let last = (t0() - minutes(30)).timestamp().to_string();
    h.put("backup", "last_run", &last).await;

    assert_eq!(h.run("backup").await, TaskOutcome::NotDue);
    assert_eq!(runner.call_count(), 0);
    assert_eq!(h.get("backup", "last_run").await, Some(last));
    assert_eq!(h.mem.len(), 1);
}

#[tokio::test]
async fn held_lock_blocks_execution() {
    let runner = MockRunner::ok();
    let h = Harness::new(vec![backup(60)], runner.clone());
    let last = (t0() - minutes(61)).timestamp().to_string();
    h.put("backup", "last_run", &last).await;
    h.mem
        .set_if_absent("st:backup:lock", "other", Duration::from_secs(300))
        .await
        .unwrap();

    assert_eq!(h.run("backup").await, TaskOutcome::LockHeld);
    assert_eq!(runner.call_count(), 0);
    assert_eq!(h.get("backup", "last_run").await, Some(last));
    assert_eq!(h.get("backup", "lock").await.as_deref(), Some("other"));
}

#[tokio::test]
async fn exhausted_quota_is_silent_until_the_date_changes() {
    let sink = EventSink::start().await;
    let runner = MockRunner::ok();
    let task = backup(1).with_daily_limit(2);
    let h = Harness::new(vec![task], runner.clone()).with(|e| e.with_dispatcher(sink.dispatcher()));

    h.set_last_run("backup", t0() - minutes(2)).await;
    h.put("backup", "daily_count", "2").await;
    h.put("backup", "daily_count_date", "2024-05-01").await;

    assert_eq!(h.run("backup").await, TaskOutcome::QuotaExhausted);
    assert_eq!(runner.call_count(), 0);
    assert!(sink.texts().is_empty());

    // Next calendar day: the stale counter no longer applies and resets on write.
    h.clock.set(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 30).unwrap());
    assert_eq!(h.run("backup").await, TaskOutcome::Succeeded);
    assert_eq!(h.get("backup", "daily_count").await.as_deref(), Some("1"));
    assert_eq!(h.get("backup", "daily_count_date").await.as_deref(), Some("2024-05-02"));
}

#[tokio::test]
async fn quota_counts_successes_within_a_day() {
    let runner = MockRunner::ok();
    let h = Harness::new(vec![backup(1).with_daily_limit(2)], runner.clone());

    assert_eq!(h.run("backup").await, TaskOutcome::Succeeded);
    h.clock.advance(minutes(2));
    assert_eq!(h.run("backup").await, TaskOutcome::Succeeded);
    h.clock.advance(minutes(2));
    assert_eq!(h.run("backup").await, TaskOutcome::QuotaExhausted);
    assert_eq!(runner.call_count(), 2);
    assert_eq!(h.get("backup", "daily_count").await.as_deref(), Some("2"));
}

#[tokio::test]
async fn unlimited_task_keeps_no_counter() {
    let h = Harness::new(vec![backup(60)], MockRunner::ok());
    h.run("backup").await;
    assert_eq!(h.get("backup", "daily_count").await, None);
    assert_eq!(h.get("backup", "daily_count_date").await, None);
}

#[tokio::test]
async fn disabled_task_never_writes() {
    let runner = MockRunner::failing();
    let task = backup(1).disabled().with_daily_limit(1).with_max_retries(3);
    let h = Harness::new(vec![task], runner.clone());

    assert_eq!(h.run("backup").await, TaskOutcome::Disabled);
    assert!(h.mem.is_empty());

    h.put("backup", "last_run", "1").await;
    h.put("backup", "retries", "2").await;
    for _ in 0..3 {
        h.clock.advance(TimeDelta::days(1));
        assert_eq!(h.run("backup").await, TaskOutcome::Disabled);
    }
    assert_eq!(runner.call_count(), 0);
    assert_eq!(h.mem.len(), 2);
    assert_eq!(h.get("backup", "last_run").await.as_deref(), Some("1"));
    assert_eq!(h.get("backup", "retries").await.as_deref(), Some("2"));
}

#[tokio::test]
async fn inactive_engine_skips_everything() {
    let runner = MockRunner::ok();
    let h = Harness::new(vec![backup(60)], runner.clone()).with(|e| e.with_active(false));

    let report = h.engine.evaluate(&h.store).await;
    assert!(!report.active);
    assert!(report.outcomes.is_empty());
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn tasks_are_evaluated_in_configuration_order() {
    let tasks = vec![
        TaskDefinition::new("zeta", "z", Duration::from_secs(60)),
        TaskDefinition::new("alpha", "a", Duration::from_secs(60)).disabled(),
        TaskDefinition::new("mid", "m", Duration::from_secs(60)),
    ];
    let h = Harness::new(tasks, MockRunner::ok());
    let report = h.engine.evaluate(&h.store).await;
    let names: Vec<&str> = report.outcomes.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    assert_eq!(report.executed(), 2);
}

// ── Failures and retries ────────────────────────────────────────────

#[tokio::test]
async fn failure_starts_retry_cycle() {
    let sink = EventSink::start().await;
    let runner = MockRunner::failing();
    let executor = BackgroundExecutor::try_current().unwrap();
    let h = Harness::new(vec![backup(60).with_max_retries(3).with_daily_limit(5)], runner.clone())
        .with(|e| {
            e.with_dispatcher(sink.dispatcher())
                .with_background(executor.clone())
                .with_retry_delay(Duration::from_secs(3600))
        });

    let outcome = h.run("backup").await;
    assert_eq!(outcome, TaskOutcome::Failed("attempt 1 failed".into()));

    assert_eq!(h.get("backup", "retries").await.as_deref(), Some("1"));
    let ttl = h.mem.ttl("st:backup:retries").unwrap();
    assert!(ttl > Duration::from_secs(3590) && ttl <= Duration::from_secs(3600));

    // A failed attempt consumes neither the interval nor the quota.
    assert_eq!(h.get("backup", "last_run").await, None);
    assert_eq!(h.get("backup", "daily_count").await, None);
    assert_eq!(h.get("backup", "lock").await, None);

    assert_eq!(
        sink.texts(),
        vec!["Scheduled Task failure: backup", "Scheduled Task retry: backup"]
    );
    assert_eq!(sink.messages()[0], "Task execution failed: attempt 1 failed");
    assert_eq!(sink.messages()[1], "Retrying task execution (attempt 1/3)");
    assert_eq!(executor.pending(), 1, "one delayed retry scheduled");
}

#[tokio::test]
async fn failure_without_retries_only_notifies() {
    let sink = EventSink::start().await;
    let h = Harness::new(vec![backup(60)], MockRunner::failing())
        .with(|e| e.with_dispatcher(sink.dispatcher()));

    assert!(matches!(h.run("backup").await, TaskOutcome::Failed(_)));
    assert_eq!(h.get("backup", "retries").await, None);
    assert_eq!(sink.texts(), vec!["Scheduled Task failure: backup"]);
}

#[tokio::test]
async fn exhausted_retries_clear_state_and_stop() {
    let sink = EventSink::start().await;
    let executor = BackgroundExecutor::try_current().unwrap();
    let h = Harness::new(vec![backup(60).with_max_retries(3)], MockRunner::failing()).with(|e| {
        e.with_dispatcher(sink.dispatcher())
            .with_background(executor.clone())
    });
    h.put("backup", "retries", "3").await;

    assert!(matches!(h.run("backup").await, TaskOutcome::Failed(_)));
    assert_eq!(h.get("backup", "retries").await, None);
    assert_eq!(executor.pending(), 0, "no retry scheduled");
    assert_eq!(sink.texts(), vec!["Scheduled Task failure: backup"]);
}

#[tokio::test]
async fn background_retry_chain_is_bounded() {
    let sink = EventSink::start().await;
    let runner = MockRunner::failing();
    let executor = BackgroundExecutor::try_current().unwrap();
    let h = Harness::new(vec![backup(60).with_max_retries(3)], runner.clone()).with(|e| {
        e.with_dispatcher(sink.dispatcher())
            .with_background(executor.clone())
            .with_retry_delay(Duration::from_millis(10))
    });

    assert!(matches!(h.run("backup").await, TaskOutcome::Failed(_)));
    executor.wait_idle().await;

    // Initial attempt plus three retries; the fourth failure clears state.
    assert_eq!(runner.call_count(), 4);
    assert_eq!(h.get("backup", "retries").await, None);
    assert_eq!(h.get("backup", "lock").await, None);
    assert_eq!(sink.count("failure"), 4);
    assert_eq!(sink.count("retry"), 3);
    assert_eq!(
        sink.messages()
            .into_iter()
            .filter(|m| m.starts_with("Retrying"))
            .collect::<Vec<_>>(),
        vec![
            "Retrying task execution (attempt 1/3)",
            "Retrying task execution (attempt 2/3)",
            "Retrying task execution (attempt 3/3)",
        ]
    );
}

#[tokio::test]
async fn background_retry_records_success() {
    let runner = Arc::new(MockRunner {
        fail_first: 1,
        ..MockRunner::default()
    });
    let executor = BackgroundExecutor::try_current().unwrap();
    let h = Harness::new(vec![backup(60).with_max_retries(2)], runner.clone()).with(|e| {
        e.with_background(executor.clone())
            .with_retry_delay(Duration::from_millis(10))
    });

    assert!(matches!(h.run("backup").await, TaskOutcome::Failed(_)));
    executor.wait_idle().await;

    assert_eq!(runner.call_count(), 2);
    assert_eq!(h.get("backup", "last_run").await, Some(t0().timestamp().to_string()));
    // Success leaves the retry counter to its own expiry.
    assert_eq!(h.get("backup", "retries").await.as_deref(), Some("1"));
}

#[tokio::test]
async fn background_retry_skips_when_lock_is_held() {
    let runner = MockRunner::failing();
    let executor = BackgroundExecutor::try_current().unwrap();
    let h = Harness::new(vec![backup(60).with_max_retries(3)], runner.clone()).with(|e| {
        e.with_background(executor.clone())
            .with_retry_delay(Duration::from_millis(20))
    });

    h.run("backup").await;
    h.mem
        .set_if_absent("st:backup:lock", "other", Duration::from_secs(300))
        .await
        .unwrap();
    executor.wait_idle().await;

    assert_eq!(runner.call_count(), 1);
    assert_eq!(h.get("backup", "lock").await.as_deref(), Some("other"));
    assert_eq!(h.get("backup", "retries").await.as_deref(), Some("1"));
}

#[tokio::test]
async fn inline_retries_run_before_the_pass_returns() {
    let runner = Arc::new(MockRunner {
        fail_first: 2,
        ..MockRunner::default()
    });
    let h = Harness::new(vec![backup(60).with_max_retries(3)], runner.clone());

    assert_eq!(h.run("backup").await, TaskOutcome::Succeeded);
    assert_eq!(runner.call_count(), 3);
    assert_eq!(h.get("backup", "retries").await.as_deref(), Some("2"));
    assert_eq!(h.get("backup", "last_run").await, Some(t0().timestamp().to_string()));
    assert_eq!(h.get("backup", "lock").await, None);
}

#[tokio::test]
async fn inline_retry_chain_is_bounded() {
    let runner = MockRunner::failing();
    let h = Harness::new(vec![backup(60).with_max_retries(3)], runner.clone());

    assert_eq!(
        h.run("backup").await,
        TaskOutcome::Failed("attempt 4 failed".into())
    );
    assert_eq!(runner.call_count(), 4);
    assert_eq!(h.get("backup", "retries").await, None);
}

#[tokio::test]
async fn panicking_command_is_a_failure_and_releases_lock() {
    let runner = Arc::new(MockRunner {
        panics: true,
        ..MockRunner::default()
    });
    let h = Harness::new(vec![backup(60)], runner.clone());

    match h.run("backup").await {
        TaskOutcome::Failed(msg) => assert!(msg.contains("runner exploded"), "got: {msg}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(h.get("backup", "lock").await, None);
    assert_eq!(h.get("backup", "last_run").await, None);
}

// ── Async dispatch ──────────────────────────────────────────────────

#[tokio::test]
async fn async_task_holds_lock_until_background_run_finishes() {
    let gate = Arc::new(Notify::new());
    let runner = Arc::new(MockRunner {
        gate: Some(gate.clone()),
        ..MockRunner::default()
    });
    let executor = BackgroundExecutor::try_current().unwrap();
    let h = Harness::new(vec![backup(60).with_async(true)], runner.clone())
        .with(|e| e.with_background(executor.clone()));

    assert_eq!(h.run("backup").await, TaskOutcome::Submitted);
    assert!(h.mem.has("st:backup:lock").await.unwrap());
    assert_eq!(h.run("backup").await, TaskOutcome::LockHeld);

    gate.notify_one();
    executor.wait_idle().await;

    assert_eq!(runner.call_count(), 1);
    assert_eq!(h.get("backup", "lock").await, None);
    assert_eq!(h.get("backup", "last_run").await, Some(t0().timestamp().to_string()));
    assert_eq!(h.run("backup").await, TaskOutcome::NotDue);
}

#[tokio::test]
async fn async_task_without_executor_runs_inline() {
    let runner = MockRunner::ok();
    let h = Harness::new(vec![backup(60).with_async(true)], runner.clone());
    assert_eq!(h.run("backup").await, TaskOutcome::Succeeded);
    assert_eq!(runner.call_count(), 1);
}

// ── Containment and isolation ───────────────────────────────────────

/// Store that fails every operation on one task's keys.
struct FlakyStore {
    inner: MemoryStore,
    broken: &'static str,
}

impl FlakyStore {
    fn check(&self, key: &str) -> Result<(), CacheError> {
        if key.contains(self.broken) {
            Err(CacheError::Unsupported(format!("backend down for {key}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.check(key)?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.check(key)?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check(key)?;
        self.inner.delete(key).await
    }

    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        self.check(key)?;
        self.inner.has(key).await
    }
}

#[tokio::test]
async fn store_faults_are_contained_per_task() {
    let runner = MockRunner::ok();
    let tasks = vec![
        TaskDefinition::new("broken", "x", Duration::from_secs(60)),
        TaskDefinition::new("healthy", "y", Duration::from_secs(60)),
    ];
    let h = Harness::new(tasks, runner.clone());
    let store: Arc<dyn KvStore> = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        broken: ":broken:",
    });

    let report = h.engine.evaluate(&store).await;
    assert!(matches!(report.outcome("broken"), Some(TaskOutcome::Errored(_))));
    assert_eq!(report.outcome("healthy"), Some(&TaskOutcome::Succeeded));
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn out_of_range_lock_ttl_does_not_affect_other_tasks() {
    let runner = MockRunner::ok();
    let tasks = vec![
        TaskDefinition::new("big", "x", Duration::from_secs(60))
            .with_lock_duration(Duration::from_secs(i64::MAX as u64)),
        TaskDefinition::new("ok", "y", Duration::from_secs(60)),
    ];
    let h = Harness::new(tasks, runner.clone());

    let report = h.engine.evaluate(&h.store).await;
    assert!(matches!(report.outcome("big"), Some(TaskOutcome::Errored(_))));
    assert_eq!(report.outcome("ok"), Some(&TaskOutcome::Succeeded));
    assert_eq!(runner.call_count(), 1);
    assert_eq!(h.get("big", "lock").await, None);

    // The store stays usable on later passes too.
    h.clock.advance(minutes(2));
    let report = h.engine.evaluate(&h.store).await;
    assert_eq!(report.outcome("ok"), Some(&TaskOutcome::Succeeded));
}

#[tokio::test]
async fn notification_failure_does_not_change_outcome() {
    let sink = EventSink::start().await;
    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        format!("http://{addr}/hook")
    };
    let dispatcher = Dispatcher::new(vec![
        Channel::Webhook(WebhookChannel::new(Some(closed), None)),
        Channel::Webhook(WebhookChannel::new(Some(sink.url.clone()), None)),
    ]);
    let h = Harness::new(vec![backup(60)], MockRunner::ok()).with(|e| e.with_dispatcher(dispatcher));

    assert_eq!(h.run("backup").await, TaskOutcome::Succeeded);
    assert_eq!(sink.texts(), vec!["Scheduled Task success: backup"]);
    assert!(h.get("backup", "last_run").await.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_passes_execute_once() {
    let runner = Arc::new(MockRunner {
        delay: Duration::from_millis(50),
        ..MockRunner::default()
    });
    let h = Arc::new(Harness::new(vec![backup(60)], runner.clone()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move { h.run("backup").await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            TaskOutcome::Succeeded => succeeded += 1,
            TaskOutcome::LockHeld | TaskOutcome::NotDue => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(succeeded, 1);
    assert_eq!(runner.call_count(), 1);
}
