//! Typed access to one task's run state in the shared store.
//!
//! Values are stored as plain strings: `last_run` as unix seconds, counters
//! as decimal integers, `daily_count_date` as `YYYY-MM-DD` and the lock as
//! `"1"`. Values that fail to decode are treated as absent and logged.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;
use trigger_cache::{CacheError, KvStore};
use trigger_core::{KeyNamespace, RunField};

/// TTL of the daily counter and its date.
pub const DAILY_COUNT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// TTL of the retry counter.
pub const RETRY_COUNT_TTL: Duration = Duration::from_secs(60 * 60);

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Decoded snapshot of the five run-state fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunState {
    pub last_run_at: Option<DateTime<Utc>>,
    pub locked: bool,
    pub daily_count: Option<u32>,
    pub daily_count_date: Option<NaiveDate>,
    pub retry_count: Option<u32>,
}

/// Run-state accessor bound to one task.
pub struct TaskState<'a> {
    store: &'a dyn KvStore,
    namespace: &'a KeyNamespace,
    task: &'a str,
}

impl<'a> TaskState<'a> {
    pub fn new(store: &'a dyn KvStore, namespace: &'a KeyNamespace, task: &'a str) -> Self {
        Self {
            store,
            namespace,
            task,
        }
    }

    fn key(&self, field: RunField) -> String {
        self.namespace.key(self.task, field)
    }

    async fn read<T: FromStr>(&self, field: RunField) -> Result<Option<T>, CacheError> {
        let Some(raw) = self.store.get(&self.key(field)).await? else {
            return Ok(None);
        };
        match raw.trim().parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                warn!(task = self.task, field = %field, value = %raw, "undecodable run-state value, ignoring");
                Ok(None)
            }
        }
    }

    async fn read_date(&self) -> Result<Option<NaiveDate>, CacheError> {
        let Some(raw) = self.store.get(&self.key(RunField::DailyCountDate)).await? else {
            return Ok(None);
        };
        match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
            Ok(date) => Ok(Some(date)),
            Err(_) => {
                warn!(task = self.task, value = %raw, "undecodable daily_count_date, ignoring");
                Ok(None)
            }
        }
    }

    /// Unix seconds of the last successful run.
    pub async fn last_run(&self) -> Result<Option<i64>, CacheError> {
        self.read(RunField::LastRun).await
    }

    pub async fn set_last_run(&self, at: DateTime<Utc>) -> Result<(), CacheError> {
        self.store
            .set(&self.key(RunField::LastRun), &at.timestamp().to_string(), None)
            .await
    }

    /// Executions counted for `today`. A counter whose stored date is another
    /// day counts as zero; a counter without a date is taken as today's.
    pub async fn daily_count(&self, today: NaiveDate) -> Result<u32, CacheError> {
        let count = self.read::<u32>(RunField::DailyCount).await?.unwrap_or(0);
        match self.read_date().await? {
            Some(date) if date != today => Ok(0),
            _ => Ok(count),
        }
    }

    /// Count one execution on `today`, resetting first on day rollover.
    /// Returns the new count.
    pub async fn increment_daily_count(&self, today: NaiveDate) -> Result<u32, CacheError> {
        let count = self.daily_count(today).await?;
        let next = count.saturating_add(1);
        self.store
            .set(
                &self.key(RunField::DailyCount),
                &next.to_string(),
                Some(DAILY_COUNT_TTL),
            )
            .await?;
        self.store
            .set(
                &self.key(RunField::DailyCountDate),
                &today.format(DATE_FORMAT).to_string(),
                Some(DAILY_COUNT_TTL),
            )
            .await?;
        Ok(next)
    }

    /// Take the lock if nobody holds it.
    pub async fn try_lock(&self, ttl: Duration) -> Result<bool, CacheError> {
        self.store
            .set_if_absent(&self.key(RunField::Lock), "1", ttl)
            .await
    }

    pub async fn unlock(&self) -> Result<(), CacheError> {
        self.store.delete(&self.key(RunField::Lock)).await
    }

    pub async fn is_locked(&self) -> Result<bool, CacheError> {
        self.store.has(&self.key(RunField::Lock)).await
    }

    pub async fn retry_count(&self) -> Result<u32, CacheError> {
        Ok(self.read(RunField::Retries).await?.unwrap_or(0))
    }

    pub async fn set_retry_count(&self, count: u32) -> Result<(), CacheError> {
        self.store
            .set(
                &self.key(RunField::Retries),
                &count.to_string(),
                Some(RETRY_COUNT_TTL),
            )
            .await
    }

    pub async fn clear_retries(&self) -> Result<(), CacheError> {
        self.store.delete(&self.key(RunField::Retries)).await
    }

    pub async fn snapshot(&self) -> Result<RunState, CacheError> {
        let last_run_at = self
            .last_run()
            .await?
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        Ok(RunState {
            last_run_at,
            locked: self.is_locked().await?,
            daily_count: self.read(RunField::DailyCount).await?,
            daily_count_date: self.read_date().await?,
            retry_count: self.read(RunField::Retries).await?,
        })
    }

    /// Delete all five fields.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store
            .delete_many(&self.namespace.task_keys(self.task))
            .await
    }
}
