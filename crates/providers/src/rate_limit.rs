//! Minimum-interval rate limiting for outbound LLM calls.
//!
//! The limiter remembers when the previous call went out and, on the next
//! call, suspends the caller until the configured interval has passed.
//! Where that timestamp lives is pluggable:
//!
//! - [`MemoryTimestampStore`] — scoped to this process
//! - [`FileTimestampStore`] — a small JSON record on disk, shared by every
//!   process pointed at the same path
//!
//! Time itself comes from a [`Clock`], so tests can run without real sleeps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Source of wall-clock time and suspension.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// The real clock: `Utc::now()` and `tokio::time::sleep`.
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Storage for the last-call timestamp.
///
/// Implementations never fail: unreadable state is reported as `None`
/// ("infinitely long ago") and failed writes are logged and dropped.
pub trait TimestampStore: Send + Sync {
    fn load(&self) -> Option<DateTime<Utc>>;

    /// Claim the next call slot and record it as the last call, as one
    /// atomic step. Returns the instant the caller may proceed.
    fn reserve(&self, now: DateTime<Utc>, min_interval: Duration) -> DateTime<Utc>;
}

/// Earliest instant at least `min_interval` after `last`, and never before
/// `now`. A `last` in the future is a slot another caller already holds.
fn next_slot(
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    min_interval: Duration,
) -> DateTime<Utc> {
    last.and_then(|last| {
        chrono::Duration::from_std(min_interval)
            .ok()
            .and_then(|interval| last.checked_add_signed(interval))
    })
    .map_or(now, |earliest| earliest.max(now))
}

/// Process-local timestamp store.
#[derive(Default)]
pub struct MemoryTimestampStore {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryTimestampStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimestampStore for MemoryTimestampStore {
    fn load(&self) -> Option<DateTime<Utc>> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reserve(&self, now: DateTime<Utc>, min_interval: Duration) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let slot = next_slot(*last, now, min_interval);
        *last = Some(slot);
        slot
    }
}

/// On-disk record: `{"last_call": "<RFC 3339>"}`.
#[derive(Debug, Serialize, Deserialize)]
struct LastCallRecord {
    last_call: DateTime<Utc>,
}

/// Timestamp store backed by a JSON file.
///
/// Every access holds an exclusive lock on a sibling `<path>.lock` file, and
/// a reservation keeps it across the read and the write, so processes
/// sharing the path queue up one interval apart. Writes go to `<path>.tmp`
/// first and are renamed into place, so a reader never sees a half-written
/// record.
pub struct FileTimestampStore {
    path: PathBuf,
}

impl FileTimestampStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Open (creating if needed) and exclusively lock the lock file.
    /// The lock is released when the returned handle is dropped.
    fn lock(&self) -> std::io::Result<std::fs::File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.sibling(".lock"))?;
        file.lock_exclusive()?;
        Ok(file)
    }

    /// Caller must hold the lock.
    fn read_record(&self) -> std::io::Result<Option<DateTime<Utc>>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        match serde_json::from_str::<LastCallRecord>(&content) {
            Ok(record) => Ok(Some(record.last_call)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt rate-limit record");
                Ok(None)
            }
        }
    }

    /// Caller must hold the lock.
    fn write_record(&self, at: DateTime<Utc>) -> std::io::Result<()> {
        let body = serde_json::to_string(&LastCallRecord { last_call: at })?;
        let tmp = self.sibling(".tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)
    }

    fn reserve_locked(
        &self,
        now: DateTime<Utc>,
        min_interval: Duration,
    ) -> std::io::Result<DateTime<Utc>> {
        let _lock = self.lock()?;
        let last = self.read_record().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Rate-limit record unreadable");
            None
        });
        let slot = next_slot(last, now, min_interval);
        self.write_record(slot)?;
        Ok(slot)
    }
}

impl TimestampStore for FileTimestampStore {
    fn load(&self) -> Option<DateTime<Utc>> {
        self.lock()
            .and_then(|_lock| self.read_record())
            .unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "Rate-limit record unreadable");
                None
            })
    }

    fn reserve(&self, now: DateTime<Utc>, min_interval: Duration) -> DateTime<Utc> {
        self.reserve_locked(now, min_interval).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to persist rate-limit record");
            now
        })
    }
}

/// Enforces a minimum wall-clock gap between consecutive calls.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    store: Box<dyn TimestampStore>,
    default_interval: Duration,
}

impl RateLimiter {
    pub fn new(
        default_interval: Duration,
        clock: Arc<dyn Clock>,
        store: Box<dyn TimestampStore>,
    ) -> Self {
        Self {
            clock,
            store,
            default_interval,
        }
    }

    /// A process-local limiter on the real clock.
    pub fn in_memory(default_interval: Duration) -> Self {
        Self::new(
            default_interval,
            Arc::new(SystemClock),
            Box::new(MemoryTimestampStore::new()),
        )
    }

    /// Wait out the configured interval. See [`throttle_for`](Self::throttle_for).
    pub async fn throttle(&self) -> Duration {
        self.throttle_for(self.default_interval).await
    }

    /// Suspend until at least `min_interval` has passed since the previous
    /// call.
    ///
    /// The slot is reserved in the store before sleeping, so concurrent
    /// callers (tasks or processes sharing a file store) each get their own
    /// slot one interval apart. Returns how long the caller was held.
    /// Absent state counts as infinitely long ago. A recorded call that lies
    /// in the future is honoured as a held slot, even when the clock moved
    /// backwards.
    pub async fn throttle_for(&self, min_interval: Duration) -> Duration {
        let now = self.clock.now();
        let slot = self.store.reserve(now, min_interval);
        let waited = (slot - now).to_std().unwrap_or(Duration::ZERO);
        if !waited.is_zero() {
            debug!(waited_ms = waited.as_millis() as u64, "Rate limiter holding call");
            self.clock.sleep(waited).await;
        }
        waited
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A clock that only moves when told to, or when slept on.
    pub(crate) struct ManualClock {
        now: Mutex<DateTime<Utc>>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self {
                now: Mutex::new(Utc::now()),
                sleeps: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::from_std(by).unwrap();
        }

        pub(crate) fn rewind(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now -= chrono::Duration::from_std(by).unwrap();
        }

        pub(crate) fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            self.advance(duration);
        }
    }

    /// A clock that never moves; sleeps return at once.
    struct StoppedClock {
        now: DateTime<Utc>,
    }

    impl StoppedClock {
        fn new() -> Self {
            Self { now: Utc::now() }
        }
    }

    #[async_trait]
    impl Clock for StoppedClock {
        fn now(&self) -> DateTime<Utc> {
            self.now
        }

        async fn sleep(&self, _duration: Duration) {}
    }

    fn limiter_with(clock: Arc<ManualClock>, store: Box<dyn TimestampStore>) -> RateLimiter {
        RateLimiter::new(Duration::from_secs(10), clock, store)
    }

    #[tokio::test]
    async fn first_call_does_not_wait() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter_with(clock.clone(), Box::new(MemoryTimestampStore::new()));

        assert_eq!(limiter.throttle().await, Duration::ZERO);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn second_call_waits_remaining_interval() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter_with(clock.clone(), Box::new(MemoryTimestampStore::new()));

        limiter.throttle().await;
        clock.advance(Duration::from_secs(3));
        let waited = limiter.throttle().await;

        assert_eq!(waited, Duration::from_secs(7));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(7)]);
    }

    #[tokio::test]
    async fn no_wait_once_interval_elapsed() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter_with(clock.clone(), Box::new(MemoryTimestampStore::new()));

        limiter.throttle().await;
        clock.advance(Duration::from_secs(12));
        assert_eq!(limiter.throttle().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn explicit_interval_overrides_default() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter_with(clock.clone(), Box::new(MemoryTimestampStore::new()));

        limiter.throttle_for(Duration::from_secs(2)).await;
        clock.advance(Duration::from_millis(500));
        let waited = limiter.throttle_for(Duration::from_secs(2)).await;
        assert_eq!(waited, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn clock_moving_backwards_still_honours_last_call() {
        let clock = Arc::new(ManualClock::new());
        let limiter = limiter_with(clock.clone(), Box::new(MemoryTimestampStore::new()));

        limiter.throttle().await;
        clock.rewind(Duration::from_secs(60));
        assert_eq!(limiter.throttle().await, Duration::from_secs(70));
    }

    #[tokio::test]
    async fn concurrent_callers_get_separate_slots() {
        let clock = Arc::new(StoppedClock::new());
        let limiter = RateLimiter::new(
            Duration::from_secs(10),
            clock,
            Box::new(MemoryTimestampStore::new()),
        );

        let (a, b, c) = tokio::join!(limiter.throttle(), limiter.throttle(), limiter.throttle());
        let mut waits = vec![a, b, c];
        waits.sort();
        assert_eq!(
            waits,
            vec![Duration::ZERO, Duration::from_secs(10), Duration::from_secs(20)]
        );
    }

    #[tokio::test]
    async fn file_store_spaces_limiters_in_flight_together() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_call.json");
        let interval = Duration::from_millis(300);
        let limiter = || {
            RateLimiter::new(
                interval,
                Arc::new(SystemClock),
                Box::new(FileTimestampStore::new(&path)),
            )
        };
        let (a, b) = (limiter(), limiter());
        a.throttle().await;

        let (first, second) = tokio::join!(
            async { (a.throttle().await, std::time::Instant::now()) },
            async { (b.throttle().await, std::time::Instant::now()) },
        );

        let (early, late) = if first.1 <= second.1 { (first, second) } else { (second, first) };
        assert!(late.0 >= early.0 + Duration::from_millis(250));
        assert!(late.1.duration_since(early.1) >= Duration::from_millis(250));
    }

    #[test]
    fn file_store_records_reserved_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTimestampStore::new(dir.path().join("last_call.json"));
        assert_eq!(store.load(), None);

        let now = Utc::now();
        assert_eq!(store.reserve(now, Duration::from_secs(10)), now);
        assert_eq!(store.load(), Some(now));

        let slot = store.reserve(now, Duration::from_secs(10));
        assert_eq!(slot, now + chrono::Duration::seconds(10));
        assert_eq!(store.load(), Some(slot));
    }

    #[test]
    fn corrupt_record_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_call.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileTimestampStore::new(&path);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn unwritable_location_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let store = FileTimestampStore::new(blocker.join("last_call.json"));
        let now = Utc::now();
        assert_eq!(store.reserve(now, Duration::from_secs(10)), now);
        assert_eq!(store.reserve(now, Duration::from_secs(10)), now);
        assert_eq!(store.load(), None);
    }
}
