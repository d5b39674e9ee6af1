//! Fixed-window request counters, one window per caller key.
//!
//! A window opens on the first request for a key and lasts `window` from that
//! moment. Expired windows are only noticed on the next call for the same key;
//! nothing is evicted in the background.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

// Source of "now" in milliseconds since the unix epoch
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// Hand-driven clock. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// Rate limit entry - tracks accepted requests per key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time: i64, // ms since epoch
}

/// How many requests a key may make per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Admin-triggered standings sync and user upgrades: 3 per 5 minutes.
    pub const fn admin_sync() -> Self {
        Self::new(3, Duration::from_secs(5 * 60))
    }

    /// League creation: 5 per 10 minutes.
    pub const fn league_create() -> Self {
        Self::new(5, Duration::from_secs(10 * 60))
    }

    /// Joining a league by invite code: 10 per minute.
    pub const fn league_join() -> Self {
        Self::new(10, Duration::from_secs(60))
    }
}

/// Outcome of [`check_rate_limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub time_until_reset: u64, // ms
}

pub struct RateLimiter<K = String, C = SystemClock>
where
    K: Hash + Eq,
{
    limits: DashMap<K, RateLimitEntry>,
    max_requests: u32,
    window_ms: i64,
    clock: C,
}

impl<K: Hash + Eq> RateLimiter<K, SystemClock> {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, SystemClock)
    }
}

impl<K, C> RateLimiter<K, C>
where
    K: Hash + Eq,
    C: Clock,
{
    pub fn with_clock(policy: RateLimitPolicy, clock: C) -> Self {
        // a zero window would let reset_time equal the window start
        let window_ms = i64::try_from(policy.window.as_millis())
            .unwrap_or(i64::MAX)
            .max(1);
        Self {
            limits: DashMap::new(),
            max_requests: policy.max_requests,
            window_ms,
            clock,
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.max_requests, Duration::from_millis(self.window_ms as u64))
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Number of keys currently holding a window (expired ones included).
    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// Records a request for `key` and reports whether it may proceed.
    ///
    /// The first request of a window is always accepted. A rejected request
    /// leaves the stored count untouched.
    pub fn is_allowed<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let now = self.clock.now_ms();
        self.admit(key, now).0
    }

    /// Milliseconds until the window for `key` rolls over, or 0 if it has none.
    pub fn time_until_reset<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now_ms();
        self.limits
            .get(key)
            .map(|entry| remaining(&entry, now))
            .unwrap_or(0)
    }

    pub fn clear<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.limits.remove(key);
    }

    pub fn entry<Q>(&self, key: &Q) -> Option<RateLimitEntry>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.limits.get(key).map(|entry| *entry)
    }

    // Runs under the shard lock of `key`, so concurrent callers can't both
    // take the last slot.
    fn admit<Q>(&self, key: &Q, now: i64) -> (bool, u64)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let fresh = RateLimitEntry {
            count: 1,
            reset_time: now.saturating_add(self.window_ms),
        };

        match self.limits.entry(key.to_owned()) {
            Entry::Vacant(slot) => {
                let entry = slot.insert(fresh);
                (true, remaining(&entry, now))
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if now > entry.reset_time {
                    *entry = fresh;
                    return (true, remaining(entry, now));
                }
                if entry.count >= self.max_requests {
                    return (false, remaining(entry, now));
                }
                entry.count += 1;
                (true, remaining(entry, now))
            }
        }
    }
}

fn remaining(entry: &RateLimitEntry, now: i64) -> u64 {
    entry.reset_time.saturating_sub(now).max(0) as u64
}

/// Records a request and returns the decision together with the time left in
/// the key's window, both read under the same lock.
pub fn check_rate_limit<K, C, Q>(limiter: &RateLimiter<K, C>, key: &Q) -> RateLimitDecision
where
    K: Hash + Eq + Borrow<Q>,
    C: Clock,
    Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
{
    let now = limiter.clock.now_ms();
    let (allowed, time_until_reset) = limiter.admit(key, now);
    RateLimitDecision {
        allowed,
        time_until_reset,
    }
}
