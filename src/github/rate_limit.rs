//! Rate limit bookkeeping for GitHub API responses.
//!
//! GitHub reports the primary rate limit through `X-RateLimit-Limit`,
//! `X-RateLimit-Remaining` and `X-RateLimit-Reset`, and secondary limits
//! through `Retry-After`. [`RateLimitInfo`] captures the former;
//! [`RateLimitGate`] is the single owner of the shared budget state that every
//! request passes through, so concurrent callers wait on the same reset.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::header::{HeaderMap, RETRY_AFTER};
use http::StatusCode;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Wait used when GitHub signals a rate limit without any reset indicator.
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Slack added to `X-RateLimit-Reset`, which only has second precision.
pub const RESET_GRACE: Duration = Duration::from_secs(1);

/// Longest wait honoured from any header. GitHub's primary window is one
/// hour, so larger values are treated as malformed and clamped.
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60 * 60);

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Rate limit information extracted from GitHub API response headers.
///
/// # Example
///
/// ```
/// use pr_backfill::github::rate_limit::RateLimitInfo;
///
/// let info = RateLimitInfo::new(5000, 4999, 1700000000);
/// assert!(!info.is_exhausted());
/// assert_eq!(info.remaining(), 4999);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed in the current window.
    limit: u32,
    /// Remaining requests in the current window.
    remaining: u32,
    /// Unix timestamp when the rate limit resets.
    reset_at: u64,
}

impl RateLimitInfo {
    /// Creates a new rate limit info instance.
    #[must_use]
    pub const fn new(limit: u32, remaining: u32, reset_at: u64) -> Self {
        Self {
            limit,
            remaining,
            reset_at,
        }
    }

    /// Reads the `X-RateLimit-*` headers, returning `None` unless both
    /// remaining and reset are present and numeric.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = header_u64(headers, REMAINING_HEADER)?;
        let reset_at = header_u64(headers, RESET_HEADER)?;
        let limit = header_u64(headers, LIMIT_HEADER).unwrap_or(0);
        Some(Self::new(
            u32::try_from(limit).unwrap_or(u32::MAX),
            u32::try_from(remaining).unwrap_or(u32::MAX),
            reset_at,
        ))
    }

    /// Returns the maximum requests allowed in the current window.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the remaining requests in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Returns the Unix timestamp when the rate limit resets.
    #[must_use]
    pub const fn reset_at(&self) -> u64 {
        self.reset_at
    }

    /// Returns true if the rate limit has been exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Time to wait from `now_unix` until the window has certainly reset.
    ///
    /// Includes [`RESET_GRACE`] so that a reset reported with second
    /// precision is never undershot. Capped at [`MAX_RATE_LIMIT_WAIT`].
    #[must_use]
    pub const fn wait_from(&self, now_unix: u64) -> Duration {
        clamp_wait(
            Duration::from_secs(self.reset_at.saturating_sub(now_unix)).saturating_add(RESET_GRACE),
        )
    }
}

const fn clamp_wait(wait: Duration) -> Duration {
    if wait.as_secs() >= MAX_RATE_LIMIT_WAIT.as_secs() {
        MAX_RATE_LIMIT_WAIT
    } else {
        wait
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Current Unix time in seconds, or 0 when the clock is before the epoch.
#[must_use]
pub fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

/// Returns true when a failed response is GitHub signalling a rate limit
/// rather than a permission problem.
#[must_use]
pub fn is_rate_limited(status: StatusCode, headers: &HeaderMap, message: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }

    let budget_exhausted = header_u64(headers, REMAINING_HEADER) == Some(0);
    let has_retry_after = headers.contains_key(RETRY_AFTER);
    let message_mentions_limit = message.to_lowercase().contains("rate limit");

    budget_exhausted || has_retry_after || message_mentions_limit
}

/// How long to wait before retrying a rate-limited request.
///
/// `Retry-After` wins when present, then `X-RateLimit-Reset`, then
/// [`DEFAULT_RATE_LIMIT_WAIT`]. Never exceeds [`MAX_RATE_LIMIT_WAIT`].
#[must_use]
pub fn rate_limit_wait(headers: &HeaderMap, now_unix: u64) -> Duration {
    if let Some(seconds) = header_u64(headers, RETRY_AFTER.as_str()) {
        return clamp_wait(Duration::from_secs(seconds));
    }
    RateLimitInfo::from_headers(headers)
        .map_or(DEFAULT_RATE_LIMIT_WAIT, |info| info.wait_from(now_unix))
}

#[derive(Debug, Default)]
struct GateState {
    calls: u64,
    latest: Option<RateLimitInfo>,
    blocked_until: Option<Instant>,
}

/// Shared rate-limit budget for every request issued during a run.
///
/// All bookkeeping sits behind one mutex. A caller that finds the gate
/// blocked sleeps while holding the lock, so every other caller queues
/// behind the same reset instead of spending requests on 403s.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    state: Mutex<GateState>,
}

impl RateLimitGate {
    /// Creates an open gate with no calls recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the gate is open, then counts one request against the
    /// budget. Returns how long the caller was held, if at all.
    pub async fn acquire(&self) -> Option<Duration> {
        let mut state = self.state.lock().await;
        let waited = match state.blocked_until.take() {
            Some(until) if until > Instant::now() => {
                let started = Instant::now();
                tokio::time::sleep_until(until).await;
                Some(started.elapsed())
            }
            _ => None,
        };
        state.calls = state.calls.saturating_add(1);
        waited
    }

    /// Records the budget reported by a response. An exhausted budget with a
    /// future reset blocks the gate until that reset.
    pub async fn observe(&self, headers: &HeaderMap) {
        let Some(info) = RateLimitInfo::from_headers(headers) else {
            return;
        };
        let mut state = self.state.lock().await;
        state.latest = Some(info);
        let now_unix = now_unix_seconds();
        if info.is_exhausted() && info.reset_at() > now_unix {
            extend_block(&mut state, info.wait_from(now_unix));
        }
    }

    /// Blocks the gate for at least `wait` from now.
    pub async fn block_for(&self, wait: Duration) {
        let mut state = self.state.lock().await;
        extend_block(&mut state, wait);
    }

    /// Number of requests counted so far.
    pub async fn calls(&self) -> u64 {
        self.state.lock().await.calls
    }

    /// Most recent budget reported by GitHub.
    pub async fn latest(&self) -> Option<RateLimitInfo> {
        self.state.lock().await.latest
    }
}

fn extend_block(state: &mut GateState, wait: Duration) {
    let now = Instant::now();
    let candidate = now.checked_add(clamp_wait(wait)).unwrap_or(now);
    state.blocked_until = Some(match state.blocked_until {
        Some(existing) if existing > candidate => existing,
        _ => candidate,
    });
}
