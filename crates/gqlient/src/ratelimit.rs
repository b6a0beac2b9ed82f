use crate::types::{JsonMap, Singleton};
use crate::{QueryError, QueryPayload, Transport};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

static RATE_LIMIT_QUERY: &str = "query { rateLimit { limit cost remaining resetAt } }";

/// Re-fetch the rate limit before every this many calls
pub const REFRESH_INTERVAL: usize = 25;

/// Wait for the quota to reset once this many or fewer points remain
pub const LOW_WATER_MARK: u32 = 150;

/// Extra time to wait past the reported reset time
pub const SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// How long to wait before retrying a rate limit request that failed to
/// connect
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// The GraphQL API's rate limit status as of some point in time
#[derive(Copy, Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub limit: u32,
    pub cost: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimit {
    /// How long to wait, starting at `now`, for the quota to be replenished.
    ///
    /// This is never less than [`SAFETY_MARGIN`], even if the reset time has
    /// already passed.
    pub fn wait_duration(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_at - now).to_std().unwrap_or_default() + SAFETY_MARGIN
    }
}

/// A source of the current time that can also block the current thread
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

/// A [`Clock`] backed by the system clock and [`std::thread::sleep()`]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Tracks the remaining API quota and blocks before calls that would risk
/// exhausting it
#[derive(Clone, Debug, Default)]
pub struct RateLimiter<C = SystemClock> {
    clock: C,

    /// The most recently fetched rate limit, decremented locally for each
    /// call made since
    state: Option<RateLimit>,
}

impl RateLimiter<SystemClock> {
    pub fn new() -> Self {
        RateLimiter::with_clock(SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(clock: C) -> Self {
        RateLimiter { clock, state: None }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn state(&self) -> Option<&RateLimit> {
        self.state.as_ref()
    }

    /// Fetch the current rate limit.
    ///
    /// If the request fails to connect, it is retried once after
    /// [`RETRY_DELAY`].
    pub fn probe<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> Result<RateLimit, RateLimitError> {
        let rate_limit = match fetch_rate_limit(transport) {
            Err(RateLimitError::Query(e)) if e.is_transient() => {
                warn!(
                    error = %e,
                    "Failed to fetch rate limit; retrying in {}",
                    humantime::format_duration(RETRY_DELAY)
                );
                self.clock.sleep(RETRY_DELAY);
                fetch_rate_limit(transport)?
            }
            r => r?,
        };
        info!(
            remaining = rate_limit.remaining,
            limit = rate_limit.limit,
            reset_at = %rate_limit.reset_at,
            "Got rate limit data"
        );
        self.state = Some(rate_limit);
        Ok(rate_limit)
    }

    /// Prepare to make the call with zero-based index `call_index`.
    ///
    /// The rate limit is re-fetched first if nothing has been fetched yet or
    /// if `call_index` is a multiple of [`REFRESH_INTERVAL`].  If the
    /// remaining quota is at or below [`LOW_WATER_MARK`], this blocks until
    /// the quota resets and then fetches the rate limit again.
    pub fn gate<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        call_index: usize,
    ) -> Result<(), RateLimitError> {
        let cached = self
            .state
            .filter(|_| call_index % REFRESH_INTERVAL != 0);
        let state = match cached {
            Some(state) => state,
            None => self.probe(transport)?,
        };
        if state.remaining <= LOW_WATER_MARK {
            let wait = state.wait_duration(self.clock.now());
            info!(
                "Quota remaining: {}; waiting {} for reset at {}",
                state.remaining,
                humantime::format_duration(wait),
                state.reset_at,
            );
            self.clock.sleep(wait);
            self.probe(transport)?;
        }
        if let Some(state) = self.state.as_mut() {
            state.remaining = state.remaining.saturating_sub(1);
        }
        Ok(())
    }
}

fn fetch_rate_limit<T: Transport + ?Sized>(transport: &T) -> Result<RateLimit, RateLimitError> {
    let payload = QueryPayload {
        query: String::from(RATE_LIMIT_QUERY),
        variables: JsonMap::new(),
    };
    let data = transport.query(payload)?;
    let Singleton(rate_limit) = serde_json::from_value::<Singleton<RateLimit>>(data.into())?;
    Ok(rate_limit)
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("failed to perform rate limit request")]
    Query(#[from] QueryError),
    #[error("failed to deserialize rate limit response")]
    Json(#[from] serde_json::Error),
}
