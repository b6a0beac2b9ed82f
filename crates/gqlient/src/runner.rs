use crate::queries::QuerySpec;
use crate::ratelimit::{Clock, RateLimitError, RateLimiter, SystemClock};
use crate::{QueryError, Transport};
use thiserror::Error;
use tracing::debug;

/// Drives a [`QuerySpec`] to completion against a [`Transport`], waiting
/// as needed to stay within the API's rate limit.
///
/// Requests are made strictly one at a time, as each request depends on the
/// response to the one before.
#[derive(Debug)]
pub struct Runner<'a, T: ?Sized, C = SystemClock> {
    transport: &'a T,
    limiter: RateLimiter<C>,
    calls: usize,
}

impl<'a, T: Transport + ?Sized> Runner<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Runner::with_limiter(transport, RateLimiter::new())
    }
}

impl<'a, T: Transport + ?Sized, C: Clock> Runner<'a, T, C> {
    pub fn with_limiter(transport: &'a T, limiter: RateLimiter<C>) -> Self {
        Runner {
            transport,
            limiter,
            calls: 0,
        }
    }

    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }

    /// Total number of query calls (excluding rate limit requests) made so
    /// far
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Perform every request that `query` asks for and return the sorted
    /// results.
    ///
    /// Any failure aborts the run, and the results of pages fetched so far
    /// are discarded.
    pub fn run<Q: QuerySpec>(&mut self, mut query: Q) -> Result<Vec<Q::Output>, RunError> {
        let mut results = Vec::new();
        while let Some(payload) = query.next_query() {
            self.limiter.gate(self.transport, self.calls)?;
            self.calls += 1;
            debug!(call = self.calls, "Fetching page");
            let data = self.transport.query(payload)?;
            results.extend(query.transform(data).map_err(RunError::Parse)?);
        }
        debug!(
            calls = self.calls,
            results = results.len(),
            "Pagination complete"
        );
        Ok(query.sort(results))
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to check rate limit")]
    RateLimit(#[from] RateLimitError),
    #[error("query failed")]
    Query(#[from] QueryError),
    #[error("failed to parse page of results")]
    Parse(#[source] serde_json::Error),
}
