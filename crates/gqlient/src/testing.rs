use crate::{Clock, JsonMap, QueryError, QueryPayload, Transport};
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

/// A [`Clock`] that starts at a fixed time and only moves forwards when
/// slept on
#[derive(Debug)]
pub(crate) struct FakeClock {
    now: Cell<DateTime<Utc>>,
    sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub(crate) fn new() -> FakeClock {
        FakeClock {
            now: Cell::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap()),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.now
            .set(self.now.get() + chrono::TimeDelta::from_std(duration).unwrap());
    }
}

/// A [`Transport`] that returns canned responses in order and records every
/// request it receives
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<JsonMap, QueryError>>>,
    requests: RefCell<Vec<QueryPayload>>,
}

impl ScriptedTransport {
    pub(crate) fn new<I>(responses: I) -> ScriptedTransport
    where
        I: IntoIterator<Item = Result<JsonMap, QueryError>>,
    {
        ScriptedTransport {
            responses: RefCell::new(responses.into_iter().collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<QueryPayload> {
        self.requests.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn query(&self, payload: QueryPayload) -> Result<JsonMap, QueryError> {
        self.requests.borrow_mut().push(payload);
        self.responses
            .borrow_mut()
            .pop_front()
            .expect("no more scripted responses")
    }
}

pub(crate) fn connection_failure() -> QueryError {
    QueryError::Http(Box::new(ureq::Error::ConnectionFailed))
}

pub(crate) fn rate_limit_data(remaining: u32, reset_at: DateTime<Utc>) -> JsonMap {
    JsonMap::from_iter([(
        "rateLimit".into(),
        serde_json::json!({
            "limit": 5000,
            "cost": 1,
            "remaining": remaining,
            "resetAt": reset_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }),
    )])
}
