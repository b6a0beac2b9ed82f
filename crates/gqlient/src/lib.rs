mod queries;
mod ratelimit;
mod runner;
#[cfg(test)]
mod testing;
mod types;
pub use crate::queries::*;
pub use crate::ratelimit::*;
pub use crate::runner::*;
pub use crate::types::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use ureq::{
    Agent, SendBody,
    http::{
        Request,
        header::{HeaderValue, InvalidHeaderValue},
    },
    middleware::MiddlewareNext,
};

pub static GRAPHQL_API_URL: &str = "https://api.github.com/graphql";

static USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_REPOSITORY"),
    ")",
);

/// Maximum time to spend on a single request, from connecting to reading the
/// whole response
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can perform a GraphQL request and return the `"data"` field
/// of a successful response
pub trait Transport {
    fn query(&self, payload: QueryPayload) -> Result<JsonMap, QueryError>;
}

/// A client for a GraphQL API endpoint that authenticates with a bearer token
#[derive(Clone, Debug)]
pub struct Client {
    inner: Agent,
    endpoint: String,
}

impl Client {
    pub fn new(token: &str) -> Result<Client, BuildClientError> {
        Client::with_endpoint(token, GRAPHQL_API_URL)
    }

    /// Create a client that sends its requests to `endpoint` instead of the
    /// GitHub GraphQL API
    pub fn with_endpoint(token: &str, endpoint: &str) -> Result<Client, BuildClientError> {
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))?;
        let inner = Agent::config_builder()
            .https_only(endpoint.starts_with("https://"))
            .user_agent(USER_AGENT)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .middleware(
                move |mut req: Request<SendBody<'_>>, next: MiddlewareNext<'_>| {
                    let _ = req.headers_mut().insert("Authorization", auth.clone());
                    next.handle(req)
                },
            )
            .build()
            .into();
        Ok(Client {
            inner,
            endpoint: endpoint.to_owned(),
        })
    }

    /// Create a client using the GitHub token configured for the local `gh`
    /// installation or found in the environment
    pub fn new_with_local_token() -> Result<Client, BuildClientError> {
        let token = gh_token::get()?;
        Client::new(&token)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for Client {
    fn query(&self, payload: QueryPayload) -> Result<JsonMap, QueryError> {
        debug!(endpoint = %self.endpoint, "Performing GraphQL request");
        let bytes = self
            .inner
            .post(self.endpoint.as_str())
            .send_json(payload)
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => QueryError::Status(code),
                e => QueryError::Http(Box::new(e)),
            })?
            .into_body()
            .read_to_vec()
            .map_err(|e| QueryError::Read(Box::new(e)))?;
        serde_json::from_slice::<Response>(&bytes)?
            .into_data()
            .map_err(Into::into)
    }
}

#[derive(Debug, Error)]
pub enum BuildClientError {
    #[error("invalid authorization token")]
    Auth(#[from] InvalidHeaderValue),
    #[error("failed to fetch GitHub access token")]
    GetToken(#[from] gh_token::Error),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to perform GraphQL request")]
    Http(#[source] Box<ureq::Error>),
    #[error("GraphQL server responded with HTTP status {0}")]
    Status(u16),
    #[error("failed to read GraphQL response")]
    Read(#[source] Box<ureq::Error>),
    #[error("failed to deserialize GraphQL response")]
    Json(#[from] serde_json::Error),
    #[error("GraphQL server returned error response")]
    GraphQL(#[from] GqlError),
}

impl QueryError {
    /// Returns true if the request failed to reach the server or timed out,
    /// in which case trying again may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            QueryError::Http(e) => matches!(
                **e,
                ureq::Error::Io(_)
                    | ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
            ),
            _ => false,
        }
    }
}

/// The body of a GraphQL request
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct QueryPayload {
    pub query: String,
    pub variables: JsonMap,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
struct Response {
    #[serde(default)]
    data: Option<JsonMap>,
    #[serde(default)]
    errors: GqlError,
}

impl Response {
    fn into_data(self) -> Result<JsonMap, GqlError> {
        if self.errors.is_empty() {
            Ok(self.data.unwrap_or_default())
        } else {
            Err(self.errors)
        }
    }
}

/// The `"errors"` array of a GraphQL response
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct GqlError(Vec<GqlInnerError>);

impl GqlError {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Query errored:")?;
        let mut first = true;
        for e in &self.0 {
            if !std::mem::take(&mut first) {
                writeln!(f, "---")?;
            }
            if let Some(ref t) = e.err_type {
                writeln!(f, "    Type: {t}")?;
            }
            writeln!(f, "    Message: {}", e.message)?;
            if let Some(ref p) = e.path {
                let path = p
                    .iter()
                    .map(|seg| match seg {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                writeln!(f, "    Path: {path}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for GqlError {}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
struct GqlInnerError {
    #[serde(default, rename = "type")]
    err_type: Option<String>,
    message: String,
    // Path segments are field names or list indices
    #[serde(default)]
    path: Option<Vec<serde_json::Value>>,
}
