use crate::QueryPayload;
use crate::types::{Cursor, JsonMap, PageInfo, RawPage};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

/// A query that a [`Runner`][crate::Runner] can drive to completion.
///
/// The runner alternates between calling `next_query()` and passing the
/// `"data"` field of the server's response to `transform()` until
/// `next_query()` returns `None`, and then passes everything that
/// `transform()` returned to `sort()`.
pub trait QuerySpec {
    type Output;

    /// Return the next request to perform, or `None` if there is nothing left
    /// to fetch
    fn next_query(&self) -> Option<QueryPayload>;

    /// Convert the data of a response to the most recent `next_query()`
    /// payload into result records and advance the internal state.
    ///
    /// An error means the response as a whole could not be understood and
    /// the query cannot continue.
    fn transform(&mut self, data: JsonMap) -> Result<Vec<Self::Output>, serde_json::Error>;

    /// Reorder the full set of accumulated results
    fn sort(&self, results: Vec<Self::Output>) -> Vec<Self::Output> {
        results
    }
}

/// The kind-specific half of a paginated query: what to request for a given
/// cursor and where in the response the paginated connection lives.
///
/// Wrap a `Paginator` in a [`Paginated`] to obtain a [`QuerySpec`].
pub trait Paginator {
    /// The record type that each edge of the connection is deserialized into
    type Item: DeserializeOwned;

    /// Build the request for the page following `cursor`, or for the first
    /// page if `cursor` is `None`
    fn for_cursor(&self, cursor: Option<&Cursor>) -> QueryPayload;

    /// Extract the page envelope from the `"data"` field of a response
    fn extract_page(&self, data: JsonMap) -> Result<RawPage, serde_json::Error>;

    /// A short description of what is being fetched, for log messages
    fn describe(&self) -> String;

    /// Reorder the full set of accumulated items
    fn sort(&self, items: Vec<Self::Item>) -> Vec<Self::Item> {
        items
    }
}

/// Where a paginated query is within its collection.
///
/// "No page fetched yet" and "no pages left" are deliberately distinct.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum PageCursor {
    /// The first page has not been requested yet
    #[default]
    Unset,

    /// More pages remain after this cursor
    After(Cursor),

    /// The last page has been received
    End,
}

/// Pagination state of a [`Paginated`] query
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PageState {
    pub cursor: PageCursor,

    /// The collection size reported by the first page.  Only used for
    /// progress reporting.
    pub expected_total: Option<u64>,
}

impl PageState {
    pub fn new() -> PageState {
        PageState::default()
    }

    pub fn is_exhausted(&self) -> bool {
        self.expected_total.is_some() && self.cursor == PageCursor::End
    }

    /// The cursor to request the next page after, if any
    pub fn cursor(&self) -> Option<&Cursor> {
        match self.cursor {
            PageCursor::After(ref c) => Some(c),
            PageCursor::Unset | PageCursor::End => None,
        }
    }

    /// Return the state after receiving a page with the given reported total
    /// and page info
    pub fn advance(self, total: u64, page_info: PageInfo) -> PageState {
        let cursor = match page_info {
            PageInfo {
                has_next_page: true,
                end_cursor: Some(c),
            } => PageCursor::After(c),
            PageInfo {
                has_next_page: true,
                end_cursor: None,
            } => {
                warn!("Server reported another page but gave no cursor for it; stopping");
                PageCursor::End
            }
            PageInfo {
                has_next_page: false,
                ..
            } => PageCursor::End,
        };
        PageState {
            cursor,
            expected_total: self.expected_total.or(Some(total)),
        }
    }
}

/// A [`QuerySpec`] that walks every page of the connection described by a
/// [`Paginator`].
///
/// Edges that fail to deserialize are logged and dropped rather than failing
/// the whole page.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Paginated<P> {
    paginator: P,
    state: PageState,
}

impl<P: Paginator> Paginated<P> {
    pub fn new(paginator: P) -> Paginated<P> {
        Paginated {
            paginator,
            state: PageState::new(),
        }
    }

    pub fn paginator(&self) -> &P {
        &self.paginator
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }
}

impl<P: Paginator> QuerySpec for Paginated<P> {
    type Output = P::Item;

    fn next_query(&self) -> Option<QueryPayload> {
        (!self.state.is_exhausted()).then(|| self.paginator.for_cursor(self.state.cursor()))
    }

    fn transform(&mut self, data: JsonMap) -> Result<Vec<P::Item>, serde_json::Error> {
        let RawPage {
            total_count,
            page_info,
            edges,
        } = self.paginator.extract_page(data)?;
        if self.state.expected_total.is_none() {
            info!("{total_count} {} to fetch", self.paginator.describe());
        }
        self.state = std::mem::take(&mut self.state).advance(total_count, page_info);
        let received = edges.len();
        let items = edges
            .iter()
            .filter_map(|edge| match P::Item::deserialize(edge) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(
                        error = %e,
                        %edge,
                        "Failed to parse {} record; skipping",
                        self.paginator.describe()
                    );
                    None
                }
            })
            .collect::<Vec<_>>();
        info!(
            "{} {} read ({} malformed)",
            items.len(),
            self.paginator.describe(),
            received - items.len()
        );
        Ok(items)
    }

    fn sort(&self, results: Vec<P::Item>) -> Vec<P::Item> {
        self.paginator.sort(results)
    }
}
