use serde::{
    Deserialize, Serialize,
    de::{self, Deserializer, IgnoredAny, MapAccess, Visitor},
};
use std::fmt;
use std::marker::PhantomData;

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// An opaque pagination cursor returned by the server
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Cursor {
        Cursor(value)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Cursor {
        Cursor(value.to_owned())
    }
}

impl From<Cursor> for serde_json::Value {
    fn from(value: Cursor) -> serde_json::Value {
        value.0.into()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The envelope of a single page of a paginated GraphQL connection.
///
/// The edges are left as raw JSON so that each one can be converted into a
/// record independently of its siblings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    /// The server-reported size of the whole collection.  Search results
    /// report this as `repositoryCount`.
    #[serde(alias = "repositoryCount")]
    pub total_count: u64,

    pub page_info: PageInfo,

    #[serde(default)]
    pub edges: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub end_cursor: Option<Cursor>,
    pub has_next_page: bool,
}

// Utility type for use in deserializing just `foo` from a map of the form
// `{"anything": foo}`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Singleton<T>(pub T);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Singleton<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SingletonVisitor::new())
    }
}

struct SingletonVisitor<T>(PhantomData<T>);

impl<T> SingletonVisitor<T> {
    fn new() -> Self {
        SingletonVisitor(PhantomData)
    }
}

impl<'de, T: Deserialize<'de>> Visitor<'de> for SingletonVisitor<T> {
    type Value = Singleton<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a string-keyed map containing a single field")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        if let Some((_, value)) = map.next_entry::<String, T>()? {
            if map.next_entry::<String, IgnoredAny>()?.is_some() {
                Err(de::Error::invalid_length(
                    map.size_hint().unwrap_or(0).saturating_add(2),
                    &self,
                ))
            } else {
                Ok(Singleton(value))
            }
        } else {
            Err(de::Error::invalid_length(0, &self))
        }
    }
}

/// Deserialize a field of the form `{"anything": value}` as just `value`.
///
/// Intended for use with `#[serde(deserialize_with = ...)]` on fields like
/// `stargazers { totalCount }`.
pub fn singleton_field<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Singleton::<T>::deserialize(deserializer).map(|s| s.0)
}
