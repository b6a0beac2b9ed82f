use crate::types::{Person, RepoId};
use gqlient::{Cursor, JsonMap, Paginator, QueryPayload, RawPage, Singleton};
use indoc::indoc;
use std::fmt;

/// The object whose user connection is listed
#[derive(Clone, Debug, Eq, PartialEq)]
enum Parent {
    User(String),
    Repository(RepoId),
}

/// Which user connection of the parent object to list
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Connection {
    Followers,
    Following,
    Stargazers,
    Watchers,
}

impl Connection {
    fn field(self) -> &'static str {
        match self {
            Connection::Followers => "followers",
            Connection::Following => "following",
            Connection::Stargazers => "stargazers",
            Connection::Watchers => "watchers",
        }
    }
}

/// List the users in one of a user's or repository's user connections:
/// followers or followed users of a user, or stargazers or watchers of a
/// repository
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ListConnection {
    parent: Parent,
    connection: Connection,
}

impl ListConnection {
    pub(crate) fn followers(login: String) -> ListConnection {
        ListConnection {
            parent: Parent::User(login),
            connection: Connection::Followers,
        }
    }

    pub(crate) fn following(login: String) -> ListConnection {
        ListConnection {
            parent: Parent::User(login),
            connection: Connection::Following,
        }
    }

    pub(crate) fn stargazers(repo: RepoId) -> ListConnection {
        ListConnection {
            parent: Parent::Repository(repo),
            connection: Connection::Stargazers,
        }
    }

    pub(crate) fn watchers(repo: RepoId) -> ListConnection {
        ListConnection {
            parent: Parent::Repository(repo),
            connection: Connection::Watchers,
        }
    }

    fn query(&self) -> String {
        let (params, parent) = match self.parent {
            Parent::User(_) => ("$login: String!", "user(login: $login)"),
            Parent::Repository(_) => (
                "$owner: String!, $name: String!",
                "repository(owner: $owner, name: $name)",
            ),
        };
        format!(
            indoc! {"
                query ({params}, $cursor: String) {{
                    {parent} {{
                        {field}(first: 100, after: $cursor) {{
                            totalCount
                            pageInfo {{
                                endCursor
                                hasNextPage
                            }}
                            edges {{
                                node {{
                                    name
                                    login
                                }}
                            }}
                        }}
                    }}
                }}
            "},
            params = params,
            parent = parent,
            field = self.connection.field(),
        )
    }
}

impl fmt::Display for ListConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent {
            Parent::User(ref login) => write!(f, "{} of {login}", self.connection.field()),
            Parent::Repository(ref repo) => write!(f, "{} of {repo}", self.connection.field()),
        }
    }
}

impl Paginator for ListConnection {
    type Item = Person;

    fn for_cursor(&self, cursor: Option<&Cursor>) -> QueryPayload {
        let mut variables = match self.parent {
            Parent::User(ref login) => JsonMap::from_iter([("login".into(), login.clone().into())]),
            Parent::Repository(ref repo) => JsonMap::from_iter([
                ("owner".into(), repo.owner.clone().into()),
                ("name".into(), repo.name.clone().into()),
            ]),
        };
        variables.insert("cursor".into(), cursor.cloned().into());
        QueryPayload {
            query: self.query(),
            variables,
        }
    }

    fn extract_page(&self, data: JsonMap) -> Result<RawPage, serde_json::Error> {
        let Singleton(Singleton(page)) =
            serde_json::from_value::<Singleton<Singleton<RawPage>>>(data.into())?;
        Ok(page)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}
