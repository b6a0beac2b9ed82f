use crate::types::Project;
use gqlient::{Cursor, JsonMap, Paginator, QueryPayload, RawPage, Singleton};
use indoc::indoc;

static QUERY: &str = indoc! {"
    query ($login: String!, $cursor: String) {
        user(login: $login) {
            repositories(
                isFork: false,
                first: 100,
                after: $cursor,
                orderBy: {field: STARGAZERS, direction: DESC},
            ) {
                totalCount
                pageInfo {
                    endCursor
                    hasNextPage
                }
                edges {
                    node {
                        nameWithOwner
                        defaultBranchRef {
                            name
                        }
                        description
                        stargazers(first: 100) {
                            totalCount
                            edges {
                                node {
                                    login
                                }
                            }
                        }
                        forks {
                            totalCount
                        }
                        watchers {
                            totalCount
                        }
                        repositoryTopics(first: 100) {
                            edges {
                                node {
                                    topic {
                                        name
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
"};

/// List a user's non-fork repositories, most-starred first, along with the
/// logins of up to 100 stargazers of each
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ListRepositories {
    login: String,
}

impl ListRepositories {
    pub(crate) fn new(login: String) -> ListRepositories {
        ListRepositories { login }
    }
}

impl Paginator for ListRepositories {
    type Item = Project;

    fn for_cursor(&self, cursor: Option<&Cursor>) -> QueryPayload {
        QueryPayload {
            query: String::from(QUERY),
            variables: JsonMap::from_iter([
                ("login".into(), self.login.clone().into()),
                ("cursor".into(), cursor.cloned().into()),
            ]),
        }
    }

    fn extract_page(&self, data: JsonMap) -> Result<RawPage, serde_json::Error> {
        let Singleton(Singleton(page)) =
            serde_json::from_value::<Singleton<Singleton<RawPage>>>(data.into())?;
        Ok(page)
    }

    fn describe(&self) -> String {
        format!("repositories of {}", self.login)
    }
}
