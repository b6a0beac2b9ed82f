use crate::types::Project;
use gqlient::{Cursor, JsonMap, Paginator, QueryPayload, RawPage, Singleton};
use indoc::indoc;

static QUERY: &str = indoc! {"
    query ($q: String!, $cursor: String) {
        search(query: $q, type: REPOSITORY, first: 25, after: $cursor) {
            repositoryCount
            pageInfo {
                endCursor
                hasNextPage
            }
            edges {
                node {
                    ... on Repository {
                        nameWithOwner
                        defaultBranchRef {
                            name
                        }
                        description
                        stargazers {
                            totalCount
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

/// Search for public, non-fork, unarchived repositories with more than a
/// given number of stars.
///
/// Results are returned in descending order of star count.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct SearchProjects {
    min_stars: u64,
    terms: Option<String>,
}

impl SearchProjects {
    pub(crate) fn new(min_stars: u64, terms: Option<String>) -> SearchProjects {
        SearchProjects { min_stars, terms }
    }

    /// The GitHub search string for this search
    pub(crate) fn search_string(&self) -> String {
        let mut q = format!("stars:>{}", self.min_stars);
        if let Some(terms) = self
            .terms
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            q.push(' ');
            q.push_str(terms);
        }
        q.push_str(" is:public fork:false archived:false sort:stars-asc");
        q
    }
}

impl Paginator for SearchProjects {
    type Item = Project;

    fn for_cursor(&self, cursor: Option<&Cursor>) -> QueryPayload {
        QueryPayload {
            query: String::from(QUERY),
            variables: JsonMap::from_iter([
                ("q".into(), self.search_string().into()),
                ("cursor".into(), cursor.cloned().into()),
            ]),
        }
    }

    fn extract_page(&self, data: JsonMap) -> Result<RawPage, serde_json::Error> {
        let Singleton(page) = serde_json::from_value::<Singleton<RawPage>>(data.into())?;
        Ok(page)
    }

    fn describe(&self) -> String {
        String::from("repositories")
    }

    fn sort(&self, mut items: Vec<Project>) -> Vec<Project> {
        items.sort_by(|a, b| b.stars.cmp(&a.stars));
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlient::{Paginated, QuerySpec};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn project(name: &str, stars: u64) -> Project {
        Project {
            name: name.to_owned(),
            owner: name.split('/').next().unwrap_or_default().to_owned(),
            default_branch: Some(String::from("main")),
            description: String::new(),
            stars,
            stargazers: Vec::new(),
            forks: 0,
            watchers: 0,
            topics: Vec::new(),
        }
    }

    #[test]
    fn search_string_without_terms() {
        let search = SearchProjects::new(42, None);
        assert_eq!(
            search.search_string(),
            "stars:>42 is:public fork:false archived:false sort:stars-asc"
        );
    }

    #[test]
    fn search_string_with_terms() {
        let search = SearchProjects::new(100, Some(String::from("language:ocaml")));
        assert_eq!(
            search.search_string(),
            "stars:>100 language:ocaml is:public fork:false archived:false sort:stars-asc"
        );
    }

    #[test]
    fn search_string_ignores_blank_terms() {
        let search = SearchProjects::new(5, Some(String::from("   ")));
        assert_eq!(
            search.search_string(),
            "stars:>5 is:public fork:false archived:false sort:stars-asc"
        );
    }

    #[test]
    fn first_page_payload() {
        let search = SearchProjects::new(42, None);
        let payload = search.for_cursor(None);
        assert_eq!(payload.query, QUERY);
        assert!(payload.query.starts_with("query ($q: String!, $cursor: String) {\n"));
        assert_eq!(
            payload.variables,
            JsonMap::from_iter([
                (
                    "q".into(),
                    json!("stars:>42 is:public fork:false archived:false sort:stars-asc")
                ),
                ("cursor".into(), json!(null)),
            ])
        );
    }

    #[test]
    fn later_page_payload() {
        let search = SearchProjects::new(42, None);
        let payload = search.for_cursor(Some(&Cursor::from("4242")));
        assert_eq!(payload.variables["cursor"], json!("4242"));
    }

    #[test]
    fn sort_by_descending_stars() {
        let search = SearchProjects::new(0, None);
        let sorted = search.sort(vec![
            project("a/low", 1),
            project("b/high", 300),
            project("c/mid", 50),
            project("d/mid", 50),
        ]);
        let names = sorted.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["b/high", "c/mid", "d/mid", "a/low"]);
    }

    #[test]
    fn transform_search_page() {
        let mut query = Paginated::new(SearchProjects::new(42, None));
        let data = JsonMap::from_iter([(
            "search".into(),
            json!({
                "repositoryCount": 26,
                "pageInfo": {"endCursor": "4242", "hasNextPage": true},
                "edges": [
                    {
                        "node": {
                            "nameWithOwner": "toto/tata",
                            "defaultBranchRef": {"name": "master"},
                            "description": "desc",
                            "stargazers": {"totalCount": 42},
                            "forks": {"totalCount": 7},
                            "watchers": {"totalCount": 48},
                            "repositoryTopics": {"edges": []}
                        }
                    },
                    {"node": {}}
                ]
            }),
        )]);
        let items = query.transform(data).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "toto/tata");
        assert_eq!(items[0].owner, "toto");
        assert_eq!(query.state().expected_total, Some(26));
        let next = query.next_query().unwrap();
        assert_eq!(next.variables["cursor"], json!("4242"));
    }
}
