use gqlient::Singleton;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Information on a GitHub repository retrieved by a
/// [`SearchProjects`][crate::queries::SearchProjects] or
/// [`ListRepositories`][crate::queries::ListRepositories] paginator
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(from = "Singleton<RawRepo>")]
pub(crate) struct Project {
    /// The repository's full name in the form "OWNER/NAME"
    pub(crate) name: String,

    /// The login of the repository's owner
    pub(crate) owner: String,

    /// The name of the default branch; `None` for empty repositories.
    /// Empty repositories are kept rather than dropped as malformed, as
    /// older versions of this tool did.
    pub(crate) default_branch: Option<String>,

    pub(crate) description: String,

    /// Number of stargazers
    pub(crate) stars: u64,

    /// Logins of (up to the first 100) stargazers, if requested
    pub(crate) stargazers: Vec<String>,

    pub(crate) forks: u64,

    pub(crate) watchers: u64,

    /// The names of the repository's topics
    pub(crate) topics: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
struct RawRepo {
    name_with_owner: String,
    #[serde(deserialize_with = "deser_branch")]
    default_branch_ref: Option<String>,
    #[serde(default)]
    description: Option<String>,
    stargazers: RawStargazers,
    #[serde(deserialize_with = "gqlient::singleton_field")]
    forks: u64,
    #[serde(deserialize_with = "gqlient::singleton_field")]
    watchers: u64,
    #[serde(deserialize_with = "deser_topics")]
    repository_topics: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
struct RawStargazers {
    total_count: u64,
    #[serde(default)]
    edges: Vec<Singleton<Singleton<String>>>,
}

impl From<Singleton<RawRepo>> for Project {
    fn from(Singleton(value): Singleton<RawRepo>) -> Project {
        let owner = value
            .name_with_owner
            .split_once('/')
            .map_or(value.name_with_owner.as_str(), |(owner, _)| owner)
            .to_owned();
        Project {
            name: value.name_with_owner,
            owner,
            default_branch: value.default_branch_ref,
            description: value.description.unwrap_or_default(),
            stars: value.stargazers.total_count,
            stargazers: value
                .stargazers
                .edges
                .into_iter()
                .map(|Singleton(Singleton(login))| login)
                .collect(),
            forks: value.forks,
            watchers: value.watchers,
            topics: value.repository_topics,
        }
    }
}

fn deser_topics<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let value: Singleton<Vec<Singleton<Singleton<Singleton<String>>>>> =
        Deserialize::deserialize(deserializer)?;
    Ok(value.0.into_iter().map(|s| s.0.0.0).collect())
}

fn deser_branch<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let value: Option<Singleton<String>> = Deserialize::deserialize(deserializer)?;
    Ok(value.map(|s| s.0))
}

/// A GitHub user retrieved by a
/// [`ListConnection`][crate::queries::ListConnection] paginator
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(from = "Singleton<RawPerson>")]
pub(crate) struct Person {
    /// The user's display name, if they have set one
    pub(crate) name: Option<String>,
    pub(crate) login: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
struct RawPerson {
    #[serde(default)]
    name: Option<String>,
    login: String,
}

impl From<Singleton<RawPerson>> for Person {
    fn from(Singleton(value): Singleton<RawPerson>) -> Person {
        Person {
            name: value.name,
            login: value.login,
        }
    }
}

/// A repository identifier of the form "OWNER/NAME"
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct RepoId {
    pub(crate) owner: String,
    pub(crate) name: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = ParseRepoIdError;

    fn from_str(s: &str) -> Result<RepoId, ParseRepoIdError> {
        let (owner, name) = s.split_once('/').ok_or(ParseRepoIdError::NoSlash)?;
        for part in [owner, name] {
            if part.is_empty() {
                return Err(ParseRepoIdError::EmptyPart);
            }
            if part.contains(|c: char| c == '/' || c.is_whitespace()) {
                return Err(ParseRepoIdError::BadChar);
            }
        }
        Ok(RepoId {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub(crate) enum ParseRepoIdError {
    #[error("repository must be given in the form OWNER/NAME")]
    NoSlash,
    #[error("repository owner and name must be nonempty")]
    EmptyPart,
    #[error("repository owner and name may not contain slashes or whitespace")]
    BadChar,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn project_from_search_edge() {
        let edge = json!({
            "node": {
                "nameWithOwner": "toto/tata",
                "defaultBranchRef": {"name": "master"},
                "description": "desc",
                "stargazers": {"totalCount": 42},
                "forks": {"totalCount": 7},
                "watchers": {"totalCount": 48},
                "repositoryTopics": {
                    "edges": [
                        {"node": {"topic": {"name": "ocaml"}}},
                        {"node": {"topic": {"name": "compiler"}}},
                    ]
                }
            }
        });
        let project = serde_json::from_value::<Project>(edge).unwrap();
        assert_eq!(
            project,
            Project {
                name: String::from("toto/tata"),
                owner: String::from("toto"),
                default_branch: Some(String::from("master")),
                description: String::from("desc"),
                stars: 42,
                stargazers: Vec::new(),
                forks: 7,
                watchers: 48,
                topics: vec![String::from("ocaml"), String::from("compiler")],
            }
        );
    }

    #[test]
    fn project_with_stargazers_and_nulls() {
        let edge = json!({
            "node": {
                "nameWithOwner": "octocat/empty",
                "defaultBranchRef": null,
                "description": null,
                "stargazers": {
                    "totalCount": 2,
                    "edges": [
                        {"node": {"login": "alice"}},
                        {"node": {"login": "bob"}},
                    ]
                },
                "forks": {"totalCount": 0},
                "watchers": {"totalCount": 1},
                "repositoryTopics": {"edges": []}
            }
        });
        let project = serde_json::from_value::<Project>(edge).unwrap();
        assert_eq!(project.default_branch, None);
        assert_eq!(project.description, "");
        assert_eq!(project.stars, 2);
        assert_eq!(project.stargazers, ["alice", "bob"]);
        assert!(project.topics.is_empty());
    }

    #[test]
    fn project_missing_counts_is_error() {
        let edge = json!({
            "node": {
                "nameWithOwner": "toto/tata",
                "defaultBranchRef": {"name": "main"},
                "description": "desc",
                "repositoryTopics": {"edges": []}
            }
        });
        assert!(serde_json::from_value::<Project>(edge).is_err());
    }

    #[test]
    fn project_serializes_flat() {
        let project = Project {
            name: String::from("toto/tata"),
            owner: String::from("toto"),
            default_branch: None,
            description: String::new(),
            stars: 1,
            stargazers: Vec::new(),
            forks: 2,
            watchers: 3,
            topics: vec![String::from("rust")],
        };
        assert_eq!(
            serde_json::to_value(&project).unwrap(),
            json!({
                "name": "toto/tata",
                "owner": "toto",
                "default_branch": null,
                "description": "",
                "stars": 1,
                "stargazers": [],
                "forks": 2,
                "watchers": 3,
                "topics": ["rust"],
            })
        );
    }

    #[test]
    fn person_from_edge() {
        let edge = json!({"node": {"name": "The Octocat", "login": "octocat"}});
        assert_eq!(
            serde_json::from_value::<Person>(edge).unwrap(),
            Person {
                name: Some(String::from("The Octocat")),
                login: String::from("octocat"),
            }
        );
    }

    #[test]
    fn person_without_name() {
        let edge = json!({"node": {"name": null, "login": "ghost"}});
        assert_eq!(
            serde_json::from_value::<Person>(edge).unwrap(),
            Person {
                name: None,
                login: String::from("ghost"),
            }
        );
    }

    #[test]
    fn person_without_login_is_error() {
        let edge = json!({"node": {"name": "Nobody"}});
        assert!(serde_json::from_value::<Person>(edge).is_err());
    }

    #[test]
    fn parse_repo_id() {
        let r = "octocat/hello-world".parse::<RepoId>().unwrap();
        assert_eq!(
            r,
            RepoId {
                owner: String::from("octocat"),
                name: String::from("hello-world"),
            }
        );
        assert_eq!(r.to_string(), "octocat/hello-world");
    }

    #[test]
    fn parse_bad_repo_ids() {
        assert_matches!("octocat".parse::<RepoId>(), Err(ParseRepoIdError::NoSlash));
        assert_matches!("/hello".parse::<RepoId>(), Err(ParseRepoIdError::EmptyPart));
        assert_matches!("octocat/".parse::<RepoId>(), Err(ParseRepoIdError::EmptyPart));
        assert_matches!("a/b/c".parse::<RepoId>(), Err(ParseRepoIdError::BadChar));
        assert_matches!("a b/c".parse::<RepoId>(), Err(ParseRepoIdError::BadChar));
    }
}
