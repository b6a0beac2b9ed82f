mod list_connection;
mod list_repositories;
mod search_projects;
pub(crate) use self::list_connection::ListConnection;
pub(crate) use self::list_repositories::ListRepositories;
pub(crate) use self::search_projects::SearchProjects;
