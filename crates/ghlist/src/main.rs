mod queries;
mod types;
use crate::queries::{ListConnection, ListRepositories, SearchProjects};
use crate::types::RepoId;
use anyhow::Context;
use clap::{Parser, Subcommand};
use gqlient::{Client, Paginated, Paginator, Runner};
use patharg::OutputArg;
use serde::Serialize;
use serde_jsonlines::WriteExt;
use std::io::Write;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fetch paginated listings from the GitHub GraphQL API
#[derive(Clone, Debug, Eq, Parser, PartialEq)]
#[command(version)]
struct Arguments {
    /// GitHub access token [default: the token configured for `gh`]
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Write the results as a single JSON array instead of one JSON object
    /// per line
    #[arg(long)]
    json: bool,

    /// Logging level or `tracing` filter directives [default: `$RUST_LOG`
    /// or "info"]
    #[arg(short, long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Write the results to the given file [default: stdout]
    #[arg(short, long)]
    outfile: Option<OutputArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Eq, PartialEq, Subcommand)]
enum Command {
    /// Search for public, non-fork, unarchived repositories with more than a
    /// given number of stars
    SearchProjects {
        /// Only find repositories with more than this many stars
        #[arg(long)]
        stars: u64,

        /// Additional search terms, e.g., "language:rust"
        #[arg(long)]
        terms: Option<String>,
    },

    /// List the followers of a user
    ListFollowers {
        #[arg(long)]
        username: String,
    },

    /// List the users that a user follows
    ListFollowing {
        #[arg(long)]
        username: String,
    },

    /// List a user's non-fork repositories
    ListRepositories {
        #[arg(long)]
        username: String,
    },

    /// List the users who have starred a repository
    ListStargazers {
        #[arg(long, value_name = "OWNER/NAME")]
        repository: RepoId,
    },

    /// List the users watching a repository
    ListWatchers {
        #[arg(long, value_name = "OWNER/NAME")]
        repository: RepoId,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    init_logging(args.log_level.as_deref());
    let client = match args.token {
        Some(ref token) => Client::new(token),
        None => Client::new_with_local_token(),
    }
    .context("failed to create GraphQL client")?;
    let output = Output {
        outfile: args.outfile.unwrap_or_default(),
        json: args.json,
    };
    match args.command {
        Command::SearchProjects { stars, terms } => {
            output.fetch(&client, SearchProjects::new(stars, terms))
        }
        Command::ListFollowers { username } => {
            output.fetch(&client, ListConnection::followers(username))
        }
        Command::ListFollowing { username } => {
            output.fetch(&client, ListConnection::following(username))
        }
        Command::ListRepositories { username } => {
            output.fetch(&client, ListRepositories::new(username))
        }
        Command::ListStargazers { repository } => {
            output.fetch(&client, ListConnection::stargazers(repository))
        }
        Command::ListWatchers { repository } => {
            output.fetch(&client, ListConnection::watchers(repository))
        }
    }
}

fn init_logging(directives: Option<&str>) {
    let filter = match directives {
        Some(d) => EnvFilter::new(d),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Output {
    outfile: OutputArg,
    json: bool,
}

impl Output {
    fn fetch<P>(&self, client: &Client, paginator: P) -> anyhow::Result<()>
    where
        P: Paginator,
        P::Item: Serialize,
    {
        let what = paginator.describe();
        let start = Instant::now();
        let results = Runner::new(client)
            .run(Paginated::new(paginator))
            .with_context(|| format!("failed to fetch {what}"))?;
        info!(
            "Fetched {} {what} in {}",
            results.len(),
            humantime::format_duration(start.elapsed())
        );
        let fp = self.outfile.create().context("failed to open output file")?;
        write_results(fp, &results, self.json)
    }
}

fn write_results<W: Write, T: Serialize>(
    mut fp: W,
    results: &[T],
    json: bool,
) -> anyhow::Result<()> {
    if json {
        serde_json::to_writer(&mut fp, results).context("failed to write results")?;
        writeln!(fp).context("failed to write results")?;
    } else {
        fp.write_json_lines(results)
            .context("failed to write results")?;
    }
    fp.flush().context("failed to flush output")?;
    Ok(())
}
