// Command-line arguments for reposcout.

use clap::Parser;

use crate::github::SearchSort;

/// Search GitHub repositories from the command line, walking result
/// pages until the results run out or the page cap is reached.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Args {
    /// Search query, e.g. "raft consensus"
    pub query: String,

    /// Result ordering
    #[clap(short, long, value_enum, default_value_t = SearchSort::Relevance)]
    pub sort: SearchSort,

    /// Only show repositories written in this language ("all" disables
    /// the filter)
    #[clap(short, long)]
    pub language: Option<String>,

    /// Stop after this many pages instead of walking to the end
    #[clap(short = 'p', long, value_name = "NUM")]
    pub pages: Option<u32>,

    /// Print one JSON object per repository instead of formatted text
    #[clap(long)]
    pub json: bool,

    /// GitHub API token; unauthenticated requests work but are rate
    /// limited much sooner
    #[clap(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}
