use std::path::PathBuf;

use clap::Parser;

/// Fetches a git revision and caches the exported tree in a local store.
#[derive(Debug, Parser)]
#[clap(version = "0.1.0")]
pub struct CliArgs {
    /// URL of the git repository to fetch
    pub url: String,
    /// Branch, tag or commit to fetch, defaults to master
    #[clap(short, long)]
    pub rev: Option<String>,
    /// Directory holding the bare mirror repository and commit links
    #[clap(short, long)]
    pub cache_directory: Option<PathBuf>,
    /// Directory of the artifact store the exported tree is imported into
    #[clap(short, long)]
    pub store_directory: Option<PathBuf>,
    /// Refuse to fetch anything, for sandboxed evaluation
    #[clap(long)]
    pub restricted: bool,
}
