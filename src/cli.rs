use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "kode", about = "Run code on a remote runner with live output and interactive stdin", version)]
pub struct Cli {
    /// Runner site root; API calls go to `<endpoint>api/`.
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Use a runner on http://127.0.0.1:8080/.
    #[arg(long, global = true, conflicts_with = "endpoint")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a file remotely; its language comes from the extension.
    ///
    /// Output streams to stdout as it arrives. Lines read from stdin are
    /// forwarded to the program while it runs.
    Run {
        file: PathBuf,
        /// Language version; the runner picks one when omitted.
        #[arg(long)]
        version: Option<String>,
    },

    /// Save a file as a shareable snapshot and print its URL.
    Share {
        file: PathBuf,
        #[arg(long)]
        version: Option<String>,
        /// Update this snapshot instead of creating a new one.
        #[arg(long)]
        id: Option<String>,
    },

    /// Download the source of a snapshot.
    Fetch {
        id: String,
        /// Write to this file instead of stdout.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// List the languages the runner supports.
    Langs {
        /// Show the built-in extension table instead of asking the runner.
        #[arg(long)]
        local: bool,
    },

    /// Open the interactive editor.
    Edit {
        /// Language to start with, as a file extension (go, rb, py, ...).
        #[arg(long)]
        lang: Option<String>,
        /// Open this snapshot.
        #[arg(long)]
        snapshot: Option<String>,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
