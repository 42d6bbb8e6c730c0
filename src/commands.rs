//! CLI command definitions
//!
//! Defines the clap commands for the parity probe CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the built-in scenario catalog against every environment
    Run {
        /// Only run these scenario tags (e.g. api-7); can be repeated
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Only run these groups (e.g. users, cart); can be repeated
        #[arg(long = "group", short = 'g')]
        groups: Vec<String>,

        /// Print every response body preview
        #[arg(long, short)]
        verbose: bool,

        /// Print the report as JSON instead of colored text
        #[arg(long)]
        json: bool,
    },

    /// Execute scenarios defined in a YAML file
    Test {
        /// Path to the YAML scenario or suite file
        path: PathBuf,

        /// Print every response body preview
        #[arg(long, short)]
        verbose: bool,

        /// Print the report as JSON instead of colored text
        #[arg(long)]
        json: bool,
    },

    /// List the built-in scenarios
    List {
        /// Only list this group
        #[arg(long, short = 'g')]
        group: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send one ad-hoc request to every environment and compare the answers
    Probe {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,

        /// Path relative to the base URL; {uuid.<name>} placeholders are filled in
        path: String,

        /// JSON request body
        #[arg(long = "json-body")]
        json_body: Option<String>,

        /// Query parameter as key=value; can be repeated
        #[arg(long = "query", short = 'q')]
        query: Vec<String>,

        /// Task tag sent in the task header
        #[arg(long, default_value = "adhoc")]
        tag: String,
    },

    /// Show the effective configuration (token redacted)
    Config,
}
