use clap::{Parser, Subcommand};

/// qapad: timed manual QA scratchpad with AI bug suggestions
#[derive(Parser, Debug, Clone)]
#[command(name = "qapad", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Path to config file (default: qapad.toml if present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Generative model used for suggestions (default: gemini-2.5-flash)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Environment variable holding the API key (default: API_KEY)
    #[arg(long, global = true)]
    pub api_key_env: Option<String>,

    /// Suggestion request timeout in seconds
    #[arg(long, global = true)]
    pub request_timeout: Option<u64>,

    /// Session countdown length in seconds
    #[arg(long)]
    pub session_seconds: Option<u64>,

    /// Directory bug reports are exported to
    #[arg(long)]
    pub export_dir: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List the configured projects
    Projects,

    /// Ask for bug suggestions about one component, print them and exit
    Suggest {
        /// Component to analyze (e.g. "header navigation")
        component: String,

        /// Project id (default: first configured project)
        #[arg(long)]
        project: Option<String>,
    },
}
