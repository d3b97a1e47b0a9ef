use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use qapad::cli::{Cli, CliCommand};
use qapad::config::Config;
use qapad::error::{Error, Result};
use qapad::session::Session;
use qapad::shell::{self, Shell};
use qapad::suggest::{SuggestionClient, validate_component};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
}

fn print_projects(config: &Config) {
    for project in &config.projects {
        println!("{:<12} {}  {}", project.id, project.name, project.url);
    }
}

async fn suggest_once(config: Config, project: Option<String>, component: String) -> Result<()> {
    let component = validate_component(&component)?.to_string();
    let mut session = Session::new(config.projects.clone());
    if let Some(ref id) = project
        && !session.select_project(id)
    {
        return Err(Error::Validation(format!("unknown project: {id}")));
    }
    let project = session
        .selected_project()
        .cloned()
        .ok_or_else(|| Error::Configuration("no projects configured".to_string()))?;

    let client = SuggestionClient::from_config(&config)?;
    let url = project.url.clone();
    let suggestions = tokio::task::spawn_blocking(move || client.suggest_bugs(&url, &component))
        .await
        .map_err(|e| Error::SuggestionService(format!("suggestion task failed: {e}")))??;

    if suggestions.is_empty() {
        println!("no suggestions returned");
    }
    for (i, s) in suggestions.iter().enumerate() {
        println!("{}. {}", i + 1, s.title);
        println!("   {}", s.description);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    debug!(?config, "config loaded");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            Some(CliCommand::Projects) => {
                print_projects(&config);
                Ok(())
            }
            Some(CliCommand::Suggest { component, project }) => {
                suggest_once(config, project, component).await
            }
            None => {
                info!(seconds = config.session_seconds, "session starting");
                shell::run(Shell::new(config)).await
            }
        }
    });

    // Blocking work still running after the shell quits (a pending suggestion
    // request, the stdin reader) is abandoned rather than awaited.
    runtime.shutdown_background();

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
