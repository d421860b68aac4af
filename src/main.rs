//! Commander CLI entrypoint.
//!
//! This is the main entrypoint for the commander command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use devops_commander::cli::{Cli, Commands, OutputFormatter, ProjectCommands};
use devops_commander::config::{Settings, SettingsLoader, SettingsValidator, find_settings_file};
use devops_commander::error::{CommanderError, Result};
use devops_commander::queue::SpoolQueue;
use devops_commander::runner::ExecutionRunner;
use devops_commander::store::{ExecutionId, FileStore, NewProject, PlanId, ProjectId};
use devops_commander::worker::Worker;
use devops_commander::workflow::Workflow;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_client_error() => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    if let Commands::Init { path, force } = &cli.command {
        return cmd_init(path, *force);
    }

    let (settings, warnings) = load_settings(cli.config.as_deref())?;
    let store = Arc::new(FileStore::new(settings.storage.data_dir.clone()));
    let queue = Arc::new(SpoolQueue::new(&settings.storage.data_dir, settings.queue.name.clone()));
    debug!(
        data_dir = %settings.storage.data_dir.display(),
        queue = %queue.name(),
        "Storage ready"
    );

    let workflow = Workflow::new(store.as_ref(), queue.as_ref(), &settings);

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Project { command } => match command {
            ProjectCommands::Add {
                name,
                repo_path,
                repo_url,
            } => {
                let project = workflow
                    .create_project(NewProject {
                        name,
                        repo_path,
                        repo_url,
                    })
                    .await?;
                emit(&formatter.format_project(&project))
            }
            ProjectCommands::List => emit(&formatter.format_projects(&workflow.list_projects().await?)),
        },
        Commands::Parse { project, text } => {
            let project_id = resolve_project(&workflow, &project).await?;
            let plan = workflow.parse_command(project_id, &text.join(" ")).await?;
            emit(&formatter.format_plan(&plan))
        }
        Commands::Plan { id } => {
            let plan = workflow.get_plan(id.parse::<PlanId>()?).await?;
            emit(&formatter.format_plan(&plan))
        }
        Commands::Approve { id } => {
            let receipt = workflow.approve_plan(id.parse::<PlanId>()?).await?;
            emit(&formatter.format_receipt(&receipt))
        }
        Commands::Execution { id } => {
            let execution = workflow.get_execution(id.parse::<ExecutionId>()?).await?;
            emit(&formatter.format_execution(&execution))
        }
        Commands::Worker { drain } => {
            let poll_interval = Duration::from_millis(settings.queue.poll_interval_ms);
            let runner = ExecutionRunner::new(store, Arc::new(settings));
            let worker = Worker::new(queue, runner, poll_interval);
            if drain {
                let processed = worker.drain().await?;
                emit(&formatter.format_drain(processed))
            } else {
                worker
                    .run(async {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            warn!("Failed to listen for Ctrl-C: {e}");
                            std::future::pending::<()>().await;
                        }
                        info!("Shutdown requested");
                    })
                    .await
            }
        }
        Commands::Status { deployment_id } => {
            let result = workflow.deployment_status(&deployment_id).await?;
            emit(&formatter.format_deployment(&result))
        }
        Commands::Rollback {
            execution_id,
            deployment_id,
        } => {
            let result = workflow
                .rollback(execution_id.parse::<ExecutionId>()?, &deployment_id)
                .await?;
            emit(&formatter.format_deployment(&result))
        }
        Commands::Config => emit(&formatter.format_settings(&settings.redacted_summary(), &warnings)),
    }
}

/// Loads `.env`, the settings file and environment overrides, then validates.
fn load_settings(explicit: Option<&Path>) -> Result<(Settings, Vec<String>)> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_settings_file(std::env::current_dir()?),
    };

    let base = path
        .as_deref()
        .and_then(Path::parent)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let loader = SettingsLoader::new().with_base_path(base);
    loader.load_dotenv()?;

    let settings = loader.load(path.as_deref(), |name| std::env::var(name).ok())?;
    let result = SettingsValidator::new().validate(&settings)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    Ok((settings, result.warnings))
}

/// Accepts a project id or a project name.
async fn resolve_project(workflow: &Workflow<'_>, reference: &str) -> Result<ProjectId> {
    if let Ok(id) = reference.parse::<ProjectId>() {
        return Ok(id);
    }

    workflow
        .list_projects()
        .await?
        .into_iter()
        .find(|p| p.name == reference)
        .map(|p| p.id)
        .ok_or_else(|| CommanderError::not_found("Project", reference))
}

fn emit(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

/// Initialize a new commander directory.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing commander in: {}", path.display());

    let settings_path = path.join("commander.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && settings_path.exists() {
        eprintln!("Settings file already exists: {}", settings_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&settings_path, include_str!("../templates/commander.yaml"))?;
    eprintln!("Created: {}", settings_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let missing: Vec<&str> = [".env", "data/"]
            .into_iter()
            .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
            .collect();
        if !missing.is_empty() {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# commander")?;
            for entry in missing {
                writeln!(file, "{entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\ndata/\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nInitialized. Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in provider credentials");
    eprintln!("  2. commander project add my-app --repo-path ./my-app");
    eprintln!("  3. commander parse --project my-app deploy to staging and run tests");
    eprintln!("  4. commander approve <plan-id>, then commander worker");

    Ok(())
}
