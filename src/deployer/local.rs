//! Local build pipeline.
//!
//! Runs the project's dependency install and build in its checkout, guarded by
//! the policy gate. Every line of subprocess output is forwarded to a
//! [`LogSink`] as soon as the command finishes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::LocalSettings;
use crate::error::{DeployError, Result};
use crate::policy::PolicyGate;

use super::Deploy;
use super::result::{DeployRequest, DeploymentResult};
use super::sink::LogSink;

/// Default value for `NODE_ENV` when the env file does not set it.
const DEFAULT_NODE_ENV: &str = "production";

/// Deployer that builds the project on this host.
#[derive(Debug, Clone)]
pub struct LocalDeployer {
    gate: PolicyGate,
    build_tool: String,
    env_file: String,
}

/// A resolved build: working directory, environment and commands to run.
#[derive(Debug, Clone)]
pub struct BuildPipeline {
    /// Repository checkout the commands run in.
    pub repo_dir: PathBuf,
    /// Full environment for the subprocesses. Inherited values need not be
    /// UTF-8.
    pub env: HashMap<OsString, OsString>,
    /// Commands to run in order; the first element of each is the program.
    pub commands: Vec<Vec<String>>,
}

impl LocalDeployer {
    /// Creates a local deployer.
    #[must_use]
    pub fn new(gate: PolicyGate, settings: &LocalSettings) -> Self {
        Self {
            gate,
            build_tool: settings.build_tool.clone(),
            env_file: settings.env_file.clone(),
        }
    }

    /// Checks the repository and resolves the build commands without running
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the repo path is missing or does not exist, or if
    /// the build tool cannot be found.
    pub fn prepare(&self, repo_path: Option<&str>) -> Result<BuildPipeline> {
        self.prepare_with(repo_path, std::env::vars_os())
    }

    /// Like [`Self::prepare`], with the inherited environment supplied by
    /// the caller.
    ///
    /// # Errors
    ///
    /// Same as [`Self::prepare`].
    pub fn prepare_with<I>(&self, repo_path: Option<&str>, inherited: I) -> Result<BuildPipeline>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let repo_path = strip_wrapping_quotes(repo_path.unwrap_or_default());
        if repo_path.is_empty() {
            return Err(DeployError::repository("Project repo_path is required for execution").into());
        }

        let repo_dir = PathBuf::from(repo_path);
        if !repo_dir.exists() {
            return Err(DeployError::repository(format!(
                "Repo path does not exist: {}",
                repo_dir.display()
            ))
            .into());
        }

        let env = self.build_env(&repo_dir, inherited);
        let program = resolve_tool(&self.build_tool, &env)?;

        let with_args = |args: &[&str]| {
            program
                .iter()
                .cloned()
                .chain(args.iter().map(|arg| (*arg).to_string()))
                .collect::<Vec<_>>()
        };

        Ok(BuildPipeline {
            commands: vec![with_args(&["install"]), with_args(&["run", "build"])],
            repo_dir,
            env,
        })
    }

    /// Runs the build pipeline, streaming output into `sink`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if the policy gate refuses, a repository or
    /// tool error from [`Self::prepare`], or `ExternalFailure` on the first
    /// command that exits non-zero.
    pub async fn execute(&self, repo_path: Option<&str>, sink: &mut dyn LogSink) -> Result<()> {
        self.gate.ensure_execution_allowed()?;
        let pipeline = self.prepare(repo_path)?;

        for command in &pipeline.commands {
            run_command(command, &pipeline, sink).await?;
        }

        info!(repo = %pipeline.repo_dir.display(), "Local build completed");
        Ok(())
    }

    fn build_env<I>(&self, repo_dir: &Path, inherited: I) -> HashMap<OsString, OsString>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut env: HashMap<OsString, OsString> = inherited.into_iter().collect();

        let env_path = repo_dir.join(&self.env_file);
        match std::fs::read_to_string(&env_path) {
            Ok(contents) => env.extend(
                parse_env_file(&contents)
                    .into_iter()
                    .map(|(key, value)| (OsString::from(key), OsString::from(value))),
            ),
            Err(_) => warn!(path = %env_path.display(), "Env file missing"),
        }

        env.entry(OsString::from("NODE_ENV"))
            .or_insert_with(|| OsString::from(DEFAULT_NODE_ENV));
        env
    }
}

async fn run_command(
    command: &[String],
    pipeline: &BuildPipeline,
    sink: &mut dyn LogSink,
) -> Result<()> {
    let printable = command.join(" ");
    sink.record(format!("$ {printable}")).await?;

    let Some((program, args)) = command.split_first() else {
        return Ok(());
    };

    debug!(command = %printable, "Running build command");
    let output = Command::new(program)
        .args(args)
        .current_dir(&pipeline.repo_dir)
        .env_clear()
        .envs(&pipeline.env)
        .output()
        .await
        .map_err(|e| DeployError::external(format!("Failed to start '{printable}': {e}")))?;

    for stream in [&output.stdout, &output.stderr] {
        let text = String::from_utf8_lossy(stream);
        let text = text.trim();
        if !text.is_empty() {
            sink.record(text.to_string()).await?;
        }
    }

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map_or_else(|| String::from("unknown"), |code| code.to_string());
        sink.record(format!("Command failed with exit code {code}"))
            .await?;
        return Err(DeployError::external(format!(
            "Command '{printable}' failed with exit code {code}"
        ))
        .into());
    }

    Ok(())
}

#[async_trait]
impl Deploy for LocalDeployer {
    fn name(&self) -> &'static str {
        "Local"
    }

    fn validate_config(&self) -> Result<()> {
        self.gate.ensure_execution_allowed()
    }

    async fn deploy(&self, request: &DeployRequest<'_>) -> DeploymentResult {
        let mut logs = vec![
            format!("Starting local deployment for {}", request.project_name),
            format!("Environment: {}", request.environment),
        ];

        match self.execute(request.repo_path, &mut logs).await {
            Ok(()) => {
                logs.push(String::from("Local build completed successfully!"));
                DeploymentResult::ok("Local deployment completed")
                    .with_logs(logs)
                    .with_metadata("environment", request.environment.as_str())
            }
            Err(e) => DeploymentResult::failed(e.to_string()).with_logs(logs),
        }
    }

    async fn deployment_status(&self, deployment_id: &str) -> DeploymentResult {
        DeploymentResult::ok("Local deployments complete synchronously")
            .with_id(Some(deployment_id.to_string()))
    }

    async fn rollback(&self, _deployment_id: &str) -> DeploymentResult {
        DeploymentResult::failed(
            "Local rollback not implemented. Use git to checkout previous version.",
        )
    }
}

/// Parses `KEY=value` lines. Blank lines, `#` comments and lines without `=`
/// are skipped; the first `=` splits key from value and both are trimmed.
#[must_use]
pub fn parse_env_file(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Removes one pair of matching single or double quotes around a path.
#[must_use]
pub fn strip_wrapping_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim();
        }
    }
    trimmed
}

/// Resolves the build tool to a command prefix.
///
/// The `PATH` of the overlaid environment is searched first, then a fixed set
/// of installation directories. On Windows the tool is launched through
/// `cmd.exe /c` so `.cmd` shims work.
fn resolve_tool(tool: &str, env: &HashMap<OsString, OsString>) -> Result<Vec<String>> {
    let names: Vec<String> = if cfg!(windows) {
        vec![format!("{tool}.cmd"), tool.to_string()]
    } else {
        vec![tool.to_string()]
    };

    let on_path = env
        .get(OsStr::new("PATH"))
        .map(|path| std::env::split_paths(path).collect::<Vec<_>>())
        .unwrap_or_default();
    let found = find_in(&on_path, &names).or_else(|| find_in(&fallback_dirs(env), &names));

    let Some(found) = found else {
        return Err(DeployError::ToolMissing {
            tool: tool.to_string(),
            hint: String::from("Install it and ensure it is on PATH for the worker process."),
        }
        .into());
    };

    let found = found.display().to_string();
    debug!(tool, path = %found, "Resolved build tool");

    if cfg!(windows) {
        let system_root = env
            .get(OsStr::new("SystemRoot"))
            .map_or_else(|| PathBuf::from("C:\\Windows"), PathBuf::from);
        let cmd_exe = system_root.join("System32").join("cmd.exe");
        let cmd_exe = if cmd_exe.exists() {
            cmd_exe.display().to_string()
        } else {
            String::from("cmd.exe")
        };
        Ok(vec![cmd_exe, String::from("/c"), found])
    } else {
        Ok(vec![found])
    }
}

fn find_in(dirs: &[PathBuf], names: &[String]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn fallback_dirs(env: &HashMap<OsString, OsString>) -> Vec<PathBuf> {
    if cfg!(windows) {
        let mut dirs = Vec::new();
        if let Some(program_files) = env.get(OsStr::new("ProgramFiles")) {
            dirs.push(PathBuf::from(program_files).join("nodejs"));
        }
        if let Some(appdata) = env.get(OsStr::new("APPDATA")) {
            dirs.push(PathBuf::from(appdata));
            dirs.push(PathBuf::from(appdata).join("npm"));
        }
        dirs
    } else {
        let mut dirs = vec![
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/usr/bin"),
            PathBuf::from("/opt/homebrew/bin"),
        ];
        if let Some(home) = dirs::home_dir() {
            dirs.push(home.join(".volta").join("bin"));
            dirs.push(home.join(".local").join("bin"));
        }
        dirs
    }
}
