//! Command-line front end: resolves which directories to watch, wires up the
//! sinks and runs the monitor until interrupted.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use logwatch_watcher::{DirectoryCandidate, LogDirectoryDiscovery, LogWatchConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Discover log directories and monitor them for changes using inotify.
#[derive(Debug, Parser)]
#[command(name = "logwatch", version)]
pub struct Cli {
    /// Discover and list potential log directories.
    #[arg(long)]
    pub discover: bool,

    /// Monitor directories for changes (discovered ones unless --dirs is given).
    #[arg(long)]
    pub monitor: bool,

    /// Specific directories to monitor.
    #[arg(long, num_args = 1.., value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// Append every event to this file as JSON.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print full event records and enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Maximum number of discovered directories to monitor [default: 50].
    #[arg(long, value_name = "N")]
    pub max_dirs: Option<usize>,

    /// TOML file overriding discovery and monitor settings.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// What the invocation asked for.
#[derive(Debug, PartialEq, Eq)]
pub enum Plan {
    /// No mode flag was given.
    Help,

    /// Discovery results were printed; nothing else to do.
    DiscoverOnly,

    /// Watch these directories.
    Monitor(Vec<PathBuf>),
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default level.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Load the configuration file, if any, and apply command-line overrides.
pub fn load_config(cli: &Cli) -> Result<LogWatchConfig> {
    let mut config = match &cli.config {
        Some(path) => LogWatchConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LogWatchConfig::default(),
    };

    if let Some(max_dirs) = cli.max_dirs {
        config.monitor.max_dirs = max_dirs;
    }

    Ok(config)
}

/// Decide what to do, running discovery and printing its results if asked.
pub fn plan(cli: &Cli, config: &LogWatchConfig, out: &mut dyn Write) -> Result<Plan> {
    let explicit = !cli.dirs.is_empty();

    if !cli.discover && !cli.monitor {
        return Ok(Plan::Help);
    }

    let discovered = if cli.discover || !explicit {
        info!("Discovering log directories...");
        let found = LogDirectoryDiscovery::new(config.discovery.clone()).discover();

        if cli.discover {
            writeln!(out, "Found {} potential log directories:", found.len())?;
            for dir in &found {
                writeln!(out, "  {}", dir.display())?;
            }
        }
        found
    } else {
        Default::default()
    };

    if !cli.monitor {
        return Ok(Plan::DiscoverOnly);
    }

    if explicit {
        return Ok(Plan::Monitor(validate_directories(&cli.dirs)));
    }

    let max_dirs = config.monitor.max_dirs;
    if discovered.len() > max_dirs {
        info!(
            "Monitoring the first {max_dirs} of {} discovered directories",
            discovered.len()
        );
    }
    Ok(Plan::Monitor(discovered.into_iter().take(max_dirs).collect()))
}

/// Keep the directories that exist and are readable, dropping duplicates.
pub fn validate_directories(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut valid = Vec::new();

    for dir in dirs {
        if !seen.insert(dir) {
            continue;
        }

        let candidate = DirectoryCandidate::probe(dir);
        if candidate.is_usable() {
            valid.push(candidate.path);
        } else if candidate.exists {
            warn!("Directory is not readable: {}", dir.display());
        } else {
            warn!("Directory does not exist: {}", dir.display());
        }
    }

    valid
}

/// Run the command.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;

    match plan(&cli, &config, &mut io::stdout())? {
        Plan::Help => {
            Cli::command().print_help()?;
            Ok(ExitCode::SUCCESS)
        }
        Plan::DiscoverOnly => Ok(ExitCode::SUCCESS),
        Plan::Monitor(dirs) => monitor(&cli, config, dirs).await,
    }
}

#[cfg(target_os = "linux")]
async fn monitor(cli: &Cli, config: LogWatchConfig, dirs: Vec<PathBuf>) -> Result<ExitCode> {
    use logwatch_watcher::{ConsoleSink, FileSink, InotifyBackend, Monitor};
    use tracing::error;

    let backend = InotifyBackend::new().context("failed to initialize inotify")?;
    let mut monitor = Monitor::new(backend, config.monitor);

    monitor.add_sink(Box::new(ConsoleSink::stdout(cli.verbose)));
    if let Some(path) = &cli.output {
        let sink = FileSink::open(path)
            .with_context(|| format!("failed to open output file {}", path.display()))?;
        monitor.add_sink(Box::new(sink));
    }

    match monitor.register_all(&dirs) {
        Ok(count) => info!("Successfully added {count} directories for monitoring"),
        Err(e) => {
            error!("{e}");
            return Ok(ExitCode::FAILURE);
        }
    }

    let dirs: Vec<String> = monitor
        .directories()
        .iter()
        .map(|dir| dir.display().to_string())
        .collect();
    info!("Monitored directories: {}", dirs.join(", "));

    match monitor.run(shutdown_signal()).await {
        Ok(stats) => {
            info!(
                "Cleanup completed: {} events, {} watches released",
                stats.events, stats.released
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Monitoring failed: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(not(target_os = "linux"))]
async fn monitor(_cli: &Cli, _config: LogWatchConfig, _dirs: Vec<PathBuf>) -> Result<ExitCode> {
    anyhow::bail!("monitoring requires inotify and is only supported on Linux")
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Monitoring stopped by user"),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => warn!("Failed to install signal handlers: {e}"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Monitoring stopped by user"),
        Err(e) => {
            warn!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwatch_watcher::DiscoveryConfig;
    use pretty_assertions::assert_eq;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("logwatch").chain(args.iter().copied())).unwrap()
    }

    fn config_for(root: &std::path::Path) -> LogWatchConfig {
        LogWatchConfig {
            discovery: DiscoveryConfig::with_roots([root.to_string_lossy().into_owned()]),
            ..Default::default()
        }
    }

    /// Root with three log subdirectories.
    fn log_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for name in ["apache2", "mysql", "nginx"] {
            let dir = temp_dir.path().join(name);
            fs::create_dir(&dir).unwrap();
            File::create(dir.join("error.log")).unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_parse_flags() {
        let cli = parse(&["--monitor", "--dirs", "/var/log", "/tmp/logs", "-v"]);
        assert!(cli.monitor);
        assert!(cli.verbose);
        assert_eq!(
            cli.dirs,
            vec![PathBuf::from("/var/log"), PathBuf::from("/tmp/logs")]
        );
        assert_eq!(cli.max_dirs, None);
    }

    #[test]
    fn test_no_mode_prints_help() {
        let cli = parse(&["--dirs", "/var/log"]);
        let mut out = Vec::new();
        let plan = plan(&cli, &LogWatchConfig::default(), &mut out).unwrap();
        assert_eq!(plan, Plan::Help);
        assert!(out.is_empty());
    }

    #[test]
    fn test_discover_only_lists_directories() {
        let tree = log_tree();
        let cli = parse(&["--discover"]);
        let mut out = Vec::new();

        let plan = plan(&cli, &config_for(tree.path()), &mut out).unwrap();
        assert_eq!(plan, Plan::DiscoverOnly);

        let out = String::from_utf8(out).unwrap();
        let root = tree.path().display();
        assert_eq!(
            out,
            format!(
                "Found 4 potential log directories:\n  {root}\n  {root}/apache2\n  {root}/mysql\n  {root}/nginx\n"
            )
        );
    }

    #[test]
    fn test_monitor_caps_discovered_directories() {
        let tree = log_tree();
        let cli = parse(&["--monitor", "--max-dirs", "2"]);
        let config = config_for(tree.path());
        let config = LogWatchConfig {
            monitor: config.monitor.clone().with_max_dirs(cli.max_dirs.unwrap()),
            ..config
        };

        let plan = plan(&cli, &config, &mut Vec::new()).unwrap();
        assert_eq!(
            plan,
            Plan::Monitor(vec![
                tree.path().to_path_buf(),
                tree.path().join("apache2"),
            ])
        );
    }

    #[test]
    fn test_explicit_directories_override_discovery() {
        let tree = log_tree();
        let nginx = tree.path().join("nginx");
        let missing = tree.path().join("missing");
        let nginx_arg = nginx.to_string_lossy().into_owned();
        let missing_arg = missing.to_string_lossy().into_owned();
        let cli = parse(&["--monitor", "--dirs", &nginx_arg, &missing_arg, &nginx_arg]);

        let plan = plan(&cli, &config_for(tree.path()), &mut Vec::new()).unwrap();
        assert_eq!(plan, Plan::Monitor(vec![nginx]));
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logwatch.toml");
        fs::write(&path, "[discovery]\ncandidate_roots = [\"/srv/logs\"]\n").unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        let cli = parse(&["--discover", "--config", &path_arg, "--max-dirs", "7"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.discovery.candidate_roots, vec!["/srv/logs".to_string()]);
        assert_eq!(config.monitor.max_dirs, 7);
    }

    #[test]
    fn test_load_config_missing_file() {
        let cli = parse(&["--discover", "--config", "/nonexistent/logwatch.toml"]);
        assert!(load_config(&cli).is_err());
    }
}
