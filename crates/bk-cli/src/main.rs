//! CLI entry point for boardkit.
//!
//! This binary runs toolchain discovery and reports what it found: search
//! roots, hardware platforms with their boards, and libraries.
//!
//! # Usage
//!
//! ```bash
//! boardkit [OPTIONS] <COMMAND>
//!
//! # Show where discovery looks
//! boardkit locations
//!
//! # Scan and list platforms
//! boardkit boards --runtime /opt/arduino-1.8.19 --detailed
//!
//! # List libraries from the last stored snapshot without scanning
//! boardkit --offline libraries
//!
//! # Resolve a library for a platform, as JSON
//! boardkit --json find-library arduino:avr Wire
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use bk_core::{
    Config, ConfigKind, DiscoveryModel, LibraryEntry, LibraryLayout, PlatformId, ScanIssue,
};
use bk_scanner::{BoardRegistry, JsonFileStore, LocationResolver, SnapshotStore};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Discovers Arduino-style toolchains, board platforms and libraries.
///
/// Searches toolchain installs and user sketchbooks, parses `boards.txt` and
/// `platform.txt`, and indexes libraries with the headers they include.
#[derive(Parser)]
#[command(name = "boardkit", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Toolchain install to search, before the host defaults.
    #[arg(long = "runtime", global = true, env = "BOARDKIT_RUNTIME", value_delimiter = ',')]
    runtime_dirs: Vec<Utf8PathBuf>,

    /// Sketchbook folder to search, before the home default.
    #[arg(long = "user", global = true, env = "BOARDKIT_USER", value_delimiter = ',')]
    user_dirs: Vec<Utf8PathBuf>,

    /// Only search the locations given with --runtime and --user.
    #[arg(long, global = true)]
    no_defaults: bool,

    /// Directory for `boards.json` and `libraries.json` snapshots.
    ///
    /// Defaults to a `boardkit` folder in the user cache directory.
    #[arg(long, global = true, env = "BOARDKIT_SNAPSHOT_DIR")]
    snapshot_dir: Option<Utf8PathBuf>,

    /// Load the last stored snapshot instead of scanning.
    #[arg(long, global = true)]
    offline: bool,

    /// Do not write a snapshot after scanning.
    #[arg(long, global = true)]
    no_store: bool,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "BOARDKIT_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Maximum number of library files read concurrently.
    #[arg(long, global = true, env = "BOARDKIT_MAX_OPEN_FILES")]
    max_open_files: Option<usize>,

    /// Print machine-readable JSON instead of a text summary.
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show the resolved search roots.
    Locations,

    /// Scan and list hardware platforms.
    Boards {
        /// List every board id per platform.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Scan and list libraries.
    Libraries {
        /// Also list libraries bundled with this platform (`vendor:arch`).
        #[arg(short, long)]
        platform: Option<String>,
    },

    /// Resolve a library for a platform.
    FindLibrary {
        /// Platform id, `vendor:arch`.
        platform: String,
        /// Library name.
        name: String,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default. Logs go
/// to stderr so `--json` output stays clean.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},ignore=warn,globset=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the optional config file, then applies CLI
/// overrides on top.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded or the result fails
/// validation.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .wrap_err_with(|| format!("Failed to load config from {path}"))?,
        None => Config::default(),
    };

    if !cli.runtime_dirs.is_empty() {
        config.discovery.runtime_dirs.clone_from(&cli.runtime_dirs);
    }
    if !cli.user_dirs.is_empty() {
        config.discovery.user_dirs.clone_from(&cli.user_dirs);
    }
    if cli.no_defaults {
        config.discovery.include_defaults = false;
    }
    if let Some(max) = cli.max_open_files {
        config.discovery.max_open_files = max;
    }
    if cli.snapshot_dir.is_some() {
        config.snapshot.dir.clone_from(&cli.snapshot_dir);
    }
    if config.snapshot.dir.is_none() {
        config.snapshot.dir = JsonFileStore::default_dir();
    }
    if cli.no_store {
        config.snapshot.store_after_scan = false;
    }

    config.validate()?;
    Ok(config)
}

/// Produces the model, either by scanning or from the stored snapshot.
///
/// Ctrl-C during a scan cancels it; the partial model is returned with its
/// cancellation marker set.
///
/// # Errors
///
/// Returns an error if `--offline` is set and no snapshot can be loaded.
async fn load_model(config: &Config, offline: bool) -> color_eyre::Result<Arc<DiscoveryModel>> {
    if offline {
        let dir = config
            .snapshot
            .dir
            .clone()
            .ok_or_else(|| eyre!("--offline needs a snapshot directory"))?;
        let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(&dir));
        let registry = BoardRegistry::from_snapshot(store, config.discovery.host_platform())
            .await
            .wrap_err_with(|| format!("Failed to load snapshot from {dir}"))?;
        return Ok(registry.model().await);
    }

    // Stored explicitly below so the process never exits mid-write.
    let registry = BoardRegistry::from_config(config).with_store_after_scan(false);

    let token = registry.cancellation_token().clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight reads");
            token.cancel();
        }
    });

    let model = registry.model().await;
    ctrl_c.abort();

    if let Some(stats) = registry.last_stats() {
        info!(
            operations = stats.issued,
            failed = stats.failed,
            refused = stats.refused,
            success_rate = stats.success_rate(),
            "Scan statistics"
        );
    }

    if model.cancelled {
        warn!("Discovery was cancelled; results are partial and were not stored");
    } else if config.snapshot.store_after_scan && config.snapshot.dir.is_some() {
        if let Err(e) = registry.store_snapshot().await {
            warn!(error = %e, "Failed to store snapshot");
        }
    }

    Ok(model)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Prints the resolved search roots.
fn run_locations(config: &Config, json: bool) -> color_eyre::Result<()> {
    let resolver = LocationResolver::from_config(&config.discovery);
    let roots = resolver.resolve_all(&config.discovery);

    if json {
        return print_json(&roots);
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "Search roots ({} host)", resolver.host())?;
    writeln!(handle, "==========================")?;
    for root in &roots {
        let exists = if root.path.is_dir() { "" } else { "  (missing)" };
        writeln!(handle, "  {:>2}  {:<8} {}{exists}", root.rank, root.kind, root.path)?;
    }
    if roots.is_empty() {
        writeln!(handle, "  (none)")?;
    }
    Ok(())
}

/// Lists hardware platforms.
fn run_boards(model: &DiscoveryModel, detailed: bool, json: bool) -> color_eyre::Result<()> {
    if json {
        #[derive(Serialize)]
        struct Report<'a> {
            platforms: &'a bk_core::PlatformMap,
            roots: &'a std::collections::BTreeMap<Utf8PathBuf, bk_core::RootStatus>,
            issues: &'a [ScanIssue],
            cancelled: bool,
        }

        return print_json(&Report {
            platforms: &model.platforms,
            roots: &model.roots,
            issues: &model.issues,
            cancelled: model.cancelled,
        });
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle)?;
    writeln!(handle, "Platforms ({})", model.platforms.len())?;
    writeln!(handle, "=============")?;
    for id in model.sorted_platform_ids() {
        let Some(entry) = model.platforms.get(id) else {
            continue;
        };
        let name = entry
            .config(ConfigKind::Platform)
            .and_then(|tree| tree.get_str("name"))
            .unwrap_or("-");
        let mut boards: Vec<_> = entry.board_ids().collect();
        boards.sort_unstable();

        writeln!(
            handle,
            "  {id:<24} {name}  ({} boards, {} bundled libraries)",
            boards.len(),
            entry.library_data.len()
        )?;

        if detailed {
            for board in boards {
                let board_name = entry
                    .boards
                    .as_ref()
                    .and_then(|tree| tree.get_str(&format!("{board}.name")))
                    .unwrap_or("");
                writeln!(handle, "      {board:<20} {board_name}")?;
            }
        }
    }

    if !model.roots.is_empty() {
        writeln!(handle)?;
        writeln!(handle, "Roots")?;
        writeln!(handle, "=====")?;
        for (path, status) in &model.roots {
            let version = status.runtime_version.as_deref().unwrap_or("-");
            let usable = if status.is_acceptable_runtime() { "  [usable runtime]" } else { "" };
            writeln!(handle, "  {:<8} {path}  version {version}{usable}", status.kind)?;
        }
    }

    print_issues(model);
    Ok(())
}

/// Lists global libraries, plus bundled ones for `platform`.
fn run_libraries(
    model: &DiscoveryModel,
    platform: Option<&str>,
    json: bool,
) -> color_eyre::Result<()> {
    let platform = platform.map(parse_platform).transpose()?;
    let bundled = platform
        .as_ref()
        .and_then(|id| model.platforms.get(id))
        .map(|entry| &entry.library_data);

    if json {
        #[derive(Serialize)]
        struct Report<'a> {
            libraries: &'a bk_core::LibraryMap,
            #[serde(skip_serializing_if = "Option::is_none")]
            bundled: Option<&'a bk_core::LibraryMap>,
        }

        return print_json(&Report {
            libraries: &model.libraries,
            bundled,
        });
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle)?;
    writeln!(handle, "Libraries ({})", model.libraries.len())?;
    writeln!(handle, "=============")?;
    for name in model.sorted_library_names() {
        if let Some(entry) = model.libraries.get(name) {
            write_library_line(&mut handle, entry)?;
        }
    }

    if let (Some(id), Some(bundled)) = (&platform, bundled) {
        let mut names: Vec<_> = bundled.keys().collect();
        names.sort_unstable();

        writeln!(handle)?;
        writeln!(handle, "Bundled with {id} ({})", names.len())?;
        for name in names {
            if let Some(entry) = bundled.get(name) {
                write_library_line(&mut handle, entry)?;
            }
        }
    }

    print_issues(model);
    Ok(())
}

/// Resolves one library for a platform.
///
/// # Errors
///
/// Returns an error if the platform id is malformed or nothing resolves.
fn run_find_library(
    model: &DiscoveryModel,
    platform: &str,
    name: &str,
    json: bool,
) -> color_eyre::Result<()> {
    let id = parse_platform(platform)?;
    let entry = model
        .find_library(&id, name)
        .ok_or_else(|| eyre!("Library {name} not found for {id}"))?;
    let dependencies = model.library_dependencies(&id, name);

    if json {
        #[derive(Serialize)]
        struct Found<'a> {
            library: &'a LibraryEntry,
            resolved_dependencies: &'a std::collections::BTreeSet<String>,
        }

        return print_json(&Found {
            library: entry,
            resolved_dependencies: &dependencies,
        });
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", entry.name)?;
    writeln!(handle, "  root:     {}", entry.root)?;
    if let Some(include) = entry.include_dir() {
        writeln!(handle, "  include:  {include}")?;
    }
    writeln!(handle, "  layout:   {}", layout_label(entry.layout()))?;
    writeln!(handle, "  files:    {}", entry.files.len())?;
    writeln!(handle, "  includes: {}", join(&entry.requirements))?;
    writeln!(handle, "  resolves: {}", join(&dependencies))?;
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn parse_platform(raw: &str) -> color_eyre::Result<PlatformId> {
    PlatformId::parse(raw).ok_or_else(|| eyre!("Expected a platform id like arduino:avr, got {raw}"))
}

fn print_json<T: Serialize>(value: &T) -> color_eyre::Result<()> {
    let json = serde_json::to_string_pretty(value).wrap_err("Failed to serialize JSON")?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;
    Ok(())
}

fn write_library_line(handle: &mut impl Write, entry: &LibraryEntry) -> std::io::Result<()> {
    writeln!(
        handle,
        "  {:<24} {:<7} {} files, {} dependencies",
        entry.name,
        layout_label(entry.layout()),
        entry.files.len(),
        entry.dependencies.len()
    )
}

const fn layout_label(layout: LibraryLayout) -> &'static str {
    match layout {
        LibraryLayout::Legacy => "legacy",
        LibraryLayout::Modern => "1.5",
        LibraryLayout::Unknown => "unknown",
    }
}

fn join(names: &std::collections::BTreeSet<String>) -> String {
    if names.is_empty() {
        return "-".to_owned();
    }
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Prints non-fatal issues to stderr.
fn print_issues(model: &DiscoveryModel) {
    if model.issues.is_empty() {
        return;
    }

    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Issues ({}):", model.issues.len());
    for issue in &model.issues {
        let _ = writeln!(handle, "  [{}] {} - {}", issue.kind, issue.path, issue.message);
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Merge config file and flags
    let config = build_config(&cli)?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Locations => run_locations(&config, cli.json),
        Commands::Boards { detailed } => {
            let model = load_model(&config, cli.offline).await?;
            run_boards(&model, *detailed, cli.json)
        }
        Commands::Libraries { platform } => {
            let model = load_model(&config, cli.offline).await?;
            run_libraries(&model, platform.as_deref(), cli.json)
        }
        Commands::FindLibrary { platform, name } => {
            let model = load_model(&config, cli.offline).await?;
            run_find_library(&model, platform, name, cli.json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("boardkit").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_applied_to_config() {
        let cli = parse(&[
            "--runtime",
            "/opt/a,/opt/b",
            "--user",
            "/home/ada/sketches",
            "--no-defaults",
            "--snapshot-dir",
            "/tmp/snap",
            "--no-store",
            "boards",
        ]);
        let config = build_config(&cli).unwrap();

        assert_eq!(
            config.discovery.runtime_dirs,
            [Utf8PathBuf::from("/opt/a"), Utf8PathBuf::from("/opt/b")]
        );
        assert_eq!(config.discovery.user_dirs, [Utf8PathBuf::from("/home/ada/sketches")]);
        assert!(!config.discovery.include_defaults);
        assert_eq!(config.snapshot.dir, Some(Utf8PathBuf::from("/tmp/snap")));
        assert!(!config.snapshot.store_after_scan);
    }

    #[test]
    fn test_zero_open_files_rejected() {
        let cli = parse(&["--max-open-files", "0", "locations"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn test_find_library_arguments() {
        let cli = parse(&["--json", "find-library", "arduino:avr", "Wire"]);
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::FindLibrary { ref platform, ref name }
                if platform == "arduino:avr" && name == "Wire"
        ));
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!(parse_platform("arduino:avr").unwrap(), PlatformId::new("arduino", "avr"));
        assert!(parse_platform("arduino").is_err());
    }

    #[test]
    fn test_layout_label() {
        assert_eq!(layout_label(LibraryLayout::Modern), "1.5");
        assert_eq!(layout_label(LibraryLayout::Legacy), "legacy");
    }
}
