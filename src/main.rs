use std::collections::HashSet;
use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use pypi_avail::check::{
    CheckError, Client, Lookup, canon_package_name, check_name, validate_package_name,
};
use pypi_avail::config::{Config, DEFAULT_API_URL, DEFAULT_PROJECT_URL, Index};
use pypi_avail::lookup::LiveLookup;
use pypi_avail::preference::{
    ColorMode, FileStore, MemoryStore, PreferenceStore, cycle_color_mode, load_color_mode,
};
use pypi_avail::render::render;

mod telemetry;

#[derive(Parser)]
#[command(
    name = "pypi-avail",
    about = "Check whether Python package names are available on PyPI",
    after_help = "Checks names against the PEP 508 naming rules, then queries PyPI using \
                  the PEP 503 canonical form (case-insensitive; runs of '.', '-' and '_' \
                  are equivalent).\n\n\
                  With --watch, each stdin line replaces the contents of a search field: \
                  lookups wait for a quiet period and stale lookups are cancelled.\n\n\
                  An available name may still be refused at upload time."
)]
struct Cli {
    /// Package names to check (also reads from stdin)
    names: Vec<String>,

    /// Suppress output, exit code only
    #[arg(short, long)]
    quiet: bool,

    /// Only print available names
    #[arg(short, long)]
    available_only: bool,

    /// Treat each stdin line as an edit of a search field and show results as they settle
    #[arg(long, conflicts_with_all = ["names", "quiet", "available_only"])]
    watch: bool,

    /// With --watch, print every state change as a JSON object
    #[arg(long)]
    json: bool,

    /// Color output (overrides the stored preference)
    #[arg(long, value_enum, value_name = "WHEN")]
    color: Option<ColorMode>,

    /// Advance the stored color preference (auto, always, never) and exit
    #[arg(long)]
    cycle_color: bool,

    /// Preference file (default: preferences are not persisted)
    #[arg(long, value_name = "PATH")]
    prefs: Option<PathBuf>,

    /// Quiet period before a --watch lookup starts
    #[arg(long, value_name = "MS", default_value_t = 300)]
    debounce_ms: u64,

    /// Give up on a request after this long
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Base URL of the JSON lookup endpoint
    #[arg(long, value_name = "URL", default_value = DEFAULT_API_URL)]
    index_url: String,

    /// Base URL of project pages
    #[arg(long, value_name = "URL", default_value = DEFAULT_PROJECT_URL)]
    project_url: String,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            debounce: Duration::from_millis(self.debounce_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            index: Index {
                api_url: self.index_url.clone(),
                project_url: self.project_url.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // `requires` cannot see through the implicit default of a flag
    if cli.json && !cli.watch {
        Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "--json requires --watch")
            .exit();
    }
    telemetry::init(cli.verbose);

    let mut store: Box<dyn PreferenceStore> = match &cli.prefs {
        Some(path) => Box::new(FileStore::new(path)),
        None => Box::new(MemoryStore::default()),
    };

    if cli.cycle_color {
        return match cycle_color_mode(&mut *store) {
            Ok(mode) => {
                println!("{mode}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(2)
            }
        };
    }

    let color = cli.color.unwrap_or_else(|| load_color_mode(&*store));
    color.apply();

    let config = cli.config();
    debug!(?config, "starting");

    if cli.watch {
        return watch(&config, color, cli.json).await;
    }

    let mut names: Vec<String> = cli.names;

    // Read from stdin if not a terminal
    if !io::stdin().is_terminal() {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(l) => {
                    let trimmed = l.trim().to_string();
                    if !trimmed.is_empty() {
                        names.push(trimmed);
                    }
                }
                Err(e) => {
                    eprintln!("error: reading stdin: {e}");
                    return ExitCode::from(2);
                }
            }
        }
    }

    if names.is_empty() {
        eprintln!("error: no package names provided");
        eprintln!("usage: pypi-avail [OPTIONS] [NAMES...]");
        return ExitCode::from(2);
    }

    // Deduplicate while preserving order; valid names collide on their canonical form
    let mut seen = HashSet::new();
    names.retain(|n| seen.insert(dedup_key(n)));

    let client = match Client::from_config(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    // Check all names concurrently
    let handles: Vec<_> = names
        .into_iter()
        .map(|name| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let result = check_name(&client, &name).await;
                (name, result)
            })
        })
        .collect();

    let mut all_available = true;

    for handle in handles {
        let (name, result) = match handle.await {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("error: check task failed: {e}");
                all_available = false;
                continue;
            }
        };

        let (label, detail) = match &result {
            Ok(Lookup::Available { .. }) => ("available", String::new()),
            Ok(Lookup::Taken { project_url, .. }) => ("taken", format!(": {project_url}")),
            Ok(Lookup::Failed(failure)) => ("error", format!(": {failure}")),
            Err(e @ (CheckError::Empty | CheckError::InvalidName(_))) => {
                ("invalid", format!(": {e}"))
            }
            Err(e @ CheckError::Cancelled(_)) => ("error", format!(": {e}")),
        };

        let available = matches!(result, Ok(Lookup::Available { .. }));
        if !available {
            all_available = false;
        }

        if cli.quiet {
            continue;
        }

        if cli.available_only && !available {
            continue;
        }

        println!("{name}\t{label}{detail}");
    }

    if all_available {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn dedup_key(name: &str) -> String {
    let name = name.trim();
    if !name.is_empty() && validate_package_name(name).is_ok() {
        canon_package_name(name)
    } else {
        format!("\0{name}")
    }
}

/// Feed stdin lines to a [`LiveLookup`] and print each rendered state.
///
/// Returns once stdin is closed and the last edit has settled.
async fn watch(config: &Config, color: ColorMode, json: bool) -> ExitCode {
    let client = match Client::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    let mut live = LiveLookup::new(client, config);
    let mut states = live.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last_printed: Option<String> = None;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => live.on_input_change(line),
                Ok(None) => stdin_open = false,
                Err(e) => {
                    eprintln!("error: reading stdin: {e}");
                    return ExitCode::from(2);
                }
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                let output = if json {
                    serde_json::to_string(&state).ok()
                } else {
                    if color == ColorMode::Auto {
                        color.apply();
                    }
                    render(&state).map(|panel| panel.to_string())
                };
                match output {
                    Some(output) if last_printed.as_deref() != Some(output.as_str()) => {
                        println!("{output}");
                        last_printed = Some(output);
                    }
                    Some(_) => {}
                    // A blank panel ends the run of repeats
                    None => last_printed = None,
                }
            }
        }

        if !stdin_open
            && states.borrow().phase().is_settled()
            && !states.has_changed().unwrap_or(false)
        {
            break;
        }
    }

    live.shutdown();
    ExitCode::SUCCESS
}
