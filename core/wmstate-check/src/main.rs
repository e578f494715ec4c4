//! wmstate-check: command-line harness for activity/window manager agreement.
//!
//! ## Subcommands
//!
//! - `parse`: Parse one saved dump and print the model as JSON
//! - `check`: Cross-check a saved pair of dumps once
//! - `wait`: Poll a device over adb (or a pair of dump files) until both
//!   managers agree

mod source;

use clap::{Parser, Subcommand, ValueEnum};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wmstate_core::validate::check_sanity;
use wmstate_core::{
    load_config, validate, CompositorState, DumpSource, Reconciler, Result, SchedulerState,
    StateError,
};

use crate::source::{AdbDumpSource, FileDumpSource};

#[derive(Parser)]
#[command(name = "wmstate-check")]
#[command(about = "Checks that the activity and window managers agree")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DumpKind {
    /// `dumpsys activity activities` output
    Activities,
    /// `dumpsys window -a` output
    Windows,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a saved dump and print it as JSON
    Parse {
        #[arg(value_enum)]
        kind: DumpKind,

        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Cross-check a saved activity dump against a saved window dump
    Check {
        #[arg(long, value_name = "FILE")]
        activities: PathBuf,

        #[arg(long, value_name = "FILE")]
        windows: PathBuf,

        /// Also compare task bounds against their stack bounds
        #[arg(long)]
        compare_bounds: bool,
    },

    /// Poll a device until both managers agree, then assert on the result
    Wait {
        /// Device serial passed to `adb -s`
        #[arg(long, conflicts_with = "activities_dump")]
        serial: Option<String>,

        /// Re-read this activity dump on every attempt instead of asking adb
        #[arg(long, value_name = "FILE", requires = "windows_dump")]
        activities_dump: Option<PathBuf>,

        /// Re-read this window dump on every attempt instead of asking adb
        #[arg(long, value_name = "FILE", requires = "activities_dump")]
        windows_dump: Option<PathBuf>,

        /// Activity that must be visible; repeatable
        #[arg(long = "activity", value_name = "NAME")]
        activities: Vec<String>,

        /// Stack each activity must be in, in the same order as --activity
        #[arg(long = "stack-id", value_name = "ID")]
        stack_ids: Vec<i32>,

        /// Also compare task bounds against their stack bounds
        #[arg(long)]
        compare_bounds: bool,

        /// Config file (defaults to ~/.wmstate/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { kind, file } => run_parse(kind, &file),
        Commands::Check {
            activities,
            windows,
            compare_bounds,
        } => run_check(&activities, &windows, compare_bounds),
        Commands::Wait {
            serial,
            activities_dump,
            windows_dump,
            activities,
            stack_ids,
            compare_bounds,
            config,
        } => {
            let request = WaitRequest {
                activities: &activities,
                stack_ids: &stack_ids,
                compare_bounds,
                config,
            };
            match (activities_dump, windows_dump) {
                (Some(activities), Some(windows)) => {
                    run_wait(FileDumpSource::new(activities, windows), request)
                }
                _ => run_wait(AdbDumpSource::new(serial), request),
            }
        }
    };

    if let Err(err) = result {
        match err.violations() {
            Some(violations) => println!("{}", violations),
            None => tracing::error!(error = %err, "wmstate-check failed"),
        }
        std::process::exit(1);
    }
}

fn init_logging() {
    let debug_enabled = env::var("WMSTATE_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_dump(path: &Path) -> Result<String> {
    fs_err::read_to_string(path).map_err(|source| StateError::Io {
        context: "reading dump".to_string(),
        source,
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| StateError::Io {
        context: "rendering JSON".to_string(),
        source: err.into(),
    })?;
    println!("{}", rendered);
    Ok(())
}

fn run_parse(kind: DumpKind, file: &Path) -> Result<()> {
    let dump = read_dump(file)?;
    match kind {
        DumpKind::Activities => {
            let state = SchedulerState::parse(&dump);
            tracing::debug!(dropped = state.dropped_lines(), "parsed activity dump");
            print_json(&state)
        }
        DumpKind::Windows => {
            let state = CompositorState::parse(&dump);
            tracing::debug!(dropped = state.dropped_lines(), "parsed window dump");
            print_json(&state)
        }
    }
}

fn run_check(activities: &Path, windows: &Path, compare_bounds: bool) -> Result<()> {
    let scheduler = SchedulerState::parse(&read_dump(activities)?);
    let compositor = CompositorState::parse(&read_dump(windows)?);
    if !compositor.is_complete() {
        tracing::warn!("window dump was taken mid-transition; results may be partial");
    }

    check_sanity(&scheduler, &compositor)?;
    validate(&scheduler, &compositor, compare_bounds)?;
    println!(
        "ok: {} stacks consistent, focused activity {}",
        scheduler.stack_count(),
        scheduler.focused_activity().unwrap_or("none")
    );
    Ok(())
}

struct WaitRequest<'a> {
    activities: &'a [String],
    stack_ids: &'a [i32],
    compare_bounds: bool,
    config: Option<PathBuf>,
}

fn run_wait<S: DumpSource>(source: S, request: WaitRequest<'_>) -> Result<()> {
    let config = load_config(request.config)?;
    let mut reconciler = Reconciler::new(source, config);
    let names: Vec<&str> = request.activities.iter().map(String::as_str).collect();
    let targets = reconciler.targets(&names);

    if request.stack_ids.is_empty() {
        reconciler.compute_state(&targets, request.compare_bounds)?;
    } else {
        reconciler.wait_for_valid_state(&targets, Some(request.stack_ids), request.compare_bounds)?;
        reconciler.assert_sanity()?;
        reconciler.assert_valid_bounds(request.compare_bounds)?;
    }

    let summary = serde_json::json!({
        "focused_stack": reconciler.scheduler().focused_stack_id(),
        "focused_activity": reconciler.scheduler().focused_activity(),
        "focused_window": reconciler.compositor().focused_window(),
        "stacks": reconciler.scheduler().stack_count(),
        "capture_skew_ms": reconciler.capture_times().skew_ms(),
    });
    print_json(&summary)
}
