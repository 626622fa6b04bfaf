//! copyctl - Command-line interface for the copy engine.
//!
//! Submits a single transfer to a copy engine over the local filesystem,
//! polls its status while drawing a progress bar on stderr, and reports the
//! outcome.

use clap::Parser;
use copy_engine::{
    CopyEngine, CopyInfo, CopyMode, CopyRequest, CopyState, CopyStatus, EngineConfig,
    LocalFiles, ProgressCallback,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// copyctl - copy, append or resume a file transfer
#[derive(Parser, Debug)]
#[command(name = "copyctl")]
#[command(version)]
#[command(about = "Copy, append or resume a file with progress tracking")]
struct Args {
    /// Source file
    #[arg(long, value_name = "PATH")]
    src: PathBuf,

    /// Target file
    #[arg(long, value_name = "PATH")]
    dst: PathBuf,

    /// Copy mode: create, replace, ignore, append or resume
    #[arg(long, value_name = "MODE", default_value = "create")]
    mode: String,

    /// Compare the existing target against the source before resuming
    #[arg(long)]
    verify: bool,

    /// Run the transfer on this thread instead of the engine's worker
    #[arg(long)]
    sync: bool,

    /// Chunk size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = 4096)]
    buffer_size: usize,

    /// Status polling interval in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 200)]
    poll_ms: u64,

    /// Cancel the transfer if it runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Print the final status as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

/// CLI implementation of ProgressCallback for announcing transfers
struct CliProgress {
    verbose: bool,
    start_time: Instant,
}

impl CliProgress {
    fn new(verbose: bool) -> Self {
        CliProgress {
            verbose,
            start_time: Instant::now(),
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

fn progress_bar(fraction: f64) -> String {
    let percent = (fraction * 100.0) as u32;
    let filled = (percent / 5) as usize;
    let empty = 20 - filled;
    format!("[{}{}] {}%", "=".repeat(filled), " ".repeat(empty), percent)
}

impl ProgressCallback for CliProgress {
    fn on_transfer_started(&self, status: &CopyStatus) {
        if self.verbose {
            eprintln!("Starting {}:", status.handle);
            eprintln!("  Source: {}", status.source.display());
            eprintln!("  Target: {}", status.target.display());
            eprintln!("  Mode: {}", status.mode);
        }
    }

    fn on_transfer_progress(&self, _handle: &str, _bytes_copied: u64, _bytes_to_copy: u64) {
        // Progress is drawn by the polling loop.
    }

    fn on_transfer_completed(&self, status: &CopyStatus) {
        if self.verbose {
            eprintln!();
            eprintln!(
                "{} finished as {} after {}",
                status.handle,
                status.state,
                format_duration(self.start_time.elapsed())
            );
        }
    }
}

/// Parse and validate command-line arguments, then run the transfer
fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let exit_code = match run_cli(&args) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_mode(mode: &str, verify: bool) -> Result<CopyMode, String> {
    let mode = match mode.to_lowercase().as_str() {
        "create" => CopyMode::Create,
        "replace" => CopyMode::Replace,
        "ignore" => CopyMode::Ignore,
        "append" => CopyMode::Append,
        "resume" => return Ok(CopyMode::Resume { verify }),
        _ => {
            return Err(format!(
                "Invalid mode '{}'. Must be 'create', 'replace', 'ignore', 'append' or 'resume'",
                mode
            ))
        }
    };
    if verify {
        return Err("--verify only applies to resume mode".to_string());
    }
    Ok(mode)
}

/// Poll until the transfer is finished, cancelling it on timeout.
fn wait_for(engine: &CopyEngine, handle: &str, args: &Args) -> Result<CopyStatus, String> {
    let started = Instant::now();
    let timeout = args.timeout.map(Duration::from_secs);
    let poll = Duration::from_millis(args.poll_ms.max(1));
    let mut cancel_sent = false;

    loop {
        let status = engine
            .status(handle)
            .map_err(|e| format!("Status query failed: {}", e))?;
        if status.is_terminal() {
            return Ok(status);
        }

        if !args.json && status.state != CopyState::Pending {
            eprint!(
                "\rProgress: {} | {}/{}",
                progress_bar(status.progress_fraction()),
                format_bytes(status.bytes_copied),
                format_bytes(status.bytes_to_copy)
            );
            let _ = std::io::Write::flush(&mut std::io::stderr());
        }

        if !cancel_sent && timeout.is_some_and(|t| started.elapsed() >= t) {
            eprintln!();
            eprintln!(
                "Timed out after {}, cancelling {}",
                format_duration(started.elapsed()),
                handle
            );
            engine
                .cancel(handle)
                .map_err(|e| format!("Cancel failed: {}", e))?;
            debug!(handle = %handle, "cancel requested after timeout");
            cancel_sent = true;
        }

        std::thread::sleep(poll);
    }
}

/// Run a synchronous submit on a scoped thread while this thread polls it,
/// so progress and `--timeout` apply the same way as for queued transfers.
fn run_sync(
    engine: &CopyEngine,
    request: CopyRequest,
    args: &Args,
) -> Result<CopyStatus, String> {
    let handle = engine.next_handle(&engine.config().handle_prefix);
    let info = CopyInfo::new(handle.clone(), request);

    std::thread::scope(|scope| -> Result<CopyStatus, String> {
        let submit = scope.spawn(move || engine.submit(info, false));
        info!(handle = %handle, "submitted synchronous transfer");

        // The handle is unknown until the submitting thread registers it.
        while engine.status(&handle).is_err() && !submit.is_finished() {
            std::thread::sleep(Duration::from_millis(1));
        }
        if engine.status(&handle).is_err() {
            return match submit.join() {
                Ok(Err(e)) => Err(format!("Submit failed: {}", e)),
                Ok(Ok(_)) => Err(format!("Transfer {} is unknown to the engine", handle)),
                Err(_) => Err("Transfer thread panicked".to_string()),
            };
        }

        let status = wait_for(engine, &handle, args)?;
        match submit.join() {
            Ok(result) => result.map_err(|e| format!("Submit failed: {}", e))?,
            Err(_) => return Err("Transfer thread panicked".to_string()),
        };
        Ok(status)
    })
}

fn print_summary(status: &CopyStatus, elapsed: Duration) {
    eprintln!();
    eprintln!("Transfer {} ({}): {}", status.handle, status.mode, status.state);
    eprintln!(
        "Bytes copied: {} of {}",
        format_bytes(status.bytes_copied),
        format_bytes(status.bytes_to_copy)
    );
    eprintln!("Elapsed: {}", format_duration(elapsed));
    if let Some(error) = &status.error {
        eprintln!("Failure: {}", error);
    }
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<(), String> {
    let mode = parse_mode(&args.mode, args.verify)?;

    let config = EngineConfig {
        buffer_size: args.buffer_size,
        ..EngineConfig::default()
    };
    let progress = Arc::new(CliProgress::new(args.verbose > 0 && !args.json));
    let engine = CopyEngine::with_progress(Arc::new(LocalFiles::new()), config, progress)
        .map_err(|e| format!("Failed to start copy engine: {}", e))?;

    let started = Instant::now();
    let request = CopyRequest::new(&args.src, &args.dst, mode);
    let status = if args.sync {
        run_sync(&engine, request, args)?
    } else {
        let handle = engine
            .copy(request, true)
            .map_err(|e| format!("Submit failed: {}", e))?;
        info!(handle = %handle, mode = %mode, "submitted transfer");
        wait_for(&engine, &handle, args)?
    };
    engine.shutdown();

    if args.json {
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| format!("Failed to encode status: {}", e))?;
        println!("{}", json);
    } else {
        print_summary(&status, started.elapsed());
    }

    match &status.error {
        Some(error) => Err(error.to_string()),
        None => Ok(()),
    }
}
