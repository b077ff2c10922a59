//! fprov - drive a local file provider from the command line.
//!
//! Usage:
//!   fprov ls [PATH]            List a folder
//!   fprov stat PATH            Describe one item
//!   fprov estimate [PATH]      Count folders, files and bytes
//!   fprov cp SRC DST           Copy inside the storage root
//!   fprov watch [PATH]         Print a line whenever a folder changes
//!   fprov --help               Show help
//!
//! Paths are relative to `--root` (the current directory by default).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use globset::Glob;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use fileprovider_core::{
    ChangeHandler, Completion, EngineConfig, FileKind, FileObject, FileProvider,
    FileProviderMonitor, FoundHandler, ProviderError, SearchPredicate,
};
use fileprovider_ops::{ContinueOnError, LocalEngine, LocalOperationHandle};
use fileprovider_scan::TreeSummary;

#[derive(Parser)]
#[command(
    name = "fprov",
    version,
    about = "Local file provider engine",
    long_about = "fprov runs file operations through the local provider engine: mutations \
                  are applied one at a time in order, reads run concurrently, and folder \
                  changes are reported with debouncing."
)]
struct Cli {
    /// Storage root every path is relative to
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the contents of a folder
    Ls {
        #[arg(default_value = "/")]
        path: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the attributes of an item
    Stat { path: PathBuf },

    /// Count folders, files and bytes below a path
    Estimate {
        #[arg(default_value = "/")]
        path: PathBuf,

        /// Only count direct children
        #[arg(long)]
        shallow: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Create a folder (and any missing parents)
    Mkdir { path: PathBuf },

    /// Copy an item
    Cp {
        source: PathBuf,
        destination: PathBuf,

        /// Replace an existing destination
        #[arg(short, long)]
        force: bool,

        /// Skip items that fail instead of stopping
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Move an item
    Mv {
        source: PathBuf,
        destination: PathBuf,

        /// Replace an existing destination
        #[arg(short, long)]
        force: bool,

        /// Skip items that fail instead of stopping
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Remove an item and everything below it
    Rm {
        path: PathBuf,

        /// Skip items that fail instead of stopping
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Create a symbolic link
    Ln { link: PathBuf, target: PathBuf },

    /// Find items whose name matches a glob pattern
    Find {
        path: PathBuf,
        pattern: String,

        /// Only look at direct children
        #[arg(long)]
        shallow: bool,
    },

    /// Print file contents
    Cat {
        path: PathBuf,

        /// Byte offset to start at
        #[arg(long)]
        offset: Option<u64>,

        /// Number of bytes to print
        #[arg(long)]
        length: Option<usize>,
    },

    /// Watch a folder and print a line on every debounced change
    Watch {
        #[arg(default_value = "/")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::builder()
        .root(cli.root.clone())
        .build()
        .map_err(|e| eyre!("Invalid configuration: {e}"))?;
    let engine = LocalEngine::new(config)
        .with_context(|| format!("Cannot open storage root {}", cli.root.display()))?;

    match cli.command {
        Command::Ls { path, json } => run_ls(&engine, &path, json).await?,
        Command::Stat { path } => run_stat(&engine, &path).await?,
        Command::Estimate {
            path,
            shallow,
            json,
        } => run_estimate(&engine, &path, !shallow, json).await?,
        Command::Mkdir { path } => run_mkdir(&engine, &path).await?,
        Command::Cp {
            source,
            destination,
            force,
            keep_going,
        } => {
            continue_on_error(&engine, keep_going);
            run(|done| engine.copy_item(&source, &destination, force, done))
                .await
                .context("Copy failed")?;
        }
        Command::Mv {
            source,
            destination,
            force,
            keep_going,
        } => {
            continue_on_error(&engine, keep_going);
            run(|done| engine.move_item(&source, &destination, force, done))
                .await
                .context("Move failed")?;
        }
        Command::Rm { path, keep_going } => {
            continue_on_error(&engine, keep_going);
            run(|done| engine.remove_item(&path, done))
                .await
                .context("Remove failed")?;
        }
        Command::Ln { link, target } => {
            run(|done| engine.create_symbolic_link(&link, &target, done))
                .await
                .context("Link failed")?;
        }
        Command::Find {
            path,
            pattern,
            shallow,
        } => run_find(&engine, &path, &pattern, !shallow).await?,
        Command::Cat {
            path,
            offset,
            length,
        } => run_cat(&engine, &path, offset, length).await?,
        Command::Watch { path } => run_watch(&engine, &path).await?,
    }

    Ok(())
}

/// Schedule one operation and wait for its outcome.
async fn run<T, F>(schedule: F) -> Result<T, ProviderError>
where
    T: Send + 'static,
    F: FnOnce(Completion<T>) -> LocalOperationHandle,
{
    let (tx, rx) = oneshot::channel();
    schedule(Box::new(move |result| {
        let _ = tx.send(result);
    }));
    rx.await.unwrap_or_else(|_| Err(ProviderError::Interrupted))
}

fn continue_on_error(engine: &LocalEngine, keep_going: bool) {
    if keep_going {
        engine.set_conflict_resolver(Some(Arc::new(ContinueOnError)));
    }
}

/// List a folder.
async fn run_ls(engine: &LocalEngine, path: &Path, json: bool) -> Result<()> {
    let children = run(|done| engine.contents_of_directory(path, done))
        .await
        .with_context(|| format!("Cannot list {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&children)?);
        return Ok(());
    }

    for child in &children {
        println!(
            "{} {:>10}  {}  {}",
            kind_marker(child),
            format_size(child.size),
            format_time(child.timestamps.modified),
            display_name(child)
        );
    }
    Ok(())
}

/// Describe one item.
async fn run_stat(engine: &LocalEngine, path: &Path) -> Result<()> {
    let object = run(|done| engine.attributes_of_item(path, done))
        .await
        .with_context(|| format!("Cannot stat {}", path.display()))?;

    println!("  Path: {}", object.path.display());
    println!("  Kind: {}", kind_name(&object.kind));
    println!(
        "  Size: {} ({} allocated)",
        format_size(object.size),
        format_size(object.allocated_size)
    );
    println!("  Modified: {}", format_time(object.timestamps.modified));
    if let Some(accessed) = object.timestamps.accessed {
        println!("  Accessed: {}", format_time(accessed));
    }
    if let Some(created) = object.timestamps.created {
        println!("  Created: {}", format_time(created));
    }
    println!("  Hidden: {}  Read-only: {}", object.hidden, object.read_only);
    Ok(())
}

/// Count folders, files and bytes.
async fn run_estimate(engine: &LocalEngine, path: &Path, recursive: bool, json: bool) -> Result<()> {
    let mut progress = engine.subscribe_progress();
    let reporter = tokio::spawn(async move {
        while let Ok(snapshot) = progress.recv().await {
            eprint!("\r{} items, {}...", snapshot.total_items(), format_size(snapshot.bytes));
        }
    });

    let summary: TreeSummary = run(|done| engine.estimate(path, recursive, done))
        .await
        .with_context(|| format!("Cannot estimate {}", path.display()))?;
    reporter.abort();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    eprint!("\r");
    println!("{}", "─".repeat(60));
    println!(" {} - {}", path.display(), format_size(summary.bytes));
    println!(" {} files, {} folders", summary.files, summary.folders);
    if summary.skipped > 0 {
        println!(" {} entries could not be read", summary.skipped);
    }
    println!(" Walked in {:.2}s", summary.elapsed.as_secs_f64());
    println!("{}", "─".repeat(60));
    Ok(())
}

/// Create a folder given its full path.
async fn run_mkdir(engine: &LocalEngine, path: &Path) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| eyre!("{} has no folder name", path.display()))?;
    let parent = path.parent().unwrap_or(Path::new("/"));

    run(|done| engine.create_folder(name, parent, done))
        .await
        .with_context(|| format!("Cannot create {}", path.display()))?;
    Ok(())
}

/// Search by glob pattern on item names, printing hits as they are found.
async fn run_find(engine: &LocalEngine, path: &Path, pattern: &str, recursive: bool) -> Result<()> {
    let matcher = Glob::new(pattern)
        .with_context(|| format!("Invalid pattern '{pattern}'"))?
        .compile_matcher();

    let query: SearchPredicate =
        Arc::new(move |object: &FileObject| matcher.is_match(object.name.as_str()));
    let found: FoundHandler = Arc::new(|object: &FileObject| {
        println!("{}", object.path.display());
    });

    let hits = run(|done| engine.search_files(path, recursive, query, Some(found), done))
        .await
        .with_context(|| format!("Cannot search {}", path.display()))?;
    eprintln!("{} match(es)", hits.len());
    Ok(())
}

/// Print file contents to stdout.
async fn run_cat(
    engine: &LocalEngine,
    path: &Path,
    offset: Option<u64>,
    length: Option<usize>,
) -> Result<()> {
    let data = match (offset, length) {
        (None, None) => run(|done| engine.contents(path, done)).await,
        (offset, length) => {
            let offset = offset.unwrap_or(0);
            let length = length.unwrap_or(usize::MAX);
            run(|done| engine.contents_range(path, offset, length, done)).await
        }
    }
    .with_context(|| format!("Cannot read {}", path.display()))?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}

/// Print a line on every change until Ctrl-C.
async fn run_watch(engine: &LocalEngine, path: &Path) -> Result<()> {
    let shown = path.display().to_string();
    let handler: ChangeHandler = Arc::new(move || {
        println!("{}  {} changed", format_time(SystemTime::now()), shown);
    });

    engine.register_notifying(path, handler);
    if !engine.is_registered(path) {
        return Err(eyre!("Cannot watch {}: not a folder under the root", path.display()));
    }

    eprintln!("Watching {} (Ctrl-C to stop)", path.display());
    tokio::signal::ctrl_c().await?;
    engine.unregister_notifying(path);
    Ok(())
}

fn kind_marker(object: &FileObject) -> char {
    match object.kind {
        FileKind::Directory => 'd',
        FileKind::Symlink { .. } => 'l',
        FileKind::File => '-',
        FileKind::Other => '?',
    }
}

fn kind_name(kind: &FileKind) -> String {
    match kind {
        FileKind::File => "file".into(),
        FileKind::Directory => "folder".into(),
        FileKind::Symlink { target } => format!("symlink -> {target}"),
        FileKind::Other => "other".into(),
    }
}

fn display_name(object: &FileObject) -> String {
    match &object.kind {
        FileKind::Directory => format!("{}/", object.name),
        FileKind::Symlink { target } => format!("{} -> {}", object.name, target),
        _ => object.name.to_string(),
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M").to_string()
}
