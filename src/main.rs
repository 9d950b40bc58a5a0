use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use ts_rewrite::config::{self, RewriteConfig};
use ts_rewrite::edit::{EditResult, FileWrite};
use ts_rewrite::rules::DeprecatedCallRule;
use ts_rewrite::safety::WorkspaceGuard;
use ts_rewrite::ts::Dialect;
use ts_rewrite::visitor::{rewrite_program, FileRewrite};
use ts_rewrite::{Program, TypeQuery};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "ts-rewrite")]
#[command(about = "Type-aware migration of deprecated calls in TypeScript sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite files in place
    Apply {
        /// Files or directories to process (default: current directory)
        paths: Vec<PathBuf>,

        /// Config file (default: ./ts-rewrite.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Project root; files outside it are never written (default: current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report files that would change, exiting 1 if there are any
    Check {
        /// Files or directories to process (default: current directory)
        paths: Vec<PathBuf>,

        /// Config file (default: ./ts-rewrite.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the pending edits as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            paths,
            config,
            root,
            dry_run,
            diff,
        } => cmd_apply(paths, config, root, dry_run, diff),

        Commands::Check {
            paths,
            config,
            json,
        } => cmd_check(paths, config, json),
    }
}

/// Logs go to stderr; `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbosity: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = match verbosity {
        0 => "ts_rewrite=warn",
        1 => "ts_rewrite=debug",
        _ => "ts_rewrite=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Expand files and directories into the sorted list of supported sources.
///
/// Directory walks skip `node_modules`, `.git` and other hidden directories.
/// Files named explicitly are kept whatever their location.
fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let default = [PathBuf::from(".")];
    let paths = if paths.is_empty() { &default[..] } else { paths };

    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.exists() {
            anyhow::bail!("No such file or directory: {}", path.display());
        }

        let walker = WalkDir::new(path).into_iter().filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !(name == "node_modules" || name.starts_with('.'))
        });

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && Dialect::from_path(entry.path()).is_some() {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

struct Run {
    cwd: PathBuf,
    config: RewriteConfig,
    files: Vec<PathBuf>,
}

impl Run {
    fn prepare(paths: &[PathBuf], config_path: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().context("cannot determine current directory")?;
        let config = config::discover(config_path, &cwd)?;
        let files = collect_sources(paths)?;
        Ok(Self { cwd, config, files })
    }

    /// Parse, check and rewrite everything in memory.
    fn rewrite(&self) -> Result<Vec<FileRewrite>> {
        let program = Program::load(&self.files, self.config.compiler_options())?;
        let query = TypeQuery::new(program.type_checker(), self.config.checker.nullability);
        let rule = DeprecatedCallRule::new(self.config.migrations(), query);
        Ok(rewrite_program(&program, &rule)?)
    }
}

/// Helper: Show unified diff between original and rewritten content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn report_rewrite(rewrite: &FileRewrite, verb: &str) {
    println!(
        "{} {}: {} {} call(s)",
        "✓".green(),
        rewrite.path.display(),
        verb,
        rewrite.edits.len()
    );
    for edit in &rewrite.edits {
        println!(
            "  {}:{}  {} {} {}",
            edit.line,
            edit.column,
            edit.before.dimmed(),
            "→".cyan(),
            edit.after
        );
    }
}

fn cmd_apply(
    paths: Vec<PathBuf>,
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let run = Run::prepare(&paths, config_path.as_deref())?;
    println!("Processing {} file(s)", run.files.len());

    let rewrites = run.rewrite()?;

    if dry_run {
        println!("{}", "  [DRY RUN - showing what would be rewritten]".cyan());
    }
    for rewrite in &rewrites {
        report_rewrite(rewrite, if dry_run { "would rewrite" } else { "rewriting" });
        if show_diff {
            display_diff(&rewrite.path, &rewrite.original, &rewrite.rewritten);
        }
    }

    let mut applied = 0;
    let mut already_applied = 0;

    if !dry_run && !rewrites.is_empty() {
        let guard = WorkspaceGuard::new(root.as_deref().unwrap_or(&run.cwd))?;

        // Every target is checked before anything is written
        let mut writes = Vec::with_capacity(rewrites.len());
        for rewrite in &rewrites {
            let target = guard.validate_path(run.cwd.join(&rewrite.path))?;
            writes.push(FileWrite::new(target, &rewrite.original, rewrite.rewritten.clone()));
        }

        for result in FileWrite::apply_batch(&writes)? {
            match result {
                EditResult::Applied { .. } => applied += 1,
                EditResult::AlreadyApplied { file } => {
                    println!("{} {}: already rewritten", "⊙".yellow(), file.display());
                    already_applied += 1;
                }
            }
        }
    }

    let edits: usize = rewrites.iter().map(|r| r.edits.len()).sum();
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} file(s) scanned", run.files.len());
    println!("  {} call(s) in {} file(s)", format!("{edits}").green(), rewrites.len());
    if !dry_run {
        println!("  {} written", format!("{applied}").green());
        println!("  {} already rewritten", format!("{already_applied}").yellow());
    }

    Ok(())
}

fn cmd_check(paths: Vec<PathBuf>, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let run = Run::prepare(&paths, config_path.as_deref())?;
    let rewrites = run.rewrite()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rewrites)?);
    } else {
        for rewrite in &rewrites {
            report_rewrite(rewrite, "would rewrite");
        }
        if rewrites.is_empty() {
            println!("{} {} file(s) up to date", "✓".green(), run.files.len());
        } else {
            println!();
            println!(
                "{} {} file(s) need rewriting",
                "✗".red(),
                rewrites.len()
            );
        }
    }

    if !rewrites.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
