use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use diag_patcher::{
    read_descriptors, run_patches, ApplyMode, CastDiagnosticParser, CastInsertion,
    DiagnosticParser, EditDescriptor, EditPlanner, EditResult, PatchError, PatchOptions,
    PositionParser, Rename, RunReport, WorkspaceGuard,
};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "diag-patcher")]
#[command(about = "Apply source edits driven by compiler diagnostics", long_about = None)]
#[command(version)]
struct Cli {
    /// Log more detail to stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert a cast for every "cannot initialize a variable of type" error
    Cast {
        /// File with one diagnostic per line ("-" for stdin)
        diagnostics: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Rename an identifier at every reported position
    Rename {
        /// File with one diagnostic per line ("-" for stdin)
        diagnostics: PathBuf,

        /// Identifier expected at each position
        old_name: String,

        /// Replacement identifier
        new_name: String,

        /// Overwrite without checking that the position holds OLD_NAME
        #[arg(long)]
        unchecked: bool,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Directory diagnostic paths are relative to (default: $DIAG_PATCHER_WORKSPACE or cwd)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Directory inside the workspace that must not be edited (repeatable)
    #[arg(short = 'x', long = "exclude")]
    excludes: Vec<PathBuf>,

    /// Dry run - show what would be changed without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long, conflicts_with = "json")]
    diff: bool,

    /// Plan all edits of a file against its original content and write it once
    #[arg(short, long)]
    batch: bool,

    /// Print the run report as JSON instead of text
    #[arg(long)]
    json: bool,
}

impl CommonArgs {
    fn options(&self) -> PatchOptions {
        PatchOptions {
            mode: if self.batch {
                ApplyMode::Batch
            } else {
                ApplyMode::Sequential
            },
            dry_run: self.dry_run,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Cast {
            diagnostics,
            common,
        } => cmd_patch(&CastDiagnosticParser, &CastInsertion, &diagnostics, &common),

        Commands::Rename {
            diagnostics,
            old_name,
            new_name,
            unchecked,
            common,
        } => {
            if old_name.is_empty() {
                anyhow::bail!("OLD_NAME must not be empty");
            }
            let rename = if unchecked {
                Rename::unchecked(old_name, new_name)
            } else {
                Rename::new(old_name, new_name)
            };
            cmd_patch(&PositionParser, &rename, &diagnostics, &common)
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("diag_patcher={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Resolve workspace path
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. DIAG_PATCHER_WORKSPACE environment variable
/// 3. Current directory
fn resolve_workspace(cli_workspace: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return Ok(path.to_path_buf());
    }

    if let Ok(env_path) = env::var("DIAG_PATCHER_WORKSPACE") {
        let path = PathBuf::from(&env_path);
        if path.is_dir() {
            return Ok(path);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: DIAG_PATCHER_WORKSPACE is set but is not a directory: {}",
                env_path
            )
            .yellow()
        );
    }

    env::current_dir().context("cannot determine current directory")
}

/// Read every diagnostic before any file is touched.
fn load_descriptors(path: &Path, parser: &dyn DiagnosticParser) -> Result<Vec<EditDescriptor>> {
    let reader: Box<dyn BufRead> = if path == Path::new("-") {
        Box::new(BufReader::new(io::stdin().lock()))
    } else {
        let file = File::open(path)
            .with_context(|| format!("failed to open diagnostics {}", path.display()))?;
        Box::new(BufReader::new(file))
    };

    read_descriptors(reader, parser)
        .with_context(|| format!("failed to parse diagnostics from {}", path.display()))
}

fn cmd_patch(
    parser: &dyn DiagnosticParser,
    planner: &dyn EditPlanner,
    diagnostics: &Path,
    common: &CommonArgs,
) -> Result<()> {
    let workspace = resolve_workspace(common.workspace.as_deref())?;
    let guard = WorkspaceGuard::new(&workspace, &common.excludes)
        .with_context(|| format!("invalid workspace {}", workspace.display()))?;

    let descriptors = load_descriptors(diagnostics, parser)?;
    let options = common.options();

    if !common.json {
        println!("Workspace: {}", guard.workspace_root().display());
        println!("Diagnostics: {} ({} lines)", diagnostics.display(), descriptors.len());
        if options.dry_run {
            println!("{}", "[DRY RUN - showing what would be applied]".cyan());
        }
        println!();
    }

    let report = match run_patches(planner, &descriptors, &guard, options) {
        Ok(report) => report,
        Err(e) => {
            explain_failure(&e);
            std::process::exit(1);
        }
    };

    if common.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if common.diff {
        for (file, change) in &report.files {
            if change.is_changed() {
                display_diff(file, &change.before, &change.after);
            }
        }
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    for edit in &report.edits {
        let location = format!("{}:{}:{}", edit.file.display(), edit.line, edit.column);
        match edit.outcome {
            EditResult::Applied => {
                let verb = if report.dry_run { "Would write" } else { "Wrote" };
                println!("{} {}: {} {:?}", "✓".green(), location, verb, edit.new_text);
            }
            EditResult::AlreadyApplied => {
                println!("{} {}: Already applied", "⊙".yellow(), location);
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", report.applied()).green());
    println!(
        "  {} already applied",
        format!("{}", report.already_applied()).yellow()
    );
    println!("  {} files touched", format!("{}", report.files.len()).cyan());
}

/// Print hints for the failures a stale or misaligned diagnostic produces.
fn explain_failure(error: &PatchError) {
    eprintln!("{} {}", "✗".red(), error);
    match error {
        PatchError::LineOutOfRange { .. } | PatchError::ColumnOutOfRange { .. } => {
            eprintln!("  {}", "CONFLICT: position is not in the file".red());
            eprintln!("  Possible causes:");
            eprintln!("    - File changed since the diagnostics were produced");
            eprintln!("    - An earlier edit on the same line shifted the columns (try --batch)");
        }
        PatchError::Mismatch { .. } => {
            eprintln!("  {}", "CONFLICT: position does not hold the old name".red());
            eprintln!("  Action: regenerate diagnostics, or pass --unchecked to overwrite anyway");
        }
        PatchError::AnchorNotFound { .. } => {
            eprintln!("  {}", "CONFLICT: reported line has no initializer".red());
        }
        PatchError::AnchorAtLineEnd { .. } => {
            eprintln!("  {}", "CONFLICT: initializer continues on the next line".red());
            eprintln!("  Action: move the value onto the '=' line, or add the cast by hand");
        }
        _ => {}
    }
    eprintln!("  Edits written before this failure were kept.");
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => continue,
        };
        print!("{}", sign);
    }
}
