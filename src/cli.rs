//! Command-line interface for lawcheck.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{self, RuleFile, STARTER_TEMPLATE};
use crate::corpus::SourceCorpus;
use crate::engine::{CancelToken, RuleEngine, RunOptions};
use crate::report::{self, Format, Verdict};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;
pub const EXIT_INCOMPLETE: i32 = 3;

/// Default rule file names to search for.
const DEFAULT_RULE_FILES: &[&str] = &["lawcheck.yaml", ".lawcheck.yaml"];

/// Rule-based compliance engine for Python source trees.
///
/// Lawcheck evaluates declared rules (import boundaries, paired calls,
/// registrations, scoped patterns, ratio and count thresholds) against a
/// source tree and reports every violation with its law citation and fix.
#[derive(Parser)]
#[command(name = "lawcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a source tree against a rule file
    #[command(visible_alias = "check")]
    Lint(LintArgs),
    /// Write a starter rule file
    Init(InitArgs),
}

/// Arguments for the lint command.
#[derive(Parser)]
pub struct LintArgs {
    /// Root of the source tree to check
    pub path: PathBuf,

    /// Path to rule YAML file (default: auto-discover)
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Skip rules not started within this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub progress: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "lawcheck.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Look for a rule file in the checked tree, then in the current directory.
fn discover_rules(root: &Path) -> anyhow::Result<PathBuf> {
    for dir in [root, Path::new(".")] {
        for name in DEFAULT_RULE_FILES {
            let path = dir.join(name);
            if path.is_file() {
                return Ok(path);
            }
        }
    }
    anyhow::bail!(
        "no rule file found (looked for {} in {} and the current directory)",
        DEFAULT_RULE_FILES.join(", "),
        root.display()
    )
}

/// Exit code for a verdict.
pub fn exit_code(verdict: Verdict) -> i32 {
    match verdict {
        Verdict::Pass => EXIT_SUCCESS,
        Verdict::Fail => EXIT_FAILED,
        Verdict::Incomplete => EXIT_INCOMPLETE,
    }
}

/// Run the lint command.
pub fn run_lint(args: &LintArgs) -> anyhow::Result<i32> {
    let format: Format = match args.format.parse() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if !args.path.is_dir() {
        eprintln!("Error: {} is not a directory", args.path.display());
        return Ok(EXIT_ERROR);
    }

    // Discover rule file if not specified
    let rules_path = match &args.rules {
        Some(p) => p.clone(),
        None => match discover_rules(&args.path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Run 'lawcheck init' to create a rule file");
                return Ok(EXIT_ERROR);
            }
        },
    };
    tracing::debug!(rules = %rules_path.display(), "using rule file");

    let rule_file = match RuleFile::parse_file(&rules_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if let Err(e) = config::validate(&rule_file) {
        eprintln!("Error: invalid rule file: {}", e);
        return Ok(EXIT_ERROR);
    }

    let engine = RuleEngine::from_config(&rule_file)?;
    let corpus = SourceCorpus::new(&args.path);

    let mut options = RunOptions::default().with_cancel(interrupt_token());
    if let Some(secs) = args.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let progress = if args.progress {
        let bar = ProgressBar::new(engine.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        let sink = bar.clone();
        options = options.on_rule_done(move |id| {
            sink.set_message(id.to_string());
            sink.inc(1);
        });
        Some(bar)
    } else {
        None
    };

    let report = engine.run_with(&corpus, &options);
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let color = !args.no_color && std::io::stdout().is_terminal();
    if color {
        colored::control::set_override(true);
    }
    let rendered = report::render_with(&report, format, color)?;
    print!("{}", rendered);

    Ok(exit_code(report.verdict()))
}

/// Token cancelled by Ctrl-C. Rules already running finish; the rest are
/// reported as cancelled.
fn interrupt_token() -> CancelToken {
    let token = CancelToken::new();
    let handle = token.clone();
    let installed = ctrlc::set_handler(move || {
        tracing::warn!("interrupted, cancelling remaining rules");
        handle.cancel();
    });
    if let Err(e) = installed {
        tracing::debug!(error = %e, "interrupt handler not installed");
    }
    token
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite or --output to choose another path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, STARTER_TEMPLATE) {
        eprintln!("Error: failed to write rule file: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your project layout", args.output.display());
    println!("  2. Run: lawcheck lint . --rules {}", args.output.display());

    Ok(EXIT_SUCCESS)
}
