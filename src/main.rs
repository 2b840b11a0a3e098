use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use package_patcher::config::load_from_path;
use package_patcher::engine::{PatchError, Patcher};
use package_patcher::logging::init_logging;
use package_patcher::reformat::Normalizer;
use package_patcher::resolve::{FixedGlobalRoot, GlobalRoot, NpmGlobalRoot};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "package-patcher")]
#[command(about = "Patch installed npm packages", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (.json or .toml)
    config: PathBuf,

    /// Undo previous patches
    #[arg(short, long)]
    undo: bool,

    /// Dry run - show what would be changed without modifying files
    #[arg(short = 'n', long, conflicts_with = "undo")]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long, conflicts_with = "undo")]
    diff: bool,

    /// Global node_modules directory (skips `npm root -g`)
    #[arg(long, value_name = "DIR")]
    global_root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug, cli.quiet)?;

    let outcome = match cli.global_root.clone() {
        Some(root) => run(&cli, FixedGlobalRoot(root)),
        None => run(&cli, NpmGlobalRoot::from_env()),
    };

    if let Err(e) = outcome {
        eprintln!("{} {}", "Error:".red(), e);
        std::process::exit(1);
    }

    Ok(())
}

fn run<G: GlobalRoot>(cli: &Cli, global_root: G) -> Result<()> {
    let config = load_from_path(&cli.config)?;
    let patcher = Patcher::with_parts(global_root, Normalizer::default());

    if cli.undo {
        let report = patcher.undo(&config)?;
        println!(
            "{} Successfully undid patches ({})",
            "✓".green(),
            report.target.path.display()
        );
        return Ok(());
    }

    let result = if cli.dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
        patcher.check(&config)
    } else {
        patcher.apply(&config)
    };

    let report = match result {
        Ok(report) => report,
        Err(PatchError::Replacement(err)) => {
            eprintln!(
                "{} {}",
                "✗".red(),
                "CONFLICT: not all replacements could be applied".red()
            );
            for outcome in err.not_found() {
                eprintln!("  - {:?}", outcome.match_text);
                if let Some(reason) = &outcome.reason_if_not_found {
                    eprintln!("    {}", reason.dimmed());
                }
            }
            eprintln!("  Possible causes:");
            eprintln!("    - The package was upgraded and the code changed");
            eprintln!("    - Match strings were written against unformatted source");
            anyhow::bail!(
                "{} of {} replacements not found",
                err.not_found().count(),
                err.outcomes.len()
            );
        }
        Err(e) => return Err(e.into()),
    };

    if cli.diff {
        display_diff(&report.target.path, &report.original, &report.patched);
    }

    if cli.dry_run {
        println!(
            "{} {} replacements would apply to {}",
            "✓".green(),
            report.outcomes.len(),
            report.target.path.display()
        );
    } else {
        println!(
            "{} Successfully applied patches ({})",
            "✓".green(),
            report.target.path.display()
        );
        if report.backup_created {
            println!(
                "{}",
                format!("  Backup saved to {}", report.target.backup_path.display()).dimmed()
            );
        }
    }

    Ok(())
}

/// Show unified diff between original and patched content
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
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
