//! docsync CLI - document snapshot reconciliation tool

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docsync::transport::execute_with_progress;
use docsync::{
    batches_to_json, compare, document_to_json, read_document, ExecuteOptions, IndexOptions,
    Indexer, JsonFormat, MockEngine, ReconcileOptions, Reconciler, Reconciliation,
};

#[derive(Parser)]
#[command(name = "docsync")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Diff document snapshots into ordered batchUpdate requests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the batches that turn BASE into DESIRED
    Diff {
        /// Snapshot the remote service holds
        #[arg(value_name = "BASE")]
        base: PathBuf,

        /// Snapshot to reach
        #[arg(value_name = "DESIRED")]
        desired: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Fail on changes the API cannot express
        #[arg(long, env = "DOCSYNC_STRICT")]
        strict: bool,
    },

    /// Replay the batches on the mock engine and compare with DESIRED
    Verify {
        /// Snapshot the remote service holds
        #[arg(value_name = "BASE")]
        base: PathBuf,

        /// Snapshot to reach
        #[arg(value_name = "DESIRED")]
        desired: PathBuf,

        /// Fail on changes the API cannot express
        #[arg(long, env = "DOCSYNC_STRICT")]
        strict: bool,
    },

    /// Recompute the indices of a snapshot
    Index {
        /// Input snapshot
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Reject text runs with embedded newlines instead of splitting
        #[arg(long)]
        no_split: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show document information
    Info {
        /// Input snapshot
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Diff {
            base,
            desired,
            output,
            compact,
            strict,
        }) => cmd_diff(&base, &desired, output.as_deref(), compact, strict),
        Some(Commands::Verify {
            base,
            desired,
            strict,
        }) => cmd_verify(&base, &desired, strict),
        Some(Commands::Index {
            input,
            output,
            no_split,
            compact,
        }) => cmd_index(&input, output.as_deref(), no_split, compact),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: docsync diff <BASE> <DESIRED>".yellow());
            println!("       docsync --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn reconcile_options(strict: bool) -> ReconcileOptions {
    if strict {
        ReconcileOptions::new().strict()
    } else {
        ReconcileOptions::new()
    }
}

fn report_unsupported(reconciliation: &Reconciliation) {
    if reconciliation.unsupported.is_empty() {
        return;
    }
    eprintln!(
        "{} {} change(s) left out:",
        "Warning:".yellow().bold(),
        reconciliation.unsupported.len()
    );
    for item in &reconciliation.unsupported {
        eprintln!("  {} {}", "-".dimmed(), item);
    }
}

fn cmd_diff(
    base: &Path,
    desired: &Path,
    output: Option<&Path>,
    compact: bool,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let base = read_document(base)?;
    let desired = read_document(desired)?;
    let reconciliation =
        Reconciler::with_options(reconcile_options(strict)).reconcile(&base, &desired)?;
    report_unsupported(&reconciliation);

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = batches_to_json(&reconciliation.batches, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!(
            "{} {} ({} batches, {} requests)",
            "Saved to".green(),
            path.display(),
            reconciliation.batches.len(),
            reconciliation.request_count()
        );
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_verify(base: &Path, desired: &Path, strict: bool) -> Result<(), Box<dyn std::error::Error>> {
    let base = read_document(base)?;
    let desired = read_document(desired)?;

    let reconciliation =
        Reconciler::with_options(reconcile_options(strict)).reconcile(&base, &desired)?;
    report_unsupported(&reconciliation);

    let pb = ProgressBar::new(reconciliation.batches.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message("Applying batches...");

    let mut engine = MockEngine::new(base);
    let options = ExecuteOptions::new().with_required_revision(engine.revision_id());
    execute_with_progress(&mut engine, &reconciliation.batches, &options, |_, response| {
        pb.set_message(response.revision_id.clone());
        pb.inc(1);
    })?;
    pb.finish_with_message("Done!");

    let expected = Indexer::new().index(desired)?;
    let mismatches = compare(&engine.get(), &expected);

    println!();
    if mismatches.is_empty() {
        println!(
            "{} {} batches, {} requests",
            "Equivalent:".green().bold(),
            reconciliation.batches.len(),
            reconciliation.request_count()
        );
        Ok(())
    } else {
        println!("{}", "Mismatches".red().bold());
        println!("{}", "─".repeat(40).dimmed());
        for mismatch in &mismatches {
            println!("  {} {}", "├─".dimmed(), mismatch);
        }
        Err(format!("{} mismatch(es) after replay", mismatches.len()).into())
    }
}

fn cmd_index(
    input: &Path,
    output: Option<&Path>,
    no_split: bool,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = read_document(input)?;
    let options = IndexOptions::new().with_split_newlines(!no_split);
    let doc = Indexer::with_options(options).index(doc)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = document_to_json(&doc, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = Indexer::new().index(read_document(input)?)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    if !doc.document_id.is_empty() {
        println!("{}: {}", "Id".bold(), doc.document_id);
    }
    if !doc.title.is_empty() {
        println!("{}: {}", "Title".bold(), doc.title);
    }
    if let Some(ref revision) = doc.revision_id {
        println!("{}: {}", "Revision".bold(), revision);
    }
    println!("{}: {}", "Tabs".bold(), doc.tabs.len());
    println!("{}: {}", "Comments".bold(), doc.comments.len());

    for tab in &doc.tabs {
        println!();
        println!(
            "{} {}",
            "Tab".cyan().bold(),
            format!("{} ({})", tab.title, tab.tab_id).cyan()
        );
        println!("{}", "─".repeat(40).dimmed());

        let mut elements: BTreeMap<&'static str, usize> = BTreeMap::new();
        for element in &tab.body.content {
            *elements.entry(element.block.kind_name()).or_default() += 1;
        }
        let text = tab.body.plain_text();

        println!("{}: {}", "Body length".bold(), tab.body.end_index());
        println!("{}: {}", "Words".bold(), text.split_whitespace().count());
        for (kind, count) in &elements {
            println!("  {} {}: {}", "├─".dimmed(), kind, count);
        }
        println!("{}: {}", "Headers".bold(), tab.headers.len());
        println!("{}: {}", "Footers".bold(), tab.footers.len());
        println!("{}: {}", "Footnotes".bold(), tab.footnotes.len());
        println!("{}: {}", "Lists".bold(), tab.lists.len());
        println!("{}: {}", "Named ranges".bold(), tab.named_ranges.len());
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docsync".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Document snapshot reconciliation tool");
    println!();
    println!("License: MIT");
}
