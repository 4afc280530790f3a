use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use threadline::{
    aggregate_kpis, classify_messages, parse_transcript_file, resolve_roles, segment_messages,
    write_text_report, AnalysisReport, Diagnostics, Language, PatternConfig, Roster,
    SegmenterConfig,
};

#[derive(Parser)]
#[command(name = "threadline")]
#[command(author, version, about = "Support chat issue extraction and KPI analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: parse, classify, segment, aggregate
    Process {
        /// Input chat export file (text)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the machine-readable report (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Output file for the human-readable report (text)
        #[arg(long)]
        human_readable: Option<PathBuf>,

        /// Member roster file (JSON); a template is written if missing
        #[arg(long, default_value = "members.json")]
        roster: PathBuf,

        /// Where to persist the resolved roster for re-runs
        #[arg(long, default_value = "members_resolved.json")]
        roster_out: PathBuf,

        /// Keyword tables file (JSON); defaults to the built-in tables
        #[arg(long)]
        keywords: Option<PathBuf>,

        /// Maximum silence within one issue thread, in hours
        #[arg(long, default_value = "2")]
        gap_hours: i64,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse a chat export and print statistics without analyzing it
    Analyze {
        /// Input chat export file (text)
        #[arg(short, long)]
        input: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            human_readable,
            roster,
            roster_out,
            keywords,
            gap_hours,
            verbose,
        } => {
            setup_logging(verbose);
            process_transcript(
                input,
                output,
                human_readable,
                roster,
                roster_out,
                keywords,
                gap_hours,
            )
        }
        Commands::Analyze { input, verbose } => {
            setup_logging(verbose);
            analyze_transcript(input)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn process_transcript(
    input: PathBuf,
    output: PathBuf,
    human_readable: Option<PathBuf>,
    roster_path: PathBuf,
    roster_out: PathBuf,
    keywords: Option<PathBuf>,
    gap_hours: i64,
) -> Result<()> {
    info!("Loading transcript from {:?}", input);
    let outcome = parse_transcript_file(&input).context("Failed to parse transcript")?;
    info!(
        "Parsed {} messages ({} lines skipped, {} system notices)",
        outcome.messages.len(),
        outcome.skipped_lines,
        outcome.system_lines
    );

    let patterns = match keywords {
        Some(path) => PatternConfig::load(&path).context("Failed to load keyword tables")?,
        None => PatternConfig::default(),
    };

    // Stage 0: Role resolution
    info!("Stage 0: Resolving sender roles...");
    let mut roster = Roster::load_or_template(&roster_path)?;
    let roles = resolve_roles(&outcome.messages, &mut roster, &patterns);
    info!(
        "Roles: {} customers, {} support staff ({} inferred)",
        roster.customers.len(),
        roster.support_staff.len(),
        roles.inferred.len()
    );

    // Stage 1: Intent classification
    info!("Stage 1: Classifying messages...");
    let classified = classify_messages(&outcome.messages, &roster, &patterns);

    // Stage 2: Segmentation
    info!("Stage 2: Segmenting into issues...");
    let config = SegmenterConfig {
        max_gap: chrono::Duration::hours(gap_hours),
    };
    let segmentation = segment_messages(&classified, &patterns, config);
    info!(
        "Segmentation: {} issues, {} messages dropped",
        segmentation.issues.len(),
        segmentation.dropped_messages
    );

    // Stage 3: KPI aggregation
    info!("Stage 3: Aggregating KPIs...");
    let kpis = aggregate_kpis(&segmentation.issues, &roster, classified.len());
    info!(
        "KPIs: resolution rate {:.1}%, response rate {:.1}%",
        kpis.resolution_rate, kpis.response_rate
    );

    let diagnostics = Diagnostics {
        parsed_messages: outcome.messages.len(),
        skipped_lines: outcome.skipped_lines,
        system_lines: outcome.system_lines,
        dropped_messages: segmentation.dropped_messages,
    };

    if let Some(human_path) = &human_readable {
        write_text_report(&kpis, human_path)?;
        info!("Human-readable report written to {:?}", human_path);
    }

    let report = AnalysisReport::build(&segmentation.issues, classified, kpis, diagnostics);
    report.write_json(&output)?;
    info!("Report written to {:?}", output);

    // Persist the resolved roster so re-runs converge
    roster.save(&roster_out)?;
    info!("Resolved roster written to {:?}", roster_out);

    Ok(())
}

fn analyze_transcript(input: PathBuf) -> Result<()> {
    info!("Analyzing transcript from {:?}", input);
    let outcome = parse_transcript_file(&input).context("Failed to parse transcript")?;

    println!("Transcript Analysis");
    println!("===================");
    println!("Total messages: {}", outcome.messages.len());
    println!("Skipped lines: {}", outcome.skipped_lines);
    println!("System notices: {}", outcome.system_lines);

    let senders: std::collections::BTreeSet<&str> =
        outcome.messages.iter().map(|m| m.sender.as_str()).collect();
    println!("Unique senders: {}", senders.len());

    if let (Some(first), Some(last)) = (outcome.messages.first(), outcome.messages.last()) {
        println!(
            "Date range: {} to {}",
            first.timestamp.date(),
            last.timestamp.date()
        );
    }
    println!();

    println!("Language Distribution");
    println!("---------------------");
    let mut arabic = 0;
    let mut english = 0;
    let mut mixed = 0;
    for msg in &outcome.messages {
        match msg.language {
            Language::Arabic => arabic += 1,
            Language::English => english += 1,
            Language::Mixed => mixed += 1,
        }
    }
    println!("Arabic: {}", arabic);
    println!("English: {}", english);
    println!("Mixed: {}", mixed);
    println!();

    println!("Messages per Sender");
    println!("-------------------");
    for sender in &senders {
        let count = outcome
            .messages
            .iter()
            .filter(|m| m.sender == *sender)
            .count();
        let with_tickets = outcome
            .messages
            .iter()
            .filter(|m| m.sender == *sender && m.has_ticket_ref())
            .count();
        println!("{}: {} messages, {} with ticket refs", sender, count, with_tickets);
    }

    Ok(())
}
