//! Fraud Rules Pipeline - Main Entry Point
//!
//! Loads a transaction CSV, scores it with the configured rules, prints the
//! dashboard and optionally exports the filtered tables.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fraud_rules_pipeline::{
    config::{AppConfig, LoggingConfig},
    scoring::clamp_threshold,
    CsvExporter, DashboardSummary, Flag, PipelineReport, RulePipeline, ScoredTransaction,
    TransactionLoader, UserAggregator, UserRiskProfile, WeightTable,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fraud-rules-pipeline",
    about = "Rule-based fraud flagging for transaction CSV files."
)]
struct Cli {
    /// Path to a TOML config file (default: config/config.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a transaction CSV and show flagged transactions and user risk
    Analyze {
        /// Transaction CSV file
        #[arg(long)]
        input: PathBuf,

        /// Minimum transaction score to show (default from config, clamped to the highest score)
        #[arg(long)]
        min_score: Option<u32>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Export filtered transactions to this file or directory
        #[arg(long)]
        export: Option<PathBuf>,

        /// Export the user risk table to this file
        #[arg(long)]
        users_export: Option<PathBuf>,

        /// Maximum rows printed per table (0 = all)
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Show the active denylist and weight table
    Rules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: &'a DashboardSummary,
    min_score: u32,
    transactions: Vec<&'a ScoredTransaction>,
    users: Vec<&'a UserRiskProfile>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    init_logging(&config.logging)?;
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Analyze {
            input,
            min_score,
            format,
            export,
            users_export,
            limit,
        } => analyze(
            &config,
            &input,
            min_score,
            format,
            export.as_deref(),
            users_export.as_deref(),
            limit,
        ),
        Commands::Rules => {
            print_rules(&config);
            Ok(())
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fraud_rules_pipeline={}", logging.level).parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.init(),
        other => bail!("Unknown log format {:?} (expected json or pretty)", other),
    }
    Ok(())
}

fn analyze(
    config: &AppConfig,
    input: &Path,
    min_score: Option<u32>,
    format: OutputFormat,
    export: Option<&Path>,
    users_export: Option<&Path>,
    limit: usize,
) -> Result<()> {
    let pipeline = RulePipeline::new(config)?;

    let table = TransactionLoader::load_path(input)
        .with_context(|| format!("Failed to load transactions from {}", input.display()))?;
    info!(rows = table.len(), "Transactions loaded");

    let report = pipeline.run(&table)?;
    let omitted = report.active_flags.omitted();
    if !omitted.is_empty() {
        warn!(omitted = ?omitted, "Some rules were not applied");
    }

    let summary = DashboardSummary::from_report(&report, config.presenter.flagged_transaction_score);
    summary.print_summary();

    let requested = min_score.unwrap_or(config.presenter.default_min_score);
    let min_score = clamp_threshold(requested, &report.transactions);
    let filtered = report.filtered(min_score);
    let ranked_users = UserAggregator::rank(&report.users);

    match format {
        OutputFormat::Table => {
            print_transactions(&filtered, min_score, limit);
            print_users(&ranked_users, limit);
        }
        OutputFormat::Json => {
            let output = JsonOutput {
                summary: &summary,
                min_score,
                transactions: filtered.clone(),
                users: ranked_users.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    let exporter = CsvExporter::new(table.columns());
    if let Some(target) = export {
        let path =
            exporter.export_transactions(target, &config.presenter.export_file_name, &filtered)?;
        info!(path = %path.display(), "Filtered transactions exported");
    }
    if let Some(path) = users_export {
        exporter.export_users(path, &ranked_users)?;
    }

    log_top_users(&report);
    Ok(())
}

fn log_top_users(report: &PipelineReport) {
    for user in report.users.iter().filter(|u| u.flagged_user) {
        info!(
            user_id = %user.user_id,
            total_score = user.total_score,
            transactions = user.transaction_count,
            "Flagged user"
        );
    }
}

fn print_transactions(rows: &[&ScoredTransaction], min_score: u32, limit: usize) {
    println!(
        "Flagged Transactions (score >= {}): {} row(s)",
        min_score,
        rows.len()
    );
    println!(
        "{:<14} {:<10} {:>12} {:<19} {:<14} {:<16} {:>5}  Rules",
        "TransactionID", "UserID", "Amount", "Timestamp", "Location", "Merchant", "Score"
    );

    let shown = if limit == 0 { rows.len() } else { limit.min(rows.len()) };
    for row in &rows[..shown] {
        let tx = &row.transaction;
        println!(
            "{:<14} {:<10} {:>12.2} {:<19} {:<14} {:<16} {:>5}  {}",
            tx.transaction_id,
            tx.user_id,
            tx.amount,
            tx.timestamp.format("%Y-%m-%d %H:%M:%S"),
            tx.location.as_deref().unwrap_or("-"),
            tx.merchant.as_deref().unwrap_or("-"),
            row.score,
            row.triggered_rules().join(",")
        );
    }
    if shown < rows.len() {
        println!("... {} more", rows.len() - shown);
    }
    println!();
}

fn print_users(users: &[&UserRiskProfile], limit: usize) {
    println!("User-Level Risk Scores: {} user(s)", users.len());
    println!(
        "{:<10} {:>10} {:>12} {:>10} {:>8}",
        "UserID", "TotalScore", "Transactions", "AvgScore", "Flagged"
    );

    let shown = if limit == 0 { users.len() } else { limit.min(users.len()) };
    for user in &users[..shown] {
        println!(
            "{:<10} {:>10} {:>12} {:>10.2} {:>8}",
            user.user_id,
            user.total_score,
            user.transaction_count,
            user.avg_score_per_transaction,
            if user.flagged_user { "yes" } else { "no" }
        );
    }
    if shown < users.len() {
        println!("... {} more", users.len() - shown);
    }
}

fn print_rules(config: &AppConfig) {
    let weights = WeightTable::from_names(&config.scoring.weights);
    let rules = &config.rules;

    println!("Rules");
    println!("  HighAmount         Amount > {}", rules.high_amount_threshold);
    println!("  NightTime          hour < {}", rules.night_end_hour);
    println!(
        "  RapidTransactions  < {} minutes since the user's previous transaction",
        rules.rapid_window_minutes
    );
    println!("  Blacklisted        Merchant in {:?}", rules.blacklisted_merchants);
    println!("  RoundedAmount      Amount multiple of {}", rules.rounded_amount_unit);
    println!("  IPChanged          IPAddress differs from the previous transaction");
    println!("  DeviceChanged      Device differs from the previous transaction");
    println!();
    println!("Weights");
    for flag in Flag::ALL {
        match weights.weight(flag) {
            Some(w) => println!("  {:<18} {}", flag.name(), w),
            None => println!("  {:<18} - (not scored)", flag.name()),
        }
    }
    println!();
    println!(
        "Flagged user at total score >= {}",
        config.scoring.flagged_user_score
    );
}
