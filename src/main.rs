use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

mod config;
mod error;
mod filter;
mod logging;
mod models;
mod normalize;
mod pipeline;
mod predict;
mod repman;
mod report;
mod shift;
mod table;

use crate::config::RepmanConfig;
use crate::error::ReportError;
use crate::models::{KilnCureTable, ReportFilterCriteria, ShiftFilter, ShiftWindow};
use crate::repman::{Credentials, RepmanClient};

#[derive(Parser)]
#[command(name = "kiln-exit-report")]
#[command(about = "Kiln exit reports and shift output forecasts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast which batches of a production log leave their kiln during a shift
    Predict {
        /// Production log (.csv, .txt, .xlsx, .xls, .xlsm, .ods)
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_parser = parse_time_arg)]
        shift_start: NaiveTime,
        #[arg(long, value_parser = parse_time_arg)]
        shift_end: NaiveTime,
        /// Number of kilns on the line; defaults to the highest kiln given with --cure
        #[arg(long)]
        kilns: Option<u32>,
        /// Cure hours per kiln as KILN=HOURS, repeatable
        #[arg(long = "cure", value_parser = parse_cure_arg)]
        cure: Vec<(u32, f64)>,
        /// Write in-shift batches as semicolon-separated text
        #[arg(long)]
        export: Option<PathBuf>,
        /// Write a markdown report
        #[arg(long = "report")]
        markdown: Option<PathBuf>,
    },
    /// Download the kiln exit report, filter it and export the result
    Report {
        #[arg(long, env = "REPMAN_USER", default_value = "")]
        user: String,
        #[arg(long, env = "REPMAN_PASSWORD", default_value = "", hide_env_values = true)]
        password: String,
        #[command(flatten)]
        repman: RepmanConfig,
        /// Filter a previously downloaded report instead of fetching one
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, value_parser = parse_date_arg)]
        date_from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg)]
        date_to: Option<NaiveDate>,
        /// Shift number, or "Todos" for every shift
        #[arg(long, default_value = "Todos")]
        shift: ShiftFilter,
        /// Line code, e.g. "LV&PD", "TQ", "TZ AA"
        #[arg(long)]
        line: Option<String>,
        /// SAP code, e.g. "O14191035"
        #[arg(long)]
        sap: Option<String>,
        #[arg(long, default_value = report::FILTERED_EXPORT_NAME)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            file,
            shift_start,
            shift_end,
            kilns,
            cure,
            export,
            markdown,
        } => {
            let kiln_count = kilns.unwrap_or_else(|| cure.iter().map(|(k, _)| *k).max().unwrap_or(0));
            if kiln_count == 0 {
                return Err(ReportError::InvalidInput(
                    "configure at least one kiln with --cure KILN=HOURS".to_string(),
                )
                .into());
            }
            let cure_table = KilnCureTable::from_entries(kiln_count, cure)?;
            let shift = ShiftWindow {
                start: shift_start,
                end: shift_end,
            };

            let table = table::read_path(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let outcome = pipeline::run(&table, &cure_table, &shift)?;

            if outcome.diagnostics.rows_dropped > 0 {
                warn!(
                    "{} of {} rows skipped: date, time, kiln or quantity could not be read",
                    outcome.diagnostics.rows_dropped, outcome.diagnostics.rows_total
                );
            }

            if outcome.summary.is_empty() {
                println!("No batches exit within this shift.");
            } else {
                println!("Predicted output by material:");
                for (material, quantity) in &outcome.summary.totals {
                    println!("- {material}: {quantity}");
                }
                println!("Total: {}", outcome.summary.total());
            }

            if let Some(path) = export {
                std::fs::write(&path, report::export_detail(&outcome.detail)?)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Batches written to {}.", path.display());
            }
            if let Some(path) = markdown {
                std::fs::write(&path, report::build_prediction_report(&shift, &outcome))
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Report written to {}.", path.display());
            }
        }
        Commands::Report {
            user,
            password,
            repman,
            input,
            date_from,
            date_to,
            shift,
            line,
            sap,
            out,
        } => {
            let data = match input {
                Some(path) => table::read_path(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    if user.trim().is_empty() || password.is_empty() {
                        return Err(ReportError::InvalidInput(
                            "user and password are required to download the report".to_string(),
                        )
                        .into());
                    }
                    let client = RepmanClient::new(repman);
                    let session = client
                        .login(&Credentials {
                            user: user.trim().to_string(),
                            password,
                        })
                        .await?;
                    let bytes = client.fetch_report(&session).await?;
                    table::read_delimited(&bytes)?
                }
            };

            let criteria = ReportFilterCriteria {
                date_from,
                date_to,
                shift,
                line,
                sap_code: sap,
            };
            let filtered = filter::apply(&data, &criteria)?;
            info!(total = data.len(), filtered = filtered.len(), "report filtered");
            println!(
                "{}",
                report::build_filter_summary(&criteria, data.len(), filtered.len())
            );

            if !filtered.is_empty() {
                std::fs::write(&out, report::export_table(&filtered)?)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Filtered report written to {}.", out.display());
            }
        }
    }

    Ok(())
}

fn parse_time_arg(value: &str) -> Result<NaiveTime, String> {
    normalize::parse_time(value).ok_or_else(|| format!("'{value}' is not a time of day (HH:MM)"))
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    normalize::parse_date(value).ok_or_else(|| format!("'{value}' is not a date (YYYY-MM-DD)"))
}

fn parse_cure_arg(value: &str) -> Result<(u32, f64), String> {
    let (kiln, hours) = value
        .split_once('=')
        .ok_or_else(|| format!("'{value}' should look like KILN=HOURS"))?;
    let kiln = kiln
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("'{kiln}' is not a kiln number"))?;
    let hours = hours
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| format!("'{hours}' is not a number of hours"))?;
    Ok((kiln, hours))
}
