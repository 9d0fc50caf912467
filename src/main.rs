use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tams_dashboard::chat::{Assistant, ChatRequest};
use tams_dashboard::config::{self, DashboardConfig};
use tams_dashboard::dashboard::Dashboard;
use tams_dashboard::ingest::{self, AnomalyInput};
use tams_dashboard::storage::RecordStore;

#[derive(Parser)]
#[command(
    name = "tams-dashboard",
    about = "Industrial anomaly tracking dashboard",
    version,
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to $TAMS_CONFIG, then /etc/tams/tams.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file, overrides the configured one
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address, overrides the configured one
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print the KPI snapshot and change statistics
    Kpis {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Print anomalies per month and criticality level
    Chart {
        /// Only count anomalies created in this year
        #[arg(long)]
        year: Option<i32>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Print the anomaly distribution per service
    Services {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Ask the assistant a question
    Chat {
        /// The question, e.g. "Quelles sont les anomalies critiques ?"
        message: String,
    },

    /// Import anomalies from a JSON array or a CSV export
    Import {
        /// Input file path; a `.csv` extension selects the CSV reader
        #[arg(long)]
        file: PathBuf,
    },
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = DashboardConfig::resolve(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        cfg.server.db_path = db;
    }
    config::init_tracing(&cfg.logging);

    let command = match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            tracing::info!(bind = %cfg.server.bind, "Starting TAMS dashboard");
            return tams_dashboard::serve(cfg).await;
        }
        other => other,
    };

    let store: Arc<dyn RecordStore> = Arc::new(tams_dashboard::open_store(&cfg)?);
    let cfg = Arc::new(cfg);
    let dashboard = Dashboard::new(store.clone(), cfg.clone());

    match command {
        Commands::Serve { .. } => {}
        Commands::Kpis { json } => {
            let kpis = dashboard.try_kpis().await?;
            let changes = dashboard.changes(&kpis).await;
            if json {
                print_json(&serde_json::json!({ "kpis": kpis, "changes": changes }))?;
            } else {
                println!("\nTAMS Dashboard KPIs");
                println!("{:<28} | {:>12} | Change", "Indicator", "Value");
                println!("{:-<28}-|-{:->12}-|-{:-<8}", "", "", "");
                println!(
                    "{:<28} | {:>12} | {:+.1}%",
                    "Total anomalies", kpis.total_anomalies, changes.total_change
                );
                println!(
                    "{:<28} | {:>12} | {:+.1}%",
                    "Open anomalies", kpis.open_anomalies, changes.open_change
                );
                println!(
                    "{:<28} | {:>12} | {:+.1}%",
                    "Critical anomalies", kpis.critical_anomalies, changes.critical_change
                );
                println!(
                    "{:<28} | {:>11.2}% | {:+.1}%",
                    "Treatment rate", kpis.treatment_rate, changes.treatment_rate_change
                );
                println!(
                    "{:<28} | {:>9.2} d. |",
                    "Average resolution time", kpis.average_resolution_time
                );
                println!(
                    "{:<28} | {:>11.2}% |",
                    "Maintenance utilization", kpis.maintenance_utilization
                );
                println!("{:<28} | {:>12} |", "Safety incidents", kpis.safety_incidents);
                println!("{:<28} | {:>10.2} M |", "Cost impact", kpis.cost_impact);
                let c = &kpis.criticality;
                println!(
                    "\nCriticality: {} low, {} medium, {} high, {} critical\n",
                    c.low, c.medium, c.high, c.critical
                );
            }
        }
        Commands::Chart { year, json } => {
            let buckets = dashboard.try_chart(year).await?;
            if json {
                print_json(&buckets)?;
            } else {
                println!(
                    "{:<6} | {:>6} | {:>6} | {:>6} | {:>6} | {:>8}",
                    "Month", "Total", "Low", "Medium", "High", "Critical"
                );
                println!("{:-<6}-|-{:->6}-|-{:->6}-|-{:->6}-|-{:->6}-|-{:->8}", "", "", "", "", "", "");
                for b in &buckets {
                    println!(
                        "{:<6} | {:>6} | {:>6} | {:>6} | {:>6} | {:>8}",
                        b.label, b.total, b.low, b.medium, b.high, b.critical
                    );
                }
            }
        }
        Commands::Services { json } => {
            let shares = dashboard.try_services().await?;
            if json {
                print_json(&shares)?;
            } else if shares.is_empty() {
                println!("No anomalies recorded.");
            } else {
                println!("{:<30} | {:>6} | Share", "Service", "Count");
                println!("{:-<30}-|-{:->6}-|-{:-<7}", "", "", "");
                for s in &shares {
                    println!("{:<30} | {:>6} | {:.2}%", s.service, s.count, s.percentage);
                }
            }
        }
        Commands::Chat { message } => {
            let assistant = Assistant::new(store.clone(), cfg.clone());
            let reply = assistant
                .respond(ChatRequest {
                    message,
                    context: None,
                })
                .await?;
            println!("{}", reply.response);
        }
        Commands::Import { file } => {
            let content = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let is_csv = file
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            let inputs: Vec<AnomalyInput> = if is_csv {
                ingest::parse_csv(&content)
                    .with_context(|| format!("failed to parse {}", file.display()))?
            } else {
                serde_json::from_slice(&content)
                    .with_context(|| format!("failed to parse {}", file.display()))?
            };
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());

            tracing::info!(%filename, records = inputs.len(), "Importing anomalies");
            let stored = ingest::store_batch(store.as_ref(), &filename, inputs).await?;
            println!(
                "{} anomalies stored (import batch {}).",
                stored.total_stored, stored.import_batch_id
            );
        }
    }

    Ok(())
}
