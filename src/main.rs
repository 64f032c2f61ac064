use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod advice;
mod chat;
mod config;
mod error;
mod import;
mod insight;
mod models;
mod report;
mod scoring;
mod server;

use crate::chat::ChatAssistant;
use crate::config::AppConfig;
use crate::insight::{CompletionsClient, InsightService};
use crate::models::{AnalysisEnvelope, DEFAULT_SLEEP_HOURS};
use crate::scoring::WorkloadScorer;
use crate::server::AppState;

const DEFAULT_LOG_DIRECTIVES: &str = "info,loadcheck=debug";

#[derive(Parser)]
#[command(name = "loadcheck")]
#[command(about = "Student workload and burnout risk checker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (/analyze, /chat, /health)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Score a workload from a JSON payload or CSV files
    #[command(group(
        ArgGroup::new("csv")
            .args(["subjects", "exams", "projects"])
            .multiple(true)
    ))]
    Analyze {
        /// JSON payload shaped like the /analyze request body
        #[arg(long, conflicts_with = "csv")]
        input: Option<PathBuf>,
        /// CSV with columns name,hours_per_week
        #[arg(long)]
        subjects: Option<PathBuf>,
        /// CSV with columns name,date[,difficulty]
        #[arg(long)]
        exams: Option<PathBuf>,
        /// CSV with columns name,deadline[,complexity]
        #[arg(long)]
        projects: Option<PathBuf>,
        /// Nightly sleep for CSV input; a JSON payload carries its own
        #[arg(long, default_value_t = DEFAULT_SLEEP_HOURS, conflicts_with = "input")]
        sleep_hours: f64,
        /// Skip the LLM tip and use the fallback message
        #[arg(long)]
        offline: bool,
        /// Write a Markdown report instead of printing JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn init_logging() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_DIRECTIVES))
        .context("invalid log filter")?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .context("logging already initialized")?;
    Ok(())
}

fn insight_service(config: &AppConfig) -> anyhow::Result<InsightService> {
    let client = CompletionsClient::for_insights(config).context("failed to build LLM client")?;
    if !client.is_configured() {
        tracing::warn!(
            target: "loadcheck::insight",
            "GROQ_API_KEY is not set; personalized tips will use the fallback message"
        );
    }
    Ok(InsightService::new(Arc::new(client), config.insight_timeout))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging()?;
    let config = AppConfig::load().context("failed to load configuration")?;

    match cli.command {
        Commands::Serve { host, port } => {
            let chat_client =
                CompletionsClient::for_chat(&config).context("failed to build chat client")?;
            let state = Arc::new(AppState {
                scorer: WorkloadScorer::new(),
                insight: insight_service(&config)?,
                chat: ChatAssistant::new(Arc::new(chat_client)),
            });

            let addr = format!(
                "{}:{}",
                host.unwrap_or_else(|| config.host.clone()),
                port.unwrap_or(config.port)
            );
            server::serve(&addr, state).await?;
        }
        Commands::Analyze {
            input,
            subjects,
            exams,
            projects,
            sleep_hours,
            offline,
            report: report_path,
        } => {
            let workload = match input {
                Some(path) => import::read_json(&path)?,
                None => import::from_csv(
                    subjects.as_deref(),
                    exams.as_deref(),
                    projects.as_deref(),
                    sleep_hours,
                )?,
            };

            let insight = if offline {
                InsightService::offline()
            } else {
                insight_service(&config)?
            };

            let today = Local::now().date_naive();
            let mut analysis = WorkloadScorer::new().analyze_on(&workload, today);
            analysis.ai_message = insight.tip(&workload, &analysis).await;

            match report_path {
                Some(out) => {
                    let markdown = report::build_report(&workload, &analysis, today);
                    std::fs::write(&out, markdown)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!(
                        "Report written to {} (score {:.1}, {}).",
                        out.display(),
                        analysis.total_score,
                        analysis.risk_level.label()
                    );
                }
                None => {
                    let envelope = AnalysisEnvelope::ok(analysis);
                    println!("{}", serde_json::to_string_pretty(&envelope)?);
                }
            }
        }
    }

    Ok(())
}
