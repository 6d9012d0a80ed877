use std::io::Write as _;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod chart;
mod dataset;
mod errors;
#[cfg(test)]
mod fixtures;
mod items;
mod loader;
mod logging;
mod models;
mod report;
mod review;
mod risk;
mod web;

use dataset::{Dashboard, Dataset, ViewParams};
use models::{MasteryFilter, StatusFilter, Threshold};
use report::ExportTable;

#[derive(Parser)]
#[command(name = "quiz-dashboard")]
#[command(about = "Quiz results dashboard: student scores, item analysis and review pointers", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    verbose: bool,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive web dashboard
    Serve {
        #[arg(long, env = "QUIZ_DASHBOARD_HOST", default_value = "127.0.0.1")]
        host: IpAddr,
        #[arg(long, env = "QUIZ_DASHBOARD_PORT", default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value_t = 20)]
        max_upload_mb: usize,
        /// Workbook to load as a session at startup
        #[arg(long)]
        preload: Option<PathBuf>,
    },
    /// Print student scores and pass/at-risk counts
    Summary {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        threshold: Threshold,
        #[arg(long, value_enum, default_value_t)]
        status: StatusFilter,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Print item analysis, mastery distribution and at-risk questions
    Items {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        mastery: MasteryFilter,
    },
    /// Print incorrect answers for one student
    Review {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        email: String,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        threshold: Threshold,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export one table as CSV
    Export {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum)]
        table: ExportTable,
        #[arg(long, value_enum, default_value_t)]
        threshold: Threshold,
        #[arg(long, value_enum, default_value_t)]
        status: StatusFilter,
        #[arg(long, value_enum, default_value_t)]
        mastery: MasteryFilter,
        #[arg(long, required_if_eq("table", "review"))]
        email: Option<String>,
        /// Write to this path instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let workbook =
        loader::load_path(path).with_context(|| format!("failed to load {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Dataset::new(name, workbook))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose, cli.log_json)?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            max_upload_mb,
            preload,
        } => {
            let state = Arc::new(web::AppState::new(max_upload_mb * 1024 * 1024));
            if let Some(path) = preload {
                let id = state.insert(load_dataset(&path)?).await;
                tracing::info!("Preloaded {} at /sessions/{}", path.display(), id);
            }
            web::serve(SocketAddr::new(host, port), state).await?;
        }
        Commands::Summary {
            file,
            threshold,
            status,
            limit,
        } => {
            let dataset = load_dataset(&file)?;
            let params = ViewParams {
                threshold,
                status,
                ..ViewParams::default()
            };
            let dashboard = Dashboard::build(&dataset, &params)?;

            println!(
                "Threshold {}% ({}). Average score {}; {} likely to pass, {} at risk.",
                threshold,
                threshold.label(),
                report::format_percent(dashboard.metrics.average_score),
                dashboard.metrics.likely_to_pass,
                dashboard.metrics.at_risk
            );

            if dashboard.students.is_empty() {
                println!("No students match this filter.");
                return Ok(());
            }

            for student in dashboard.students.iter().take(limit) {
                println!(
                    "- {} {} ({}) {}/{} = {:.2}% {}",
                    student.first_name,
                    student.last_name,
                    student.email,
                    student.total_correct,
                    student.total_items,
                    student.percent_score,
                    student.status
                );
            }
        }
        Commands::Items { file, mastery } => {
            let dataset = load_dataset(&file)?;
            let params = ViewParams {
                mastery,
                ..ViewParams::default()
            };
            let dashboard = Dashboard::build(&dataset, &params)?;

            for item in &dashboard.items {
                println!(
                    "- [{}] {} A:{} B:{} C:{} D:{} correct {:.1}% ({})",
                    report::format_order(item.item_order),
                    item.question_id,
                    item.count_a,
                    item.count_b,
                    item.count_c,
                    item.count_d,
                    item.percent_correct,
                    item.mastery_level
                );
            }

            println!("Mastery distribution:");
            for entry in &dashboard.distribution {
                println!(
                    "- {}: {} ({:.1}%)",
                    entry.mastery_level, entry.count, entry.percentage
                );
            }

            if dashboard.prompts.is_empty() {
                println!("No low mastery questions detected.");
            } else {
                println!("At-risk questions:");
                for prompt in &dashboard.prompts {
                    println!(
                        "- {} most chosen {} ({}): {}",
                        prompt.question_id,
                        prompt.most_chosen_incorrect_answer,
                        prompt.count,
                        prompt.question
                    );
                }
            }
        }
        Commands::Review { file, email } => {
            let dataset = load_dataset(&file)?;
            let params = ViewParams {
                email: Some(email.clone()),
                ..ViewParams::default()
            };
            let dashboard = Dashboard::build(&dataset, &params)?;

            if dashboard.review.is_empty() {
                println!("All answers correct for {email}!");
                return Ok(());
            }

            for entry in &dashboard.review {
                println!(
                    "- {} {}: answered {} ({}); notes: {}",
                    entry.question_id,
                    entry.question,
                    entry.answer,
                    entry.text,
                    entry.notes.as_deref().unwrap_or("none")
                );
            }
        }
        Commands::Report {
            file,
            threshold,
            email,
            out,
        } => {
            let dataset = load_dataset(&file)?;
            let params = ViewParams {
                threshold,
                email,
                ..ViewParams::default()
            };
            let dashboard = Dashboard::build(&dataset, &params)?;
            let report = report::build_report(&dataset.source_name, chrono::Utc::now(), &dashboard);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            file,
            table,
            threshold,
            status,
            mastery,
            email,
            out,
        } => {
            let dataset = load_dataset(&file)?;
            let params = ViewParams {
                threshold,
                status,
                mastery,
                email,
            };
            let dashboard = Dashboard::build(&dataset, &params)?;

            match out {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    report::export_csv(&dashboard, table, file)?;
                    println!("Exported {} to {}.", table.name(), path.display());
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut handle = stdout.lock();
                    report::export_csv(&dashboard, table, &mut handle)?;
                    handle.flush()?;
                }
            }
        }
    }

    Ok(())
}
