use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use call_quality_dashboard::aggregate::{end_of_day, start_of_day};
use call_quality_dashboard::airtable::AirtableClient;
use call_quality_dashboard::auth::{AccessPolicy, User};
use call_quality_dashboard::config::Settings;
use call_quality_dashboard::dashboard::Dashboard;
use call_quality_dashboard::db::{self, PgStore};
use call_quality_dashboard::filter::{EvaluationFilter, SortColumn, SortOrder};
use call_quality_dashboard::models::{CallEvaluation, Priority, Proceso, TrendQuery};
use call_quality_dashboard::{export, report};

#[derive(Parser)]
#[command(name = "call-quality-dashboard")]
#[command(about = "Call center quality analytics over Airtable evaluations", long_about = None)]
struct Cli {
    /// Open id of the calling user, checked when DASHBOARD_REQUIRE_AUTH is on
    #[arg(long, global = true, env = "DASHBOARD_USER")]
    as_user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Import every evaluation from Airtable
    Sync {
        #[arg(long, env = "AIRTABLE_API_KEY", hide_env_values = true)]
        api_key: String,
    },
    /// List evaluations
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Show a single evaluation
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Summary statistics across every evaluation
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Daily score trends
    Trends {
        #[arg(long)]
        operator: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Export the filtered listing as CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "evaluations.csv")]
        out: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Delete every stored evaluation
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Substring matched against call id, operator, scenario name and feedback
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    operator: Option<String>,
    #[arg(long, value_parser = parse_proceso)]
    proceso: Option<Proceso>,
    #[arg(long, value_parser = parse_priority)]
    priority: Option<Priority>,
    #[arg(long)]
    scenario: Option<String>,
    #[arg(long)]
    min_score: Option<f64>,
    #[arg(long)]
    max_score: Option<f64>,
    #[arg(long)]
    start: Option<NaiveDate>,
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Column to sort by, e.g. averageScore; newest first when omitted
    #[arg(long)]
    sort_by: Option<String>,
    #[arg(long, default_value = "desc")]
    order: String,
}

impl FilterArgs {
    fn into_filter(self) -> EvaluationFilter {
        let sort_by = self.sort_by.as_deref().and_then(|name| {
            let column = SortColumn::parse(name);
            if column.is_none() {
                warn!(column = name, "unknown sort column, sorting by recency");
            }
            column
        });

        EvaluationFilter {
            search: self.search,
            operator_name: self.operator,
            proceso: self.proceso,
            priority: self.priority,
            scenario_id: self.scenario,
            min_score: self.min_score,
            max_score: self.max_score,
            start_date: self.start.map(start_of_day),
            end_date: self.end.map(end_of_day),
            sort_by,
            sort_order: SortOrder::parse(&self.order),
        }
    }
}

fn parse_proceso(raw: &str) -> Result<Proceso, String> {
    Proceso::from_label(&raw.to_uppercase()).ok_or_else(|| format!("unknown proceso {raw}"))
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    Priority::from_label(raw).ok_or_else(|| format!("unknown priority {raw}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    let database_url = settings
        .database_url()
        .context("DATABASE_URL must point at the dashboard Postgres instance")?;

    let pool = db::connect(database_url, settings.max_connections)
        .await
        .context("failed to connect to Postgres")?;
    let store = PgStore::new(pool);
    let dashboard = Dashboard::new(
        store,
        AccessPolicy {
            require_auth: settings.require_auth,
        },
    );

    match cli.command {
        Commands::InitDb => {
            db::init_db(dashboard.store().pool()).await?;
            println!("Schema ready.");
        }
        Commands::Sync { api_key } => {
            let airtable = settings.airtable()?;
            let client = AirtableClient::new(&airtable)?;
            let caller = resolve_caller(dashboard.store(), cli.as_user.as_deref()).await?;
            let result = dashboard
                .sync_from_airtable(caller.as_ref(), &client, &api_key)
                .await?;
            println!(
                "Imported {} evaluations from {}.",
                result.records_imported,
                client.endpoint()
            );
        }
        Commands::List { filter, json } => {
            let rows = dashboard.list(&filter.into_filter()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No evaluations match these filters.");
            } else {
                for row in &rows {
                    println!("{}", summary_line(row));
                }
            }
        }
        Commands::Show { id, json } => match dashboard.by_id(id).await {
            Some(row) if json => println!("{}", serde_json::to_string_pretty(&row)?),
            Some(row) => print_detail(&row),
            None => bail!("evaluation {id} not found"),
        },
        Commands::Stats { json } => {
            let Some(stats) = dashboard.stats().await else {
                bail!("statistics unavailable; check the database connection");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            println!("Calls evaluated: {}", stats.total_calls);
            println!("Overall average score: {:.2}", stats.overall_average_score);
            println!("By proceso:");
            for entry in &stats.proceso_distribution {
                println!("- {}: {}", entry.proceso, entry.count);
            }
            println!("By priority:");
            for entry in &stats.priority_distribution {
                println!("- {}: {}", entry.priority, entry.count);
            }
            println!("Top operators:");
            for op in &stats.top_operators {
                println!(
                    "- {} averages {:.2} across {} calls",
                    op.name, op.average_score, op.call_count
                );
            }
        }
        Commands::Trends {
            operator,
            start,
            end,
            json,
        } => {
            let trends = dashboard
                .trends(&TrendQuery {
                    operator_name: operator,
                    start_date: start,
                    end_date: end,
                })
                .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&trends)?);
                return Ok(());
            }
            if trends.overall.is_empty() {
                println!("No evaluations in this window.");
                return Ok(());
            }
            println!("Overall:");
            for point in &trends.overall {
                println!(
                    "- {} avg {:.2} across {} calls",
                    point.date, point.average_score, point.count
                );
            }
            for series in &trends.by_operator {
                println!("{}:", series.operator_name);
                for point in &series.points {
                    println!(
                        "- {} avg {:.2} across {} calls",
                        point.date, point.average_score, point.count
                    );
                }
            }
        }
        Commands::Export { filter, out } => {
            let rows = dashboard.list(&filter.into_filter()).await;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let written = export::write_csv(file, &rows)?;
            println!("Exported {written} evaluations to {}.", out.display());
        }
        Commands::Report { start, end, out } => {
            let Some(stats) = dashboard.stats().await else {
                bail!("statistics unavailable; check the database connection");
            };
            let trends = dashboard
                .trends(&TrendQuery {
                    operator_name: None,
                    start_date: start,
                    end_date: end,
                })
                .await;
            let report = report::build_report(&stats, &trends, &report::window_label(start, end));
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("refusing to delete every evaluation without --yes");
            }
            let caller = resolve_caller(dashboard.store(), cli.as_user.as_deref()).await?;
            let removed = dashboard.clear_all(caller.as_ref()).await?;
            println!("Deleted {removed} evaluations.");
        }
    }

    Ok(())
}

async fn resolve_caller(store: &PgStore, open_id: Option<&str>) -> anyhow::Result<Option<User>> {
    let Some(open_id) = open_id else {
        return Ok(None);
    };
    let user = store
        .find_user_by_open_id(open_id)
        .await
        .context("failed to look up the calling user")?;
    if user.is_none() {
        warn!(open_id, "no user with this open id");
    }
    Ok(user)
}

fn summary_line(row: &CallEvaluation) -> String {
    format!(
        "#{} {} [{} {}] {} avg {} ({})",
        row.id,
        row.call_id,
        row.proceso,
        row.priority,
        row.operator_name.as_deref().unwrap_or("-"),
        score(row.average_score),
        row.evaluated_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "not evaluated".to_string())
    )
}

fn print_detail(row: &CallEvaluation) {
    println!("{}", summary_line(row));
    println!(
        "Scores: adherence {}, sentiment {}, correctness {}, speed {}",
        score(row.adherence_score),
        score(row.sentiment_score),
        score(row.correctness_score),
        score(row.speed_score)
    );
    if let Some(name) = &row.scenario_name {
        println!("Scenario: {name}");
    }
    if let Some(secs) = row.duration_seconds {
        println!("Duration: {secs}s");
    }
    for (label, text) in [
        ("Feedback", &row.feedback),
        ("Strengths", &row.strengths),
        ("Areas for improvement", &row.areas_for_improvement),
        ("Critical issues", &row.critical_issues),
        ("Expected wrap-up", &row.expected_wrap_up),
        ("Expected steps", &row.expected_steps),
    ] {
        if let Some(text) = text {
            println!("{label}: {text}");
        }
    }
}

fn score(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "-".to_string())
}
