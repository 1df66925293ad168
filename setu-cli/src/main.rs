use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use setu_core::{parse_date, submission_violations, RangeOption, SetuConfig};
use setu_query::{
    city_demographics, city_missing_submissions, city_resource_trend, city_symptoms,
    hospital_availability, overview, InMemoryStore, ViewContext,
};
use setu_rows::{submissions_from_str, AggregateRequest};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "setu",
    about = "Aggregate daily hospital resource submissions."
)]
struct Args {
    /// JSON file overriding the default thresholds.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate a `{ rows, spec, chronological }` request file.
    Aggregate {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// City dashboard: trend, demographics, availability cards and symptoms.
    City {
        #[arg(short, long)]
        dataset: PathBuf,
        #[arg(long)]
        city: String,
        /// today, 7 days, 14 days or month.
        #[arg(long)]
        range: Option<String>,
        /// Defaults to the current day in the configured offset.
        #[arg(long)]
        today: Option<String>,
    },
    /// Hospitals in a city that have not submitted today.
    Missing {
        #[arg(short, long)]
        dataset: PathBuf,
        #[arg(long)]
        city: String,
        #[arg(long)]
        today: Option<String>,
    },
    /// Registry-wide submission counts.
    Overview {
        #[arg(short, long)]
        dataset: PathBuf,
        #[arg(long)]
        today: Option<String>,
    },
    /// Check a submissions file for used values above totals.
    Validate {
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .try_init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Aggregate { input } => {
            let data = read(&input)?;
            let request: AggregateRequest =
                serde_json::from_str(&data).context("aggregate request is not valid JSON")?;
            let days = request.run()?;
            print_json(&days)?;
        }
        Command::City {
            dataset,
            city,
            range,
            today,
        } => {
            let store = load_store(&dataset)?;
            let ctx = ViewContext::new(city, resolve_today(today.as_deref(), &config)?);
            let range = match range {
                Some(raw) => raw.parse::<RangeOption>()?,
                None => config.default_range,
            };
            info!(city = %ctx.city, today = %ctx.today, ?range, "building city dashboard");

            let report = json!({
                "city": ctx.city,
                "today": ctx.today,
                "range": range,
                "trend": city_resource_trend(&store, &ctx, range)?,
                "demographics": city_demographics(&store, &ctx, range)?,
                "hospitals": hospital_availability(&store, &ctx, &config)?,
                "symptoms": city_symptoms(&store, &ctx)?,
            });
            print_json(&report)?;
        }
        Command::Missing {
            dataset,
            city,
            today,
        } => {
            let store = load_store(&dataset)?;
            let ctx = ViewContext::new(city, resolve_today(today.as_deref(), &config)?);
            let missing = city_missing_submissions(&store, &ctx)?;
            if missing.is_empty() {
                println!("All hospitals in {} have submitted for {}.", ctx.city, ctx.today);
            }
            for hospital in missing {
                println!(
                    "{} - {}",
                    hospital.name,
                    hospital.location.as_deref().unwrap_or("unknown location")
                );
            }
        }
        Command::Overview { dataset, today } => {
            let store = load_store(&dataset)?;
            let stats = overview(&store, resolve_today(today.as_deref(), &config)?)?;
            println!(
                "Submitted today: {}\nPast 7 days: {}\nPast 30 days: {}\nMissing today: {}",
                stats.submitted_today, stats.last_7_days, stats.last_30_days, stats.missing_today
            );
        }
        Command::Validate { input } => {
            let submissions = submissions_from_str(&read(&input)?)?;
            let mut rejected = 0;
            for submission in &submissions {
                for violation in submission_violations(submission) {
                    rejected += 1;
                    println!(
                        "{} on {}: {}",
                        submission.hospital_id,
                        submission.date,
                        violation.describe()
                    );
                }
            }
            if rejected > 0 {
                bail!("{rejected} used/total violations in {:?}", input);
            }
            println!("{} submissions passed validation.", submissions.len());
        }
    }

    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("could not read file {path:?}"))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SetuConfig> {
    match path {
        Some(path) => serde_json::from_str(&read(path)?)
            .with_context(|| format!("config {path:?} is not valid")),
        None => Ok(SetuConfig::default()),
    }
}

fn load_store(path: &Path) -> anyhow::Result<InMemoryStore> {
    InMemoryStore::from_path(path).with_context(|| format!("could not load dataset {path:?}"))
}

fn resolve_today(raw: Option<&str>, config: &SetuConfig) -> anyhow::Result<NaiveDate> {
    match raw {
        Some(raw) => Ok(parse_date(raw)?),
        None => Ok(config.today(Utc::now())),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
