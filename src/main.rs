use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutor_srs::api::handle_schedule_request;
use tutor_srs::config::Config;
use tutor_srs::database::db;
use tutor_srs::export::json::{RecordExport, export_records_to_path, import_records};
use tutor_srs::models::sm2::{format_interval, preview_intervals};
use tutor_srs::{ReviewQuality, ReviewSession};

/// Spaced-repetition scheduling for tutoring sessions
#[derive(Parser, Debug)]
#[command(name = "tutor-srs")]
#[command(version)]
struct Args {
    /// SQLite review store
    #[arg(long, global = true, env = "TUTOR_SRS_DB")]
    db: Option<PathBuf>,

    /// TOML config file (defaults to ./tutor-srs.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Schedule one review from a JSON request (argument or stdin); no store involved
    Schedule { request: Option<String> },
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that open the review store
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Start tracking a concept for a student
    Enroll {
        student: String,
        concept: String,
        #[arg(long)]
        subject: Option<String>,
    },
    /// Grade one review (quality 0-5)
    Review {
        student: String,
        concept: String,
        quality: i64,
    },
    /// List concepts due now
    Due {
        student: String,
        #[arg(long)]
        subject: Option<String>,
    },
    /// Show review counters for a student
    Stats {
        student: String,
        #[arg(long)]
        subject: Option<String>,
    },
    /// Show the review log of one concept
    History { student: String, concept: String },
    /// Review all due concepts interactively, repeating failed ones
    Session {
        student: String,
        #[arg(long)]
        subject: Option<String>,
    },
    /// Move the store's current date forward one day
    AdvanceDay,
    /// Write a student's records to a JSON file
    Export { student: String, path: PathBuf },
    /// Load records from a JSON file into the store
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::resolve(args.config.as_deref(), args.db.clone(), None)
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match args.command {
        Command::Schedule { request } => {
            let body = match request {
                Some(body) => body,
                None => {
                    let mut body = String::new();
                    io::stdin()
                        .read_to_string(&mut body)
                        .context("Failed to read request from stdin")?;
                    body
                }
            };
            println!("{}", handle_schedule_request(&body, Utc::now())?);
            Ok(())
        }
        Command::Store(command) => run_store_command(command, &config),
    }
}

fn run_store_command(command: StoreCommand, config: &Config) -> Result<()> {
    let mut conn = db::init_database(&config.database_path)
        .context("Failed to initialize review store")?;

    match command {
        StoreCommand::Enroll {
            student,
            concept,
            subject,
        } => {
            let record = db::enroll_concept(&student, &concept, subject.as_deref(), &conn)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        StoreCommand::Review {
            student,
            concept,
            quality,
        } => {
            let quality = ReviewQuality::try_from(quality)?;
            let record = db::submit_review(&student, &concept, quality, &mut conn)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        StoreCommand::Due { student, subject } => {
            let due = db::get_due_reviews(&student, subject.as_deref(), &conn)?;
            println!("{}", serde_json::to_string_pretty(&due)?);
        }
        StoreCommand::Stats { student, subject } => {
            let stats = db::get_review_stats(&student, subject.as_deref(), &conn)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StoreCommand::History { student, concept } => {
            let log = db::get_review_log(&student, &concept, &conn)?;
            println!("{}", serde_json::to_string_pretty(&log)?);
        }
        StoreCommand::Session { student, subject } => {
            run_session(&student, subject.as_deref(), conn)?;
        }
        StoreCommand::AdvanceDay => {
            let date = db::advance_day(&conn)?;
            println!("{}", date.to_rfc3339());
        }
        StoreCommand::Export { student, path } => {
            let export = RecordExport::from_store(&student, &conn)?;
            export_records_to_path(&export, &path)
                .with_context(|| format!("Failed to export to {}", path.display()))?;
        }
        StoreCommand::Import { path } => {
            let export = import_records(&path)
                .with_context(|| format!("Failed to import {}", path.display()))?;
            let count = export.apply_to_store(&conn)?;
            info!("Imported {} records", count);
        }
    }

    Ok(())
}

fn run_session(
    student: &str,
    subject: Option<&str>,
    conn: rusqlite::Connection,
) -> Result<()> {
    let mut session = ReviewSession::start(student, subject, Arc::new(Mutex::new(conn)))?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while !session.is_completed() {
        let Some(record) = session.current_concept() else {
            break;
        };
        let preview = preview_intervals(&record.state())?;
        println!("{}", session.phase_message());
        println!(
            "Concept: {}  (0-2 again {}, 3 {}, 4 {}, 5 {})",
            record.concept_id,
            format_interval(preview[0]),
            format_interval(preview[3]),
            format_interval(preview[4]),
            format_interval(preview[5]),
        );
        print!("Quality 0-5: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            bail!("Input ended with {} concepts left", session.remaining_count());
        };
        let quality = match line?.trim().parse::<i64>().map(ReviewQuality::try_from) {
            Ok(Ok(quality)) => quality,
            _ => {
                println!("Enter a whole number from 0 to 5");
                continue;
            }
        };

        if let Some(updated) = session.grade_current(quality)? {
            println!(
                "Next review in {} ({})",
                format_interval(updated.interval_days),
                updated.next_review_at.to_rfc3339()
            );
        }
        session.next_concept();
    }

    println!("Session complete.");
    Ok(())
}
