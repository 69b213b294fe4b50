mod error;
mod models;
mod store;
mod tui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use models::{ApplicationRecord, Intent, Metrics, NewApplication, RecordEdit, Status};
use serde::Serialize;
use std::path::PathBuf;
use store::{ApplicationStore, DEFAULT_FILE};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jotrack", version)]
#[command(about = "Track job applications and their progress in a CSV file")]
struct Cli {
    /// Path to the applications table
    #[arg(short, long, global = true, default_value = DEFAULT_FILE)]
    file: PathBuf,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an application
    Add {
        /// Company name
        company: String,

        /// Job title
        job_title: String,

        /// Initial status (defaults to Applied)
        #[arg(short, long, value_parser = parse_status)]
        status: Option<Status>,

        #[command(flatten)]
        details: Details,
    },

    /// List applications
    List {
        /// Only show these statuses (repeatable)
        #[arg(short, long, value_parser = parse_status)]
        status: Vec<Status>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one application
    Show {
        /// Application index (from `list`)
        index: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Record a status change
    Status {
        /// Application index
        index: usize,

        /// New status (Applied, Assessment, Phone Screen, Interview, Offer, Rejected, Withdrawn)
        #[arg(value_parser = parse_status)]
        status: Status,
    },

    /// Edit an application; unspecified fields keep their current values
    Edit {
        /// Application index
        index: usize,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        job_title: Option<String>,

        /// New status, appended to the history (repeats the current status if omitted)
        #[arg(short, long, value_parser = parse_status)]
        status: Option<Status>,

        #[command(flatten)]
        details: EditDetails,
    },

    /// Delete an application
    Delete {
        /// Application index
        index: usize,
    },

    /// Show totals: all, active, offers
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the statuses currently in use (filter choices)
    Statuses,

    /// Browse applications interactively
    Browse {
        /// Only show these statuses (repeatable)
        #[arg(short, long, value_parser = parse_status)]
        status: Vec<Status>,
    },
}

#[derive(Args)]
struct Details {
    /// Job description
    #[arg(short, long, default_value = "")]
    description: String,

    /// Next steps
    #[arg(short, long, default_value = "")]
    next_steps: String,

    /// Free-form notes
    #[arg(long, default_value = "")]
    notes: String,
}

#[derive(Args)]
struct EditDetails {
    #[arg(short, long)]
    description: Option<String>,

    #[arg(short, long)]
    next_steps: Option<String>,

    #[arg(long)]
    notes: Option<String>,
}

#[derive(Serialize)]
struct Listed<'a> {
    index: usize,
    #[serde(flatten)]
    record: &'a ApplicationRecord,
}

fn parse_status(s: &str) -> Result<Status, String> {
    s.parse().map_err(|e: error::StoreError| e.to_string())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut store = ApplicationStore::open(&cli.file)
        .with_context(|| format!("Failed to load applications from {}", cli.file.display()))?;

    match cli.command {
        Commands::Add {
            company,
            job_title,
            status,
            details,
        } => {
            let outcome = store.apply(Intent::Create(NewApplication {
                company,
                job_title,
                description: details.description,
                status,
                next_steps: details.next_steps,
                notes: details.notes,
            }))?;
            println!("{}", outcome);
        }

        Commands::List { status, json } => {
            let rows = store.list(&status);
            if json {
                let listed: Vec<Listed> = rows
                    .into_iter()
                    .map(|(index, record)| Listed { index, record })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else if store.records().is_empty() {
                println!("No applications yet. Add your first one with 'jotrack add <COMPANY> <JOB_TITLE>'.");
            } else {
                print_metrics(&store.metrics());
                println!();
                if rows.is_empty() {
                    println!("No applications match that filter.");
                } else {
                    println!(
                        "{:<5} {:<13} {:<22} {:<28} {:<11} {:<19}",
                        "IDX", "STATUS", "COMPANY", "JOB TITLE", "APPLIED", "UPDATED"
                    );
                    println!("{}", "-".repeat(103));
                    for (idx, rec) in rows {
                        println!(
                            "{:<5} {:<13} {:<22} {:<28} {:<11} {:<19}",
                            idx,
                            rec.status,
                            truncate(&rec.company, 20),
                            truncate(&rec.job_title, 26),
                            rec.date_applied.format("%Y-%m-%d").to_string(),
                            rec.last_updated.format("%Y-%m-%d %H:%M:%S").to_string()
                        );
                    }
                }
            }
        }

        Commands::Show { index, json } => match store.get(index) {
            Some(rec) if json => {
                let listed = Listed { index, record: rec };
                println!("{}", serde_json::to_string_pretty(&listed)?);
            }
            Some(rec) => print_record(index, rec),
            None => {
                println!("Application #{} not found.", index);
            }
        },

        Commands::Status { index, status } => {
            store.update_status(index, status)?;
            println!("Application updated successfully! (#{} is now {})", index, status);
        }

        Commands::Edit {
            index,
            company,
            job_title,
            status,
            details,
        } => {
            let current = store.get(index).ok_or(error::StoreError::IndexOutOfRange {
                index,
                len: store.records().len(),
            })?;

            // Prefill from the stored record, then apply what was given.
            let mut edit = RecordEdit::from(current);
            if let Some(company) = company {
                edit.company = company;
            }
            if let Some(job_title) = job_title {
                edit.job_title = job_title;
            }
            if let Some(status) = status {
                edit.status = status;
            }
            if let Some(description) = details.description {
                edit.description = description;
            }
            if let Some(next_steps) = details.next_steps {
                edit.next_steps = next_steps;
            }
            if let Some(notes) = details.notes {
                edit.notes = notes;
            }

            let outcome = store.apply(Intent::Update(index, edit))?;
            println!("{}", outcome);
        }

        Commands::Delete { index } => {
            let outcome = store.apply(Intent::Delete(index))?;
            println!("{}", outcome);
        }

        Commands::Stats { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&store.metrics())?);
            } else {
                println!("File: {}", store.path().display());
                print_metrics(&store.metrics());
            }
        }

        Commands::Statuses => {
            let statuses = store.statuses_present();
            if statuses.is_empty() {
                println!("No applications yet.");
            } else {
                for status in statuses {
                    println!("{}", status);
                }
            }
        }

        Commands::Browse { status } => {
            tui::run_browse(&mut store, status)?;
        }
    }

    Ok(())
}

fn print_metrics(metrics: &Metrics) {
    println!(
        "Total Applications: {}   Active Applications: {}   Offers: {}",
        metrics.total, metrics.active, metrics.offers
    );
}

fn print_record(index: usize, rec: &ApplicationRecord) {
    println!("Application #{}", index);
    println!("{} - {}", rec.company, rec.job_title);
    println!("Applied: {}", rec.date_applied.format("%Y-%m-%d"));
    println!("Status: {}", rec.status);
    println!("Status History: {}", rec.status_history);
    if !rec.description.is_empty() {
        println!("\n--- Description ---\n{}", rec.description);
    }
    if !rec.next_steps.is_empty() {
        println!("\n--- Next Steps ---\n{}", rec.next_steps);
    }
    if !rec.notes.is_empty() {
        println!("\n--- Notes ---\n{}", rec.notes);
    }
    println!("\nLast Updated: {}", rec.last_updated.format("%Y-%m-%d %H:%M:%S"));
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_with_status() {
        let cli = Cli::try_parse_from([
            "jotrack",
            "add",
            "Acme",
            "Engineer",
            "--status",
            "phone-screen",
            "--notes",
            "via referral",
        ])
        .unwrap();
        match cli.command {
            Commands::Add {
                company,
                status,
                details,
                ..
            } => {
                assert_eq!(company, "Acme");
                assert_eq!(status, Some(Status::PhoneScreen));
                assert_eq!(details.notes, "via referral");
                assert_eq!(details.description, "");
            }
            _ => panic!("expected add"),
        }
        assert_eq!(cli.file, PathBuf::from(DEFAULT_FILE));
    }

    #[test]
    fn test_parse_list_with_repeated_filter() {
        let cli = Cli::try_parse_from([
            "jotrack", "list", "-s", "offer", "-s", "Interview", "--file", "/tmp/apps.csv",
        ])
        .unwrap();
        match cli.command {
            Commands::List { status, json } => {
                assert_eq!(status, vec![Status::Offer, Status::Interview]);
                assert!(!json);
            }
            _ => panic!("expected list"),
        }
        assert_eq!(cli.file, PathBuf::from("/tmp/apps.csv"));
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        let result = Cli::try_parse_from(["jotrack", "status", "0", "ghosted"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_truncate_is_char_aware() {
        assert_eq!(truncate("Acme", 10), "Acme");
        assert_eq!(truncate("Société Générale", 10), "Société...");
    }
}
