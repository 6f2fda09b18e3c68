mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sait-sched")]
#[command(about = "SAIT class schedule builder and Banner registration tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a pasted browser header file and show the captured session
    Session {
        /// File containing the copied request headers
        file: String,
    },

    /// List the registration terms Banner offers
    Terms {
        /// File containing the copied request headers
        #[arg(short, long)]
        session_file: String,
    },

    /// Subject/course autocomplete search
    Search {
        #[arg(short, long)]
        session_file: String,

        /// Term code, e.g. 202530
        #[arg(short, long)]
        term: String,

        /// Search text, e.g. "itsc"
        query: String,
    },

    /// Fetch course sections from Banner and write a catalog file
    Fetch {
        #[arg(short, long)]
        session_file: String,

        /// Term code, e.g. 202530
        #[arg(short, long)]
        term: String,

        /// Course codes, e.g. ITSC320,CPSY300
        #[arg(short, long, value_delimiter = ',')]
        codes: Vec<String>,

        /// Include sections without open seats
        #[arg(long)]
        include_full: bool,

        /// Output file path
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Enumerate conflict-free schedules from a catalog file
    Plan {
        /// Catalog file written by `fetch`
        #[arg(short, long)]
        input: String,

        /// CRNs that must appear in every schedule
        #[arg(short, long, value_delimiter = ',')]
        mandatory: Vec<String>,

        /// Weekdays to keep free, e.g. fri or friday,monday
        #[arg(short, long, value_delimiter = ',')]
        free_days: Vec<String>,

        /// Show at most this many schedules
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Write the picked schedule as an ICS file
        #[arg(long)]
        ics: Option<String>,

        /// Which ranked schedule to export (1 = best)
        #[arg(long, default_value = "1")]
        pick: usize,

        /// Semester start date (YYYY-MM-DD), required with --ics
        #[arg(long)]
        start_date: Option<String>,

        /// Semester end date (YYYY-MM-DD), required with --ics
        #[arg(long)]
        end_date: Option<String>,
    },

    /// Show current registrations for a term
    Registrations {
        #[arg(short, long)]
        session_file: String,

        #[arg(short, long)]
        term: String,
    },

    /// Register sections by CRN
    Register {
        #[arg(short, long)]
        session_file: String,

        #[arg(short, long)]
        term: String,

        /// CRNs to register, e.g. 12345,23456
        #[arg(short, long, value_delimiter = ',')]
        crns: Vec<String>,
    },

    /// Drop registered sections by CRN
    Drop {
        #[arg(short, long)]
        session_file: String,

        /// CRNs to drop
        #[arg(short, long, value_delimiter = ',')]
        crns: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sait_sched_cli={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Session { file } => commands::session_command(file).await,

        Commands::Terms { session_file } => commands::terms_command(session_file).await,

        Commands::Search {
            session_file,
            term,
            query,
        } => commands::search_command(session_file, term, query).await,

        Commands::Fetch {
            session_file,
            term,
            codes,
            include_full,
            output,
        } => {
            commands::fetch_command(commands::FetchParams {
                session_file,
                term,
                codes,
                open_only: !include_full,
                output,
            })
            .await
        }

        Commands::Plan {
            input,
            mandatory,
            free_days,
            limit,
            ics,
            pick,
            start_date,
            end_date,
        } => {
            commands::plan_command(commands::PlanParams {
                input,
                mandatory,
                free_days,
                limit,
                ics_output: ics,
                pick,
                start_date,
                end_date,
            })
            .await
        }

        Commands::Registrations { session_file, term } => {
            commands::registrations_command(session_file, term).await
        }

        Commands::Register {
            session_file,
            term,
            crns,
        } => commands::register_command(session_file, term, crns).await,

        Commands::Drop { session_file, crns } => commands::drop_command(session_file, crns).await,
    }
}
