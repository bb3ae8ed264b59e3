use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use team_progress_proxy::config::{load_file, validate_jobs, AppConfig, ConfigError};
use team_progress_proxy::cookies::RequestCookie;
use team_progress_proxy::jobs::{HttpJobApi, JobApi, JobError, JobPoller, JobStatus, PollSettings};
use team_progress_proxy::observability::init_logging;

#[derive(Parser)]
#[command(name = "progress-cli")]
#[command(about = "Trigger and follow team progress backend jobs", long_about = None)]
struct Cli {
    /// Backend or proxy base URL
    #[arg(short, long, default_value = "http://localhost:3000/api/backend")]
    url: String,

    /// Session cookie forwarded with every request, as NAME=VALUE
    #[arg(short, long = "cookie")]
    cookies: Vec<RequestCookie>,

    /// Read polling settings from the proxy's TOML config
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an organization sync and wait for it to finish
    Sync {
        organization_id: u64,

        #[arg(long)]
        interval_ms: Option<u64>,

        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Print the current status of a job
    Job { job_id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_code(e.as_ref()))
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_file(path)?,
        None => {
            let mut config = AppConfig::default();
            config.observability.log_level = "warn".into();
            config
        }
    };
    init_logging(&config.observability);

    let api = HttpJobApi::new(&cli.url)?.with_cookies(cli.cookies);

    match cli.command {
        Commands::Sync {
            organization_id,
            interval_ms,
            timeout_ms,
        } => {
            if let Some(ms) = interval_ms {
                config.jobs.poll_interval_ms = ms;
            }
            if let Some(ms) = timeout_ms {
                config.jobs.overall_timeout_ms = ms;
            }
            validate_jobs(&config.jobs).map_err(ConfigError::Validation)?;
            let settings = PollSettings::from(&config.jobs);

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let poller = JobPoller::new(api, settings);
            let status = poller.submit_and_await(organization_id, &cancel).await?;
            print_status(&status)?;
        }
        Commands::Job { job_id } => {
            match api.fetch_status(&job_id).await? {
                Some(status) => print_status(&status)?,
                None => return Err(JobError::NotFound(job_id).into()),
            }
        }
    }

    Ok(())
}

fn print_status(status: &JobStatus) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(status)?);
    Ok(())
}

fn exit_code(error: &(dyn std::error::Error + 'static)) -> u8 {
    match error.downcast_ref::<JobError>() {
        Some(JobError::Failed(_)) => 1,
        Some(JobError::Timeout) => 2,
        Some(JobError::NotFound(_)) => 3,
        Some(JobError::Cancelled) => 130,
        _ => 1,
    }
}
