use clap::{Parser, Subcommand};
use radar_scraper::pipeline::orchestration::{FetchStep, FilterStep};
use radar_scraper::pipeline::services::{ChangeDetector, GitCommittedStore, ImageFetcher, PaletteFilter};
use radar_scraper::{workflow, AppError, Artifact, RadarImage, RadarPipeline, RunOutcome, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "radar", version, about = "Fetch, filter and track the BOM weather radar image")]
struct Cli {
    /// Settings file layered over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download the radar image to its fixed path
    Fetch,
    /// Derive the filtered image from the downloaded radar image
    Filter,
    /// Compare both images with the last commit
    Detect,
    /// Fetch, filter and compare in one go
    Run {
        /// Commit changed images to the repository
        #[arg(long)]
        commit: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the palette and detected radar key of an image
    Palette {
        /// Image to inspect, defaults to the downloaded radar image
        path: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn execute(cli: Cli) -> Result<(), AppError> {
    let settings = Settings::load(cli.config.as_deref())?;
    let artifacts = &settings.artifacts;

    match cli.command {
        Command::Fetch => {
            let fetcher = ImageFetcher::new(&settings.fetch)?;
            FetchStep::new(fetcher, &artifacts.radar_image).fetch().await?;
        }
        Command::Filter => {
            let radar = RadarImage(Artifact::load(&artifacts.radar_image)?);
            let filter = PaletteFilter::new(&settings.filter);
            FilterStep::new(Box::new(filter), &artifacts.filtered_image).derive(&radar)?;
        }
        Command::Detect => {
            let radar = Artifact::load(&artifacts.radar_image)?;
            let filtered = Artifact::load(&artifacts.filtered_image)?;
            let store = GitCommittedStore::new(&settings.repository.path);
            let decision = ChangeDetector::new(Box::new(store)).detect(&[&radar, &filtered])?;

            println!("{}", if decision.changed { "changed" } else { "unchanged" });
            workflow::set_step_output("changed", &decision.changed.to_string())?;
        }
        Command::Run { commit, json } => {
            let mut pipeline = RadarPipeline::from_settings(&settings, commit)?;
            let report = pipeline.run().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                match &report.outcome {
                    RunOutcome::Unchanged => println!("unchanged"),
                    RunOutcome::Changed => println!("changed"),
                    RunOutcome::Published { commit_id } => println!("published {commit_id}"),
                }
            }
            let changed = report.outcome != RunOutcome::Unchanged;
            workflow::set_step_output("changed", &changed.to_string())?;
        }
        Command::Palette { path } => {
            let path = path.unwrap_or_else(|| artifacts.radar_image.clone());
            let image = Artifact::load(path)?;
            let report = PaletteFilter::new(&settings.filter).inspect(image.bytes())?;
            print!("{report}");
        }
    }

    Ok(())
}
