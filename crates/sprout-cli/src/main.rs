use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use sprout_core::panel::WateringStatus;
use sprout_core::{load_config, Pipeline, SproutConfig};
use sprout_provider::{OpenAiVisionModel, OpenWeatherForecast, PlantNetIdentifier};
use sprout_scheduler::CycleLoop;
use sprout_store::{PlantStore, StorePaths};

const DEFAULT_MODEL_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Parser)]
#[command(name = "sprout", version, about = "sprout plant-care daemon")]
struct Cli {
    #[arg(long, default_value = "sprout.yaml", help = "Path to the config file")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the decision loop")]
    Start,
    #[command(about = "Validate the config file")]
    Check,
    #[command(about = "Print the panel summary")]
    Panel,
    #[command(about = "Erase logs, plant identity, pot info and photos")]
    Reset {
        #[arg(long, help = "Confirm the wipe")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sprout_core=info,sprout_scheduler=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            let config = load_config(&cli.config)?;
            println!(
                "Config valid. data_dir={}, model={}, interval={}s, timeout={}s.",
                config.data_dir.display(),
                config.model.model_id,
                config.schedule.cycle_interval_secs,
                config.schedule.cycle_timeout_secs
            );
        }
        Commands::Start => {
            let config = load_config(&cli.config)?;
            let driver = build_loop(&config)?;
            driver.run().await;
        }
        Commands::Panel => {
            let config = load_config(&cli.config)?;
            let store = PlantStore::open(StorePaths::new(&config.data_dir))?;
            print_panel(&store).await;
        }
        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("reset erases all plant history; re-run with --yes to confirm");
            }
            let config = load_config(&cli.config)?;
            let store = PlantStore::open(StorePaths::new(&config.data_dir))?;
            store.reset_generation().await?;
            println!("Plant history erased. The next cycle starts a new generation.");
        }
    }

    Ok(())
}

fn build_loop(config: &SproutConfig) -> Result<CycleLoop> {
    let store = PlantStore::open(StorePaths::new(&config.data_dir))?;
    let api_base = config
        .model
        .api_base
        .as_deref()
        .unwrap_or(DEFAULT_MODEL_API_BASE);
    let pipeline = Pipeline {
        store,
        model: Arc::new(OpenAiVisionModel::new(&config.model.api_key, api_base)),
        species: Arc::new(PlantNetIdentifier::new(&config.species.api_key)),
        forecast: Arc::new(OpenWeatherForecast::new(&config.weather.api_key)),
        model_id: config.model.model_id.clone(),
    };
    Ok(CycleLoop::new(
        pipeline,
        Duration::from_secs(config.schedule.cycle_interval_secs),
        Duration::from_secs(config.schedule.cycle_timeout_secs),
    ))
}

async fn print_panel(store: &PlantStore) {
    let snapshot = sprout_core::snapshot(store).await;

    let watered = match snapshot.watering_today.status {
        WateringStatus::Watered => "yes",
        WateringStatus::NotWatered => "no",
    };
    println!("Watered today: {watered} ({:.0} ml)", snapshot.watering_today.total_ml);
    println!("Note: {}", snapshot.watering_today.note);

    match snapshot.health.health_level {
        Some(level) => println!("Health: {level} ({})", snapshot.health.color),
        None => println!("Health: no assessment yet"),
    }
    if !snapshot.health.reasons.is_empty() {
        println!("Reasons: {}", snapshot.health.reasons.join(", "));
    }

    println!(
        "Waterings in the last 15 days: {}",
        snapshot.recent_watering.len()
    );
    println!(
        "Sensor readings in the last 24h: {}",
        snapshot.recent_sensors.len()
    );
}
