use anyhow::Context;
use clap::{Parser, Subcommand};
use fusion_client::SearchGateway;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fusion-cli")]
#[command(about = "Query the Yelp Fusion API from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search businesses near a point
    Search {
        #[arg(long, default_value = "")]
        term: String,
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Top-rated businesses in a city, optionally with details and reviews
    City {
        #[arg(long, default_value = "")]
        term: String,
        #[arg(long, env = "FUSION_DEFAULT_CITY", default_value = "Wichita")]
        city: String,
        #[arg(long, env = "FUSION_DEFAULT_STATE", default_value = "Kansas")]
        state: String,
        #[arg(long, default_value = "20")]
        limit: u32,
        #[arg(long)]
        details: bool,
    },
    /// Businesses that deliver to a point
    Delivery {
        #[arg(long, default_value = "")]
        term: String,
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Suggestions for partially typed text
    Autocomplete {
        text: String,
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
        #[arg(long)]
        locale: Option<String>,
    },
    /// Full details for one business
    Business { id: String },
    /// Reviews for one business
    Reviews {
        id: String,
        #[arg(long)]
        locale: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = fusion_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let gateway = SearchGateway::from_config(&config).context("building Fusion client")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling request");
            on_interrupt.cancel();
        }
    });

    run(&gateway, cli.command, &cancel).await
}

async fn run(
    gateway: &SearchGateway,
    command: Commands,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match command {
        Commands::Search {
            term,
            latitude,
            longitude,
        } => print_json(
            &gateway
                .search_by_text(&term, latitude, longitude, cancel)
                .await?,
        ),
        Commands::City {
            term,
            city,
            state,
            limit,
            details,
        } => print_json(
            &gateway
                .search_by_city_state(&term, &city, &state, limit, details, cancel)
                .await?,
        ),
        Commands::Delivery {
            term,
            latitude,
            longitude,
        } => print_json(
            &gateway
                .search_with_delivery(&term, latitude, longitude, cancel)
                .await?,
        ),
        Commands::Autocomplete {
            text,
            latitude,
            longitude,
            locale,
        } => print_json(
            &gateway
                .autocomplete(&text, latitude, longitude, locale.as_deref(), cancel)
                .await?,
        ),
        Commands::Business { id } => print_json(&gateway.get_business(&id, cancel).await?),
        Commands::Reviews { id, locale } => print_json(
            &gateway
                .get_reviews(&id, locale.as_deref(), cancel)
                .await?,
        ),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serializing response")?;
    println!("{rendered}");
    Ok(())
}
