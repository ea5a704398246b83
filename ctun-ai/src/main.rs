//! ctun-ai - ContextTunes recommendation pipeline
//!
//! Runs one recommendation request from the command line: reads a captured
//! frame, publishes the given location fix, aggregates context and prints the
//! recommended tracks as JSON. Ctrl-C cancels the request.

use anyhow::{Context, Result};
use clap::Parser;
use ctun_ai::providers::{
    FrameBufferProvider, ImageFileProvider, LocationFeed, NearbyPlacesProvider,
    OpenWeatherProvider, StaticProvider, TaggedPlacesProvider,
};
use ctun_ai::types::{ImageFrame, SignalProvider};
use ctun_ai::{PipelineConfig, PipelineOrchestrator, ProviderSet};
use ctun_common::config::{default_config_path, load_toml_config, ApiKeys, TomlConfig};
use ctun_common::events::{CtunEvent, EventBus};
use ctun_common::models::{LocationFix, Place, WeatherReport};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(version, about = "ContextTunes context-aware music recommendations")]
struct Args {
    /// Path to TOML config (default: <config_dir>/contexttunes/ctun-ai.toml)
    #[arg(short, long, env = "CTUN_CONFIG")]
    config: Option<PathBuf>,

    /// Captured camera frame to include
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Latitude of the current location fix
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude of the current location fix
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Horizontal accuracy of the location fix in meters
    #[arg(long, default_value_t = 10.0)]
    accuracy: f32,

    /// Override the per-provider timeout from config
    #[arg(long)]
    signal_timeout_ms: Option<u64>,
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Wire the concrete providers from configuration
fn build_providers(
    args: &Args,
    config: &TomlConfig,
    keys: &ApiKeys,
    feed: &LocationFeed,
    http_client: &reqwest::Client,
) -> ProviderSet {
    let image: Arc<dyn SignalProvider<ImageFrame>> = match &args.image {
        Some(path) => Arc::new(ImageFileProvider::new(path)),
        None => Arc::new(FrameBufferProvider::empty()),
    };

    let nearby: Arc<dyn SignalProvider<Vec<Place>>> = match &keys.places {
        Some(key) => Arc::new(
            NearbyPlacesProvider::new(
                http_client.clone(),
                config.endpoints.places_url.clone(),
                key.clone(),
                feed.clone(),
            )
            .with_radius(config.pipeline.places_radius_m),
        ),
        None => Arc::new(StaticProvider::<Vec<Place>>::unavailable(
            "places",
            "places API key not configured",
        )),
    };
    let places: Arc<dyn SignalProvider<Vec<Place>>> = if config.tagged_locations.is_empty() {
        nearby
    } else {
        Arc::new(
            TaggedPlacesProvider::new(config.tagged_locations.clone(), feed.clone(), nearby)
                .with_geofence_radius(config.pipeline.geofence_radius_m),
        )
    };

    let weather: Arc<dyn SignalProvider<WeatherReport>> = match &keys.weather {
        Some(key) => Arc::new(OpenWeatherProvider::new(
            http_client.clone(),
            config.endpoints.weather_url.clone(),
            key.clone(),
            feed.clone(),
        )),
        None => Arc::new(StaticProvider::<WeatherReport>::unavailable(
            "weather",
            "weather API key not configured",
        )),
    };

    ProviderSet::new(image, Arc::new(feed.provider()), places, weather)
}

fn log_event(event: &CtunEvent) {
    match event {
        CtunEvent::RequestStateChanged {
            old_state,
            new_state,
            ..
        } => info!(from = %old_state, to = %new_state, "Request state changed"),
        CtunEvent::ProviderResolved {
            provider,
            outcome,
            elapsed_ms,
            ..
        } => info!(provider = %provider, outcome = %outcome, elapsed_ms, "Provider resolved"),
        CtunEvent::RecommendationsDelivered {
            completeness,
            recommendations,
            ..
        } => info!(
            completeness = ?completeness,
            count = recommendations.len(),
            "Recommendations delivered"
        ),
        CtunEvent::RequestFailed { kind, message, .. } => {
            warn!(kind = %kind, message = %message, "Request failed")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path().context("Could not determine config directory")?,
    };
    let mut config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    if let Some(timeout_ms) = args.signal_timeout_ms {
        config.pipeline.signal_timeout_ms = timeout_ms;
    }

    init_tracing(&config)?;

    info!("Starting ctun-ai");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", config_path.display());

    let keys = config.resolve_api_keys()?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .context("Failed to build HTTP client")?;

    let feed = LocationFeed::new();
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        feed.publish(LocationFix::new(lat, lon, args.accuracy));
    }

    let providers = build_providers(&args, &config, &keys, &feed, &http_client);
    let event_bus = EventBus::new(config.pipeline.event_capacity);
    let orchestrator =
        PipelineOrchestrator::new(providers, http_client, PipelineConfig::from_toml(&config), event_bus);

    let mut events = orchestrator.subscribe();
    let logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            log_event(&event);
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling request");
            ctrl_c.cancel();
        }
    });

    let result = orchestrator.run_request(None, &keys, &cancel).await;

    // Closing the bus ends the logger loop
    drop(orchestrator);
    let _ = logger.await;

    let recommendations = result?;
    println!("{}", serde_json::to_string_pretty(&recommendations)?);
    Ok(())
}
