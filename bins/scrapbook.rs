use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use service::geocode::{HereGeocoder, LocationPicker};
use service::storage::JsonFileKv;
use service::{StoreOptions, TripStore};
use tracing::{error, info};
use uuid::Uuid;

fn init_logging() {
    // load .env first so RUST_LOG and GEOCODING_API_KEY apply
    dotenv().ok();
    common::utils::logging::init_logging_default();
    info!(service = "scrapbook", event = "logger_init", "tracing subscriber initialized");
}

/// Geocoder from the `[geocoding]` section; `None` when no API key is configured.
fn build_geocoder(cfg: &configs::GeocodingConfig) -> anyhow::Result<Option<HereGeocoder>> {
    let Some(api_key) = cfg.api_key.clone() else {
        return Ok(None);
    };
    let geocoder = HereGeocoder::new(cfg.endpoint.clone(), Some(api_key), Duration::from_secs(cfg.timeout_secs))?;
    Ok(Some(geocoder))
}

async fn run(cfg: configs::AppConfig) -> anyhow::Result<()> {
    common::env::ensure_env(&configs::config_path(), &cfg.storage.data_dir).await?;

    let kv = JsonFileKv::open(cfg.store_path()).await?;
    let options = StoreOptions {
        debounce: Duration::from_millis(cfg.persistence.debounce_ms),
        legacy_trip_name: cfg.storage.legacy_trip_name.clone(),
    };
    let store = TripStore::load(Arc::clone(&kv), options).await;

    let report = store.last_load();
    if report.malformed {
        error!(service = "scrapbook", event = "malformed_store", path = %kv.file_path().display(), "stored trips could not be parsed; starting empty");
    }
    let geocoder = build_geocoder(&cfg.geocoding)?;
    if geocoder.is_none() {
        info!(service = "scrapbook", "GEOCODING_API_KEY not set; location search disabled");
    }

    let trips = store.trips().await;
    if trips.is_empty() {
        println!("No trips yet. Create one to start your scrapbook.");
    }
    let selected = store.selected().await;
    for (name, trip) in &trips {
        let marker = if selected.as_deref() == Some(name.as_str()) { "*" } else { " " };
        let anchor = trip
            .coordinates
            .map(|c| format!("{:.4}, {:.4}", c.latitude, c.longitude))
            .unwrap_or_else(|| "no location".into());
        println!("{marker} {name}: {} image(s), {anchor}", trip.images.len());
    }
    if let Some((name, trip)) = store.selected_trip().await {
        println!("{}", serde_json::to_string_pretty(&trip.map_pins())?);
        info!(service = "scrapbook", trip = %name, pins = trip.map_pins().len(), "selected trip ready");

        // suggest an anchor for a trip that has none; confirming stays with the user
        if let (None, Some(geocoder)) = (trip.coordinates, geocoder.as_ref()) {
            let mut picker = LocationPicker::for_trip(&trip);
            match picker.search(geocoder, &name).await {
                Ok(region) => println!("Suggested location for {name}: {:.4}, {:.4}", region.latitude, region.longitude),
                Err(e) => {
                    info!(service = "scrapbook", trip = %name, error = %e, "no location suggestion");
                    println!("{}", picker.error().unwrap_or_default());
                }
            }
        }
    }

    store.flush().await?;
    Ok(())
}

fn main() -> std::process::ExitCode {
    init_logging();

    let session_id = Uuid::new_v4();
    let version = env!("CARGO_PKG_VERSION");

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "scrapbook", event = "config_invalid", error = %e, "invalid configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "scrapbook", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(service = "scrapbook", event = "start", %session_id, version, data_dir = %cfg.storage.data_dir, "scrapbook starting");

    match rt.block_on(run(cfg)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(service = "scrapbook", event = "run_failed", %session_id, error = %e, "scrapbook exited with error");
            std::process::ExitCode::FAILURE
        }
    }
}
