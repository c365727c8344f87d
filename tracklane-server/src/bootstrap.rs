//! Wiring of providers, registry and service from configuration.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use tracing::{info, warn};
use tracklane_core::{
    Providers,
    plugin::{ProviderOrder, ProviderRegistry},
    ports::TrackingPort,
    service::TrackingService,
};
use tracklane_provider_maersk as maersk;
use tracklane_provider_mock as mock;
use tracklane_provider_shipsgo as shipsgo;
use tracklane_provider_trackingmore as trackingmore;

use crate::config::ServerConfig;
use crate::observer::LogObserver;
use crate::routes::{AppState, BatchLimits};

/// Shared HTTP client used by every network provider.
///
/// # Errors
///
/// Returns an error when the TLS backend cannot be initialised.
pub fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(concat!("tracklane/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Build every provider in registration order.
///
/// # Errors
///
/// Returns an error when the offline dataset cannot be loaded.
pub fn providers(config: &ServerConfig, client: &Client) -> Result<Vec<Arc<dyn TrackingPort>>> {
    let settings = &config.providers;

    let mock = mock::port(&mock::MockSettings {
        enabled: settings.mock.enabled,
        dataset_path: settings.mock.dataset.clone(),
    })
    .context("loading mock dataset")?;

    let maersk = maersk::port(
        client.clone(),
        maersk::MaerskSettings {
            consumer_key: settings.maersk.consumer_key.clone(),
            base_url: settings
                .maersk
                .base_url
                .clone()
                .unwrap_or_else(|| maersk::DEFAULT_BASE_URL.to_owned()),
            timeout: config.provider_timeout(settings.maersk.timeout_ms),
        },
    );

    let shipsgo = shipsgo::port(
        client.clone(),
        shipsgo::ShipsGoSettings {
            auth_code: settings.shipsgo.auth_code.clone(),
            base_url: settings
                .shipsgo
                .base_url
                .clone()
                .unwrap_or_else(|| shipsgo::DEFAULT_BASE_URL.to_owned()),
            timeout: config.provider_timeout(settings.shipsgo.timeout_ms),
        },
    );

    let trackingmore = trackingmore::port(
        client.clone(),
        trackingmore::TrackingMoreSettings {
            api_key: settings.trackingmore.api_key.clone(),
            base_url: settings
                .trackingmore
                .base_url
                .clone()
                .unwrap_or_else(|| trackingmore::DEFAULT_BASE_URL.to_owned()),
            timeout: config.provider_timeout(settings.trackingmore.timeout_ms),
        },
    );

    Ok(vec![mock, maersk, shipsgo, trackingmore])
}

/// Attempt order from configuration.
///
/// # Errors
///
/// Returns an error naming the first entry that is not a known provider.
pub fn provider_order(config: &ServerConfig) -> Result<ProviderOrder> {
    let known: Vec<String> = Providers::ALL.iter().map(ToString::to_string).collect();
    let order = ProviderOrder::parse(&config.tracking.order.join(","));

    if let Some(unknown) = order.iter().find(|id| !known.iter().any(|name| name == id.as_str())) {
        bail!(
            "unknown provider '{unknown}' in tracking.order (known: {})",
            known.join(", ")
        );
    }
    Ok(order)
}

/// Reject timeouts that would make every live lookup fail at once.
///
/// # Errors
///
/// Returns an error naming the first setting that is zero.
pub fn check_timeouts(config: &ServerConfig) -> Result<()> {
    if config.tracking.timeout_ms == 0 {
        bail!("tracking.timeout_ms must be greater than zero");
    }
    let providers = &config.providers;
    let overrides = [
        ("maersk", providers.maersk.timeout_ms),
        ("shipsgo", providers.shipsgo.timeout_ms),
        ("trackingmore", providers.trackingmore.timeout_ms),
    ];
    if let Some((name, _)) = overrides.iter().find(|(_, timeout)| *timeout == Some(0)) {
        bail!("providers.{name}.timeout_ms must be greater than zero");
    }
    Ok(())
}

/// Build the tracking service with the logging observer attached.
///
/// # Errors
///
/// Returns an error for an invalid provider order, a zero timeout or an
/// unreadable dataset.
pub fn service(config: &ServerConfig, client: &Client) -> Result<TrackingService> {
    check_timeouts(config)?;
    let order = provider_order(config)?;
    let registry = ProviderRegistry::new(providers(config, client)?);

    let report = registry.status();
    for status in report.providers.iter().filter(|status| !status.available) {
        warn!(
            provider = %status.name,
            missing = status.missing.join(", "),
            "provider not configured, it will be skipped"
        );
    }
    info!(
        available = report.available_providers,
        total = report.total_providers,
        order = config.tracking.order.join(","),
        "tracking providers ready"
    );

    Ok(TrackingService::new(Arc::new(registry))
        .with_order(order)
        .with_observer(Arc::new(LogObserver)))
}

/// Build the router state.
///
/// # Errors
///
/// See [`service`].
pub fn state(config: &ServerConfig, client: &Client) -> Result<AppState> {
    Ok(AppState {
        service: Arc::new(service(config, client)?),
        batch: BatchLimits {
            concurrency: config.tracking.batch_concurrency.max(1),
            max_size: config.tracking.max_batch_size,
        },
    })
}
