//! WSI Viewer - deep-zoom tiles and tissue heatmaps for Whole Slide Images.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_viewer::{
    config::Config,
    server::{create_router, RouterConfig},
    slide::{LocalSlideSource, SlideRegistry, SlideSource},
    tile::JpegTileEncoder,
    HeatmapService, TileService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    run_serve(config).await
}

async fn run_serve(config: Config) -> ExitCode {
    info!("WSI Viewer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Slides directory: {}", config.slides_dir.display());
    info!(
        "  Pyramid: {}px tiles, {}px overlap",
        config.tile_size, config.overlap
    );
    info!(
        "  Heatmap: {}x{} grid from a {}px thumbnail",
        config.heatmap_rows, config.heatmap_cols, config.heatmap_thumbnail
    );
    if config.cache_slides == 0 {
        info!("  Cache: unbounded slides");
    } else {
        info!("  Cache: {} slides", config.cache_slides);
    }

    // Create slide source and check the directory is readable
    let source = LocalSlideSource::new(config.slides_dir.clone());
    match source.list() {
        Ok(slides) => info!("  Found {} slide(s)", slides.len()),
        Err(e) => {
            warn!("  Slides directory is not readable yet: {}", e);
        }
    }

    let registry = Arc::new(SlideRegistry::with_policy(
        source,
        config.pyramid_config(),
        config.slide_cache_policy(),
    ));

    let encoder = match JpegTileEncoder::new(config.jpeg_quality) {
        Ok(encoder) => encoder,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let tile_service =
        TileService::with_options(Arc::clone(&registry), encoder, config.region_max_edge);
    let heatmap_service = HeatmapService::with_params(registry, config.heatmap_params());

    let router = create_router(tile_service, heatmap_service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/api/slides", addr);
    info!("    curl http://{}/api/slide/<slide_id>/metadata", addr);
    info!("    curl http://{}/api/slide/<slide_id>/tile/0/0/0.jpg", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Resolve when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_viewer=debug,tower_http=debug"
    } else {
        "wsi_viewer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_cache_max_age(config.cache_max_age);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}
