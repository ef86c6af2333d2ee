use anyhow::Result;
use std::sync::Arc;
use syspulse::aggregator::Aggregator;
use syspulse::reader::ContainerRuntime;
use syspulse::scheduler::{JsonLinesSink, Scheduler};
use syspulse::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stderr keeps stdout clean for `watch` output
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app_config = config::AppConfig::load()?;

    let host = Arc::new(sysinfo_repo::SysinfoRepo::new());
    let runtime: Option<Arc<dyn ContainerRuntime>> = match docker_repo::DockerRepo::connect() {
        Ok(repo) => Some(Arc::new(repo)),
        Err(e) => {
            tracing::warn!(error = %e, "container runtime client unavailable; container domain disabled");
            None
        }
    };
    let aggregator = Aggregator::new(host, runtime, app_config.collect_settings());

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("watch") => {
            let interval = args.next().map(|s| s.parse::<f64>()).transpose()?;
            let top = args.next().map(|s| s.parse::<usize>()).transpose()?;
            watch(aggregator, &app_config, interval, top).await
        }
        Some(other) => anyhow::bail!("unknown command: {} (expected `watch` or nothing)", other),
        None => serve(aggregator, app_config).await,
    }
}

/// Print one JSON snapshot per line until Ctrl-C.
async fn watch(
    aggregator: Aggregator,
    app_config: &config::AppConfig,
    interval_secs: Option<f64>,
    top: Option<usize>,
) -> Result<()> {
    let request = app_config.stream_request(interval_secs, top);
    let mut scheduler = Scheduler::new(aggregator, request, &app_config.stream_limits())?;
    let mut sink = JsonLinesSink::new(tokio::io::stdout());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(());
    });

    let delivered = scheduler.run(&mut sink, stop_rx).await?;
    tracing::info!(delivered, "watch stopped");
    Ok(())
}

async fn serve(aggregator: Aggregator, app_config: config::AppConfig) -> Result<()> {
    let app = routes::app(aggregator, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let in_container = std::path::Path::new("/.dockerenv").exists()
        || std::env::var("CONTAINER").as_deref() == Ok("1");

    if in_container {
        // In Docker: run server until error or SIGTERM (no signal handler; avoids immediate exit)
        axum::serve(listener, app).await?;
    } else {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_signal().await;
                tracing::info!("Received shutdown signal");
            })
            .await?;
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
