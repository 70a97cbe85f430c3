#![doc = include_str!("../README.md")]

mod proxy;

use clap::Parser;
use hose_core::{ChurnSettings, Coordinator, KubeCluster, MemoryCluster, WorkerReport};
use proxy::config::{CliArgs, ProxyConfig};
use proxy::telemetry::{init_telemetry, record_worker_report, shutdown_telemetry};
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ProxyConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let shutdown = CancellationToken::new();
    let signals = tokio::spawn(shutdown_signal(shutdown.clone()));

    let result = if config.dry_run {
        run_in_memory(config.churn.clone(), shutdown).await
    } else {
        run_against_cluster(&config, shutdown).await
    };
    signals.abort();

    match &result {
        Ok(reports) => log_summary(reports),
        Err(e) => tracing::error!("Churn aborted: {e:#}"),
    }

    shutdown_telemetry(providers);
    result.map(|_| ())
}

async fn run_against_cluster(
    config: &ProxyConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<Vec<WorkerReport>> {
    let kube_config = config.kube_config().await?;
    tracing::info!(
        "Using API server {} (namespace {:?})",
        kube_config.cluster_url,
        config.namespace
    );

    let namespace = config.namespace.clone();
    let coordinator = Coordinator::new(config.churn.clone(), move || {
        KubeCluster::connect(kube_config.clone(), &namespace)
    });
    Ok(coordinator.run(shutdown).await?)
}

async fn run_in_memory(
    settings: ChurnSettings,
    shutdown: CancellationToken,
) -> anyhow::Result<Vec<WorkerReport>> {
    tracing::info!("Dry run: churning against an in-process store");
    let cluster = MemoryCluster::new();
    cluster.seed_endpoints(&settings.source, Vec::new());

    let coordinator = Coordinator::new(settings, move || Ok(cluster.clone()));
    Ok(coordinator.run(shutdown).await?)
}

fn log_startup_info(config: &ProxyConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting hose-proxy with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting hose-proxy: {} workers, window {}, steps {}",
            config.churn.parallel,
            config.churn.window,
            config.churn.budget
        );
    }
}

fn log_summary(reports: &[WorkerReport]) {
    for report in reports {
        record_worker_report(report);
        tracing::info!(
            worker_id = report.worker_id,
            steps = report.steps,
            creates_failed = report.creates_failed,
            deletes_failed = report.deletes_failed,
            cleaned_up = report.cleaned_up,
            "Worker finished: {}",
            report.exit
        );
    }

    let steps: u64 = reports.iter().map(|r| r.steps).sum();
    tracing::info!("All {} workers done after {steps} steps", reports.len());
}

enum Received {
    CtrlC,
    Terminate,
    CtrlCFailed(std::io::Error),
}

/// Cancels `token` on the first Ctrl+C or SIGTERM. Later signals are only
/// logged; workers are already draining.
async fn shutdown_signal(token: CancellationToken) {
    #[cfg(unix)]
    let mut terminate =
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(stream) => Some(stream),
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                None
            }
        };
    #[cfg(not(unix))]
    let mut terminate = None::<()>;

    let mut ctrl_c_installed = true;

    loop {
        let received = tokio::select! {
            res = wait_ctrl_c(ctrl_c_installed) => match res {
                Ok(()) => Received::CtrlC,
                Err(e) => Received::CtrlCFailed(e),
            },
            () = wait_terminate(&mut terminate) => Received::Terminate,
        };

        match received {
            Received::CtrlC => tracing::info!("Received Ctrl+C signal"),
            Received::Terminate => tracing::info!("Received SIGTERM signal"),
            Received::CtrlCFailed(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {e}");
                ctrl_c_installed = false;
                continue;
            }
        }

        on_shutdown_signal(&token);
    }
}

/// Cancels `token` on the first call and returns `true`. Later calls only
/// log.
fn on_shutdown_signal(token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        tracing::info!("Already shutting down, waiting for workers to clean up");
        return false;
    }
    tracing::info!("Shutdown signal received, draining workers...");
    token.cancel();
    true
}

async fn wait_ctrl_c(installed: bool) -> std::io::Result<()> {
    if installed {
        signal::ctrl_c().await
    } else {
        std::future::pending().await
    }
}

#[cfg(unix)]
async fn wait_terminate(stream: &mut Option<signal::unix::Signal>) {
    if let Some(stream) = stream {
        if stream.recv().await.is_some() {
            return;
        }
    }
    std::future::pending().await
}

#[cfg(not(unix))]
async fn wait_terminate(_stream: &mut Option<()>) {
    std::future::pending().await
}
