use crate::cli::format::format_report;
use crate::cli::CliError;
use crate::config::{expand_tilde, Config, OutputFormat};
use crate::monitor::{HostReport, Monitor};
use std::path::Path;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Tail `path`, printing a report for `host` every report interval until Ctrl+C.
pub async fn run(
    path: &Path,
    host: &str,
    config: Config,
    format: OutputFormat,
) -> Result<(), CliError> {
    let path = expand_tilde(path);
    let monitor = Monitor::new(host, config.monitor);

    let (report_tx, mut report_rx) = mpsc::channel::<HostReport>(16);
    let cancel = CancellationToken::new();

    let printer = tokio::spawn(async move {
        while let Some(report) = report_rx.recv().await {
            match format_report(&report, format) {
                Ok(text) => println!("{}", text),
                Err(e) => error!(error = %e, "Failed to format report"),
            }
        }
    });

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    info!("Monitoring {}, press Ctrl+C to stop", path.display());
    let result = monitor.run(&path, report_tx, cancel).await;

    // The report sender is gone once the monitor returns, so the printer drains and exits
    printer.await?;
    result?;
    Ok(())
}
