use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use traceviz_daemon::DaemonConfig;

#[derive(Debug, Parser)]
#[command(name = "tracevizd")]
#[command(about = "Collects agent hook events and streams them to live dashboards")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:7823")]
    listen: SocketAddr,
    /// Session log directory [default: ~/.trace-viz/sessions]
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Built dashboard to serve on non-API paths
    #[arg(long)]
    web_dist: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = DaemonConfig::new(cli.log_dir.unwrap_or_else(DaemonConfig::default_log_dir))
        .listen(cli.listen)
        .web_dist(cli.web_dist);

    traceviz_daemon::run(config, shutdown_signal()).await
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    {
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(error) => error!(%error, "failed to install SIGTERM handler"),
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}
