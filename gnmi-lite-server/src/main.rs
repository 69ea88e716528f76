//! gnmi-lite mock server
//!
//! Reads JSON-lines requests on stdin and writes responses on stdout.
//! Logs go to stderr.
//!
//! Configuration path: `--config`, then `GNMI_LITE_CONFIG`, then
//! `config/gnmi-lite.yaml`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use gnmi_lite_server::config::{ServerConfig, CONFIG_ENV, DEFAULT_CONFIG_PATH};
use gnmi_lite_server::{bootstrap, console};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "gnmi-lite-server")]
#[command(about = "Mock gNMI configuration server over a JSON-lines console")]
struct Args {
    /// Server configuration file
    #[arg(short = 'c', long, env = CONFIG_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Model file, overriding the configuration
    #[arg(short = 'm', long)]
    model: Option<PathBuf>,

    /// Initial configuration file, overriding the configuration
    #[arg(short = 'i', long)]
    initial_config: Option<PathBuf>,

    /// Responses buffered per subscription
    #[arg(long)]
    subscription_buffer: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_file(&args.config)?;
    if let Some(model) = args.model {
        config = config.model_path(model);
    }
    if let Some(initial) = args.initial_config {
        config = config.initial_config(initial);
    }
    if let Some(size) = args.subscription_buffer {
        config = config.subscription_buffer(size);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter.clone().into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(config = %args.config.display(), "starting gnmi-lite server");
    info!(
        model = %config.model_path.display(),
        initial = ?config.initial_config,
        "loading"
    );

    let server = Arc::new(bootstrap::build_server(&config)?);
    console::run(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
