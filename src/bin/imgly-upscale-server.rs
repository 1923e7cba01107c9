//! IMG.LY Upscale HTTP server
//!
//! Loads the Real-ESRGAN and GFPGAN models once, then serves `GET /` and
//! `POST /upscale` until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use imgly_upscale::{
    backends, server, tracing_config::spans, BackendType, ExecutionProvider, ModelRegistry,
    ServiceConfig, ServiceConfigBuilder, TracingConfig, TracingFormat, UpscaleProcessor,
};
use std::{path::PathBuf, sync::Arc};
use tracing::info;

/// Real-ESRGAN / GFPGAN upscaling service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgly-upscale-server")]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long, env = "UPSCALE_HOST")]
    host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "UPSCALE_PORT")]
    port: Option<u16>,

    /// Directory holding the `realesrgan/` and `gfpgan/` weight folders
    #[arg(short, long, env = "UPSCALE_MODEL_DIR", value_name = "PATH")]
    model_dir: Option<PathBuf>,

    /// Inference backend (onnx, tract)
    #[arg(short, long)]
    backend: Option<BackendType>,

    /// Execution provider for the ONNX backend (auto, cpu, cuda, coreml)
    #[arg(short, long)]
    execution_provider: Option<ExecutionProvider>,

    /// CUDA device id
    #[arg(long)]
    device_id: Option<i32>,

    /// Real-ESRGAN tile size in pixels (0 = whole image)
    #[arg(long)]
    tile: Option<u32>,

    /// Number of inference threads (0 = auto-detect)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format (console, compact, json)
    #[arg(long, default_value = "console")]
    log_format: TracingFormat,

    /// Show execution provider diagnostics and exit
    #[arg(long)]
    show_providers: bool,
}

impl Cli {
    fn service_config(&self) -> Result<ServiceConfig> {
        let base = match &self.config {
            Some(path) => ServiceConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ServiceConfig::default(),
        };

        let mut builder = ServiceConfigBuilder::from_config(base);
        if let Some(host) = &self.host {
            builder = builder.host(host.clone());
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(dir) = &self.model_dir {
            builder = builder.model_dir(dir.clone());
        }
        if let Some(backend) = self.backend {
            builder = builder.backend(backend);
        }
        if let Some(provider) = self.execution_provider {
            builder = builder.execution_provider(provider);
        }
        if let Some(device_id) = self.device_id {
            builder = builder.device_id(device_id);
        }
        if let Some(tile) = self.tile {
            builder = builder.tile(tile);
        }
        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }

        builder.build().context("Invalid configuration")
    }
}

fn show_provider_diagnostics() {
    println!("🔍 Backend and Execution Provider Diagnostics");

    let cpu_count = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    println!("💻 System: {cpu_count} CPU cores detected");

    for backend in [BackendType::Onnx, BackendType::Tract] {
        let providers = backends::list_providers(backend);
        if providers.is_empty() {
            println!("\n🔧 {backend}: not compiled in");
            continue;
        }
        println!("\n🔧 {backend}:");
        for (name, available, description) in providers {
            let status = if available { "✅ Available" } else { "❌ Not Available" };
            println!("  • {name}: {status} - {description}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut tracing_config = TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format);
    if let Ok(filter) = std::env::var("RUST_LOG") {
        tracing_config = tracing_config.with_env_filter(filter);
    }
    let _guard = tracing_config.init().context("Failed to initialize tracing")?;

    if cli.show_providers {
        show_provider_diagnostics();
        return Ok(());
    }

    let config = cli.service_config()?;
    info!(
        bind = %config.server.bind_address(),
        backend = %config.engine.backend,
        provider = %config.engine.execution_provider,
        model_dir = %config.engine.model_dir.display(),
        "Starting upscale server"
    );

    let state = {
        let backend = config.engine.backend.to_string();
        let provider = config.engine.execution_provider.to_string();
        let _span = spans::model_loading(&backend, &provider).entered();
        Arc::new(ModelRegistry::load(&config.engine))
    };

    let processor = UpscaleProcessor::new(state, config.output.clone());
    server::serve(&config.server, server::AppState::new(processor)).await
}
