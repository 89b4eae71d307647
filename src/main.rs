use anyhow::Context;
use clap::Parser;
use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use std::path::PathBuf;
use std::sync::Arc;
use vixel::api::{ApiState, VixelApp};
use vixel::catalog::MemoryCatalog;
use vixel::config::Config;
use vixel::service::ImageService;
use vixel::storage::build_object_store;

/// Vixel - image upload and transformation service
#[derive(Parser, Debug)]
#[command(name = "vixel")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    config.validate().context("Invalid configuration")?;

    vixel::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    tracing::info!(
        config_file = %args.config.display(),
        server_address = %config.server.address,
        server_port = config.server.port,
        storage_endpoint = %config.storage.endpoint,
        bucket = %config.storage.bucket,
        "Configuration loaded successfully"
    );

    if args.test {
        println!("configuration {} is valid", args.config.display());
        return Ok(());
    }

    // The S3 client is built on a short-lived runtime; Pingora runs its own
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let store = runtime
        .block_on(build_object_store(&config.storage))
        .context("Failed to create object store client")?;
    drop(runtime);

    let images = ImageService::new(
        Arc::new(MemoryCatalog::new()),
        store,
        config.limits.clone(),
    );
    let state = Arc::new(ApiState::new(Arc::new(images), &config));

    let opt = Opt {
        test: false,
        ..Default::default()
    };
    let mut server = Server::new(Some(opt)).context("Failed to create Pingora server")?;
    server.bootstrap();

    let listen_addr = config.server.listen_addr();
    let service = VixelApp::service(state, &listen_addr);

    tracing::info!(address = %listen_addr, "Starting Vixel image service");

    server.add_service(service);
    server.run_forever();
}
