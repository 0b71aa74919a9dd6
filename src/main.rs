//! Answers one network map request against a mesh replayed from a snapshot file
//! and prints the published response to stdout.

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use mesh_networkmap::{
    bridge::{NetworkMapHandler, bus::MemoryBus},
    settings::Settings,
    topology::replay::{MeshSnapshot, ReplayMesh},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Zigbee network map for a replayed mesh", long_about = None)]
struct Args {
    /// Mesh snapshot: device list plus scripted neighbor and routing tables
    #[arg(short, long, env = "NETWORKMAP_SNAPSHOT")]
    snapshot: PathBuf,

    /// Settings file (JSON). Defaults apply when omitted
    #[arg(short, long, env = "NETWORKMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Request payload, either `{"type": ..., "routes": ...}` or a bare format name
    #[arg(short, long, default_value = r#"{"type": "raw", "routes": true}"#)]
    request: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let snapshot = MeshSnapshot::load(&args.snapshot)?;
    info!(
        snapshot = %args.snapshot.display(),
        devices = snapshot.devices.len(),
        "Loaded mesh snapshot"
    );

    let mesh = Arc::new(ReplayMesh::new(snapshot));
    let bus = Arc::new(MemoryBus::new());
    let handler = NetworkMapHandler::new(mesh.clone(), mesh, bus.clone(), &settings);

    let request_topic = handler.topics().request.clone();
    if let Err(e) = handler.on_message(&request_topic, &args.request).await {
        error!("Network map request failed: {e}");
        return Err(e.into());
    }

    for message in bus.take().await {
        info!(topic = %message.topic, "Published response");
        println!("{}", message.payload);
    }
    Ok(())
}
