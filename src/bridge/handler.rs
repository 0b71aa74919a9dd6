use std::{fmt::Display, sync::Arc, time::SystemTime};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    bridge::{
        bus::{BusError, MessageBus, PublishOptions},
        request::{NetworkMapRequest, NetworkMapResponse},
    },
    network::network_graph::NetworkGraph,
    render::{RenderOptions, render},
    settings::{GraphvizColors, Settings},
    topology::{
        collector::TopologyCollector,
        source::{DeviceRegistry, MeshTransport},
    },
};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Request and response topics under the configured base topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub request: String,
    pub response: String,
}

impl Topics {
    pub fn new(base_topic: &str) -> Self {
        Self {
            request: format!("{base_topic}/bridge/request/networkmap"),
            response: format!("{base_topic}/bridge/response/networkmap"),
        }
    }
}

/// Where a request currently is in the pipeline. Every request ends back in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validating,
    Collecting,
    Building,
    Serializing,
    Responding,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Validating => "validating",
            Stage::Collecting => "collecting",
            Stage::Building => "building",
            Stage::Serializing => "serializing",
            Stage::Responding => "responding",
        };
        write!(f, "{name}")
    }
}

fn enter(stage: Stage) {
    debug!(%stage, "Network map request");
}

/// Answers network map requests: validate, collect, build, render, publish exactly once.
///
/// Holds no state between requests; the device list is read fresh every time.
pub struct NetworkMapHandler {
    registry: Arc<dyn DeviceRegistry>,
    collector: TopologyCollector,
    bus: Arc<dyn MessageBus>,
    topics: Topics,
    colors: GraphvizColors,
    clock: fn() -> SystemTime,
}

impl NetworkMapHandler {
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        transport: Arc<dyn MeshTransport>,
        bus: Arc<dyn MessageBus>,
        settings: &Settings,
    ) -> Self {
        Self {
            registry,
            collector: TopologyCollector::new(transport, settings.collector.clone()),
            bus,
            topics: Topics::new(&settings.base_topic),
            colors: settings.map_options.graphviz.colors.clone(),
            clock: SystemTime::now,
        }
    }

    /// Replaces the clock used for relative "last seen" labels.
    pub fn with_clock(mut self, clock: fn() -> SystemTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Entry point for the subscription. Returns whether the message was meant for us.
    pub async fn on_message(&self, topic: &str, payload: &str) -> Result<bool, HandlerError> {
        if topic != self.topics.request {
            return Ok(false);
        }
        self.handle_request(payload).await?;
        Ok(true)
    }

    pub async fn handle_request(&self, payload: &str) -> Result<(), HandlerError> {
        let request = NetworkMapRequest::parse(payload);
        let response = self.respond_to(&request).await;

        enter(Stage::Responding);
        let encoded = serde_json::to_string(&response)?;
        let published = self
            .bus
            .publish(&self.topics.response, encoded, PublishOptions::default())
            .await;
        enter(Stage::Idle);
        published?;
        Ok(())
    }

    async fn respond_to(&self, request: &NetworkMapRequest) -> NetworkMapResponse {
        enter(Stage::Validating);
        let format = match request.validate() {
            Ok(format) => format,
            Err(e) => {
                warn!(format = %request.format, "Rejecting network map request: {e}");
                return NetworkMapResponse::error(e.to_string(), request.transaction.clone());
            }
        };
        info!(%format, routes = request.include_routes, "Starting network scan");

        enter(Stage::Collecting);
        let devices = self.registry.list_devices().await;
        let scan = self.collector.collect(&devices, request.include_routes).await;

        enter(Stage::Building);
        let map = NetworkGraph::build(&devices, &scan).to_map();
        info!(nodes = map.nodes.len(), links = map.links.len(), "Network scan finished");

        enter(Stage::Serializing);
        let options = RenderOptions {
            now: (self.clock)(),
            colors: self.colors.clone(),
        };
        match render(&map, format, &options) {
            Ok(value) => NetworkMapResponse::ok(
                format,
                request.include_routes,
                value,
                request.transaction.clone(),
            ),
            Err(e) => {
                warn!(%format, "Failed to render network map: {e}");
                NetworkMapResponse::error(e.to_string(), request.transaction.clone())
            }
        }
    }
}
