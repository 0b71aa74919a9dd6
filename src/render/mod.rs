/*!
Network map renderers.

Each output format is a pure function over the same `NetworkMap`:
- `raw`: the nodes and links as structured JSON, for programmatic consumers and UIs.
- `graphviz`: a DOT digraph with record-shaped vertices.
- `plantuml`: a PlantUML card diagram with the same content.
*/

pub mod graphviz;
pub mod plantuml;

use std::{
    fmt::Display,
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    network::{
        device::{DeviceKind, network_address_hex},
        edge::RouteEntry,
        network_graph::NetworkMap,
        node::Node,
    },
    settings::GraphvizColors,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize map: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write diagram: {0}")]
    Format(#[from] std::fmt::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Type '{0}' not supported, allowed are: {allowed}", allowed = MapFormat::allowed())]
pub struct UnsupportedFormat(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapFormat {
    Raw,
    Graphviz,
    Plantuml,
}

impl MapFormat {
    pub const ALL: [MapFormat; 3] = [MapFormat::Raw, MapFormat::Graphviz, MapFormat::Plantuml];

    pub fn as_str(&self) -> &'static str {
        match self {
            MapFormat::Raw => "raw",
            MapFormat::Graphviz => "graphviz",
            MapFormat::Plantuml => "plantuml",
        }
    }

    /// `raw,graphviz,plantuml`
    pub fn allowed() -> String {
        Self::ALL
            .iter()
            .map(MapFormat::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for MapFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnsupportedFormat(s.to_string()))
    }
}

impl Display for MapFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inputs of the diagram renderers that do not come from the map itself.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Reference point for relative "last seen" labels.
    pub now: SystemTime,
    pub colors: GraphvizColors,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            now: SystemTime::now(),
            colors: GraphvizColors::default(),
        }
    }
}

pub fn render(
    map: &NetworkMap,
    format: MapFormat,
    options: &RenderOptions,
) -> Result<Value, RenderError> {
    let value = match format {
        MapFormat::Raw => serde_json::to_value(map)?,
        MapFormat::Graphviz => Value::String(graphviz::render(map, options)?),
        MapFormat::Plantuml => Value::String(plantuml::render(map, options)?),
    };
    Ok(value)
}

/// Label sections shared by the diagram formats: name, address line, model line, last seen.
pub(crate) fn node_sections(node: &Node, now: SystemTime) -> Vec<String> {
    let mut sections = vec![node.friendly_name.clone()];

    let mut address = format!(
        "{} ({})",
        node.ieee_addr,
        network_address_hex(node.network_address)
    );
    if let Some(failed) = node.failed.as_ref().filter(|f| !f.is_empty()) {
        address.push_str(&format!(" failed: {}", failed.joined()));
    }
    sections.push(address);

    if node.kind != DeviceKind::Coordinator {
        sections.extend(node.model_label());
    }
    sections.push(last_seen_label(node, now));
    sections
}

pub(crate) fn last_seen_label(node: &Node, now: SystemTime) -> String {
    if node.kind == DeviceKind::Coordinator {
        return "now".to_string();
    }
    let Some(last_seen) = node.last_seen else {
        return "unknown".to_string();
    };
    let seen = UNIX_EPOCH + Duration::from_millis(last_seen);
    match now.duration_since(seen) {
        Ok(elapsed) => format!(
            "{} ago",
            humantime::format_duration(Duration::from_secs(elapsed.as_secs()))
        ),
        // Clock skew between the hub and the registry
        Err(_) => "now".to_string(),
    }
}

/// `(routes: 0x198c via 0x9db1 ACTIVE, ...)`, or `None` for a route-less link.
pub(crate) fn routes_label(routes: &[RouteEntry]) -> Option<String> {
    if routes.is_empty() {
        return None;
    }
    let routes = routes
        .iter()
        .map(|r| {
            format!(
                "{} via {} {}",
                network_address_hex(r.destination_address),
                network_address_hex(r.next_hop),
                r.status
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("(routes: {routes})"))
}
