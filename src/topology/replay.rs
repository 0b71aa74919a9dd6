/*!
Replayed mesh: a device registry and transport backed by a recorded snapshot.

A snapshot lists the devices in registry order and, per device, what its neighbor
and routing table queries answer. Each scripted table can be told to fail a number
of times before answering, or to fail forever. Devices without a script never
answer, which the collector sees as a timeout.
*/

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
    network::{
        device::{Device, IeeeAddr},
        edge::RouteEntry,
        node::QueryKind,
    },
    topology::source::{
        DeviceRegistry, MeshTransport, NeighborEntry, TransportError, TransportResult,
    },
};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Scripted answer for one table query of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedTable<T> {
    #[serde(default = "Vec::new")]
    pub entries: Vec<T>,
    /// Number of attempts rejected before the entries are returned.
    #[serde(default)]
    pub fail_first: u32,
    #[serde(default)]
    pub always_fail: bool,
}

impl<T> ScriptedTable<T> {
    pub fn answering(entries: Vec<T>) -> Self {
        Self {
            entries,
            fail_first: 0,
            always_fail: false,
        }
    }

    pub fn always_failing() -> Self {
        Self {
            entries: Vec::new(),
            fail_first: 0,
            always_fail: true,
        }
    }

    pub fn failing_first(mut self, attempts: u32) -> Self {
        self.fail_first = attempts;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSnapshot {
    pub devices: Vec<Device>,
    pub neighbors: HashMap<IeeeAddr, ScriptedTable<NeighborEntry>>,
    pub routes: HashMap<IeeeAddr, ScriptedTable<RouteEntry>>,
}

impl MeshSnapshot {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Serves a `MeshSnapshot` through `DeviceRegistry` and `MeshTransport`, counting queries.
pub struct ReplayMesh {
    snapshot: MeshSnapshot,
    attempts: Mutex<HashMap<(IeeeAddr, QueryKind), u32>>,
}

impl ReplayMesh {
    pub fn new(snapshot: MeshSnapshot) -> Self {
        Self {
            snapshot,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn devices(&self) -> Vec<Device> {
        self.snapshot.devices.clone()
    }

    /// How many times `kind` was requested from `ieee_addr` so far.
    pub async fn query_count(&self, ieee_addr: IeeeAddr, kind: QueryKind) -> u32 {
        self.attempts
            .lock()
            .await
            .get(&(ieee_addr, kind))
            .copied()
            .unwrap_or(0)
    }

    pub async fn total_queries(&self) -> u32 {
        self.attempts.lock().await.values().sum()
    }

    async fn answer<T: Clone>(
        &self,
        device: &Device,
        kind: QueryKind,
        table: Option<&ScriptedTable<T>>,
    ) -> TransportResult<Vec<T>> {
        let attempt = {
            let mut attempts = self.attempts.lock().await;
            let count = attempts.entry((device.ieee_addr, kind)).or_insert(0);
            *count += 1;
            *count
        };

        let Some(table) = table else {
            return Err(TransportError::Timeout);
        };
        if table.always_fail || attempt <= table.fail_first {
            return Err(TransportError::Rejected(format!(
                "{kind} attempt {attempt} for {}",
                device.ieee_addr
            )));
        }
        Ok(table.entries.clone())
    }
}

#[async_trait]
impl DeviceRegistry for ReplayMesh {
    async fn list_devices(&self) -> Vec<Device> {
        self.devices()
    }
}

#[async_trait]
impl MeshTransport for ReplayMesh {
    async fn query_neighbor_table(&self, device: &Device) -> TransportResult<Vec<NeighborEntry>> {
        let table = self.snapshot.neighbors.get(&device.ieee_addr);
        self.answer(device, QueryKind::NeighborTable, table).await
    }

    async fn query_routing_table(&self, device: &Device) -> TransportResult<Vec<RouteEntry>> {
        let table = self.snapshot.routes.get(&device.ieee_addr);
        self.answer(device, QueryKind::RoutingTable, table).await
    }
}
