/*!
Collaborator interfaces consumed by the network map.

This module defines:
- `NeighborEntry`: one row of a device's neighbor table, as reported by the device.
- `TransportError`: why a table query did not produce an answer.
- `MeshTransport`: an async trait that asks a single device for its tables.
- `DeviceRegistry`: a read-only view of every known device.

Adapters (radio stacks, replayed captures, test doubles) implement these traits
and hide how frames actually reach the devices.
*/

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::network::{
    device::{Device, IeeeAddr, NetworkAddress},
    edge::{Relationship, RouteEntry},
};

/// One neighbor as seen by the device that was queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborEntry {
    /// May be `IeeeAddr::PLACEHOLDER` when the device only knows the short address.
    pub ieee_addr: IeeeAddr,
    pub network_address: NetworkAddress,
    pub relationship: Relationship,
    pub depth: u8,
    #[serde(rename = "linkquality")]
    pub link_quality: u8,
}

/// Errors that can occur when querying a device for one of its tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The device or the coordinator rejected the request.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// No answer arrived in time.
    #[error("request timed out")]
    Timeout,
    /// The device does not implement the request.
    #[error("request not supported: {0}")]
    Unsupported(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Sends table requests to a single device and waits for the answer.
#[async_trait]
pub trait MeshTransport: Send + Sync {
    async fn query_neighbor_table(&self, device: &Device) -> TransportResult<Vec<NeighborEntry>>;
    async fn query_routing_table(&self, device: &Device) -> TransportResult<Vec<RouteEntry>>;
}

/// Read-only snapshot of the known devices, in a stable order.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn list_devices(&self) -> Vec<Device>;
}
