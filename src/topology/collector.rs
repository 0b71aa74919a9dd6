use std::{collections::HashMap, future::Future, sync::Arc};

use futures::{StreamExt, stream};
use tracing::{debug, info, warn};

use crate::{
    network::{
        device::{Device, IeeeAddr},
        edge::RouteEntry,
        node::{FailedQueries, QueryKind},
    },
    settings::CollectorSettings,
    topology::source::{MeshTransport, NeighborEntry, TransportError, TransportResult},
};

/// What one routing-capable device told us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceScan {
    pub neighbors: Vec<NeighborEntry>,
    /// Empty when routes were not requested.
    pub routes: Vec<RouteEntry>,
    pub failed: FailedQueries,
}

/// Results of one sweep over the network, keyed by device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyScan {
    scans: HashMap<IeeeAddr, DeviceScan>,
}

impl TopologyScan {
    pub fn insert(&mut self, ieee_addr: IeeeAddr, scan: DeviceScan) {
        self.scans.insert(ieee_addr, scan);
    }

    pub fn get(&self, ieee_addr: &IeeeAddr) -> Option<&DeviceScan> {
        self.scans.get(ieee_addr)
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }
}

impl FromIterator<(IeeeAddr, DeviceScan)> for TopologyScan {
    fn from_iter<T: IntoIterator<Item = (IeeeAddr, DeviceScan)>>(iter: T) -> Self {
        Self {
            scans: iter.into_iter().collect(),
        }
    }
}

/// Walks every coordinator and router and asks for its neighbor and routing tables.
///
/// Each query is attempted at most twice. A device that stays silent only marks its own
/// `failed` set; it never holds back the other devices.
pub struct TopologyCollector {
    transport: Arc<dyn MeshTransport>,
    settings: CollectorSettings,
}

impl TopologyCollector {
    pub fn new(transport: Arc<dyn MeshTransport>, settings: CollectorSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub async fn collect(&self, devices: &[Device], include_routes: bool) -> TopologyScan {
        let targets: Vec<&Device> = devices
            .iter()
            .filter(|d| d.is_queryable() && !d.disabled)
            .collect();
        info!(
            devices = targets.len(),
            include_routes, "Collecting neighbor tables"
        );

        let scan: TopologyScan = stream::iter(targets)
            .map(|device| async move {
                (
                    device.ieee_addr,
                    self.scan_device(device, include_routes).await,
                )
            })
            .buffer_unordered(self.settings.max_concurrent_queries.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect();

        debug!(scanned = scan.len(), "Collection finished");
        scan
    }

    async fn scan_device(&self, device: &Device, include_routes: bool) -> DeviceScan {
        let mut result = DeviceScan::default();

        match self
            .query_with_retry(device, QueryKind::NeighborTable, || {
                self.transport.query_neighbor_table(device)
            })
            .await
        {
            Some(neighbors) => result.neighbors = neighbors,
            None => result.failed.insert(QueryKind::NeighborTable),
        }

        if include_routes {
            match self
                .query_with_retry(device, QueryKind::RoutingTable, || {
                    self.transport.query_routing_table(device)
                })
                .await
            {
                Some(routes) => result.routes = routes,
                None => result.failed.insert(QueryKind::RoutingTable),
            }
        }

        result
    }

    /// Runs `query` once, and once more after `retry_delay` if the first attempt failed.
    async fn query_with_retry<T, F, Fut>(
        &self,
        device: &Device,
        kind: QueryKind,
        mut query: F,
    ) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        match self.attempt(query()).await {
            Ok(value) => return Some(value),
            Err(e) => {
                debug!(
                    device = %device.ieee_addr,
                    name = %device.friendly_name,
                    %kind,
                    error = %e,
                    "Query failed, retrying"
                );
            }
        }

        if !self.settings.retry_delay.is_zero() {
            tokio::time::sleep(self.settings.retry_delay).await;
        }

        match self.attempt(query()).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    device = %device.ieee_addr,
                    name = %device.friendly_name,
                    %kind,
                    error = %e,
                    "Query failed after retry"
                );
                None
            }
        }
    }

    async fn attempt<T>(
        &self,
        query: impl Future<Output = TransportResult<T>>,
    ) -> TransportResult<T> {
        match self.settings.query_timeout {
            Some(limit) => tokio::time::timeout(limit, query)
                .await
                .unwrap_or(Err(TransportError::Timeout)),
            None => query.await,
        }
    }
}
