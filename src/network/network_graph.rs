use std::collections::HashMap;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use serde::Serialize;
use tracing::debug;

use crate::{
    network::{
        device::{Device, IeeeAddr, NetworkAddress},
        edge::{Link, LinkEndpoint, Relationship},
        node::Node,
    },
    topology::{collector::TopologyScan, source::NeighborEntry},
};

/// Ordered output of a build: nodes in registry order, links in construction order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkMap {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

/// The merged mesh: one directed graph assembled from every device's local view.
///
/// Links point from the reporting neighbor to the device whose table listed it.
/// `node_index_map` maps extended addresses to graph indices for safe lookups.
pub struct NetworkGraph {
    pub graph: DiGraph<Node, Link>,
    pub node_index_map: HashMap<IeeeAddr, NodeIndex>,
}

impl NetworkGraph {
    /// Builds the graph from the registry snapshot and the collected tables.
    ///
    /// Devices are walked in registry order, so a (neighbor, device) pair reported twice keeps
    /// the later reading in the position of the first.
    pub fn build(devices: &[Device], scan: &TopologyScan) -> Self {
        let mut graph = DiGraph::new();
        let mut node_index_map = HashMap::new();

        for device in devices.iter().filter(|d| !d.disabled) {
            let failed = scan.get(&device.ieee_addr).map(|s| s.failed.clone());
            let index = graph.add_node(Node::from_device(device, failed));
            node_index_map.insert(device.ieee_addr, index);
        }

        let mut this = Self {
            graph,
            node_index_map,
        };
        let resolver = IdentityResolver::new(devices);
        this.add_neighbor_links(devices, scan, &resolver);
        this.attach_routes(devices, scan);
        this
    }

    fn add_neighbor_links(
        &mut self,
        devices: &[Device],
        scan: &TopologyScan,
        resolver: &IdentityResolver,
    ) {
        for device in devices {
            let (Some(&target_index), Some(device_scan)) = (
                self.node_index_map.get(&device.ieee_addr),
                scan.get(&device.ieee_addr),
            ) else {
                continue;
            };

            for entry in &device_scan.neighbors {
                if entry.relationship == Relationship::FormerChild {
                    continue;
                }
                let Some(neighbor) = resolver.resolve(entry) else {
                    debug!(device = %device.ieee_addr, nwk = entry.network_address,
                        "Skipping neighbor with unresolvable identity");
                    continue;
                };
                // Unknown and disabled devices have no vertex
                let Some(&source_index) = self.node_index_map.get(&neighbor) else {
                    debug!(device = %device.ieee_addr, %neighbor, "Skipping neighbor without node");
                    continue;
                };
                let link = Link {
                    source: LinkEndpoint {
                        ieee_addr: neighbor,
                        network_address: entry.network_address,
                    },
                    target: LinkEndpoint {
                        ieee_addr: device.ieee_addr,
                        network_address: device.network_address,
                    },
                    relationship: entry.relationship,
                    depth: entry.depth,
                    link_quality: entry.link_quality,
                    routes: Vec::new(),
                };
                self.graph.update_edge(source_index, target_index, link);
            }
        }
    }

    fn attach_routes(&mut self, devices: &[Device], scan: &TopologyScan) {
        for device in devices {
            let (Some(&target_index), Some(device_scan)) = (
                self.node_index_map.get(&device.ieee_addr),
                scan.get(&device.ieee_addr),
            ) else {
                continue;
            };

            for route in &device_scan.routes {
                let edge = self
                    .graph
                    .edges_directed(target_index, Direction::Incoming)
                    .filter(|e| e.weight().source.network_address == route.next_hop)
                    .map(|e| e.id())
                    .min();
                match edge {
                    Some(edge) => self.graph[edge].routes.push(route.clone()),
                    None => debug!(device = %device.ieee_addr, next_hop = route.next_hop,
                        destination = route.destination_address, "Dropping route without link"),
                }
            }
        }
    }

    pub fn node(&self, ieee_addr: &IeeeAddr) -> Option<&Node> {
        self.node_index_map
            .get(ieee_addr)
            .map(|index| &self.graph[*index])
    }

    pub fn link(&self, source: &IeeeAddr, target: &IeeeAddr) -> Option<&Link> {
        let source = self.node_index_map.get(source)?;
        let target = self.node_index_map.get(target)?;
        let edge = self.graph.find_edge(*source, *target)?;
        Some(&self.graph[edge])
    }

    pub fn to_map(&self) -> NetworkMap {
        NetworkMap {
            nodes: self.graph.node_weights().cloned().collect(),
            links: self.graph.edge_weights().cloned().collect(),
        }
    }
}

/// Replaces placeholder neighbor addresses with the registry entry sharing the short address.
struct IdentityResolver {
    by_network_address: HashMap<NetworkAddress, IeeeAddr>,
}

impl IdentityResolver {
    fn new(devices: &[Device]) -> Self {
        let mut by_network_address = HashMap::with_capacity(devices.len());
        // Enabled devices first, so a stale disabled entry never shadows the live holder
        let (enabled, disabled): (Vec<&Device>, Vec<&Device>) =
            devices.iter().partition(|d| !d.disabled);
        for device in enabled.into_iter().chain(disabled) {
            by_network_address
                .entry(device.network_address)
                .or_insert(device.ieee_addr);
        }
        Self { by_network_address }
    }

    fn resolve(&self, entry: &NeighborEntry) -> Option<IeeeAddr> {
        if entry.ieee_addr.is_placeholder() {
            self.by_network_address.get(&entry.network_address).copied()
        } else {
            Some(entry.ieee_addr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        network::{
            edge::RouteEntry,
            node::{FailedQueries, QueryKind},
        },
        topology::{collector::DeviceScan, replay::MeshSnapshot},
    };

    const COORDINATOR: IeeeAddr = IeeeAddr::new(0x00124b00120144ae);
    const BULB: IeeeAddr = IeeeAddr::new(0x000b57fffec6a5b2);
    const BULB_COLOR: IeeeAddr = IeeeAddr::new(0x000b57fffec6a5b3);
    const BUTTON: IeeeAddr = IeeeAddr::new(0x0017880104e45521);
    const UNSUPPORTED_ROUTER: IeeeAddr = IeeeAddr::new(0x0017880104e45525);
    const CC2530_ROUTER: IeeeAddr = IeeeAddr::new(0x0017880104e45559);
    const EXTERNAL: IeeeAddr = IeeeAddr::new(0x0017880104e45511);

    fn snapshot() -> MeshSnapshot {
        MeshSnapshot::from_json(include_str!("../../test_data/mesh_snapshot.json")).unwrap()
    }

    /// What a collector would produce for the snapshot once retries are exhausted.
    fn scan_of(snapshot: &MeshSnapshot) -> TopologyScan {
        snapshot
            .devices
            .iter()
            .filter(|d| d.is_queryable() && !d.disabled)
            .map(|d| {
                let mut scan = DeviceScan::default();
                match snapshot.neighbors.get(&d.ieee_addr) {
                    Some(t) if !t.always_fail => scan.neighbors = t.entries.clone(),
                    _ => scan.failed.insert(QueryKind::NeighborTable),
                }
                match snapshot.routes.get(&d.ieee_addr) {
                    Some(t) if !t.always_fail => scan.routes = t.entries.clone(),
                    _ => scan.failed.insert(QueryKind::RoutingTable),
                }
                (d.ieee_addr, scan)
            })
            .collect()
    }

    fn link_pairs(map: &NetworkMap) -> Vec<(IeeeAddr, IeeeAddr)> {
        map.links
            .iter()
            .map(|l| (l.source.ieee_addr, l.target.ieee_addr))
            .collect()
    }

    #[test]
    fn test_build_full_mesh() {
        let snapshot = snapshot();
        let graph = NetworkGraph::build(&snapshot.devices, &scan_of(&snapshot));
        let map = graph.to_map();

        let nodes: Vec<_> = map.nodes.iter().map(|n| n.ieee_addr).collect();
        assert_eq!(
            nodes,
            vec![COORDINATOR, BULB, BULB_COLOR, BUTTON, UNSUPPORTED_ROUTER, CC2530_ROUTER, EXTERNAL]
        );
        assert_eq!(
            link_pairs(&map),
            vec![
                (BULB_COLOR, COORDINATOR),
                (BULB, COORDINATOR),
                (EXTERNAL, COORDINATOR),
                (BULB_COLOR, BULB),
                (CC2530_ROUTER, BULB),
                (BUTTON, CC2530_ROUTER),
            ]
        );

        let bulb_link = graph.link(&BULB, &COORDINATOR).unwrap();
        assert_eq!(bulb_link.link_quality, 92);
        assert_eq!(bulb_link.relationship, Relationship::Sibling);
        assert_eq!(
            bulb_link.routes,
            vec![RouteEntry {
                destination_address: 6540,
                next_hop: 40369,
                status: "ACTIVE".to_string(),
            }]
        );
        assert!(graph.link(&BULB_COLOR, &COORDINATOR).unwrap().routes.is_empty());
    }

    #[test]
    fn test_failed_sets() {
        let snapshot = snapshot();
        let graph = NetworkGraph::build(&snapshot.devices, &scan_of(&snapshot));

        let failed: FailedQueries = [QueryKind::NeighborTable, QueryKind::RoutingTable]
            .into_iter()
            .collect();
        assert_eq!(graph.node(&UNSUPPORTED_ROUTER).unwrap().failed, Some(failed));
        assert_eq!(graph.node(&COORDINATOR).unwrap().failed, Some(FailedQueries::default()));
        assert_eq!(graph.node(&BUTTON).unwrap().failed, None);

        let map = graph.to_map();
        assert!(map.links.iter().all(|l| l.target.ieee_addr != UNSUPPORTED_ROUTER));
        assert!(map.links.iter().all(|l| l.source.ieee_addr != UNSUPPORTED_ROUTER));
    }

    #[test]
    fn test_placeholder_identity_is_resolved() {
        let snapshot = snapshot();
        let graph = NetworkGraph::build(&snapshot.devices, &scan_of(&snapshot));

        let link = graph.link(&BUTTON, &CC2530_ROUTER).unwrap();
        assert_eq!(link.source.ieee_addr, BUTTON);
        assert_eq!(link.source.network_address, 6538);
        assert!(graph.to_map().links.iter().all(|l| !l.source.ieee_addr.is_placeholder()));
    }

    #[test]
    fn test_former_child_is_not_linked() {
        let snapshot = snapshot();
        let graph = NetworkGraph::build(&snapshot.devices, &scan_of(&snapshot));

        assert!(graph.link(&BULB_COLOR, &CC2530_ROUTER).is_none());
        assert!(
            graph
                .to_map()
                .links
                .iter()
                .all(|l| l.relationship != Relationship::FormerChild)
        );
    }

    #[test]
    fn test_disabled_device_is_excluded() {
        let mut snapshot = snapshot();
        snapshot.devices[1].disabled = true;
        let graph = NetworkGraph::build(&snapshot.devices, &scan_of(&snapshot));
        let map = graph.to_map();

        assert!(graph.node(&BULB).is_none());
        assert_eq!(map.nodes.len(), 6);
        assert_eq!(
            link_pairs(&map),
            vec![
                (BULB_COLOR, COORDINATOR),
                (EXTERNAL, COORDINATOR),
                (BUTTON, CC2530_ROUTER),
            ]
        );
        // The coordinator's only route pointed through the bulb
        assert!(map.links.iter().all(|l| l.routes.is_empty()));
    }

    #[test]
    fn test_disabled_reporter_contributes_no_links_even_if_scanned() {
        let snapshot = snapshot();
        let scan = scan_of(&snapshot);
        let mut devices = snapshot.devices.clone();
        devices[5].disabled = true;

        let map = NetworkGraph::build(&devices, &scan).to_map();
        assert!(map.links.iter().all(|l| l.target.ieee_addr != CC2530_ROUTER
            && l.source.ieee_addr != CC2530_ROUTER));
    }

    #[test]
    fn test_routes_match_link_source() {
        let snapshot = snapshot();
        let map = NetworkGraph::build(&snapshot.devices, &scan_of(&snapshot)).to_map();
        for link in &map.links {
            for route in &link.routes {
                assert_eq!(route.next_hop, link.source.network_address);
            }
        }
    }

    #[test]
    fn test_dangling_route_is_dropped() {
        let snapshot = snapshot();
        let mut scan = scan_of(&snapshot);
        let mut coordinator = scan.get(&COORDINATOR).unwrap().clone();
        coordinator.routes.push(RouteEntry {
            destination_address: 1,
            next_hop: 4242,
            status: "DISCOVERY_UNDERWAY".to_string(),
        });
        scan.insert(COORDINATOR, coordinator);

        let map = NetworkGraph::build(&snapshot.devices, &scan).to_map();
        let routes: usize = map.links.iter().map(|l| l.routes.len()).sum();
        assert_eq!(routes, 1);
    }

    #[test]
    fn test_later_report_wins_in_place() {
        let snapshot = snapshot();
        let mut scan = scan_of(&snapshot);
        let mut coordinator = scan.get(&COORDINATOR).unwrap().clone();
        coordinator.neighbors.push(NeighborEntry {
            ieee_addr: BULB_COLOR,
            network_address: 40399,
            relationship: Relationship::Child,
            depth: 1,
            link_quality: 7,
        });
        scan.insert(COORDINATOR, coordinator);

        let map = NetworkGraph::build(&snapshot.devices, &scan).to_map();
        assert_eq!(map.links.len(), 6);
        assert_eq!(map.links[0].source.ieee_addr, BULB_COLOR);
        assert_eq!(map.links[0].link_quality, 7);
        assert_eq!(map.links[0].relationship, Relationship::Child);
    }

    #[test]
    fn test_unknown_neighbor_is_skipped() {
        let snapshot = snapshot();
        let mut scan = scan_of(&snapshot);
        let mut bulb_color = DeviceScan::default();
        bulb_color.neighbors = vec![
            NeighborEntry {
                ieee_addr: IeeeAddr::new(0xdeadbeef),
                network_address: 77,
                relationship: Relationship::Child,
                depth: 2,
                link_quality: 50,
            },
            NeighborEntry {
                ieee_addr: IeeeAddr::PLACEHOLDER,
                network_address: 78,
                relationship: Relationship::Child,
                depth: 2,
                link_quality: 50,
            },
        ];
        scan.insert(BULB_COLOR, bulb_color);

        let map = NetworkGraph::build(&snapshot.devices, &scan).to_map();
        assert_eq!(map.links.len(), 6);
        assert!(map.links.iter().all(|l| l.target.ieee_addr != BULB_COLOR));
    }

    #[test]
    fn test_device_reporting_itself_is_linked() {
        let snapshot = snapshot();
        let mut scan = scan_of(&snapshot);
        let mut coordinator = DeviceScan::default();
        coordinator.neighbors = vec![NeighborEntry {
            ieee_addr: COORDINATOR,
            network_address: 0,
            relationship: Relationship::Sibling,
            depth: 0,
            link_quality: 255,
        }];
        scan.insert(COORDINATOR, coordinator);

        let graph = NetworkGraph::build(&snapshot.devices, &scan);
        let link = graph.link(&COORDINATOR, &COORDINATOR).unwrap();
        assert_eq!(link.link_quality, 255);
        assert_eq!(link.relationship, Relationship::Sibling);
    }

    #[test]
    fn test_disabled_device_does_not_shadow_short_address() {
        let mut snapshot = snapshot();
        let mut stale = snapshot.devices[1].clone();
        stale.ieee_addr = IeeeAddr::new(0x00aa00aa00aa00aa);
        stale.network_address = 7;
        stale.disabled = true;
        let mut live = snapshot.devices[2].clone();
        live.ieee_addr = IeeeAddr::new(0x00bb00bb00bb00bb);
        live.network_address = 7;
        snapshot.devices.push(stale);
        snapshot.devices.push(live.clone());

        let mut scan = scan_of(&snapshot);
        let mut coordinator = DeviceScan::default();
        coordinator.neighbors = vec![NeighborEntry {
            ieee_addr: IeeeAddr::PLACEHOLDER,
            network_address: 7,
            relationship: Relationship::Child,
            depth: 1,
            link_quality: 60,
        }];
        scan.insert(COORDINATOR, coordinator);

        let map = NetworkGraph::build(&snapshot.devices, &scan).to_map();
        assert!(link_pairs(&map).contains(&(live.ieee_addr, COORDINATOR)));
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let snapshot = snapshot();
        let scan = scan_of(&snapshot);
        let first = serde_json::to_string(&NetworkGraph::build(&snapshot.devices, &scan).to_map());
        let second = serde_json::to_string(&NetworkGraph::build(&snapshot.devices, &scan).to_map());
        assert_eq!(first.unwrap(), second.unwrap());
    }
}
