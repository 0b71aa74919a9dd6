use std::{collections::BTreeSet, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::network::device::{Definition, Device, DeviceKind, IeeeAddr, NetworkAddress};

/// A table query issued to a routing-capable device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueryKind {
    #[serde(rename = "neighbor-table")]
    NeighborTable,
    #[serde(rename = "routing-table")]
    RoutingTable,
}

impl Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::NeighborTable => write!(f, "neighbor-table"),
            QueryKind::RoutingTable => write!(f, "routing-table"),
        }
    }
}

/// Query kinds that still failed after their retry. Ordered, so output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailedQueries(BTreeSet<QueryKind>);

impl FailedQueries {
    pub fn insert(&mut self, kind: QueryKind) {
        self.0.insert(kind);
    }

    pub fn contains(&self, kind: QueryKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = QueryKind> + '_ {
        self.0.iter().copied()
    }

    /// `neighbor-table,routing-table`
    pub fn joined(&self) -> String {
        self.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(",")
    }
}

impl FromIterator<QueryKind> for FailedQueries {
    fn from_iter<T: IntoIterator<Item = QueryKind>>(iter: T) -> Self {
        FailedQueries(iter.into_iter().collect())
    }
}

/// A vertex of the network map. One per known, enabled device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub ieee_addr: IeeeAddr,
    pub friendly_name: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub network_address: NetworkAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_name: Option<String>,
    #[serde(default, rename = "modelID")]
    pub model_id: Option<String>,
    /// Absent for end devices, which are never queried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<FailedQueries>,
    #[serde(default)]
    pub last_seen: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Definition>,
}

impl Node {
    /// Builds the vertex for a device. `failed` is only kept for queryable devices.
    pub fn from_device(device: &Device, failed: Option<FailedQueries>) -> Self {
        let failed = if device.is_queryable() {
            Some(failed.unwrap_or_default())
        } else {
            None
        };
        Self {
            ieee_addr: device.ieee_addr,
            friendly_name: device.friendly_name.clone(),
            kind: device.kind,
            network_address: device.network_address,
            manufacturer_name: device.manufacturer_name.clone(),
            model_id: device.model_id.clone(),
            failed,
            last_seen: device.last_seen,
            definition: device.definition.clone(),
        }
    }

    /// Human readable model line, e.g. `IKEA TRADFRI bulb (LED1545G12)`.
    ///
    /// `None` when nothing is known about the model.
    pub fn model_label(&self) -> Option<String> {
        if let Some(def) = &self.definition {
            return Some(format!("{} {} ({})", def.vendor, def.description, def.model));
        }
        let parts: Vec<&str> = [self.manufacturer_name.as_deref(), self.model_id.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device(kind: DeviceKind) -> Device {
        Device {
            ieee_addr: IeeeAddr::new(0x0017880104e45521),
            network_address: 6538,
            kind,
            friendly_name: "button".to_string(),
            model_id: None,
            manufacturer_name: None,
            last_seen: None,
            disabled: false,
            definition: None,
        }
    }

    #[test]
    fn test_end_device_has_no_failed_set() {
        let failed: FailedQueries = [QueryKind::NeighborTable].into_iter().collect();
        let node = Node::from_device(&device(DeviceKind::EndDevice), Some(failed));
        assert!(node.failed.is_none());

        let value = serde_json::to_value(&node).unwrap();
        assert!(value.get("failed").is_none());
        assert_eq!(value["modelID"], json!(null));
        assert_eq!(value["lastSeen"], json!(null));
    }

    #[test]
    fn test_router_failed_set_is_present_even_when_empty() {
        let node = Node::from_device(&device(DeviceKind::Router), None);
        assert_eq!(node.failed, Some(FailedQueries::default()));
        assert_eq!(serde_json::to_value(&node).unwrap()["failed"], json!([]));
    }

    #[test]
    fn test_failed_queries_are_ordered() {
        let failed: FailedQueries = [QueryKind::RoutingTable, QueryKind::NeighborTable]
            .into_iter()
            .collect();
        assert_eq!(failed.joined(), "neighbor-table,routing-table");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!(["neighbor-table", "routing-table"])
        );
    }

    #[test]
    fn test_model_label_falls_back_to_manufacturer() {
        let mut d = device(DeviceKind::Router);
        d.manufacturer_name = Some("Boef".to_string());
        d.model_id = Some("notSupportedModelID".to_string());
        let node = Node::from_device(&d, None);
        assert_eq!(node.model_label().as_deref(), Some("Boef notSupportedModelID"));

        d.definition = Some(Definition {
            vendor: "IKEA".to_string(),
            model: "LED1545G12".to_string(),
            description: "TRADFRI bulb".to_string(),
            supports: "light".to_string(),
        });
        let node = Node::from_device(&d, None);
        assert_eq!(
            node.model_label().as_deref(),
            Some("IKEA TRADFRI bulb (LED1545G12)")
        );
    }

    #[test]
    fn test_model_label_without_any_model_data() {
        let node = Node::from_device(&device(DeviceKind::Router), None);
        assert_eq!(node.model_label(), None);

        let mut d = device(DeviceKind::Router);
        d.model_id = Some("lumi.router".to_string());
        let node = Node::from_device(&d, None);
        assert_eq!(node.model_label().as_deref(), Some("lumi.router"));
    }
}
