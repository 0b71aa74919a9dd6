use serde::{Deserialize, Serialize, ser::SerializeStruct};
use thiserror::Error;

use crate::network::device::{IeeeAddr, NetworkAddress};

/// Relationship of a neighbor to the node that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Relationship {
    Parent,
    Child,
    Sibling,
    None,
    /// Stale entry for a child that has since left. Never turned into a link.
    FormerChild,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown relationship code {0}")]
pub struct UnknownRelationship(pub u8);

impl From<Relationship> for u8 {
    fn from(value: Relationship) -> Self {
        match value {
            Relationship::Parent => 0,
            Relationship::Child => 1,
            Relationship::Sibling => 2,
            Relationship::None => 3,
            Relationship::FormerChild => 4,
        }
    }
}

impl TryFrom<u8> for Relationship {
    type Error = UnknownRelationship;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Relationship::Parent),
            1 => Ok(Relationship::Child),
            2 => Ok(Relationship::Sibling),
            3 => Ok(Relationship::None),
            4 => Ok(Relationship::FormerChild),
            other => Err(UnknownRelationship(other)),
        }
    }
}

/// One row of a node's routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
    pub destination_address: NetworkAddress,
    pub next_hop: NetworkAddress,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEndpoint {
    pub ieee_addr: IeeeAddr,
    pub network_address: NetworkAddress,
}

/// Directed link from the reporting neighbor (source) to the node whose table listed it (target).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub source: LinkEndpoint,
    pub target: LinkEndpoint,
    pub relationship: Relationship,
    pub depth: u8,
    pub link_quality: u8,
    /// Routes of the target whose next hop is this link's source.
    pub routes: Vec<RouteEntry>,
}

// The wire format duplicates a few fields for older consumers (lqi, *IeeeAddr, sourceNwkAddr)

impl Serialize for Link {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut st = serializer.serialize_struct("Link", 10)?;
        st.serialize_field("source", &self.source)?;
        st.serialize_field("target", &self.target)?;
        st.serialize_field("sourceIeeeAddr", &self.source.ieee_addr)?;
        st.serialize_field("targetIeeeAddr", &self.target.ieee_addr)?;
        st.serialize_field("sourceNwkAddr", &self.source.network_address)?;
        st.serialize_field("linkquality", &self.link_quality)?;
        st.serialize_field("lqi", &self.link_quality)?;
        st.serialize_field("depth", &self.depth)?;
        st.serialize_field("relationship", &self.relationship)?;
        st.serialize_field("routes", &self.routes)?;
        st.end()
    }
}
