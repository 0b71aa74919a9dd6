use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Short (16-bit) network address, valid for the current network lifetime only.
pub type NetworkAddress = u16;

/// Formats a short address the way diagrams label it, e.g. `0x1a2b`.
pub fn network_address_hex(addr: NetworkAddress) -> String {
    format!("0x{addr:04x}")
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IeeeAddrError {
    #[error("extended address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("extended address must have 16 hex digits: {0}")]
    InvalidLength(String),
    #[error("invalid hex in extended address {0}: {1}")]
    InvalidHex(String, hex::FromHexError),
}

/// Globally stable 64-bit device identifier (IEEE extended address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IeeeAddr(u64);

impl IeeeAddr {
    /// All-zero address some firmware reports for neighbors it only knows by short address.
    pub const PLACEHOLDER: IeeeAddr = IeeeAddr(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::PLACEHOLDER
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn as_string(&self) -> String {
        format!("0x{}", hex::encode(self.0.to_be_bytes()))
    }
}

impl FromStr for IeeeAddr {
    type Err = IeeeAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| IeeeAddrError::MissingPrefix(s.to_string()))?;
        if digits.len() != 16 {
            return Err(IeeeAddrError::InvalidLength(s.to_string()));
        }
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| IeeeAddrError::InvalidHex(s.to_string(), e))?;
        Ok(IeeeAddr(u64::from_be_bytes(bytes)))
    }
}

impl Display for IeeeAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

// Serialized as the hex string so it can be used as a JSON key and matches the wire format

impl Serialize for IeeeAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.as_string())
    }
}

impl<'de> Deserialize<'de> for IeeeAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Role of a device in the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Coordinator,
    Router,
    EndDevice,
}

impl DeviceKind {
    /// Only devices that route traffic keep neighbor and routing tables worth asking for.
    pub fn is_queryable(&self) -> bool {
        matches!(self, DeviceKind::Coordinator | DeviceKind::Router)
    }
}

impl Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Coordinator => write!(f, "Coordinator"),
            DeviceKind::Router => write!(f, "Router"),
            DeviceKind::EndDevice => write!(f, "EndDevice"),
        }
    }
}

/// Capability record resolved for a device model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub vendor: String,
    pub model: String,
    pub description: String,
    pub supports: String,
}

/// A device as tracked by the device registry. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub ieee_addr: IeeeAddr,
    pub network_address: NetworkAddress,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub friendly_name: String,
    #[serde(default, rename = "modelID")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub manufacturer_name: Option<String>,
    /// Milliseconds since the unix epoch.
    #[serde(default)]
    pub last_seen: Option<u64>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub definition: Option<Definition>,
}

impl Device {
    pub fn is_queryable(&self) -> bool {
        self.kind.is_queryable()
    }
}
