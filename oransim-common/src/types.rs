//! Core RAN identifiers: E2 node ids, node types, cell ids, positions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical cell identifier as seen by the radio layer.
pub type CellId = u16;

/// Radio network temporary identifier of a UE inside its serving cell.
pub type Rnti = u16;

/// E2 node identifier assigned by the RIC at registration.
///
/// The value 0 is reserved and means "unregistered". Ids are handed out from
/// a monotonically increasing counter and are never reused, so an id from a
/// previous registration can never alias a current one.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// The reserved "not registered" id.
    pub const UNREGISTERED: NodeId = NodeId(0);

    /// Creates a node id from its raw value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns true if this id was granted by the RIC (non-zero).
    pub const fn is_registered(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Role of the network element behind an E2 node terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Base station (eNB/gNB)
    BaseStation,
    /// Mobile unit (UE)
    MobileUnit,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::BaseStation => write!(f, "BaseStation"),
            NodeType::MobileUnit => write!(f, "MobileUnit"),
        }
    }
}

/// 3D position in meters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Position {
    /// Creates a new position
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}
