//! Registry of physical locations in the delivery network.

use serde::Serialize;

use crate::analytics::NodeStat;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Central depot.
    Hub,
    /// Delivery endpoint.
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeLocation {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

/// Paderu–Araku corridor.
pub const NODE_LOCATIONS: &[NodeLocation] = &[
    NodeLocation { name: "Paderu", lat: 18.0833, lng: 82.6670, kind: NodeKind::Hub },
    NodeLocation { name: "Araku Valley", lat: 18.3273, lng: 82.8756, kind: NodeKind::Node },
    NodeLocation { name: "Chintapalli", lat: 17.8707, lng: 82.3518, kind: NodeKind::Node },
    NodeLocation { name: "Munchingiputtu", lat: 18.3663, lng: 82.5086, kind: NodeKind::Node },
    NodeLocation { name: "Lothugedda", lat: 17.9622, lng: 82.3942, kind: NodeKind::Node },
    NodeLocation { name: "Sunkarametta", lat: 18.2783, lng: 82.9675, kind: NodeKind::Node },
    NodeLocation { name: "Bheemavaram", lat: 18.0480, lng: 82.7390, kind: NodeKind::Node },
    NodeLocation { name: "Tajangi", lat: 17.8709, lng: 82.4942, kind: NodeKind::Node },
];

/// Case-insensitive lookup by location name.
pub fn locate(name: &str) -> Option<&'static NodeLocation> {
    let name = name.trim();
    NODE_LOCATIONS
        .iter()
        .find(|n| n.name.eq_ignore_ascii_case(name))
}

/// Node activity joined with its registry entry, when one exists.
#[derive(Debug, Clone, Serialize)]
pub struct LocatedNode {
    #[serde(flatten)]
    pub stats: NodeStat,
    pub location: Option<NodeLocation>,
}

pub fn locate_all(stats: Vec<NodeStat>) -> Vec<LocatedNode> {
    // ---
    stats
        .into_iter()
        .map(|stats| LocatedNode {
            location: locate(&stats.name).copied(),
            stats,
        })
        .collect()
}
