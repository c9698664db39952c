//! Serde data file structs for board definitions.
//!
//! A board file names every node, lists the edges between them by name and
//! gives each player a starting node. The loader resolves the names into
//! engine ids.

use conduit_core::node_kind::NodeKind;
use serde::Deserialize;

// ===========================================================================
// Board
// ===========================================================================

/// The whole board file.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardData {
    pub nodes: Vec<NodeData>,
    #[serde(default)]
    pub edges: Vec<EdgeData>,
    #[serde(default)]
    pub players: Vec<PlayerData>,
}

/// A node definition. Kind defaults to `standard`, energy to zero.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeData {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: NodeKind,
    #[serde(default)]
    pub energy: f64,
}

fn default_kind() -> NodeKind {
    NodeKind::Standard
}

/// An undirected edge between two named nodes.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeData {
    pub a: String,
    pub b: String,
    #[serde(default = "default_length")]
    pub length: f64,
}

fn default_length() -> f64 {
    1.0
}

/// A player and the node they start on.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerData {
    pub name: String,
    pub start: String,
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_from_ron() {
        let ron_str = r#"(
            nodes: [
                (name: "home"),
                (name: "keep", kind: fortress, energy: 40.0),
            ],
            edges: [(a: "home", b: "keep", length: 2.5)],
            players: [(name: "red", start: "home")],
        )"#;
        let board: BoardData = ron::from_str(ron_str).unwrap();
        assert_eq!(board.nodes.len(), 2);
        assert_eq!(board.nodes[0].kind, NodeKind::Standard);
        assert_eq!(board.nodes[0].energy, 0.0);
        assert_eq!(board.nodes[1].kind, NodeKind::Fortress);
        assert_eq!(board.edges[0].length, 2.5);
        assert_eq!(board.players[0].start, "home");
    }

    #[test]
    fn board_from_json_defaults_edge_length() {
        let json = r#"{
            "nodes": [{"name": "a"}, {"name": "b", "kind": "reactor"}],
            "edges": [{"a": "a", "b": "b"}]
        }"#;
        let board: BoardData = serde_json::from_str(json).unwrap();
        assert_eq!(board.edges[0].length, 1.0);
        assert_eq!(board.nodes[1].kind, NodeKind::Reactor);
        assert!(board.players.is_empty());
    }

    #[test]
    fn board_from_toml() {
        let toml_str = r#"
            [[nodes]]
            name = "a"
            kind = "amplifier"

            [[nodes]]
            name = "b"

            [[edges]]
            a = "a"
            b = "b"
            length = 3.0

            [[players]]
            name = "blue"
            start = "b"
        "#;
        let board: BoardData = toml::from_str(toml_str).unwrap();
        assert_eq!(board.nodes[0].kind, NodeKind::Amplifier);
        assert_eq!(board.edges[0].length, 3.0);
        assert_eq!(board.players[0].name, "blue");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let json = r#"{"nodes": [{"name": "a", "kind": "citadel"}]}"#;
        assert!(serde_json::from_str::<BoardData>(json).is_err());
    }
}
