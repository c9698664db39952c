use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a node in the contest graph.
    pub struct NodeId;

    /// Identifies an undirected edge in the contest graph.
    pub struct EdgeId;

    /// Identifies a player taking part in the match.
    pub struct PlayerId;
}

/// Identifies an energy packet. Allocated monotonically by [`GameState`],
/// never reused within a match.
///
/// [`GameState`]: crate::state::GameState
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketId(pub u64);
