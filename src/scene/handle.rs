//! Stable node identities

use std::fmt;

/// Stable identity of a scene node, independent of where the node lives in memory.
///
/// Handles are handed out monotonically by [`Scene`](super::Scene) and never
/// reused for a new node. A removed node that is restored by undo comes back
/// under its original handle. The value 0 is reserved as invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u32);

impl NodeHandle {
    /// The reserved invalid handle
    pub const INVALID: NodeHandle = NodeHandle(0);

    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw integer value of this handle
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Whether this handle can refer to a node at all
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
