//! Identity type for pipeline nodes.
//!
//! A `NodeId` is the node's position in declaration order and serves as a
//! direct index into `Pipeline::nodes`.

use std::fmt;

/// Index into `Pipeline::nodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
