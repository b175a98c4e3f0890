//! Identifier newtypes and point addressing.
//!
//! [`BlockId`] wraps the caller-supplied string identifier of a block.
//! [`ConnectionId`] is an arena handle allocated by the graph. A [`PointRef`]
//! addresses one point by its owning block, direction, and position, which is
//! how connections refer to their endpoints without owning them.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Block identifier, unique within a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

/// Stable connection identifier. Never reused within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

/// Which side of a block a point lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

/// Address of a point inside a graph.
///
/// `index` is the position in the block's input or output list. Points are
/// never removed individually, so the index is stable for the block's life.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointRef {
    pub block: BlockId,
    pub direction: Direction,
    pub index: usize,
}

impl BlockId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PointRef {
    pub fn input(block: BlockId, index: usize) -> Self {
        PointRef {
            block,
            direction: Direction::Input,
            index,
        }
    }

    pub fn output(block: BlockId, index: usize) -> Self {
        PointRef {
            block,
            direction: Direction::Output,
            index,
        }
    }
}

impl Direction {
    /// The direction a connection's other endpoint must have.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        BlockId(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        BlockId(s)
    }
}

impl Borrow<str> for BlockId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

impl fmt::Display for PointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}[{}]", self.block, self.direction, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_display() {
        assert_eq!(format!("{}", BlockId::from("UniqueIdCanBeAString")), "UniqueIdCanBeAString");
    }

    #[test]
    fn connection_id_display() {
        assert_eq!(format!("{}", ConnectionId(3)), "ConnectionId(3)");
    }

    #[test]
    fn direction_opposite() {
        assert_eq!(Direction::Input.opposite(), Direction::Output);
        assert_eq!(Direction::Output.opposite(), Direction::Input);
    }

    #[test]
    fn block_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&BlockId::from("0")).unwrap();
        assert_eq!(json, "\"0\"");
    }

    #[test]
    fn block_id_borrows_as_str() {
        let mut map = std::collections::HashMap::new();
        map.insert(BlockId::from("a"), 1);
        assert_eq!(map.get("a"), Some(&1));
    }
}
