//! Connections between an output point and an input point.
//!
//! A [`Connection`] is owned by the graph. Its two endpoints are addressed by
//! [`PointRef`] and only record the connection's id, so removing a connection
//! never leaves a point owning anything.

use serde::{Deserialize, Serialize};

use crate::id::{BlockId, ConnectionId, Direction, PointRef};

/// A directed edge from an output point to an input point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    id: ConnectionId,
    output: PointRef,
    input: PointRef,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, output: PointRef, input: PointRef) -> Self {
        debug_assert_eq!(output.direction, Direction::Output);
        debug_assert_eq!(input.direction, Direction::Input);
        Connection { id, output, input }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The output endpoint.
    pub fn output(&self) -> &PointRef {
        &self.output
    }

    /// The input endpoint.
    pub fn input(&self) -> &PointRef {
        &self.input
    }

    /// Returns `true` if either endpoint is the given point.
    pub fn touches(&self, point: &PointRef) -> bool {
        self.output == *point || self.input == *point
    }

    /// Returns `true` if either endpoint belongs to the given block.
    pub fn touches_block(&self, block: &BlockId) -> bool {
        self.output.block == *block || self.input.block == *block
    }

    /// The endpoint on the far side from `point`, if `point` is an endpoint.
    pub fn other_end(&self, point: &PointRef) -> Option<&PointRef> {
        if self.output == *point {
            Some(&self.input)
        } else if self.input == *point {
            Some(&self.output)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Connection {
        Connection::new(
            ConnectionId(0),
            PointRef::output(BlockId::from("1"), 0),
            PointRef::input(BlockId::from("0"), 0),
        )
    }

    #[test]
    fn touches_both_endpoints() {
        let c = sample();
        assert!(c.touches(&PointRef::output(BlockId::from("1"), 0)));
        assert!(c.touches(&PointRef::input(BlockId::from("0"), 0)));
        assert!(!c.touches(&PointRef::input(BlockId::from("1"), 0)));
    }

    #[test]
    fn touches_block_by_id() {
        let c = sample();
        assert!(c.touches_block(&BlockId::from("0")));
        assert!(!c.touches_block(&BlockId::from("2")));
    }

    #[test]
    fn other_end_crosses_over() {
        let c = sample();
        assert_eq!(
            c.other_end(c.output()),
            Some(&PointRef::input(BlockId::from("0"), 0))
        );
        assert_eq!(c.other_end(&PointRef::output(BlockId::from("9"), 0)), None);
    }
}
