//! Error types for codegraph-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Every variant
//! carries the offending ids, names, or types so a caller can diagnose the
//! failure without inspecting graph internals.

use thiserror::Error;

use crate::id::{BlockId, ConnectionId, Direction};
use crate::types::ValueType;

/// Errors produced while loading or editing a [`Graph`](crate::graph::Graph).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// A required description field is absent.
    #[error("`{field}` is required in {context}")]
    MissingField { field: &'static str, context: String },

    /// A value point has no explicit type, no literal to infer one from, and
    /// no template to default from.
    #[error("cannot create the point `{point}` in block `{block}` without specifying a value type")]
    MissingValueType { block: BlockId, point: String },

    /// A block id collides with an existing block.
    #[error("a block with id `{id}` already exists")]
    DuplicateId { id: BlockId },

    /// Two points of a block share a name within one direction.
    #[error("block `{block}` already has an {direction} point named `{name}`")]
    DuplicatePoint {
        block: BlockId,
        direction: Direction,
        name: String,
    },

    /// No block with the given id.
    #[error("block not found: `{id}`")]
    BlockNotFound { id: BlockId },

    /// No point with the given name and direction on the block.
    #[error("{direction} point `{name}` not found in block `{block}`")]
    PointNotFound {
        block: BlockId,
        direction: Direction,
        name: String,
    },

    /// No connection with the given id.
    #[error("connection not found: {id}")]
    ConnectionNotFound { id: ConnectionId },

    /// A block references a model that was not supplied.
    #[error("model `{name}` referenced by block `{block}` not found")]
    ModelNotFound { block: BlockId, name: String },

    /// A point references a generic the block does not declare.
    #[error("template `{template}` used by point `{point}` is not declared in block `{block}`")]
    TemplateNotFound {
        block: BlockId,
        point: String,
        template: String,
    },

    /// Two value types cannot be connected or assigned.
    #[error("cannot connect two points of different value types: `{output}` and `{input}`")]
    IncompatibleTypes { output: ValueType, input: ValueType },

    /// A value socket was wired to a stream socket.
    #[error("cannot connect a {output} socket `{output_point}` to a {input} socket `{input_point}`")]
    IncompatibleSockets {
        output_point: String,
        output: &'static str,
        input_point: String,
        input: &'static str,
    },

    /// A connection endpoint has the wrong direction.
    #[error("point `{point}` in block `{block}` is an {actual} but an {expected} was expected")]
    InvalidDirection {
        block: BlockId,
        point: String,
        expected: Direction,
        actual: Direction,
    },

    /// Reading or writing the value of a stream point.
    #[error("stream point `{point}` in block `{block}` has no value")]
    NoValueOnStream { block: BlockId, point: String },

    /// A point would exceed its connection limit.
    #[error("point `{point}` in block `{block}` cannot accept more than `{limit}` connection(s)")]
    ConnectionLimitExceeded {
        block: BlockId,
        point: String,
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompatible_types_names_both_types() {
        let err = GraphError::IncompatibleTypes {
            output: ValueType::String,
            input: ValueType::Vec3,
        };
        assert_eq!(
            err.to_string(),
            "cannot connect two points of different value types: `String` and `Vec3`"
        );
    }

    #[test]
    fn limit_message_includes_limit() {
        let err = GraphError::ConnectionLimitExceeded {
            block: BlockId::from("7"),
            point: "hello".into(),
            limit: 1,
        };
        assert!(err.to_string().contains("cannot accept more than `1` connection"));
    }

    #[test]
    fn point_not_found_mentions_direction() {
        let err = GraphError::PointNotFound {
            block: BlockId::from("0"),
            direction: Direction::Input,
            name: "x".into(),
        };
        assert_eq!(err.to_string(), "input point `x` not found in block `0`");
    }
}
