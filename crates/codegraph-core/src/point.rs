//! Points: typed sockets owned by a block.
//!
//! A [`Point`] is either a value socket carrying a [`ValueType`] and an
//! optional literal, or a stream socket carrying control flow. Points keep
//! the ids of the connections that reference them; the connections
//! themselves are owned by the graph.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::GraphError;
use crate::id::{BlockId, ConnectionId, Direction};
use crate::types::{Value, ValueType};

/// The two socket kinds. Only sockets of the same kind connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SocketKind {
    #[default]
    Value,
    Stream,
}

impl SocketKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SocketKind::Value => "Value",
            SocketKind::Stream => "Stream",
        }
    }
}

/// Socket payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Socket {
    /// Data socket. `value_type` is the effective type: for a templated
    /// point it tracks the resolution state of its generic.
    Value {
        value_type: ValueType,
        value: Option<Value>,
    },
    /// Control-flow socket. Never holds a value.
    Stream,
}

/// How a point came to exist on its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointOrigin {
    /// Listed in the block description.
    Declared,
    /// Scaffolding added by variant expansion.
    Generated,
    /// The port built from an Instruction/Function return description.
    Return,
}

/// Binding of a point to one of its block's generics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateBinding {
    /// Generic name, a key of the block's template table.
    pub name: String,
    /// Type the point reports while the generic is unresolved.
    pub default: ValueType,
}

/// A typed socket on a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    block: BlockId,
    name: String,
    direction: Direction,
    socket: Socket,
    template: Option<TemplateBinding>,
    /// `None` means unlimited.
    max_connections: Option<usize>,
    origin: PointOrigin,
    connections: SmallVec<[ConnectionId; 2]>,
}

impl Point {
    /// Creates a value point.
    pub fn value_socket(
        block: BlockId,
        name: impl Into<String>,
        direction: Direction,
        value_type: ValueType,
        value: Option<Value>,
    ) -> Self {
        Point::new(
            block,
            name.into(),
            direction,
            Socket::Value { value_type, value },
        )
    }

    /// Creates a stream point.
    pub fn stream_socket(block: BlockId, name: impl Into<String>, direction: Direction) -> Self {
        Point::new(block, name.into(), direction, Socket::Stream)
    }

    fn new(block: BlockId, name: String, direction: Direction, socket: Socket) -> Self {
        Point {
            block,
            name,
            direction,
            socket,
            template: None,
            max_connections: None,
            origin: PointOrigin::Declared,
            connections: SmallVec::new(),
        }
    }

    pub(crate) fn with_template(mut self, binding: TemplateBinding) -> Self {
        self.template = Some(binding);
        self
    }

    pub(crate) fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.max_connections = limit;
        self
    }

    pub(crate) fn with_origin(mut self, origin: PointOrigin) -> Self {
        self.origin = origin;
        self
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Id of the owning block.
    pub fn block(&self) -> &BlockId {
        &self.block
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn socket_kind(&self) -> SocketKind {
        match self.socket {
            Socket::Value { .. } => SocketKind::Value,
            Socket::Stream => SocketKind::Stream,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.socket, Socket::Stream)
    }

    /// Effective value type. `None` for stream points.
    pub fn value_type(&self) -> Option<&ValueType> {
        match &self.socket {
            Socket::Value { value_type, .. } => Some(value_type),
            Socket::Stream => None,
        }
    }

    /// Current literal. Fails with [`GraphError::NoValueOnStream`] on a
    /// stream point.
    pub fn value(&self) -> Result<Option<&Value>, GraphError> {
        match &self.socket {
            Socket::Value { value, .. } => Ok(value.as_ref()),
            Socket::Stream => Err(self.no_value_error()),
        }
    }

    /// The generic this point is bound to, if any.
    pub fn template(&self) -> Option<&TemplateBinding> {
        self.template.as_ref()
    }

    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    pub fn origin(&self) -> PointOrigin {
        self.origin
    }

    /// Ids of the connections referencing this point, in insertion order.
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    // -----------------------------------------------------------------------
    // Mutation (graph-internal)
    // -----------------------------------------------------------------------

    /// Fails with [`GraphError::ConnectionLimitExceeded`] if one more
    /// connection would exceed this point's limit.
    pub(crate) fn check_capacity(&self) -> Result<(), GraphError> {
        match self.max_connections {
            Some(limit) if self.connections.len() >= limit => {
                Err(GraphError::ConnectionLimitExceeded {
                    block: self.block.clone(),
                    point: self.name.clone(),
                    limit,
                })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn link(&mut self, id: ConnectionId) {
        self.connections.push(id);
    }

    pub(crate) fn unlink(&mut self, id: ConnectionId) {
        self.connections.retain(|c| *c != id);
    }

    /// Stores a literal without type checks. The block validates first.
    pub(crate) fn store_value(&mut self, new_value: Value) -> Result<(), GraphError> {
        match &mut self.socket {
            Socket::Value { value, .. } => {
                *value = Some(new_value);
                Ok(())
            }
            Socket::Stream => Err(self.no_value_error()),
        }
    }

    pub(crate) fn set_value_type(&mut self, ty: ValueType) {
        if let Socket::Value { value_type, .. } = &mut self.socket {
            *value_type = ty;
        }
    }

    /// Deep copy for a cloned block: same shape and literal, no connections.
    pub(crate) fn copy_for(&self, block: BlockId) -> Point {
        Point {
            block,
            connections: SmallVec::new(),
            ..self.clone()
        }
    }

    pub(crate) fn no_value_error(&self) -> GraphError {
        GraphError::NoValueOnStream {
            block: self.block.clone(),
            point: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_input() -> Point {
        Point::value_socket(
            BlockId::from("0"),
            "in",
            Direction::Input,
            ValueType::Number,
            Some(Value::from(64)),
        )
        .with_limit(Some(1))
    }

    #[test]
    fn value_point_reports_type_and_value() {
        let point = number_input();
        assert_eq!(point.socket_kind(), SocketKind::Value);
        assert_eq!(point.value_type(), Some(&ValueType::Number));
        assert_eq!(point.value().unwrap(), Some(&Value::from(64)));
    }

    #[test]
    fn stream_point_has_no_value() {
        let mut point = Point::stream_socket(BlockId::from("0"), "in", Direction::Input);
        assert!(point.value_type().is_none());
        assert!(matches!(
            point.value(),
            Err(GraphError::NoValueOnStream { .. })
        ));
        assert!(matches!(
            point.store_value(Value::from(32)),
            Err(GraphError::NoValueOnStream { .. })
        ));
    }

    #[test]
    fn capacity_respects_limit() {
        let mut point = number_input();
        assert!(point.check_capacity().is_ok());
        point.link(ConnectionId(0));
        assert_eq!(
            point.check_capacity(),
            Err(GraphError::ConnectionLimitExceeded {
                block: BlockId::from("0"),
                point: "in".into(),
                limit: 1,
            })
        );
        point.unlink(ConnectionId(0));
        assert!(point.check_capacity().is_ok());
    }

    #[test]
    fn unlimited_point_accepts_many() {
        let mut point = Point::stream_socket(BlockId::from("0"), "out", Direction::Output);
        for i in 0..8 {
            point.link(ConnectionId(i));
        }
        assert!(point.check_capacity().is_ok());
        assert_eq!(point.connections().len(), 8);
    }

    #[test]
    fn copy_drops_connections_and_rebinds_block() {
        let mut point = number_input();
        point.link(ConnectionId(4));
        let copy = point.copy_for(BlockId::from("9"));
        assert_eq!(copy.block(), &BlockId::from("9"));
        assert!(!copy.is_connected());
        assert_eq!(copy.value().unwrap(), Some(&Value::from(64)));
    }
}
