//! Graph configuration.

use serde::{Deserialize, Serialize};

use crate::conversion::ConversionTable;
use crate::point::SocketKind;

/// Tunables shared by every block and connection in a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// Implicit conversions accepted when connecting or assigning values.
    pub conversions: ConversionTable,
    /// Connection limit for value points without an explicit limit.
    /// Default: 1.
    pub value_connection_limit: Option<usize>,
    /// Connection limit for stream points without an explicit limit.
    /// Default: unlimited.
    pub stream_connection_limit: Option<usize>,
}

impl GraphConfig {
    /// The default limit applied to a point of the given socket kind.
    pub fn default_limit(&self, kind: SocketKind) -> Option<usize> {
        match kind {
            SocketKind::Value => self.value_connection_limit,
            SocketKind::Stream => self.stream_connection_limit,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            conversions: ConversionTable::default(),
            value_connection_limit: Some(1),
            stream_connection_limit: None,
        }
    }
}
