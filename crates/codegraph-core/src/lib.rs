pub mod types;
pub mod conversion;
pub mod config;
pub mod id;
pub mod point;
pub mod block;
pub mod expand;
pub mod connection;
pub mod events;
pub mod graph;
pub mod desc;
pub mod loader;
pub mod error;

// Re-export commonly used types
pub use types::{Value, ValueType};
pub use conversion::ConversionTable;
pub use config::GraphConfig;
pub use id::{BlockId, ConnectionId, Direction, PointRef};
pub use point::{Point, PointOrigin, Socket, SocketKind, TemplateBinding};
pub use block::{Block, BlockVariant, Template};
pub use connection::Connection;
pub use events::{GraphEvent, SubscriptionId, Topic};
pub use graph::Graph;
pub use desc::{BlockDesc, ConnectionDesc, GraphDesc, ModelMap, PointDesc};
pub use loader::Loader;
pub use error::GraphError;
