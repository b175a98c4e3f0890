//! Synchronous creation and removal notifications.
//!
//! The graph keeps one [`Observers`] list. Handlers subscribe to a [`Topic`]
//! and are called in subscription order, on the caller's thread, at the
//! moment the entity is created or removed.

use std::fmt;

use crate::block::Block;
use crate::connection::Connection;
use crate::point::Point;

/// Event categories a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    BlockCreated,
    PointCreated,
    BlockRemoved,
    ConnectionCreated,
    ConnectionRemoved,
}

/// A notification carrying the affected entity.
#[derive(Debug, Clone, Copy)]
pub enum GraphEvent<'a> {
    BlockCreated(&'a Block),
    PointCreated(&'a Point),
    /// Delivered after the block's connections were removed.
    BlockRemoved(&'a Block),
    ConnectionCreated(&'a Connection),
    ConnectionRemoved(&'a Connection),
}

impl GraphEvent<'_> {
    pub fn topic(&self) -> Topic {
        match self {
            GraphEvent::BlockCreated(_) => Topic::BlockCreated,
            GraphEvent::PointCreated(_) => Topic::PointCreated,
            GraphEvent::BlockRemoved(_) => Topic::BlockRemoved,
            GraphEvent::ConnectionCreated(_) => Topic::ConnectionCreated,
            GraphEvent::ConnectionRemoved(_) => Topic::ConnectionRemoved,
        }
    }
}

/// Handle returned by [`Observers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A notification handler.
pub type Handler = Box<dyn FnMut(&GraphEvent<'_>) + Send>;

/// Per-topic handler list.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Topic, Handler)>,
}

impl Observers {
    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&GraphEvent<'_>) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, topic, Box::new(handler)));
        id
    }

    /// Removes a handler. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _, _)| *sid != id);
        self.handlers.len() != before
    }

    /// Delivers an event to every handler subscribed to its topic.
    pub fn emit(&mut self, event: &GraphEvent<'_>) {
        let topic = event.topic();
        tracing::trace!("emit {:?}", topic);
        for (_, t, handler) in self.handlers.iter_mut() {
            if *t == topic {
                handler(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
