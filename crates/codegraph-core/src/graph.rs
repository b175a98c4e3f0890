//! Graph: the aggregate root owning every block and connection.
//!
//! [`Graph`] is the single entry point for querying and editing a program.
//! Blocks and connections live in insertion-ordered arenas
//! (`IndexMap`s keyed by id); points refer to connections by
//! [`ConnectionId`] and connections refer to points by [`PointRef`], so the
//! point/connection cycle never involves ownership.
//!
//! All mutations go through `Graph` methods, which validate before changing
//! anything and cascade removals so that no connection outlives either of its
//! endpoints.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::block::{Block, Template, TypeCheck};
use crate::config::GraphConfig;
use crate::connection::Connection;
use crate::desc::{ConnectionDesc, GraphDesc, ModelMap};
use crate::error::GraphError;
use crate::events::{GraphEvent, Observers, SubscriptionId, Topic};
use crate::id::{BlockId, ConnectionId, Direction, PointRef};
use crate::loader::Loader;
use crate::point::Point;
use crate::types::{Value, ValueType};

/// A pending generic resolution: block, template name, resolved type.
type Resolution = (BlockId, String, ValueType);

/// The program graph.
#[derive(Debug, Default)]
pub struct Graph {
    /// Blocks in creation order.
    blocks: IndexMap<BlockId, Block>,
    /// Connections in creation order.
    connections: IndexMap<ConnectionId, Connection>,
    config: GraphConfig,
    observers: Observers,
    next_connection_id: u32,
    /// Next generated clone id. Stays above every numeric id ever inserted,
    /// so removed ids are not handed out again.
    next_clone_id: u64,
}

impl Graph {
    /// Creates an empty graph with the default configuration.
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Graph {
            config,
            ..Graph::default()
        }
    }

    /// Builds a graph from a description in one step. See [`Loader`].
    pub fn from_description(
        desc: &GraphDesc,
        models: Option<&ModelMap>,
    ) -> Result<Graph, GraphError> {
        let loader = Loader::new(desc);
        let loader = match models {
            Some(models) => loader.with_models(models),
            None => loader,
        };
        loader.load(Graph::new())
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// Registers a handler for one topic. Handlers run synchronously.
    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&GraphEvent<'_>) + Send + 'static,
    {
        self.observers.subscribe(topic, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Looks up a block by id.
    pub fn block(&self, id: &str) -> Result<&Block, GraphError> {
        self.blocks.get(id).ok_or_else(|| GraphError::BlockNotFound {
            id: BlockId::from(id),
        })
    }

    pub fn contains_block(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    /// Blocks in creation order.
    pub fn blocks(&self) -> impl ExactSizeIterator<Item = &Block> {
        self.blocks.values()
    }

    /// Connections in creation order.
    pub fn connections(&self) -> impl ExactSizeIterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connection(&self, id: ConnectionId) -> Result<&Connection, GraphError> {
        self.connections
            .get(&id)
            .ok_or(GraphError::ConnectionNotFound { id })
    }

    /// Resolves a point address.
    pub fn point(&self, at: &PointRef) -> Result<&Point, GraphError> {
        self.block(at.block.as_str())?
            .point(at.direction, at.index)
            .ok_or_else(|| GraphError::PointNotFound {
                block: at.block.clone(),
                direction: at.direction,
                name: format!("#{}", at.index),
            })
    }

    /// Address of a block's input point by name.
    pub fn input_ref(&self, block: &str, name: &str) -> Result<PointRef, GraphError> {
        self.point_ref(block, Direction::Input, name)
    }

    /// Address of a block's output point by name.
    pub fn output_ref(&self, block: &str, name: &str) -> Result<PointRef, GraphError> {
        self.point_ref(block, Direction::Output, name)
    }

    pub fn point_ref(
        &self,
        block: &str,
        direction: Direction,
        name: &str,
    ) -> Result<PointRef, GraphError> {
        let found = self.block(block)?;
        let index = found.index_of(direction, name)?;
        Ok(PointRef {
            block: found.id().clone(),
            direction,
            index,
        })
    }

    /// Connections referencing a point, in creation order. The same
    /// [`Connection`] is returned from either of its endpoints.
    pub fn connections_by_point(&self, at: &PointRef) -> Result<Vec<&Connection>, GraphError> {
        Ok(self
            .point(at)?
            .connections()
            .iter()
            .filter_map(|id| self.connections.get(id))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Block methods
    // -----------------------------------------------------------------------

    /// Registers a fully built block and announces it and its points.
    pub(crate) fn insert_block(&mut self, block: Block) -> Result<(), GraphError> {
        if self.blocks.contains_key(block.id()) {
            return Err(GraphError::DuplicateId {
                id: block.id().clone(),
            });
        }
        let id = block.id().clone();
        if let Ok(n) = id.as_str().parse::<u64>() {
            self.next_clone_id = self.next_clone_id.max(n.saturating_add(1));
        }
        tracing::debug!(
            "block `{}` created with {} input(s) and {} output(s)",
            id,
            block.inputs().len(),
            block.outputs().len()
        );
        self.blocks.insert(id.clone(), block);

        if let Some(block) = self.blocks.get(&id) {
            self.observers.emit(&GraphEvent::BlockCreated(block));
            for point in block.all_points() {
                self.observers.emit(&GraphEvent::PointCreated(point));
            }
        }
        Ok(())
    }

    /// Changes a block's display name.
    pub fn rename_block(&mut self, id: &str, name: impl Into<String>) -> Result<(), GraphError> {
        let block = self
            .blocks
            .get_mut(id)
            .ok_or_else(|| GraphError::BlockNotFound { id: BlockId::from(id) })?;
        block.set_name(name.into());
        Ok(())
    }

    /// Writes the literal of a value point, type-checking it against the
    /// point's current type or resolving its generic.
    pub fn set_value(&mut self, at: &PointRef, value: Value) -> Result<(), GraphError> {
        let point = self.point(at)?;
        if point.is_stream() {
            return Err(point.no_value_error());
        }
        let incoming = value.value_type();
        let block = self.block(at.block.as_str())?;
        let resolution =
            match block.check_type(at.direction, at.index, &incoming, &self.config.conversions) {
                TypeCheck::Accepts => None,
                TypeCheck::Resolves { template, to } => {
                    let resolution = (at.block.clone(), template, to);
                    self.check_resolution(
                        &resolution,
                        std::slice::from_ref(&resolution),
                        Some(at),
                    )?;
                    Some(resolution)
                }
                TypeCheck::Rejects { expected } => {
                    return Err(GraphError::IncompatibleTypes {
                        output: incoming,
                        input: expected,
                    })
                }
            };

        let block = self
            .blocks
            .get_mut(at.block.as_str())
            .ok_or_else(|| GraphError::BlockNotFound {
                id: at.block.clone(),
            })?;
        if let Some((_, template, to)) = resolution {
            block.resolve_template(&template, to);
        }
        match block.point_mut(at.direction, at.index) {
            Some(point) => point.store_value(value),
            None => Ok(()),
        }
    }

    /// Removes a block after removing every connection touching it.
    pub fn remove_block(&mut self, id: &str) -> Result<Block, GraphError> {
        let block_id = self.block(id)?.id().clone();
        let touching: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.touches_block(&block_id))
            .map(Connection::id)
            .collect();
        for connection in touching {
            self.disconnect(connection)?;
        }

        let block = self
            .blocks
            .shift_remove(&block_id)
            .ok_or(GraphError::BlockNotFound { id: block_id })?;
        tracing::debug!("block `{}` removed", block.id());
        self.observers.emit(&GraphEvent::BlockRemoved(&block));

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(block)
    }

    /// Copies a block under a generated id without re-wiring it.
    pub fn clone_block(&mut self, id: &str) -> Result<BlockId, GraphError> {
        let new_id = self.fresh_block_id();
        let copy = self.block(id)?.copy_as(new_id.clone());
        self.insert_block(copy)?;
        Ok(new_id)
    }

    /// Clones a set of blocks and replicates the connections internal to it.
    ///
    /// Clones are created in input order, once per distinct id. Afterwards
    /// every existing connection whose endpoints both lie in the set is
    /// reproduced between the corresponding clones, appended in the original
    /// order. Connections crossing the boundary of the set are not
    /// replicated.
    pub fn clone_blocks(&mut self, ids: &[BlockId]) -> Result<Vec<BlockId>, GraphError> {
        for id in ids {
            self.block(id.as_str())?;
        }

        let mut mapping: HashMap<BlockId, BlockId> = HashMap::new();
        let mut clones = Vec::with_capacity(ids.len());
        for id in ids {
            if mapping.contains_key(id) {
                continue;
            }
            let clone = self.clone_block(id.as_str())?;
            mapping.insert(id.clone(), clone.clone());
            clones.push(clone);
        }

        let internal: Vec<(PointRef, PointRef)> = self
            .connections
            .values()
            .filter_map(|c| {
                let output = mapping.get(&c.output().block)?;
                let input = mapping.get(&c.input().block)?;
                Some((
                    PointRef {
                        block: output.clone(),
                        ..c.output().clone()
                    },
                    PointRef {
                        block: input.clone(),
                        ..c.input().clone()
                    },
                ))
            })
            .collect();
        for (output, input) in internal {
            self.connect(&output, &input)?;
        }

        Ok(clones)
    }

    fn fresh_block_id(&mut self) -> BlockId {
        loop {
            let candidate = BlockId(self.next_clone_id.to_string());
            self.next_clone_id += 1;
            if !self.blocks.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Connection methods
    // -----------------------------------------------------------------------

    /// Connects an output point to an input point.
    ///
    /// Validates directions, socket kinds, connection limits on both
    /// endpoints, and value types (resolving a generic where the incoming
    /// type is one of its candidates). Nothing changes if validation fails.
    pub fn connect(
        &mut self,
        output: &PointRef,
        input: &PointRef,
    ) -> Result<ConnectionId, GraphError> {
        let out_point = self.point(output)?;
        let in_point = self.point(input)?;
        expect_direction(out_point, Direction::Output)?;
        expect_direction(in_point, Direction::Input)?;

        if out_point.socket_kind() != in_point.socket_kind() {
            return Err(GraphError::IncompatibleSockets {
                output_point: out_point.name().to_string(),
                output: out_point.socket_kind().as_str(),
                input_point: in_point.name().to_string(),
                input: in_point.socket_kind().as_str(),
            });
        }
        out_point.check_capacity()?;
        in_point.check_capacity()?;

        let plan = match (out_point.value_type(), in_point.value_type()) {
            (Some(out_ty), Some(in_ty)) => self.plan_types(output, input, out_ty, in_ty)?,
            _ => Vec::new(),
        };

        for (block, template, to) in plan {
            if let Some(block) = self.blocks.get_mut(&block) {
                block.resolve_template(&template, to);
            }
        }

        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        for end in [output, input] {
            if let Some(point) = self
                .blocks
                .get_mut(&end.block)
                .and_then(|b| b.point_mut(end.direction, end.index))
            {
                point.link(id);
            }
        }
        let connection = Connection::new(id, output.clone(), input.clone());
        tracing::debug!("connected {} -> {} as {}", output, input, id);
        self.observers.emit(&GraphEvent::ConnectionCreated(&connection));
        self.connections.insert(id, connection);

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    /// Connects two points addressed by block id and point name.
    pub fn connect_by_name(
        &mut self,
        output_block: &str,
        output: &str,
        input_block: &str,
        input: &str,
    ) -> Result<ConnectionId, GraphError> {
        let output = self.output_ref(output_block, output)?;
        let input = self.input_ref(input_block, input)?;
        self.connect(&output, &input)
    }

    /// Decides the type side of a connection and the generics it resolves.
    ///
    /// An unresolved generic on the input takes the output's type when that
    /// is one of its candidates, else an unresolved generic on the output
    /// takes the input's type. Otherwise the types must be compatible, and
    /// any unresolved generic on either end is fixed to its current type so
    /// it cannot later drift away from the connection. Every resolution is
    /// checked against the literals and connections already on its points.
    fn plan_types(
        &self,
        output: &PointRef,
        input: &PointRef,
        out_ty: &ValueType,
        in_ty: &ValueType,
    ) -> Result<Vec<Resolution>, GraphError> {
        let out_generic = self.block(output.block.as_str())?.open_template(output.direction, output.index);
        let in_generic = self.block(input.block.as_str())?.open_template(input.direction, input.index);
        let resolve = |at: &PointRef, generic: Option<(&str, &Template)>, ty: &ValueType| {
            generic
                .filter(|(_, template)| template.accepts(ty))
                .map(|(name, _)| (at.block.clone(), name.to_string(), ty.clone()))
        };

        let mut plan: Vec<Resolution> = Vec::new();
        if let Some(first) = resolve(input, in_generic, out_ty) {
            plan.push(first);
            plan.extend(resolve(output, out_generic, out_ty));
        } else if let Some(first) = resolve(output, out_generic, in_ty) {
            plan.push(first);
            plan.extend(resolve(input, in_generic, in_ty));
        } else if self.config.conversions.compatible(out_ty, in_ty) {
            plan.extend(resolve(input, in_generic, in_ty));
            plan.extend(resolve(output, out_generic, out_ty));
        } else {
            return Err(GraphError::IncompatibleTypes {
                output: out_ty.clone(),
                input: in_ty.clone(),
            });
        }
        // A connection between two points of one generic resolves it once.
        if plan.len() == 2 && plan[0].0 == plan[1].0 && plan[0].1 == plan[1].1 {
            plan.truncate(1);
        }

        for resolution in &plan {
            self.check_resolution(resolution, &plan, None)?;
        }
        Ok(plan)
    }

    /// Verifies that resolving a generic keeps every literal and every
    /// existing connection on its bound points well-typed. `pending` lists
    /// the resolutions applied together with this one; `skip` is a point
    /// whose literal is being replaced.
    fn check_resolution(
        &self,
        resolution: &Resolution,
        pending: &[Resolution],
        skip: Option<&PointRef>,
    ) -> Result<(), GraphError> {
        let (block_id, template, to) = resolution;
        let table = &self.config.conversions;
        let block = self.block(block_id.as_str())?;
        let skip = skip
            .filter(|at| at.block == *block_id)
            .map(|at| (at.direction, at.index));
        block.check_literals(template, to, table, skip)?;

        for (direction, index, _) in block.bound_points(template) {
            let here = PointRef {
                block: block_id.clone(),
                direction,
                index,
            };
            for connection in self.connections_by_point(&here)? {
                let Some(there) = connection.other_end(&here) else {
                    continue;
                };
                let far = self.point(there)?;
                let pending_ty = far.template().and_then(|binding| {
                    pending
                        .iter()
                        .find(|(b, t, _)| *b == there.block && *t == binding.name)
                        .map(|(_, _, ty)| ty)
                });
                let Some(far_ty) = pending_ty.or_else(|| far.value_type()) else {
                    continue;
                };
                let (out_ty, in_ty) = match direction {
                    Direction::Input => (far_ty, to),
                    Direction::Output => (to, far_ty),
                };
                if !table.compatible(out_ty, in_ty) {
                    return Err(GraphError::IncompatibleTypes {
                        output: out_ty.clone(),
                        input: in_ty.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Removes a connection and unlinks it from both endpoints. Generics left
    /// with no connected point and no literal return to their unresolved
    /// state.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<Connection, GraphError> {
        let connection = self
            .connections
            .shift_remove(&id)
            .ok_or(GraphError::ConnectionNotFound { id })?;

        for end in [connection.output(), connection.input()] {
            let Some(block) = self.blocks.get_mut(&end.block) else {
                continue;
            };
            let template = block.point_mut(end.direction, end.index).and_then(|point| {
                point.unlink(id);
                point.template().map(|b| b.name.clone())
            });
            if let Some(template) = template {
                block.release_template_if_idle(&template);
            }
        }

        tracing::debug!("disconnected {}", id);
        self.observers.emit(&GraphEvent::ConnectionRemoved(&connection));

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(connection)
    }

    // -----------------------------------------------------------------------
    // Description
    // -----------------------------------------------------------------------

    /// Describes the graph so that loading the result rebuilds it.
    pub fn describe(&self) -> GraphDesc {
        GraphDesc {
            blocks: self
                .blocks
                .values()
                .map(|b| b.describe(&self.config))
                .collect(),
            connections: self
                .connections
                .values()
                .filter_map(|c| {
                    let output = self.point(c.output()).ok()?;
                    let input = self.point(c.input()).ok()?;
                    Some(ConnectionDesc::new(
                        c.output().block.as_str(),
                        output.name(),
                        c.input().block.as_str(),
                        input.name(),
                    ))
                })
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Debug consistency assertion
    // -----------------------------------------------------------------------

    /// Verifies that every connection's endpoints exist and list it, and that
    /// every connection id held by a point exists.
    ///
    /// Only called in debug builds (via `cfg(debug_assertions)`).
    #[cfg(debug_assertions)]
    fn assert_consistency(&self) {
        for connection in self.connections.values() {
            for end in [connection.output(), connection.input()] {
                let point = self
                    .point(end)
                    .unwrap_or_else(|e| panic!("{} has a dangling endpoint: {}", connection.id(), e));
                assert!(
                    point.connections().contains(&connection.id()),
                    "{} is not linked from {}",
                    connection.id(),
                    end
                );
            }
        }
        for block in self.blocks.values() {
            for point in block.all_points() {
                for id in point.connections() {
                    assert!(
                        self.connections.contains_key(id),
                        "point `{}` of block `{}` references missing {}",
                        point.name(),
                        block.id(),
                        id
                    );
                }
            }
        }
    }
}

fn expect_direction(point: &Point, expected: Direction) -> Result<(), GraphError> {
    if point.direction() == expected {
        Ok(())
    } else {
        Err(GraphError::InvalidDirection {
            block: point.block().clone(),
            point: point.name().to_string(),
            expected,
            actual: point.direction(),
        })
    }
}
