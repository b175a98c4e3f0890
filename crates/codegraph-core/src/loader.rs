//! One-shot, all-or-nothing graph builder.
//!
//! The [`Loader`] takes ownership of the graph it populates. If any block or
//! connection description is invalid the graph is dropped together with the
//! error, so a caller never holds a half-loaded graph.

use std::borrow::Cow;

use crate::desc::{BlockDesc, GraphDesc, ModelMap};
use crate::error::GraphError;
use crate::expand::expand;
use crate::graph::Graph;
use crate::id::BlockId;

/// Builds a [`Graph`] from a [`GraphDesc`] and optional models.
#[derive(Debug, Clone, Copy)]
pub struct Loader<'a> {
    desc: &'a GraphDesc,
    models: Option<&'a ModelMap>,
}

impl<'a> Loader<'a> {
    pub fn new(desc: &'a GraphDesc) -> Self {
        Loader { desc, models: None }
    }

    /// Supplies the models that block descriptions may reference.
    pub fn with_models(mut self, models: &'a ModelMap) -> Self {
        self.models = Some(models);
        self
    }

    /// Populates `graph` with every block, then every connection.
    ///
    /// The graph is usually empty but may already carry subscriptions, which
    /// then observe the creation events of the load.
    pub fn load(self, mut graph: Graph) -> Result<Graph, GraphError> {
        for (position, block_desc) in self.desc.blocks.iter().enumerate() {
            let merged = self.apply_model(block_desc)?;
            let id = merged
                .id
                .as_deref()
                .map(BlockId::from)
                .ok_or_else(|| GraphError::MissingField {
                    field: "id",
                    context: format!("block #{}", position),
                })?;
            if graph.contains_block(id.as_str()) {
                return Err(GraphError::DuplicateId { id });
            }
            let block = expand(id, &merged, graph.config())?;
            graph.insert_block(block)?;
        }

        for connection in &self.desc.connections {
            let output =
                graph.output_ref(&connection.output_block_id, &connection.output_point_name)?;
            let input =
                graph.input_ref(&connection.input_block_id, &connection.input_point_name)?;
            graph.connect(&output, &input)?;
        }

        tracing::debug!(
            "loaded {} block(s) and {} connection(s)",
            graph.block_count(),
            graph.connection_count()
        );
        Ok(graph)
    }

    fn apply_model<'d>(&self, desc: &'d BlockDesc) -> Result<Cow<'d, BlockDesc>, GraphError> {
        let Some(name) = desc.model.as_deref() else {
            return Ok(Cow::Borrowed(desc));
        };
        let model = self
            .models
            .and_then(|models| models.get(name))
            .ok_or_else(|| GraphError::ModelNotFound {
                block: BlockId::from(desc.id.as_deref().unwrap_or_default()),
                name: name.to_string(),
            })?;
        Ok(Cow::Owned(desc.merged_with(name, model)))
    }
}
