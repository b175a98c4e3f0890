//! Blocks: named nodes owning ordered input and output points.
//!
//! A [`Block`] is created by variant expansion (see [`crate::expand`]) and
//! owned by the graph. Besides its points it carries a generic template
//! table: each [`Template`] lists candidate value types and, once a
//! connection or assignment picks one, the resolved type shared by every
//! point bound to it.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::conversion::ConversionTable;
use crate::error::GraphError;
use crate::id::{BlockId, Direction};
use crate::point::Point;
use crate::types::{Value, ValueType};

/// Structural category of a block. Controls the scaffold ports added on
/// expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlockVariant {
    #[default]
    Default,
    Instruction,
    Function,
    Getter,
    Each,
    Range,
    Condition,
    Variable,
    Value,
}

impl BlockVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockVariant::Default => "Block",
            BlockVariant::Instruction => "Instruction",
            BlockVariant::Function => "Function",
            BlockVariant::Getter => "Getter",
            BlockVariant::Each => "Each",
            BlockVariant::Range => "Range",
            BlockVariant::Condition => "Condition",
            BlockVariant::Variable => "Variable",
            BlockVariant::Value => "Value",
        }
    }
}

impl fmt::Display for BlockVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A block-level generic: ordered candidates plus resolution state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    candidates: Vec<ValueType>,
    resolved: Option<ValueType>,
}

impl Template {
    pub fn new(candidates: Vec<ValueType>) -> Self {
        Template {
            candidates,
            resolved: None,
        }
    }

    pub fn candidates(&self) -> &[ValueType] {
        &self.candidates
    }

    pub fn resolved(&self) -> Option<&ValueType> {
        self.resolved.as_ref()
    }

    pub fn accepts(&self, ty: &ValueType) -> bool {
        self.candidates.contains(ty)
    }
}

/// Outcome of offering a concrete type to one of a block's value points.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TypeCheck {
    /// Compatible with the point's current type.
    Accepts,
    /// Compatible by resolving the point's generic.
    Resolves { template: String, to: ValueType },
    /// Incompatible with the point's current type.
    Rejects { expected: ValueType },
}

/// A node in the program graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    id: BlockId,
    name: String,
    variant: BlockVariant,
    model: Option<String>,
    /// Declared type of Variable, Getter and Value blocks.
    value_type: Option<ValueType>,
    /// Target class of a Getter block.
    class_type: Option<ValueType>,
    inputs: Vec<Point>,
    outputs: Vec<Point>,
    templates: IndexMap<String, Template>,
}

impl Block {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: BlockId,
        name: String,
        variant: BlockVariant,
        model: Option<String>,
        value_type: Option<ValueType>,
        class_type: Option<ValueType>,
        inputs: Vec<Point>,
        outputs: Vec<Point>,
        templates: IndexMap<String, Template>,
    ) -> Self {
        Block {
            id,
            name,
            variant,
            model,
            value_type,
            class_type,
            inputs,
            outputs,
            templates,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variant(&self) -> BlockVariant {
        self.variant
    }

    /// The model this block was instantiated from, if any.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn value_type(&self) -> Option<&ValueType> {
        self.value_type.as_ref()
    }

    pub fn class_type(&self) -> Option<&ValueType> {
        self.class_type.as_ref()
    }

    pub fn inputs(&self) -> &[Point] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Point] {
        &self.outputs
    }

    pub fn points(&self, direction: Direction) -> &[Point] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    /// Inputs followed by outputs.
    pub fn all_points(&self) -> impl Iterator<Item = &Point> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    pub fn templates(&self) -> &IndexMap<String, Template> {
        &self.templates
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Looks up an input point by name.
    pub fn input(&self, name: &str) -> Result<&Point, GraphError> {
        self.point_by_name(Direction::Input, name)
    }

    /// Looks up an output point by name.
    pub fn output(&self, name: &str) -> Result<&Point, GraphError> {
        self.point_by_name(Direction::Output, name)
    }

    pub fn point_by_name(&self, direction: Direction, name: &str) -> Result<&Point, GraphError> {
        let index = self.index_of(direction, name)?;
        Ok(&self.points(direction)[index])
    }

    /// Position of the named point within its direction.
    pub fn index_of(&self, direction: Direction, name: &str) -> Result<usize, GraphError> {
        self.points(direction)
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| GraphError::PointNotFound {
                block: self.id.clone(),
                direction,
                name: name.to_string(),
            })
    }

    pub fn point(&self, direction: Direction, index: usize) -> Option<&Point> {
        self.points(direction).get(index)
    }

    /// Literal of a Value or Variable block: the value of its `value` output.
    pub fn value(&self) -> Option<&Value> {
        match self.variant {
            BlockVariant::Value | BlockVariant::Variable => self
                .output("value")
                .ok()
                .and_then(|p| p.value().ok().flatten()),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Mutation (graph-internal)
    // -----------------------------------------------------------------------

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn point_mut(&mut self, direction: Direction, index: usize) -> Option<&mut Point> {
        match direction {
            Direction::Input => self.inputs.get_mut(index),
            Direction::Output => self.outputs.get_mut(index),
        }
    }

    /// Decides whether a value of type `incoming` may reach the given point.
    ///
    /// A point bound to an unresolved generic whose candidates contain
    /// `incoming` resolves; otherwise the conversion table decides against the
    /// point's current type. Stream points always reject.
    pub(crate) fn check_type(
        &self,
        direction: Direction,
        index: usize,
        incoming: &ValueType,
        table: &ConversionTable,
    ) -> TypeCheck {
        let Some(point) = self.point(direction, index) else {
            return TypeCheck::Rejects {
                expected: incoming.clone(),
            };
        };
        let Some(current) = point.value_type() else {
            return TypeCheck::Rejects {
                expected: incoming.clone(),
            };
        };

        if let Some(binding) = point.template() {
            if let Some(template) = self.templates.get(&binding.name) {
                if template.resolved.is_none() && template.accepts(incoming) {
                    return TypeCheck::Resolves {
                        template: binding.name.clone(),
                        to: incoming.clone(),
                    };
                }
            }
        }

        if table.compatible(incoming, current) {
            TypeCheck::Accepts
        } else {
            TypeCheck::Rejects {
                expected: current.clone(),
            }
        }
    }

    /// The unresolved generic a point is bound to, if any.
    pub(crate) fn open_template(&self, direction: Direction, index: usize) -> Option<(&str, &Template)> {
        let binding = self.point(direction, index)?.template()?;
        let template = self.templates.get(&binding.name)?;
        template
            .resolved
            .is_none()
            .then_some((binding.name.as_str(), template))
    }

    /// Points bound to the named generic, with their direction and position.
    pub(crate) fn bound_points<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (Direction, usize, &'a Point)> + 'a {
        let inputs = self
            .inputs
            .iter()
            .enumerate()
            .map(|(i, p)| (Direction::Input, i, p));
        let outputs = self
            .outputs
            .iter()
            .enumerate()
            .map(|(i, p)| (Direction::Output, i, p));
        inputs
            .chain(outputs)
            .filter(move |(_, _, p)| p.template().is_some_and(|b| b.name == name))
    }

    /// Fails if a literal stored on a point bound to `name` could not stay
    /// on that point once the generic resolves to `to`. The point at `skip`
    /// is ignored (its literal is about to be replaced).
    pub(crate) fn check_literals(
        &self,
        name: &str,
        to: &ValueType,
        table: &ConversionTable,
        skip: Option<(Direction, usize)>,
    ) -> Result<(), GraphError> {
        for (direction, index, point) in self.bound_points(name) {
            if skip == Some((direction, index)) {
                continue;
            }
            if let Ok(Some(value)) = point.value() {
                let literal = value.value_type();
                if !table.compatible(&literal, to) {
                    return Err(GraphError::IncompatibleTypes {
                        output: literal,
                        input: to.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolves a generic and retypes every point bound to it. Callers
    /// validate the new type against literals and connections first.
    pub(crate) fn resolve_template(&mut self, name: &str, to: ValueType) {
        let Some(template) = self.templates.get_mut(name) else {
            return;
        };
        template.resolved = Some(to.clone());
        for point in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            if point.template().is_some_and(|b| b.name == name) {
                point.set_value_type(to.clone());
            }
        }
        tracing::debug!("template `{}` of block `{}` resolved to `{}`", name, self.id, to);
    }

    /// Returns a resolved generic to its unresolved state once none of its
    /// points is connected or holds a literal. Returns `true` if released.
    pub(crate) fn release_template_if_idle(&mut self, name: &str) -> bool {
        let pinned = self
            .bound_points(name)
            .any(|(_, _, p)| p.is_connected() || matches!(p.value(), Ok(Some(_))));
        if pinned {
            return false;
        }
        let Some(template) = self.templates.get_mut(name) else {
            return false;
        };
        if template.resolved.take().is_none() {
            return false;
        }
        for point in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            let default = match point.template() {
                Some(binding) if binding.name == name => binding.default.clone(),
                _ => continue,
            };
            point.set_value_type(default);
        }
        tracing::debug!("template `{}` of block `{}` released", name, self.id);
        true
    }

    /// Deep, unconnected copy of this block under a new id.
    pub(crate) fn copy_as(&self, id: BlockId) -> Block {
        Block {
            inputs: self.inputs.iter().map(|p| p.copy_for(id.clone())).collect(),
            outputs: self.outputs.iter().map(|p| p.copy_for(id.clone())).collect(),
            id,
            name: self.name.clone(),
            variant: self.variant,
            model: self.model.clone(),
            value_type: self.value_type.clone(),
            class_type: self.class_type.clone(),
            templates: self.templates.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ConnectionId;
    use crate::point::TemplateBinding;

    /// The `mix(x, y, a) -> value` block with a `genType` generic.
    fn mix_block() -> Block {
        let id = BlockId::from("0");
        let bound = |name: &str, direction| {
            Point::value_socket(id.clone(), name, direction, ValueType::Number, None)
                .with_template(TemplateBinding {
                    name: "genType".into(),
                    default: ValueType::Number,
                })
                .with_limit(Some(1))
        };
        let mut templates = IndexMap::new();
        templates.insert(
            "genType".to_string(),
            Template::new(vec![
                ValueType::Number,
                ValueType::Vec2,
                ValueType::Vec3,
                ValueType::Vec4,
            ]),
        );
        Block::from_parts(
            id.clone(),
            "mix".into(),
            BlockVariant::Default,
            None,
            None,
            None,
            vec![
                bound("x", Direction::Input),
                bound("y", Direction::Input),
                Point::value_socket(id.clone(), "a", Direction::Input, ValueType::Number, None),
            ],
            vec![bound("value", Direction::Output)],
            templates,
        )
    }

    #[test]
    fn lookup_by_name_is_namespaced_by_direction() {
        let block = mix_block();
        assert!(block.input("value").is_err());
        assert_eq!(block.output("value").unwrap().name(), "value");
        assert_eq!(block.index_of(Direction::Input, "a").unwrap(), 2);
    }

    #[test]
    fn candidate_type_resolves_template() {
        let block = mix_block();
        let table = ConversionTable::default();
        assert_eq!(
            block.check_type(Direction::Input, 0, &ValueType::Vec3, &table),
            TypeCheck::Resolves {
                template: "genType".into(),
                to: ValueType::Vec3
            }
        );
    }

    #[test]
    fn resolution_retypes_all_bound_points() {
        let mut block = mix_block();
        block.resolve_template("genType", ValueType::Vec3);
        assert_eq!(block.input("x").unwrap().value_type(), Some(&ValueType::Vec3));
        assert_eq!(block.input("y").unwrap().value_type(), Some(&ValueType::Vec3));
        assert_eq!(block.input("a").unwrap().value_type(), Some(&ValueType::Number));
        assert_eq!(block.output("value").unwrap().value_type(), Some(&ValueType::Vec3));
        assert_eq!(block.template("genType").unwrap().resolved(), Some(&ValueType::Vec3));
    }

    #[test]
    fn resolved_template_rejects_other_candidates() {
        let mut block = mix_block();
        let table = ConversionTable::default();
        block.resolve_template("genType", ValueType::Vec3);
        assert_eq!(
            block.check_type(Direction::Input, 1, &ValueType::Vec2, &table),
            TypeCheck::Rejects {
                expected: ValueType::Vec3
            }
        );
    }

    #[test]
    fn non_candidate_falls_back_to_conversion_table() {
        let block = mix_block();
        let table = ConversionTable::default();
        assert_eq!(
            block.check_type(Direction::Input, 0, &ValueType::Boolean, &table),
            TypeCheck::Accepts
        );
        assert_eq!(
            block.check_type(Direction::Input, 0, &ValueType::String, &table),
            TypeCheck::Rejects {
                expected: ValueType::Number
            }
        );
    }

    #[test]
    fn idle_template_is_released() {
        let mut block = mix_block();
        block.resolve_template("genType", ValueType::Vec2);
        block.point_mut(Direction::Input, 0).unwrap().link(ConnectionId(0));
        assert!(!block.release_template_if_idle("genType"));

        block.point_mut(Direction::Input, 0).unwrap().unlink(ConnectionId(0));
        assert!(block.release_template_if_idle("genType"));
        assert_eq!(block.input("y").unwrap().value_type(), Some(&ValueType::Number));
        assert!(block.template("genType").unwrap().resolved().is_none());
    }

    #[test]
    fn literal_pins_resolved_template() {
        let mut block = mix_block();
        block.resolve_template("genType", ValueType::Vec2);
        block
            .point_mut(Direction::Input, 1)
            .unwrap()
            .store_value(Value::from(vec![Value::from(1), Value::from(2)]))
            .unwrap();
        assert!(!block.release_template_if_idle("genType"));
        assert_eq!(block.template("genType").unwrap().resolved(), Some(&ValueType::Vec2));
    }

    #[test]
    fn literals_veto_incompatible_resolution() {
        let mut block = mix_block();
        let table = ConversionTable::default();
        block
            .point_mut(Direction::Input, 0)
            .unwrap()
            .store_value(Value::from(true))
            .unwrap();
        assert!(block.check_literals("genType", &ValueType::Number, &table, None).is_ok());
        assert_eq!(
            block.check_literals("genType", &ValueType::Vec3, &table, None),
            Err(GraphError::IncompatibleTypes {
                output: ValueType::Boolean,
                input: ValueType::Vec3
            })
        );
        assert!(block
            .check_literals("genType", &ValueType::Vec3, &table, Some((Direction::Input, 0)))
            .is_ok());
    }

    #[test]
    fn open_template_only_while_unresolved() {
        let mut block = mix_block();
        assert_eq!(block.open_template(Direction::Output, 0).map(|(n, _)| n), Some("genType"));
        assert!(block.open_template(Direction::Input, 2).is_none());
        block.resolve_template("genType", ValueType::Vec3);
        assert!(block.open_template(Direction::Output, 0).is_none());
        assert_eq!(block.bound_points("genType").count(), 3);
    }

    #[test]
    fn copy_is_independent() {
        let block = mix_block();
        let mut copy = block.copy_as(BlockId::from("1"));
        copy.resolve_template("genType", ValueType::Vec4);
        assert_eq!(copy.id(), &BlockId::from("1"));
        assert_eq!(copy.input("x").unwrap().block(), &BlockId::from("1"));
        assert_eq!(block.input("x").unwrap().value_type(), Some(&ValueType::Number));
    }
}
