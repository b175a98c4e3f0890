//! Variant expansion: from a block description to a concrete [`Block`].
//!
//! Every variant goes through [`expand`], which prepends and appends the
//! variant's scaffold ports around the declared ones and resolves each
//! port's value type:
//!
//! | Variant     | Inputs                                   | Outputs                                   |
//! |-------------|------------------------------------------|-------------------------------------------|
//! | Default     | declared                                 | declared                                  |
//! | Instruction | `in`~, declared                          | `out`~, declared, return                  |
//! | Function    | declared                                 | return, declared                          |
//! | Getter      | `this`:class, declared                   | `value`:type, declared                    |
//! | Each        | `in`~, `list`:Array, declared            | `completed`~, `loop`~, `index`, `item`?   |
//! | Range       | `in`~, `start`, `end`, `step`, declared  | `completed`~, `loop`~, `index`, declared  |
//! | Condition   | `in`~, `test`:Boolean, declared          | `true`~, `false`~, declared               |
//! | Variable    | declared                                 | `value`:type, declared                    |
//! | Value       | declared                                 | `value`:literal, declared                 |
//!
//! `~` marks stream ports; `item` exists only when the Each block declares a
//! value type.

use indexmap::IndexMap;

use crate::block::{Block, BlockVariant, Template};
use crate::config::GraphConfig;
use crate::desc::{BlockDesc, PointDesc};
use crate::error::GraphError;
use crate::id::{BlockId, Direction};
use crate::point::{Point, PointOrigin, SocketKind, TemplateBinding};
use crate::types::{Value, ValueType};

/// Name of the return port when the return description has none.
pub const DEFAULT_RETURN_NAME: &str = "value";

/// Expands a (model-merged) block description into a block.
pub fn expand(id: BlockId, desc: &BlockDesc, config: &GraphConfig) -> Result<Block, GraphError> {
    let variant = desc.variant.unwrap_or_default();
    let templates: IndexMap<String, Template> = desc
        .templates
        .iter()
        .flatten()
        .map(|(name, candidates)| (name.clone(), Template::new(candidates.clone())))
        .collect();

    let ctx = Expansion {
        block: &id,
        templates: &templates,
        config,
    };

    let declared_inputs = ctx.declared(desc.inputs.as_deref(), Direction::Input)?;
    let declared_outputs = ctx.declared(desc.outputs.as_deref(), Direction::Output)?;
    let returns = desc
        .returns
        .as_ref()
        .map(|r| ctx.return_point(r))
        .transpose()?;

    let mut value_type = desc.value_type.clone();
    let mut class_type = None;

    let (inputs, outputs) = match variant {
        BlockVariant::Default => (declared_inputs, declared_outputs),
        BlockVariant::Instruction => (
            prepend(vec![ctx.stream("in", Direction::Input)], declared_inputs),
            prepend(vec![ctx.stream("out", Direction::Output)], declared_outputs)
                .into_iter()
                .chain(returns)
                .collect(),
        ),
        BlockVariant::Function => (
            declared_inputs,
            returns.into_iter().chain(declared_outputs).collect(),
        ),
        BlockVariant::Getter => {
            let class = desc.class_type.clone().ok_or_else(|| GraphError::MissingField {
                field: "classType",
                context: format!("Getter block `{}`", id),
            })?;
            let ty = ctx.required_type(desc, "value")?;
            class_type = Some(class.clone());
            (
                prepend(
                    vec![ctx.data("this", Direction::Input, class, None)],
                    declared_inputs,
                ),
                prepend(
                    vec![ctx.data("value", Direction::Output, ty, None)],
                    declared_outputs,
                ),
            )
        }
        BlockVariant::Each => {
            let mut scaffold = vec![
                ctx.stream("completed", Direction::Output),
                ctx.stream("loop", Direction::Output),
                ctx.data("index", Direction::Output, ValueType::Number, None),
            ];
            if let Some(item) = desc.value_type.clone() {
                scaffold.push(ctx.data("item", Direction::Output, item, None));
            }
            (
                prepend(
                    vec![
                        ctx.stream("in", Direction::Input),
                        ctx.data("list", Direction::Input, ValueType::Array, None),
                    ],
                    declared_inputs,
                ),
                prepend(scaffold, declared_outputs),
            )
        }
        BlockVariant::Range => (
            prepend(
                vec![
                    ctx.stream("in", Direction::Input),
                    ctx.data("start", Direction::Input, ValueType::Number, Some(Value::from(0))),
                    ctx.data("end", Direction::Input, ValueType::Number, Some(Value::from(0))),
                    ctx.data("step", Direction::Input, ValueType::Number, Some(Value::from(1))),
                ],
                declared_inputs,
            ),
            prepend(
                vec![
                    ctx.stream("completed", Direction::Output),
                    ctx.stream("loop", Direction::Output),
                    ctx.data("index", Direction::Output, ValueType::Number, None),
                ],
                declared_outputs,
            ),
        ),
        BlockVariant::Condition => (
            prepend(
                vec![
                    ctx.stream("in", Direction::Input),
                    ctx.data("test", Direction::Input, ValueType::Boolean, None),
                ],
                declared_inputs,
            ),
            prepend(
                vec![
                    ctx.stream("true", Direction::Output),
                    ctx.stream("false", Direction::Output),
                ],
                declared_outputs,
            ),
        ),
        BlockVariant::Variable => {
            let ty = ctx.required_type(desc, "value")?;
            ctx.check_literal(desc.value.as_ref(), &ty)?;
            value_type = Some(ty.clone());
            (
                declared_inputs,
                prepend(
                    vec![ctx.data("value", Direction::Output, ty, desc.value.clone())],
                    declared_outputs,
                ),
            )
        }
        BlockVariant::Value => {
            let ty = desc
                .value_type
                .clone()
                .or_else(|| desc.value.as_ref().map(Value::value_type))
                .ok_or_else(|| GraphError::MissingValueType {
                    block: id.clone(),
                    point: "value".into(),
                })?;
            ctx.check_literal(desc.value.as_ref(), &ty)?;
            value_type = Some(ty.clone());
            (
                declared_inputs,
                prepend(
                    vec![ctx.data("value", Direction::Output, ty, desc.value.clone())],
                    declared_outputs,
                ),
            )
        }
    };

    check_unique_names(&id, &inputs, Direction::Input)?;
    check_unique_names(&id, &outputs, Direction::Output)?;

    let name = desc
        .name
        .clone()
        .unwrap_or_else(|| variant.as_str().to_string());

    let pins = literal_pins(&inputs, &outputs, &templates)?;
    let mut block = Block::from_parts(
        id,
        name,
        variant,
        desc.model.clone(),
        value_type,
        class_type,
        inputs,
        outputs,
        templates,
    );
    for (template, ty) in pins {
        block.check_literals(&template, &ty, &config.conversions, None)?;
        block.resolve_template(&template, ty);
    }
    Ok(block)
}

/// Generics fixed by a literal of one of their candidate types. Two
/// literals pinning one generic to different types conflict.
fn literal_pins(
    inputs: &[Point],
    outputs: &[Point],
    templates: &IndexMap<String, Template>,
) -> Result<IndexMap<String, ValueType>, GraphError> {
    let mut pins: IndexMap<String, ValueType> = IndexMap::new();
    for point in inputs.iter().chain(outputs) {
        let (Some(binding), Ok(Some(value))) = (point.template(), point.value()) else {
            continue;
        };
        let ty = value.value_type();
        if !templates.get(&binding.name).is_some_and(|t| t.accepts(&ty)) {
            continue;
        }
        match pins.get(&binding.name) {
            Some(pinned) if *pinned != ty => {
                return Err(GraphError::IncompatibleTypes {
                    output: ty,
                    input: pinned.clone(),
                })
            }
            Some(_) => {}
            None => {
                pins.insert(binding.name.clone(), ty);
            }
        }
    }
    Ok(pins)
}

fn prepend(mut scaffold: Vec<Point>, declared: Vec<Point>) -> Vec<Point> {
    scaffold.extend(declared);
    scaffold
}

fn check_unique_names(block: &BlockId, points: &[Point], direction: Direction) -> Result<(), GraphError> {
    for (i, point) in points.iter().enumerate() {
        if points[..i].iter().any(|p| p.name() == point.name()) {
            return Err(GraphError::DuplicatePoint {
                block: block.clone(),
                direction,
                name: point.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Shared state while expanding one block.
struct Expansion<'a> {
    block: &'a BlockId,
    templates: &'a IndexMap<String, Template>,
    config: &'a GraphConfig,
}

impl Expansion<'_> {
    fn stream(&self, name: &str, direction: Direction) -> Point {
        Point::stream_socket(self.block.clone(), name, direction)
            .with_limit(self.config.default_limit(SocketKind::Stream))
            .with_origin(PointOrigin::Generated)
    }

    fn data(&self, name: &str, direction: Direction, ty: ValueType, value: Option<Value>) -> Point {
        Point::value_socket(self.block.clone(), name, direction, ty, value)
            .with_limit(self.config.default_limit(SocketKind::Value))
            .with_origin(PointOrigin::Generated)
    }

    fn declared(
        &self,
        descs: Option<&[PointDesc]>,
        direction: Direction,
    ) -> Result<Vec<Point>, GraphError> {
        descs
            .unwrap_or_default()
            .iter()
            .map(|d| self.point(d, direction))
            .collect()
    }

    fn return_point(&self, desc: &PointDesc) -> Result<Point, GraphError> {
        let mut desc = desc.clone();
        desc.name.get_or_insert_with(|| DEFAULT_RETURN_NAME.to_string());
        Ok(self
            .point(&desc, Direction::Output)?
            .with_origin(PointOrigin::Return))
    }

    /// Builds one declared point, resolving its value type: a literal typed
    /// as one of the generic's candidates, else the explicit type, else the
    /// literal's type, else the template default.
    fn point(&self, desc: &PointDesc, direction: Direction) -> Result<Point, GraphError> {
        let name = desc.name.clone().ok_or_else(|| GraphError::MissingField {
            field: "name",
            context: format!("a point of block `{}`", self.block),
        })?;
        let kind = desc.socket_kind.unwrap_or_default();
        let limit = desc
            .max_connections
            .or_else(|| self.config.default_limit(kind));

        if kind == SocketKind::Stream {
            if desc.value.is_some() {
                return Err(GraphError::NoValueOnStream {
                    block: self.block.clone(),
                    point: name,
                });
            }
            return Ok(Point::stream_socket(self.block.clone(), name, direction).with_limit(limit));
        }

        let generic = match &desc.template {
            Some(template) => Some((
                template,
                self.templates.get(template).ok_or_else(|| GraphError::TemplateNotFound {
                    block: self.block.clone(),
                    point: name.clone(),
                    template: template.clone(),
                })?,
            )),
            None => None,
        };
        let literal_ty = desc.value.as_ref().map(Value::value_type);
        let template_default = desc
            .value_type
            .clone()
            .or_else(|| generic.and_then(|(_, t)| t.candidates().first().cloned()));

        // A literal whose type is a candidate of the point's generic types
        // the point directly; `expand` then resolves the generic to it.
        let candidate_literal = literal_ty
            .clone()
            .filter(|ty| generic.is_some_and(|(_, t)| t.accepts(ty)));
        let value_type = candidate_literal
            .clone()
            .or_else(|| desc.value_type.clone())
            .or_else(|| literal_ty.clone())
            .or_else(|| template_default.clone())
            .ok_or_else(|| GraphError::MissingValueType {
                block: self.block.clone(),
                point: name.clone(),
            })?;
        let binding = generic.map(|(template, _)| TemplateBinding {
            name: template.clone(),
            default: template_default
                .clone()
                .unwrap_or_else(|| value_type.clone()),
        });
        if candidate_literal.is_none() {
            let expected = match &binding {
                Some(binding) => &binding.default,
                None => &value_type,
            };
            self.check_literal(desc.value.as_ref(), expected)?;
        }

        let point = Point::value_socket(
            self.block.clone(),
            name,
            direction,
            value_type,
            desc.value.clone(),
        )
        .with_limit(limit);
        Ok(match binding {
            Some(binding) => point.with_template(binding),
            None => point,
        })
    }

    fn required_type(&self, desc: &BlockDesc, point: &str) -> Result<ValueType, GraphError> {
        desc.value_type
            .clone()
            .ok_or_else(|| GraphError::MissingValueType {
                block: self.block.clone(),
                point: point.to_string(),
            })
    }

    fn check_literal(&self, value: Option<&Value>, ty: &ValueType) -> Result<(), GraphError> {
        match value {
            Some(v) if !self.config.conversions.compatible(&v.value_type(), ty) => {
                Err(GraphError::IncompatibleTypes {
                    output: v.value_type(),
                    input: ty.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}
