//! Declarative graph descriptions.
//!
//! These are the serde types consumed by the [`Loader`](crate::loader::Loader)
//! and produced by [`Graph::describe`](crate::graph::Graph::describe). Keys
//! are camelCase; every field except a connection's endpoints is optional at
//! the serde level so that missing required fields surface as
//! [`GraphError::MissingField`](crate::error::GraphError::MissingField)
//! rather than as parse errors.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockVariant};
use crate::config::GraphConfig;
use crate::point::{Point, PointOrigin, SocketKind};
use crate::types::{Value, ValueType};

/// Named block models supplied alongside a description.
pub type ModelMap = IndexMap<String, BlockDesc>;

/// A whole graph: blocks in creation order, then connections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDesc {
    #[serde(default)]
    pub blocks: Vec<BlockDesc>,
    #[serde(default)]
    pub connections: Vec<ConnectionDesc>,
}

/// One block, or a model when found in a [`ModelMap`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDesc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<BlockVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Generic name -> ordered candidate types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<IndexMap<String, Vec<ValueType>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<PointDesc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<PointDesc>>,
    /// Return port of Instruction and Function blocks.
    #[serde(default, rename = "return", skip_serializing_if = "Option::is_none")]
    pub returns: Option<PointDesc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// One point of a block description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointDesc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_kind: Option<SocketKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,
}

/// A connection between two named points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDesc {
    pub output_block_id: String,
    pub output_point_name: String,
    pub input_block_id: String,
    pub input_point_name: String,
}

impl BlockDesc {
    /// Applies this instance on top of a model: fields present here win,
    /// the rest come from the model. The display name falls back to the
    /// model's name, then to the model key.
    pub fn merged_with(&self, model_name: &str, model: &BlockDesc) -> BlockDesc {
        BlockDesc {
            id: self.id.clone(),
            name: self
                .name
                .clone()
                .or_else(|| model.name.clone())
                .or_else(|| Some(model_name.to_string())),
            variant: self.variant.or(model.variant),
            model: Some(model_name.to_string()),
            templates: self.templates.clone().or_else(|| model.templates.clone()),
            inputs: self.inputs.clone().or_else(|| model.inputs.clone()),
            outputs: self.outputs.clone().or_else(|| model.outputs.clone()),
            returns: self.returns.clone().or_else(|| model.returns.clone()),
            value_type: self.value_type.clone().or_else(|| model.value_type.clone()),
            class_type: self.class_type.clone().or_else(|| model.class_type.clone()),
            value: self.value.clone().or_else(|| model.value.clone()),
        }
    }
}

impl PointDesc {
    pub fn value(name: &str, value_type: ValueType) -> Self {
        PointDesc {
            socket_kind: Some(SocketKind::Value),
            name: Some(name.to_string()),
            value_type: Some(value_type),
            ..PointDesc::default()
        }
    }

    pub fn stream(name: &str) -> Self {
        PointDesc {
            socket_kind: Some(SocketKind::Stream),
            name: Some(name.to_string()),
            ..PointDesc::default()
        }
    }

    /// Describes an existing point. The limit is emitted only when it differs
    /// from the configured default for the socket kind.
    pub(crate) fn from_point(point: &Point, config: &GraphConfig) -> Self {
        let kind = point.socket_kind();
        let (value_type, template) = match point.template() {
            Some(binding) => (Some(binding.default.clone()), Some(binding.name.clone())),
            None => (point.value_type().cloned(), None),
        };
        let max_connections = match point.max_connections() {
            limit if limit == config.default_limit(kind) => None,
            limit => limit,
        };
        PointDesc {
            socket_kind: Some(kind),
            name: Some(point.name().to_string()),
            value_type,
            value: point.value().ok().flatten().cloned(),
            template,
            max_connections,
        }
    }
}

impl ConnectionDesc {
    pub fn new(output_block: &str, output: &str, input_block: &str, input: &str) -> Self {
        ConnectionDesc {
            output_block_id: output_block.to_string(),
            output_point_name: output.to_string(),
            input_block_id: input_block.to_string(),
            input_point_name: input.to_string(),
        }
    }
}

impl Block {
    /// Describes this block so that loading the description rebuilds it.
    /// Scaffold ports are left to variant expansion. Model fields are
    /// already inlined, so the model name is not emitted and the result
    /// loads without the model map.
    pub fn describe(&self, config: &GraphConfig) -> BlockDesc {
        let declared = |points: &[Point]| -> Option<Vec<PointDesc>> {
            let described: Vec<PointDesc> = points
                .iter()
                .filter(|p| p.origin() == PointOrigin::Declared)
                .map(|p| PointDesc::from_point(p, config))
                .collect();
            (!described.is_empty()).then_some(described)
        };

        let returns = self
            .outputs()
            .iter()
            .find(|p| p.origin() == PointOrigin::Return)
            .map(|p| PointDesc::from_point(p, config));

        let templates = (!self.templates().is_empty()).then(|| {
            self.templates()
                .iter()
                .map(|(name, t)| (name.clone(), t.candidates().to_vec()))
                .collect()
        });

        BlockDesc {
            id: Some(self.id().to_string()),
            name: Some(self.name().to_string()),
            variant: (self.variant() != BlockVariant::Default).then_some(self.variant()),
            model: None,
            templates,
            inputs: declared(self.inputs()),
            outputs: declared(self.outputs()),
            returns,
            value_type: self.value_type().cloned(),
            class_type: self.class_type().cloned(),
            value: self.value().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_description_keys() {
        let desc: GraphDesc = serde_json::from_str(
            r#"{
                "blocks": [
                    {"id": "0", "inputs": [
                        {"socketKind": "Value", "name": "in", "valueType": "Number", "value": 64}
                    ]},
                    {"id": "1", "variant": "Instruction", "return": {"valueType": "String"}}
                ],
                "connections": [
                    {"outputBlockId": "1", "outputPointName": "value", "inputBlockId": "0", "inputPointName": "in"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(desc.blocks.len(), 2);
        let input = &desc.blocks[0].inputs.as_ref().unwrap()[0];
        assert_eq!(input.value_type, Some(ValueType::Number));
        assert_eq!(input.value, Some(Value::Number(64.0)));
        assert_eq!(desc.blocks[1].variant, Some(BlockVariant::Instruction));
        assert_eq!(
            desc.blocks[1].returns.as_ref().unwrap().value_type,
            Some(ValueType::String)
        );
        assert_eq!(desc.connections[0], ConnectionDesc::new("1", "value", "0", "in"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let desc: BlockDesc = serde_json::from_str(r#"{"": ""}"#).unwrap();
        assert!(desc.id.is_none());
    }

    #[test]
    fn instance_fields_override_model() {
        let model = BlockDesc {
            inputs: Some(vec![PointDesc::value("is_true", ValueType::Boolean)]),
            ..BlockDesc::default()
        };
        let plain = BlockDesc {
            id: Some("0".into()),
            model: Some("do_stuff".into()),
            ..BlockDesc::default()
        };
        let named = BlockDesc {
            name: Some("custom_name".into()),
            ..plain.clone()
        };

        let merged = plain.merged_with("do_stuff", &model);
        assert_eq!(merged.name.as_deref(), Some("do_stuff"));
        assert_eq!(merged.inputs, model.inputs);
        assert_eq!(merged.id.as_deref(), Some("0"));

        let merged = named.merged_with("do_stuff", &model);
        assert_eq!(merged.name.as_deref(), Some("custom_name"));
    }

    #[test]
    fn connection_desc_snapshot() {
        insta::assert_json_snapshot!(ConnectionDesc::new("1", "out", "0", "in"), @r###"
        {
          "outputBlockId": "1",
          "outputPointName": "out",
          "inputBlockId": "0",
          "inputPointName": "in"
        }
        "###);
    }
}
