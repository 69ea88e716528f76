//! Typed configuration model
//!
//! A [`Model`] bundles the schema tree, the enum label table and the model
//! identities the server advertises. It turns encoded JSON into a validated
//! [`ConfigRoot`], encodes roots and subtrees back to JSON, and answers
//! schema questions for paths.

mod codec;
mod typed;

pub use codec::JsonStyle;
pub use typed::{ConfigRoot, Fields, Located, NodeRef, Scalar, TypedNode};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::schema::{LeafKind, LeafSchema, SchemaError, SchemaNode};
use crate::types::{ModelData, Path};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("{at}: unknown field {field}")]
    UnknownField { at: String, field: String },

    #[error("{0} is not in the schema")]
    NotInSchema(String),

    #[error("{at}: expected {expected}, got {found}")]
    TypeMismatch {
        at: String,
        expected: String,
        found: String,
    },

    #[error("{at}: {label} is not a label of enum {enum_type}")]
    UnknownEnumLabel {
        at: String,
        enum_type: String,
        label: String,
    },

    #[error("enum {enum_type} has no label for value {value}")]
    UnknownEnumValue { enum_type: String, value: i64 },

    #[error("{at}: list entry is missing key {key}")]
    MissingKey { at: String, key: String },

    #[error("{at}: duplicate list entry for keys {keys:?}")]
    DuplicateKey { at: String, keys: Vec<String> },

    #[error("{at}: invalid key: {reason}")]
    InvalidKey { at: String, reason: String },

    #[error("{at}: more than one case of choice {choice} is set")]
    MultipleCases { at: String, choice: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Label of one enum value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub name: String,
}

/// Enum type name to (numeric value to label).
pub type EnumTable = BTreeMap<String, BTreeMap<i64, EnumDefinition>>;

/// On-disk form of a model: identities, schema and enum table together.
#[derive(Debug, Deserialize)]
struct ModelFile {
    #[serde(default)]
    models: Vec<ModelData>,
    schema: SchemaNode,
    #[serde(default)]
    enums: EnumTable,
}

/// What a path addresses once checked against the schema.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Root, container, whole list, or a single list entry (`entry`).
    Subtree {
        schema: &'a SchemaNode,
        entry: bool,
        module: Option<&'a str>,
    },
    Leaf(&'a LeafSchema),
}

#[derive(Debug)]
pub struct Model {
    model_data: Vec<ModelData>,
    schema: SchemaNode,
    enums: EnumTable,
}

impl Model {
    pub fn new(
        model_data: Vec<ModelData>,
        schema: SchemaNode,
        enums: EnumTable,
    ) -> Result<Self, SchemaError> {
        schema.check()?;
        Ok(Self {
            model_data,
            schema,
            enums,
        })
    }

    /// Load identities, schema and enums from one JSON document.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let file: ModelFile = serde_json::from_str(json)?;
        Ok(Self::new(file.models, file.schema, file.enums)?)
    }

    pub fn model_data(&self) -> &[ModelData] {
        &self.model_data
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    pub fn enums(&self) -> &EnumTable {
        &self.enums
    }

    pub fn supports(&self, model: &ModelData) -> bool {
        self.model_data.iter().any(|m| m == model)
    }

    pub fn enum_label(&self, enum_type: &str, value: i64) -> Option<&str> {
        self.enums
            .get(enum_type)?
            .get(&value)
            .map(|def| def.name.as_str())
    }

    pub fn enum_value(&self, enum_type: &str, label: &str) -> Option<i64> {
        self.enums
            .get(enum_type)?
            .iter()
            .find(|(_, def)| def.name == label)
            .map(|(value, _)| *value)
    }

    /// An empty, valid configuration.
    pub fn empty_root(&self) -> ConfigRoot {
        ConfigRoot::default()
    }

    /// Construct a validated root from encoded JSON (any of the encodings).
    pub fn new_root(&self, bytes: &[u8]) -> Result<ConfigRoot, ModelError> {
        let value: Value = serde_json::from_slice(bytes)?;
        self.new_root_from_value(&value)
    }

    pub fn new_root_from_value(&self, value: &Value) -> Result<ConfigRoot, ModelError> {
        let fields = self.decode_object(&self.schema, None, value, "")?;
        Ok(ConfigRoot::new(fields))
    }

    /// Check that `value` is acceptable for a leaf of `kind`.
    pub fn check_leaf(&self, kind: &LeafKind, value: &Value) -> Result<(), ModelError> {
        self.decode_scalar(kind, value, "leaf").map(|_| ())
    }

    /// Validate a subtree payload for `target` and re-encode it in the
    /// unqualified IETF style used by the working tree.
    pub fn normalize_subtree(&self, target: Target<'_>, value: &Value) -> Result<Value, ModelError> {
        match target {
            Target::Leaf(leaf) => {
                self.check_leaf(&leaf.kind, value)?;
                Ok(value.clone())
            }
            Target::Subtree {
                schema,
                entry,
                module,
            } => {
                if let (SchemaNode::List(_), false) = (schema, entry) {
                    let Some(node) = self.decode_node(schema, module, value, "list")? else {
                        return Ok(Value::Array(Vec::new()));
                    };
                    let located = Located {
                        node: node.as_node_ref(),
                        schema,
                        module,
                    };
                    return Ok(self.encode(&located, JsonStyle::Ietf));
                }
                let fields = self.decode_object(schema, module, value, "subtree")?;
                Ok(Value::Object(self.encode_fields(
                    schema,
                    &fields,
                    module,
                    JsonStyle::Ietf,
                )))
            }
        }
    }

    /// Walk `path` through the schema, checking element names, key names and
    /// key values. Deprecated string elements are not looked at.
    pub fn resolve_target(&self, path: &Path) -> Result<Target<'_>, ModelError> {
        let mut schema = &self.schema;
        let mut module: Option<&str> = None;
        let mut entry = false;
        let mut walked = String::new();

        for elem in &path.elem {
            match schema {
                SchemaNode::Leaf(_) => {
                    return Err(ModelError::NotInSchema(format!("{walked}/{}", elem.name)));
                }
                SchemaNode::List(_) if !entry => {
                    return Err(ModelError::InvalidKey {
                        at: walked,
                        reason: "list addressed without keys".to_string(),
                    });
                }
                _ => {}
            }
            walked.push('/');
            walked.push_str(&elem.to_string());

            let child = schema
                .find_child(&elem.name)
                .ok_or_else(|| ModelError::NotInSchema(walked.clone()))?;
            entry = false;
            if elem.has_key() {
                let SchemaNode::List(list) = child else {
                    return Err(ModelError::InvalidKey {
                        at: walked,
                        reason: "keys given for a node that is not a list".to_string(),
                    });
                };
                if elem.key.len() != list.keys.len() {
                    return Err(ModelError::InvalidKey {
                        at: walked,
                        reason: format!("expected keys {:?}", list.keys),
                    });
                }
                for (name, text) in &elem.key {
                    let Some(SchemaNode::Leaf(key_leaf)) = list
                        .keys
                        .contains(name)
                        .then(|| list.children.get(name))
                        .flatten()
                    else {
                        return Err(ModelError::InvalidKey {
                            at: walked,
                            reason: format!("{name} is not a key"),
                        });
                    };
                    if let Err(e) =
                        self.decode_scalar(&key_leaf.kind, &Value::String(text.clone()), &walked)
                    {
                        return Err(ModelError::InvalidKey {
                            at: walked,
                            reason: e.to_string(),
                        });
                    }
                }
                entry = true;
            }
            module = child.module().or(module);
            schema = child;
        }

        match schema {
            SchemaNode::Leaf(leaf) => Ok(Target::Leaf(leaf)),
            other => Ok(Target::Subtree {
                schema: other,
                entry,
                module,
            }),
        }
    }
}
