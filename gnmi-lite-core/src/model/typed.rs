//! Typed configuration nodes
//!
//! Data nodes are keyed by their unqualified schema name. Children of
//! choice cases sit directly in the enclosing node's fields, as they do in
//! encoded JSON.

use serde_json::Value;
use std::collections::BTreeMap;

use super::{JsonStyle, Model};
use crate::schema::SchemaNode;
use crate::types::{Path, PathElem};

pub type Fields = BTreeMap<String, TypedNode>;

/// A typed leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Bool(bool),
    Binary(Vec<u8>),
    Enum { type_name: String, value: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedNode {
    Container(Fields),
    /// Keyed list entries in insertion order; never empty.
    List(Vec<Fields>),
    Leaf(Scalar),
}

impl TypedNode {
    pub fn as_node_ref(&self) -> NodeRef<'_> {
        match self {
            Self::Container(fields) => NodeRef::Container(fields),
            Self::List(entries) => NodeRef::List(entries),
            Self::Leaf(scalar) => NodeRef::Leaf(scalar),
        }
    }
}

/// Borrowed view of a node found by path.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Leaf(&'a Scalar),
    /// The root, a container or a single list entry.
    Container(&'a Fields),
    /// A whole keyed list.
    List(&'a [Fields]),
}

/// A node together with its schema and effective module.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub node: NodeRef<'a>,
    pub schema: &'a SchemaNode,
    pub module: Option<&'a str>,
}

/// A complete, validated configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigRoot {
    fields: Fields,
}

impl ConfigRoot {
    pub(crate) fn new(fields: Fields) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode the whole configuration.
    pub fn to_json(&self, model: &Model, style: JsonStyle) -> Value {
        Value::Object(model.encode_fields(model.schema(), &self.fields, None, style))
    }

    /// Look up the node at `path`. Keyed elements must name every key of the
    /// list exactly; anything else is treated as absent.
    pub fn get_node<'a>(&'a self, model: &'a Model, path: &Path) -> Option<Located<'a>> {
        let mut here = Located {
            node: NodeRef::Container(&self.fields),
            schema: model.schema(),
            module: None,
        };
        for elem in &path.elem {
            let NodeRef::Container(fields) = here.node else {
                return None;
            };
            let schema = here.schema.find_child(&elem.name)?;
            let child = fields.get(&elem.name)?;
            let node = match (child, elem.has_key()) {
                (TypedNode::List(entries), true) => {
                    let keys = schema.list_keys()?;
                    let entry = entries
                        .iter()
                        .find(|entry| entry_matches(model, entry, keys, elem))?;
                    NodeRef::Container(entry)
                }
                (_, true) => return None,
                (other, false) => other.as_node_ref(),
            };
            here = Located {
                node,
                schema,
                module: schema.module().or(here.module),
            };
        }
        Some(here)
    }
}

fn entry_matches(model: &Model, entry: &Fields, keys: &[String], elem: &PathElem) -> bool {
    elem.key.len() == keys.len()
        && keys.iter().all(|key| {
            let stored = match entry.get(key) {
                Some(TypedNode::Leaf(scalar)) => model.scalar_text(scalar),
                _ => return false,
            };
            elem.key.get(key) == Some(&stored)
        })
}
