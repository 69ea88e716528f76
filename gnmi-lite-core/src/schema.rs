//! Schema tree describing the shape of the configuration
//!
//! A schema is a tree of tagged nodes. Containers and lists hold named
//! children; choices hold named cases whose children appear in the data as if
//! they belonged to the enclosing node. Choices never appear in paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema root must be a container")]
    RootNotContainer,

    #[error("list {list}: key {key} is not a leaf child")]
    KeyNotLeaf { list: String, key: String },

    #[error("list {0} has no keys")]
    ListWithoutKeys(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    Container(ContainerSchema),
    List(ListSchema),
    Leaf(LeafSchema),
    Choice(ChoiceSchema),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub children: BTreeMap<String, SchemaNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub keys: Vec<String>,
    #[serde(default)]
    pub children: BTreeMap<String, SchemaNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(rename = "type")]
    pub kind: LeafKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceSchema {
    pub cases: BTreeMap<String, CaseSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSchema {
    #[serde(default)]
    pub children: BTreeMap<String, SchemaNode>,
}

/// Value type of a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal64,
    String,
    Boolean,
    Binary,
    /// Enumerated leaf; the payload names the enum type in the enum table.
    Enumeration(String),
}

impl LeafKind {
    /// Kinds that IETF JSON carries as decimal strings.
    pub fn is_64bit(&self) -> bool {
        matches!(self, Self::Int64 | Self::Uint64)
    }

    /// Inclusive range of a signed integer kind.
    pub fn signed_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::Int8 => Some((i8::MIN.into(), i8::MAX.into())),
            Self::Int16 => Some((i16::MIN.into(), i16::MAX.into())),
            Self::Int32 => Some((i32::MIN.into(), i32::MAX.into())),
            Self::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Upper bound of an unsigned integer kind.
    pub fn unsigned_max(&self) -> Option<u64> {
        match self {
            Self::Uint8 => Some(u8::MAX.into()),
            Self::Uint16 => Some(u16::MAX.into()),
            Self::Uint32 => Some(u32::MAX.into()),
            Self::Uint64 => Some(u64::MAX),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Decimal64 => "decimal64",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Binary => "binary",
            Self::Enumeration(name) => name,
        }
    }
}

impl CaseSchema {
    /// True if `name` is a data child of this case, looking through nested
    /// choices.
    pub fn contains(&self, name: &str) -> bool {
        find_in(&self.children, name).is_some()
    }
}

impl SchemaNode {
    /// Children of a container or list; empty for leaves and choices.
    pub fn children(&self) -> Option<&BTreeMap<String, SchemaNode>> {
        match self {
            Self::Container(c) => Some(&c.children),
            Self::List(l) => Some(&l.children),
            Self::Leaf(_) | Self::Choice(_) => None,
        }
    }

    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Container(c) => c.module.as_deref(),
            Self::List(l) => l.module.as_deref(),
            Self::Leaf(l) => l.module.as_deref(),
            Self::Choice(_) => None,
        }
    }

    /// Key field names when this is a list.
    pub fn list_keys(&self) -> Option<&[String]> {
        match self {
            Self::List(l) => Some(&l.keys),
            _ => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafSchema> {
        match self {
            Self::Leaf(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, Self::Choice(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Resolve a data child by name.
    ///
    /// Direct children win; otherwise the choices among the children are
    /// searched case by case, descending into nested choices.
    pub fn find_child(&self, name: &str) -> Option<&SchemaNode> {
        find_in(self.children()?, name)
    }

    /// Validate structural rules for a schema root.
    pub fn check(&self) -> Result<(), SchemaError> {
        match self {
            Self::Container(c) => check_children("", &c.children),
            _ => Err(SchemaError::RootNotContainer),
        }
    }
}

fn find_in<'a>(children: &'a BTreeMap<String, SchemaNode>, name: &str) -> Option<&'a SchemaNode> {
    if let Some(child) = children.get(name) {
        if !child.is_choice() {
            return Some(child);
        }
    }
    children.values().find_map(|child| match child {
        SchemaNode::Choice(choice) => choice
            .cases
            .values()
            .find_map(|case| find_in(&case.children, name)),
        _ => None,
    })
}

fn check_children(parent: &str, children: &BTreeMap<String, SchemaNode>) -> Result<(), SchemaError> {
    for (name, child) in children {
        let here = if parent.is_empty() {
            name.clone()
        } else {
            format!("{parent}/{name}")
        };
        match child {
            SchemaNode::Container(c) => check_children(&here, &c.children)?,
            SchemaNode::List(l) => {
                if l.keys.is_empty() {
                    return Err(SchemaError::ListWithoutKeys(here));
                }
                for key in &l.keys {
                    if !matches!(l.children.get(key), Some(SchemaNode::Leaf(_))) {
                        return Err(SchemaError::KeyNotLeaf {
                            list: here.clone(),
                            key: key.clone(),
                        });
                    }
                }
                check_children(&here, &l.children)?;
            }
            SchemaNode::Leaf(_) => {}
            SchemaNode::Choice(choice) => {
                for case in choice.cases.values() {
                    check_children(&here, &case.children)?;
                }
            }
        }
    }
    Ok(())
}
