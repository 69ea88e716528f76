//! Walking a generic JSON tree alongside its schema

use serde_json::{Map, Number, Value};
use tracing::{error, warn};

use crate::schema::{LeafKind, SchemaNode};
use crate::types::PathElem;

/// A resolved child: its schema, and the tree node if it exists (or was
/// created).
#[derive(Debug)]
pub struct Child<'t, 's> {
    pub value: Option<&'t mut Value>,
    pub schema: &'s SchemaNode,
}

/// Resolve one path element below `node`.
///
/// Returns `None` when the name is not a child in the schema. When the name
/// resolves but the tree has no such node (and `create` is false) the child
/// is returned without a value.
pub fn resolve_child<'t, 's>(
    node: &'t mut Map<String, Value>,
    schema: &'s SchemaNode,
    elem: &PathElem,
    create: bool,
) -> Option<Child<'t, 's>> {
    let child_schema = schema.find_child(&elem.name)?;
    let value = if elem.has_key() {
        keyed_list_lookup(node, elem, child_schema, create)
    } else if create {
        Some(
            node.entry(elem.name.clone())
                .or_insert_with(|| Value::Object(Map::new())),
        )
    } else {
        node.get_mut(&elem.name)
    };
    Some(Child {
        value,
        schema: child_schema,
    })
}

/// Find the list entry whose key fields equal `elem.key` exactly.
///
/// `list` is the schema of the keyed list. Every key field of the list must
/// be given and match after formatting the stored value as text; a subset or
/// superset never matches. With `create` a missing entry is appended,
/// creating the list when absent.
pub fn keyed_list_lookup<'t>(
    node: &'t mut Map<String, Value>,
    elem: &PathElem,
    list: &SchemaNode,
    create: bool,
) -> Option<&'t mut Value> {
    let keys = list.list_keys().unwrap_or_default();
    let position = match node.get(&elem.name) {
        Some(Value::Array(entries)) => find_entry(entries, elem, keys)?,
        Some(_) => {
            error!(list = %elem.name, "keyed list field does not hold a list");
            return None;
        }
        None => None,
    };

    if let Some(i) = position {
        return node.get_mut(&elem.name)?.as_array_mut()?.get_mut(i);
    }
    if !create {
        warn!(elem = %elem, "no list entry matches the given keys");
        return None;
    }

    let mut entry = Map::new();
    for (k, v) in &elem.key {
        entry.insert(k.clone(), coerce_key_value(v, key_kind(list, k)));
    }
    let entries = node
        .entry(elem.name.clone())
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()?;
    entries.push(Value::Object(entry));
    entries.last_mut()
}

/// Remove the entry matching `elem.key` exactly. Removing the last entry
/// removes the list field; other entries keep their order.
pub fn delete_keyed_list_entry(
    node: &mut Map<String, Value>,
    elem: &PathElem,
    keys: &[String],
) -> bool {
    let Some(Value::Array(entries)) = node.get_mut(&elem.name) else {
        return false;
    };
    let Some(Some(i)) = find_entry(entries, elem, keys) else {
        return false;
    };
    if entries.len() == 1 {
        node.remove(&elem.name);
    } else {
        entries.remove(i);
    }
    true
}

/// Index of the matching entry. The outer `None` signals a malformed list.
fn find_entry(entries: &[Value], elem: &PathElem, keys: &[String]) -> Option<Option<usize>> {
    if elem.key.len() != keys.len() {
        return Some(None);
    }
    for (i, entry) in entries.iter().enumerate() {
        let Value::Object(fields) = entry else {
            error!(list = %elem.name, index = i, "list entry is not an object");
            return None;
        };
        let matches = keys.iter().all(|k| match (elem.key.get(k), fields.get(k)) {
            (Some(wanted), Some(stored)) => {
                format_key_value(stored).as_deref() == Some(wanted.as_str())
            }
            _ => false,
        });
        if matches {
            return Some(Some(i));
        }
    }
    Some(None)
}

/// Text form of a stored key value; `None` for containers and null.
pub fn format_key_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Leaf kind of key field `key` of `list`.
pub fn key_kind<'s>(list: &'s SchemaNode, key: &str) -> Option<&'s LeafKind> {
    list.find_child(key)?.as_leaf().map(|leaf| &leaf.kind)
}

/// Key text as the JSON value stored for a key leaf of `kind`.
///
/// Integer and decimal keys become numbers when the text parses; every other
/// kind, or an unknown one, keeps the text as given.
pub fn coerce_key_value(text: &str, kind: Option<&LeafKind>) -> Value {
    let number = match kind {
        Some(LeafKind::Int8 | LeafKind::Int16 | LeafKind::Int32 | LeafKind::Int64) => {
            text.parse::<i64>().ok().map(Number::from)
        }
        Some(LeafKind::Uint8 | LeafKind::Uint16 | LeafKind::Uint32 | LeafKind::Uint64) => {
            text.parse::<u64>().ok().map(Number::from)
        }
        Some(LeafKind::Decimal64) => text
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(Number::from_f64),
        _ => None,
    };
    number
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}
