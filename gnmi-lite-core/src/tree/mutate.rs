//! Writing values into a generic JSON tree

use serde_json::{Map, Value};

use super::navigate::{coerce_key_value, format_key_value, key_kind, keyed_list_lookup};
use crate::error::{GnmiError, GnmiResult};
use crate::schema::SchemaNode;
use crate::types::{Operation, PathElem};

/// Assign `value` to the child `elem` of `node`.
///
/// Unkeyed children are set outright on Replace, when absent or when the
/// value is not an object; otherwise the value's fields are merged into the
/// existing object. An empty array removes the field. Keyed children locate
/// (or create) the list entry first, then write key fields and merge.
/// `schema` describes the child.
pub fn assign_child(
    op: Operation,
    node: &mut Map<String, Value>,
    elem: &PathElem,
    schema: &SchemaNode,
    value: Value,
) -> GnmiResult<()> {
    if elem.has_key() {
        assign_list_entry(op, node, elem, schema, value)
    } else {
        assign_field(op, node, &elem.name, value)
    }
}

fn assign_field(
    op: Operation,
    node: &mut Map<String, Value>,
    name: &str,
    value: Value,
) -> GnmiResult<()> {
    if matches!(&value, Value::Array(items) if items.is_empty()) {
        node.remove(name);
        return Ok(());
    }
    let merge = op == Operation::Update && value.is_object() && node.contains_key(name);
    if !merge {
        node.insert(name.to_string(), value);
        return Ok(());
    }
    let (Some(Value::Object(existing)), Value::Object(incoming)) = (node.get_mut(name), value)
    else {
        return Err(GnmiError::internal(format!(
            "can not merge into {name}: existing node is not a container"
        )));
    };
    merge_fields(existing, incoming);
    Ok(())
}

fn assign_list_entry(
    op: Operation,
    node: &mut Map<String, Value>,
    elem: &PathElem,
    list: &SchemaNode,
    value: Value,
) -> GnmiResult<()> {
    let Value::Object(mut incoming) = value else {
        return Err(GnmiError::invalid_argument(format!(
            "list entry {elem} requires a container value"
        )));
    };
    for (k, v) in &elem.key {
        if let Some(given) = incoming.get(k) {
            if format_key_value(given).as_deref() != Some(v.as_str()) {
                return Err(GnmiError::invalid_argument(format!(
                    "invalid config data: {k} is a path attribute"
                )));
            }
        }
    }

    let entry = keyed_list_lookup(node, elem, list, true)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| GnmiError::internal(format!("can not create list entry {elem}")))?;
    if op == Operation::Replace {
        entry.clear();
    }
    for (k, v) in &elem.key {
        incoming.remove(k);
        entry.insert(k.clone(), coerce_key_value(v, key_kind(list, k)));
    }
    merge_fields(entry, incoming);
    Ok(())
}

/// Replace every top-level field of `tree` with those of `value`.
pub fn replace_root(tree: &mut Map<String, Value>, value: Map<String, Value>) {
    tree.clear();
    tree.extend(value);
}

fn merge_fields(existing: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (k, v) in incoming {
        if matches!(&v, Value::Array(items) if items.is_empty()) {
            existing.remove(&k);
        } else {
            existing.insert(k, v);
        }
    }
}
