//! Write Transaction Engine
//!
//! A Set request runs inside the store's writer section against an encoded
//! copy of the authoritative root. Deletes run first, then replaces, then
//! updates, each in request order. The result is revalidated into a new
//! typed root, pushed through the device hook and installed; only then are
//! change events published.

use serde_json::{Number, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{GnmiError, GnmiResult};
use crate::events::{ChangeEmitter, ChangeEvent};
use crate::hook::ConfigHook;
use crate::model::{ConfigRoot, JsonStyle, Model, Target};
use crate::path::{full_path, prefix_and_path_to_string};
use crate::schema::SchemaNode;
use crate::store::ConfigStore;
use crate::tree::{
    assign_child, delete_keyed_list_entry, replace_root, resolve_child, Child, Tree,
};
use crate::types::{
    now_nanos, Operation, Path, PathElem, SetRequest, SetResponse, TypedValue, Update,
    UpdateResult,
};

/// Working state of one Set request.
pub struct SetTransaction<'m> {
    model: &'m Model,
    hook: Option<&'m dyn ConfigHook>,
    base: Arc<ConfigRoot>,
    tree: Tree,
    prefix: Option<Path>,
    results: Vec<UpdateResult>,
    changes: Vec<ChangeEvent>,
}

/// Outcome of a transaction that passed revalidation.
pub struct Validated {
    pub root: ConfigRoot,
    pub results: Vec<UpdateResult>,
    pub changes: Vec<ChangeEvent>,
}

impl<'m> SetTransaction<'m> {
    /// Snapshot `base` as an unqualified IETF tree.
    pub fn begin(
        model: &'m Model,
        hook: Option<&'m dyn ConfigHook>,
        base: Arc<ConfigRoot>,
        prefix: Option<Path>,
    ) -> GnmiResult<Self> {
        let Value::Object(tree) = base.to_json(model, JsonStyle::Ietf) else {
            let msg = "error in constructing IETF JSON tree from config struct";
            error!("{msg}");
            return Err(GnmiError::internal(msg));
        };
        Ok(Self {
            model,
            hook,
            base,
            tree,
            prefix,
            results: Vec::new(),
            changes: Vec::new(),
        })
    }

    /// The working tree as it stands.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Delete `path`. Finding nothing is not an error.
    pub fn delete(&mut self, path: &Path) -> GnmiResult<()> {
        let full = full_path(self.prefix.as_ref(), path);
        if full.uses_deprecated_elements() {
            return Err(GnmiError::unimplemented(
                "deprecated path element type is unsupported",
            ));
        }

        let deleted = if full.is_root() {
            let had_data = !self.tree.is_empty();
            self.tree.clear();
            had_data
        } else {
            delete_at(&mut self.tree, self.model.schema(), &full.elem)
        };

        if deleted {
            if let Some(hook) = self.hook {
                debug!(path = %full, "calling delete hook");
                hook.deleted(&self.base, &full).map_err(|e| {
                    GnmiError::aborted(format!("error in deleting {full} on device: {e}"))
                })?;
            }
            info!(path = %full, "deleted");
        } else {
            warn!(path = %full, "nothing to delete");
        }

        self.results.push(UpdateResult {
            path: path.clone(),
            op: Operation::Delete,
        });
        self.changes.push(ChangeEvent::new(full));
        Ok(())
    }

    /// Apply one Replace or Update.
    pub fn replace_or_update(&mut self, op: Operation, update: &Update) -> GnmiResult<()> {
        let model = self.model;
        let full = full_path(self.prefix.as_ref(), &update.path);
        if full.uses_deprecated_elements() {
            return Err(GnmiError::unimplemented(
                "deprecated path element type is unsupported",
            ));
        }
        let val = update
            .val
            .as_ref()
            .ok_or_else(|| GnmiError::invalid_argument(format!("no value given for {op} of {full}")))?;

        let target = model.resolve_target(&full).map_err(|e| {
            GnmiError::not_found(format!(
                "path {full} is not found in the config structure: {e}"
            ))
        })?;

        let node_val = match target {
            Target::Leaf(leaf) => {
                let json = leaf_to_json(val, leaf.kind.is_64bit())?;
                model.check_leaf(&leaf.kind, &json).map_err(|e| {
                    GnmiError::invalid_argument(format!("invalid value for {full}: {e}"))
                })?;
                info!(
                    path = %prefix_and_path_to_string(self.prefix.as_ref(), &update.path),
                    value = %json,
                    "update/replace"
                );
                json
            }
            subtree => {
                let bytes = val.json_bytes().ok_or_else(|| {
                    GnmiError::invalid_argument(format!(
                        "a JSON or JSON_IETF value is required for {full}"
                    ))
                })?;
                let raw: Value = serde_json::from_slice(bytes).map_err(|e| {
                    GnmiError::invalid_argument(format!(
                        "unmarshaling json data to config struct fails: {e}"
                    ))
                })?;
                model.normalize_subtree(subtree, &raw).map_err(|e| {
                    GnmiError::invalid_argument(format!("config data validation fails: {e}"))
                })?
            }
        };

        self.assign_at(op, &full, node_val)?;

        self.results.push(UpdateResult {
            path: update.path.clone(),
            op,
        });
        self.changes.push(ChangeEvent::new(full));
        Ok(())
    }

    fn assign_at(&mut self, op: Operation, full: &Path, value: Value) -> GnmiResult<()> {
        let model = self.model;
        let Some((last, parents)) = full.elem.split_last() else {
            if op == Operation::Update {
                return Err(GnmiError::unimplemented(
                    "update the root of config tree is unsupported",
                ));
            }
            let Value::Object(fields) = value else {
                return Err(GnmiError::invalid_argument(
                    "expect a tree to replace the root, got a scalar value",
                ));
            };
            replace_root(&mut self.tree, fields);
            return Ok(());
        };

        let mut node = &mut self.tree;
        let mut schema = model.schema();
        for elem in parents {
            let Some(Child {
                value: Some(child),
                schema: child_schema,
            }) = resolve_child(node, schema, elem, true)
            else {
                return Err(GnmiError::not_found(format!("path elem not found: {elem}")));
            };
            node = match child {
                Value::Object(fields) => fields,
                Value::Array(_) => {
                    return Err(GnmiError::not_found(format!(
                        "incompatible path elem: {elem}"
                    )))
                }
                other => {
                    return Err(GnmiError::internal(format!(
                        "wrong node type at {elem}: {other}"
                    )))
                }
            };
            schema = child_schema;
        }
        let child_schema = schema
            .find_child(&last.name)
            .ok_or_else(|| GnmiError::not_found(format!("path elem not found: {last}")))?;
        assign_child(op, node, last, child_schema, value)
    }

    /// Revalidate the working tree into a new typed root.
    pub fn finish(self) -> GnmiResult<Validated> {
        let bytes = serde_json::to_vec(&self.tree).map_err(|e| {
            let msg = format!("error in marshaling IETF JSON tree to bytes: {e}");
            error!("{msg}");
            GnmiError::internal(msg)
        })?;
        let root = self.model.new_root(&bytes).map_err(|e| {
            let msg = format!("error in creating config struct from IETF JSON data: {e}");
            error!("{msg}");
            GnmiError::internal(msg)
        })?;
        Ok(Validated {
            root,
            results: self.results,
            changes: self.changes,
        })
    }
}

fn list_keys_of<'s>(schema: &'s SchemaNode, elem: &PathElem) -> &'s [String] {
    schema
        .find_child(&elem.name)
        .and_then(SchemaNode::list_keys)
        .unwrap_or_default()
}

/// Remove the node at `elems` (non-empty) if it exists.
fn delete_at(tree: &mut Tree, root: &SchemaNode, elems: &[PathElem]) -> bool {
    let Some((last, parents)) = elems.split_last() else {
        return false;
    };
    let mut node = tree;
    let mut schema = root;
    for elem in parents {
        let Some(Child {
            value: Some(Value::Object(fields)),
            schema: child_schema,
        }) = resolve_child(node, schema, elem, false)
        else {
            warn!(elem = %elem, "delete stopping due to no child");
            return false;
        };
        node = fields;
        schema = child_schema;
    }
    if last.has_key() {
        delete_keyed_list_entry(node, last, list_keys_of(schema, last))
    } else {
        node.remove(&last.name).is_some()
    }
}

/// Plain JSON form of a typed scalar, 64-bit integers as decimal strings
/// when `int_as_string`.
pub fn leaf_to_json(val: &TypedValue, int_as_string: bool) -> GnmiResult<Value> {
    let float = |f: f64| {
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| GnmiError::invalid_argument(format!("{f} is not a valid number")))
    };
    let json = match val {
        TypedValue::StringVal(s) | TypedValue::AsciiVal(s) => Value::String(s.clone()),
        TypedValue::IntVal(n) if int_as_string => Value::String(n.to_string()),
        TypedValue::UintVal(n) if int_as_string => Value::String(n.to_string()),
        TypedValue::IntVal(n) => Value::from(*n),
        TypedValue::UintVal(n) => Value::from(*n),
        TypedValue::BoolVal(b) => Value::Bool(*b),
        TypedValue::FloatVal(f) => float(f64::from(*f))?,
        TypedValue::DoubleVal(f) => float(*f)?,
        TypedValue::BytesVal(bytes) => Value::String(STANDARD.encode(bytes)),
        TypedValue::JsonVal(bytes) | TypedValue::JsonIetfVal(bytes) => {
            let parsed: Value = serde_json::from_slice(bytes).map_err(|e| {
                GnmiError::invalid_argument(format!("invalid JSON value for a leaf: {e}"))
            })?;
            match parsed {
                Value::Object(_) | Value::Array(_) | Value::Null => {
                    return Err(GnmiError::invalid_argument(
                        "a leaf requires a scalar value",
                    ))
                }
                Value::Number(n) if int_as_string && (n.is_i64() || n.is_u64()) => {
                    Value::String(n.to_string())
                }
                scalar => scalar,
            }
        }
    };
    Ok(json)
}

/// Run a Set request to completion.
pub async fn execute_set(
    model: &Model,
    store: &ConfigStore,
    hook: Option<&dyn ConfigHook>,
    emitter: &ChangeEmitter,
    req: &SetRequest,
) -> GnmiResult<SetResponse> {
    let mut txn = store.transaction().await;
    let mut set = SetTransaction::begin(model, hook, txn.base().clone(), req.prefix.clone())?;

    for path in &req.delete {
        debug!(path = %path, "handling delete");
        set.delete(path)
            .inspect_err(|e| warn!(error = %e, "delete returning with error"))?;
    }
    for update in &req.replace {
        debug!(path = %update.path, "handling replace");
        set.replace_or_update(Operation::Replace, update)
            .inspect_err(|e| warn!(error = %e, "replace returning with error"))?;
    }
    for update in &req.update {
        debug!(path = %update.path, "handling update");
        set.replace_or_update(Operation::Update, update)
            .inspect_err(|e| warn!(error = %e, "update returning with error"))?;
    }

    let Validated {
        root,
        results,
        changes,
    } = set.finish()?;

    if let Some(hook) = hook {
        if let Err(apply_err) = hook.apply(&root) {
            warn!(error = %apply_err, "apply hook failed, rolling back");
            if let Err(rollback_err) = hook.rollback(txn.base()) {
                error!(error = %rollback_err, "rollback hook failed");
                return Err(GnmiError::internal(format!(
                    "error in rollback the failed operation ({apply_err}): {rollback_err}"
                )));
            }
            return Err(GnmiError::aborted(format!(
                "error in applying operation to device: {apply_err}"
            )));
        }
    }

    txn.commit(root).await;
    for change in changes {
        emitter.emit(change);
    }
    drop(txn);

    Ok(SetResponse {
        prefix: req.prefix.clone(),
        response: results,
        timestamp: now_nanos(),
    })
}
