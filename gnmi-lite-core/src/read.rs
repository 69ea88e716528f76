//! Read Resolver
//!
//! Turns the node at a path into the typed value sent to clients.

use std::sync::Arc;

use crate::error::{GnmiError, GnmiResult};
use crate::model::{ConfigRoot, JsonStyle, Model, NodeRef, Scalar};
use crate::path::{full_path, path_to_string};
use crate::store::ConfigStore;
use crate::types::{Path, TypedValue, Update};

/// Resolve `prefix` + `path` against `root`.
///
/// Leaves become typed scalars, everything else module-qualified IETF JSON.
/// The returned update carries `path` as given, without the prefix.
pub fn resolve_update(
    model: &Model,
    root: &ConfigRoot,
    prefix: Option<&Path>,
    path: &Path,
) -> GnmiResult<Update> {
    let full = full_path(prefix, path);
    if full.uses_deprecated_elements() {
        return Err(GnmiError::unimplemented(
            "deprecated path element type is unsupported",
        ));
    }
    let located = root.get_node(model, &full).ok_or_else(|| {
        GnmiError::not_found(format!("path {} not found", path_to_string(Some(&full))))
    })?;

    let val = match located.node {
        NodeRef::Leaf(scalar) => scalar_to_typed_value(model, scalar)?,
        _ => {
            let json = model.encode(&located, JsonStyle::IetfQualified);
            let bytes = serde_json::to_vec(&json)
                .map_err(|e| GnmiError::internal(format!("error in marshaling node: {e}")))?;
            TypedValue::JsonIetfVal(bytes)
        }
    };
    Ok(Update::new(path.clone(), val))
}

/// Typed value of a leaf. Enum values are reported by label.
pub fn scalar_to_typed_value(model: &Model, scalar: &Scalar) -> GnmiResult<TypedValue> {
    Ok(match scalar {
        Scalar::Int(n) => TypedValue::IntVal(*n),
        Scalar::Uint(n) => TypedValue::UintVal(*n),
        Scalar::Float(f) => TypedValue::DoubleVal(*f),
        Scalar::String(s) => TypedValue::StringVal(s.clone()),
        Scalar::Bool(b) => TypedValue::BoolVal(*b),
        Scalar::Binary(bytes) => TypedValue::BytesVal(bytes.clone()),
        Scalar::Enum { type_name, value } => {
            if !model.enums().contains_key(type_name) {
                return Err(GnmiError::internal(format!(
                    "no enum table for type {type_name}"
                )));
            }
            let label = model.enum_label(type_name, *value).ok_or_else(|| {
                GnmiError::internal(format!("enum {type_name} has no label for {value}"))
            })?;
            TypedValue::StringVal(label.to_string())
        }
    })
}

/// Resolver bound to a model and a store, shared by Get and Subscribe.
#[derive(Clone)]
pub struct ReadResolver {
    model: Arc<Model>,
    store: Arc<ConfigStore>,
}

impl ReadResolver {
    pub fn new(model: Arc<Model>, store: Arc<ConfigStore>) -> Self {
        Self { model, store }
    }

    /// Resolve against the current authoritative root.
    pub async fn resolve(&self, prefix: Option<&Path>, path: &Path) -> GnmiResult<Update> {
        let root = self.store.snapshot().await;
        resolve_update(&self.model, &root, prefix, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Code;
    use crate::model::tests::test_model;
    use serde_json::json;

    fn root(model: &Model) -> ConfigRoot {
        model
            .new_root_from_value(&json!({
                "interface": [{"name": "eth0", "counter": 9, "admin-status": "UP", "secret": "AQI="}],
                "system": {"hostname": "r1", "uptime": 5}
            }))
            .unwrap()
    }

    #[test]
    fn test_leaf_values() {
        let model = test_model();
        let root = root(&model);

        let status = Path::parse("/interface[name=eth0]/admin-status").unwrap();
        let update = resolve_update(&model, &root, None, &status).unwrap();
        assert_eq!(update.val, Some(TypedValue::StringVal("UP".to_string())));

        let counter = Path::parse("/interface[name=eth0]/counter").unwrap();
        let update = resolve_update(&model, &root, None, &counter).unwrap();
        assert_eq!(update.val, Some(TypedValue::UintVal(9)));

        let secret = Path::parse("/interface[name=eth0]/secret").unwrap();
        let update = resolve_update(&model, &root, None, &secret).unwrap();
        assert_eq!(update.val, Some(TypedValue::BytesVal(vec![1, 2])));
    }

    #[test]
    fn test_subtree_is_qualified_ietf_with_relative_path() {
        let model = test_model();
        let root = root(&model);
        let prefix = Path::parse("/system").unwrap();

        let update = resolve_update(&model, &root, Some(&prefix), &Path::root()).unwrap();
        assert_eq!(update.path, Path::root());
        let Some(TypedValue::JsonIetfVal(bytes)) = update.val else {
            panic!("expected json_ietf_val");
        };
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"hostname": "r1", "uptime": "5"}));
    }

    #[test]
    fn test_root_is_module_qualified() {
        let model = test_model();
        let root = root(&model);
        let update = resolve_update(&model, &root, None, &Path::root()).unwrap();
        let bytes = update.val.and_then(|v| v.json_bytes().map(<[u8]>::to_vec)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("mock-sys:system").is_some());
        assert!(value.get("mock-if:interface").is_some());
    }

    #[test]
    fn test_missing_and_deprecated() {
        let model = test_model();
        let root = root(&model);

        let missing = Path::parse("/interface[name=eth7]").unwrap();
        let err = resolve_update(&model, &root, None, &missing).unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
        assert_eq!(err.message(), "path interface[name=eth7] not found");

        let deprecated = Path {
            element: vec!["system".to_string()],
            ..Default::default()
        };
        let err = resolve_update(&model, &root, None, &deprecated).unwrap_err();
        assert_eq!(err.code(), Code::Unimplemented);
    }

    #[test]
    fn test_enum_without_table_is_internal() {
        let model = test_model();
        let scalar = Scalar::Enum {
            type_name: "Missing".to_string(),
            value: 1,
        };
        let err = scalar_to_typed_value(&model, &scalar).unwrap_err();
        assert_eq!(err.code(), Code::Internal);
    }
}
