//! Get request handling

use tracing::debug;

use crate::error::{GnmiError, GnmiResult};
use crate::model::{ConfigRoot, JsonStyle, Model, NodeRef};
use crate::path::{full_path, path_to_string};
use crate::read::scalar_to_typed_value;
use crate::tree::TreeFilter;
use crate::types::{
    now_nanos, Encoding, GetRequest, GetResponse, Notification, TypedValue, Update,
};

/// Answer `req` from `root`, one notification per requested path.
///
/// Encoding and model checks are the caller's job.
pub fn execute_get(model: &Model, root: &ConfigRoot, req: &GetRequest) -> GnmiResult<GetResponse> {
    let filter = TreeFilter::for_data_type(req.data_type)?;
    let (style, wrap): (JsonStyle, fn(Vec<u8>) -> TypedValue) = match req.encoding {
        Encoding::JsonIetf => (JsonStyle::IetfQualified, TypedValue::JsonIetfVal),
        _ => (JsonStyle::Internal, TypedValue::JsonVal),
    };

    let mut notification = Vec::with_capacity(req.path.len());
    for path in &req.path {
        let full = full_path(req.prefix.as_ref(), path);
        if full.uses_deprecated_elements() {
            return Err(GnmiError::unimplemented(
                "deprecated path element type is unsupported",
            ));
        }
        debug!(path = %full, "handling get");

        let located = root.get_node(model, &full).ok_or_else(|| {
            GnmiError::not_found(format!("path {} not found", path_to_string(Some(&full))))
        })?;
        let val = match located.node {
            NodeRef::Leaf(scalar) => scalar_to_typed_value(model, scalar)?,
            _ => {
                let json = filter.prune(&model.encode(&located, style));
                let bytes = serde_json::to_vec(&json).map_err(|e| {
                    GnmiError::internal(format!("error in marshaling {full}: {e}"))
                })?;
                wrap(bytes)
            }
        };
        notification.push(Notification {
            timestamp: now_nanos(),
            prefix: req.prefix.clone(),
            update: vec![Update::new(path.clone(), val)],
            delete: Vec::new(),
        });
    }
    Ok(GetResponse { notification })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Code;
    use crate::model::tests::test_model;
    use crate::types::{DataType, Path};
    use serde_json::{json, Value};

    fn root(model: &Model) -> ConfigRoot {
        model
            .new_root_from_value(&json!({
                "interface": [{
                    "name": "eth0",
                    "counter": 3,
                    "config": {"description": "uplink"},
                    "state": {"oper-status": "up"}
                }]
            }))
            .unwrap()
    }

    fn decoded(val: &TypedValue) -> Value {
        serde_json::from_slice(val.json_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_json_encoding_is_internal() {
        let model = test_model();
        let req = GetRequest {
            path: vec![Path::parse("/interface[name=eth0]").unwrap()],
            encoding: Encoding::Json,
            ..Default::default()
        };
        let resp = execute_get(&model, &root(&model), &req).unwrap();
        let val = resp.notification[0].update[0].val.as_ref().unwrap();
        assert!(matches!(val, TypedValue::JsonVal(_)));
        assert_eq!(decoded(val)["counter"], json!(3));
    }

    #[test]
    fn test_json_ietf_encoding_is_qualified() {
        let model = test_model();
        let req = GetRequest {
            path: vec![Path::root()],
            encoding: Encoding::JsonIetf,
            ..Default::default()
        };
        let resp = execute_get(&model, &root(&model), &req).unwrap();
        let val = resp.notification[0].update[0].val.as_ref().unwrap();
        assert!(matches!(val, TypedValue::JsonIetfVal(_)));
        let tree = decoded(val);
        assert_eq!(tree["mock-if:interface"][0]["counter"], json!("3"));
    }

    #[test]
    fn test_data_type_prunes() {
        let model = test_model();
        let req = GetRequest {
            path: vec![Path::parse("/interface[name=eth0]").unwrap()],
            data_type: DataType::State,
            ..Default::default()
        };
        let resp = execute_get(&model, &root(&model), &req).unwrap();
        let tree = decoded(resp.notification[0].update[0].val.as_ref().unwrap());
        assert_eq!(
            tree,
            json!({"name": "eth0", "counter": 3, "state": {"oper-status": "up"}})
        );
    }

    #[test]
    fn test_one_notification_per_path() {
        let model = test_model();
        let req = GetRequest {
            path: vec![
                Path::parse("/interface[name=eth0]/counter").unwrap(),
                Path::parse("/interface[name=eth0]/name").unwrap(),
            ],
            ..Default::default()
        };
        let resp = execute_get(&model, &root(&model), &req).unwrap();
        assert_eq!(resp.notification.len(), 2);
        assert_eq!(
            resp.notification[0].update[0].val,
            Some(TypedValue::UintVal(3))
        );
    }

    #[test]
    fn test_missing_path() {
        let model = test_model();
        let req = GetRequest {
            path: vec![Path::parse("/system").unwrap()],
            ..Default::default()
        };
        let err = execute_get(&model, &root(&model), &req).unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }
}
