mod common;

use common::*;
use gnmi_lite_core::{
    Code, DataType, Encoding, GetRequest, Operation, Path, PathElem, SetRequest, TypedValue,
};
use serde_json::{json, Value};

async fn get_val(server: &gnmi_lite_core::Server, text: &str) -> Option<TypedValue> {
    let req = GetRequest {
        path: vec![path(text)],
        ..Default::default()
    };
    let resp = server.get(&req).await.ok()?;
    resp.notification
        .into_iter()
        .next()?
        .update
        .into_iter()
        .next()?
        .val
}

fn json_of(val: &TypedValue) -> Value {
    serde_json::from_slice(val.json_bytes().expect("json value")).expect("valid json")
}

#[tokio::test]
async fn test_eth0_update_creates_then_merges() {
    let server = server();

    let req = update_req(vec![update(
        "/interface[name=eth0]/enabled",
        TypedValue::BoolVal(true),
    )]);
    server.set(&req).await.unwrap();
    assert_eq!(
        config_json(&server).await,
        json!({"interface": [{"name": "eth0", "enabled": true}]})
    );

    let req = update_req(vec![update(
        "/interface[name=eth0]/enabled",
        TypedValue::BoolVal(false),
    )]);
    server.set(&req).await.unwrap();
    assert_eq!(
        config_json(&server).await,
        json!({"interface": [{"name": "eth0", "enabled": false}]})
    );
}

#[tokio::test]
async fn test_eth0_delete_removes_list_field() {
    let server = server_with(json!({"interface": [{"name": "eth0", "enabled": false}]}));
    let resp = server.set(&delete_req(&["/interface[name=eth0]"])).await.unwrap();

    assert_eq!(resp.response.len(), 1);
    assert_eq!(resp.response[0].op, Operation::Delete);
    assert_eq!(config_json(&server).await, json!({}));
}

#[tokio::test]
async fn test_replace_then_get_round_trip() {
    let server = server();
    let cases = vec![
        ("/system/hostname", TypedValue::StringVal("core-1".to_string())),
        ("/interface[name=eth0]/mtu", TypedValue::UintVal(9000)),
        ("/interface[name=eth0]/counter", TypedValue::UintVal(u64::MAX)),
        ("/interface[name=eth0]/enabled", TypedValue::BoolVal(true)),
        ("/system/uptime", TypedValue::IntVal(-5)),
        (
            "/interface[name=eth0]/admin-status",
            TypedValue::StringVal("DOWN".to_string()),
        ),
        ("/slice[slice-id=4]/gbr", TypedValue::UintVal(100)),
    ];
    for (text, val) in cases {
        server
            .set(&replace_req(vec![update(text, val.clone())]))
            .await
            .unwrap();
        assert_eq!(get_val(&server, text).await, Some(val), "round trip of {text}");
    }
}

#[tokio::test]
async fn test_subtree_round_trip() {
    let server = server();
    let entry = json!({"name": "eth3", "mtu": 1400, "config": {"description": "core"}});
    server
        .set(&replace_req(vec![update(
            "/interface[name=eth3]",
            json_val(entry.clone()),
        )]))
        .await
        .unwrap();

    let req = GetRequest {
        path: vec![path("/interface[name=eth3]")],
        encoding: Encoding::Json,
        ..Default::default()
    };
    let resp = server.get(&req).await.unwrap();
    let val = resp.notification[0].update[0].val.as_ref().unwrap();
    assert_eq!(json_of(val), entry);
}

#[tokio::test]
async fn test_64bit_leaves_are_strings_in_json_ietf() {
    let server = server_with(json!({"interface": [{"name": "eth0", "counter": 42}]}));
    let req = GetRequest {
        path: vec![path("/interface[name=eth0]")],
        encoding: Encoding::JsonIetf,
        ..Default::default()
    };
    let resp = server.get(&req).await.unwrap();
    let val = resp.notification[0].update[0].val.as_ref().unwrap();
    assert!(matches!(val, TypedValue::JsonIetfVal(_)));
    assert_eq!(json_of(val), json!({"name": "eth0", "counter": "42"}));
}

#[tokio::test]
async fn test_multi_key_entries() {
    let server = server();
    let hops = [("10.0.0.0/8", "1", "a"), ("10.0.0.0/8", "2", "b"), ("10.0.0.0/8", "1", "c")];
    for (prefix, vrf, hop) in hops {
        let text = format!("/route[prefix={prefix}][vrf={vrf}]/next-hop");
        server
            .set(&update_req(vec![update(
                &text,
                TypedValue::StringVal(hop.to_string()),
            )]))
            .await
            .unwrap();
    }
    let config = config_json(&server).await;
    assert_eq!(
        config["route"],
        json!([
            {"prefix": "10.0.0.0/8", "vrf": 1, "next-hop": "c"},
            {"prefix": "10.0.0.0/8", "vrf": 2, "next-hop": "b"}
        ])
    );

    // a key subset addresses nothing
    let partial = Path::new(vec![PathElem::new("route").with_key("prefix", "10.0.0.0/8")]);
    let req = GetRequest {
        path: vec![partial],
        ..Default::default()
    };
    assert_eq!(server.get(&req).await.unwrap_err().code(), Code::NotFound);
}

#[tokio::test]
async fn test_numeric_looking_string_keys_round_trip() {
    let server = server();
    for name in ["007", "-0", "1e3", "+5"] {
        let text = format!("/interface[name={name}]/mtu");
        server
            .set(&update_req(vec![update(&text, TypedValue::UintVal(1500))]))
            .await
            .unwrap();
        assert_eq!(get_val(&server, &text).await, Some(TypedValue::UintVal(1500)));

        server
            .set(&update_req(vec![update(&text, TypedValue::UintVal(9000))]))
            .await
            .unwrap();
        assert_eq!(get_val(&server, &text).await, Some(TypedValue::UintVal(9000)));
    }
    assert_eq!(
        config_json(&server).await["interface"],
        json!([
            {"name": "007", "mtu": 9000},
            {"name": "-0", "mtu": 9000},
            {"name": "1e3", "mtu": 9000},
            {"name": "+5", "mtu": 9000}
        ])
    );
}

#[tokio::test]
async fn test_delete_one_of_many_keeps_others() {
    let server = server_with(json!({"interface": [
        {"name": "eth0", "mtu": 1000},
        {"name": "eth1", "mtu": 1100},
        {"name": "eth2", "mtu": 1200}
    ]}));
    server.set(&delete_req(&["/interface[name=eth0]"])).await.unwrap();

    assert_eq!(
        config_json(&server).await["interface"],
        json!([{"name": "eth1", "mtu": 1100}, {"name": "eth2", "mtu": 1200}])
    );
}

#[tokio::test]
async fn test_missing_delete_is_reported_and_harmless() {
    let server = server_with(json!({"system": {"hostname": "r1"}}));
    let resp = server
        .set(&delete_req(&["/interface[name=eth9]", "/system/uptime"]))
        .await
        .unwrap();
    assert_eq!(resp.response.len(), 2);
    assert_eq!(config_json(&server).await, json!({"system": {"hostname": "r1"}}));
}

#[tokio::test]
async fn test_deletes_run_before_replaces() {
    let server = server_with(json!({"system": {"hostname": "old", "uptime": 1}}));
    let req = SetRequest {
        replace: vec![update("/system", json_val(json!({"hostname": "new"})))],
        delete: vec![path("/system")],
        ..Default::default()
    };
    let resp = server.set(&req).await.unwrap();

    assert_eq!(config_json(&server).await, json!({"system": {"hostname": "new"}}));
    let ops: Vec<Operation> = resp.response.iter().map(|r| r.op).collect();
    assert_eq!(ops, vec![Operation::Delete, Operation::Replace]);
}

#[tokio::test]
async fn test_prefix_applies_to_every_path() {
    let server = server();
    let req = SetRequest {
        prefix: Some(path("/interface[name=eth5]")),
        update: vec![
            update("mtu", TypedValue::UintVal(1500)),
            update("config/description", TypedValue::StringVal("edge".to_string())),
        ],
        ..Default::default()
    };
    let resp = server.set(&req).await.unwrap();
    assert_eq!(resp.prefix, req.prefix);
    assert_eq!(resp.response[0].path, path("mtu"));
    assert_eq!(
        config_json(&server).await,
        json!({"interface": [{"name": "eth5", "mtu": 1500, "config": {"description": "edge"}}]})
    );
}

#[tokio::test]
async fn test_choice_case_children_are_addressable() {
    let server = server();
    server
        .set(&update_req(vec![update(
            "/slice[slice-id=1]/mbr",
            json_val(json!({"uplink": "5000000000"})),
        )]))
        .await
        .unwrap();
    assert_eq!(
        get_val(&server, "/slice[slice-id=1]/mbr/uplink").await,
        Some(TypedValue::UintVal(5_000_000_000))
    );

    // switching case while the other is still set fails revalidation
    let err = server
        .set(&update_req(vec![update(
            "/slice[slice-id=1]/gbr",
            TypedValue::UintVal(7),
        )]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Internal);
}

#[tokio::test]
async fn test_failed_batch_changes_nothing() {
    let server = server_with(json!({"system": {"hostname": "r1"}}));
    let before = server.config().await;
    let req = SetRequest {
        delete: vec![path("/system")],
        update: vec![update("/system/bogus", TypedValue::IntVal(1))],
        ..Default::default()
    };
    let err = server.set(&req).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    assert_eq!(*server.config().await, *before);
}

#[tokio::test]
async fn test_root_update_unimplemented_root_replace_swaps() {
    let server = server_with(json!({"system": {"hostname": "r1"}}));
    let err = server
        .set(&update_req(vec![update("/", json_val(json!({})))]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unimplemented);

    server
        .set(&replace_req(vec![update(
            "/",
            json_val(json!({"mock-if:interface": [{"name": "lo"}]})),
        )]))
        .await
        .unwrap();
    assert_eq!(config_json(&server).await, json!({"interface": [{"name": "lo"}]}));
}

#[tokio::test]
async fn test_deprecated_elements_unimplemented() {
    let server = server();
    let legacy = Path {
        element: vec!["system".to_string(), "hostname".to_string()],
        ..Default::default()
    };
    let req = SetRequest {
        delete: vec![legacy.clone()],
        ..Default::default()
    };
    assert_eq!(server.set(&req).await.unwrap_err().code(), Code::Unimplemented);

    let get = GetRequest {
        path: vec![legacy],
        ..Default::default()
    };
    assert_eq!(server.get(&get).await.unwrap_err().code(), Code::Unimplemented);
}

#[tokio::test]
async fn test_unknown_enum_label_rejected() {
    let server = server();
    let err = server
        .set(&update_req(vec![update(
            "/interface[name=eth0]/admin-status",
            TypedValue::StringVal("SIDEWAYS".to_string()),
        )]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_key_mismatch_in_entry_payload() {
    let server = server();
    let err = server
        .set(&update_req(vec![update(
            "/interface[name=eth0]",
            json_val(json!({"name": "eth1"})),
        )]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert!(err.message().contains("is a path attribute"));
}

#[tokio::test]
async fn test_get_prunes_by_data_type() {
    let server = server_with(json!({"interface": [{
        "name": "eth0",
        "config": {"description": "x"},
        "state": {"oper-status": "up"}
    }]}));
    let req = GetRequest {
        path: vec![Path::root()],
        data_type: DataType::Config,
        ..Default::default()
    };
    let resp = server.get(&req).await.unwrap();
    let val = resp.notification[0].update[0].val.as_ref().unwrap();
    assert_eq!(
        json_of(val),
        json!({"interface": [{"name": "eth0", "config": {"description": "x"}}]})
    );
}
