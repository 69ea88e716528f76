#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use gnmi_lite_core::{
    ConfigHook, ConfigRoot, EngineConfig, Model, Path, Server, SetRequest, TypedValue, Update,
};
use serde_json::Value;

pub const FIXTURE_MODEL: &str = r#"{
    "models": [
        {"name": "mock-if", "organization": "gnmi-lite", "version": "1.0.0"},
        {"name": "mock-sys", "organization": "gnmi-lite", "version": "1.0.0"}
    ],
    "schema": {"kind": "container", "children": {
        "interface": {"kind": "list", "module": "mock-if", "keys": ["name"], "children": {
            "name": {"kind": "leaf", "type": "string"},
            "enabled": {"kind": "leaf", "type": "boolean"},
            "mtu": {"kind": "leaf", "type": "uint16"},
            "counter": {"kind": "leaf", "type": "uint64"},
            "admin-status": {"kind": "leaf", "type": {"enumeration": "AdminStatus"}},
            "config": {"kind": "container", "children": {
                "description": {"kind": "leaf", "type": "string"}
            }},
            "state": {"kind": "container", "children": {
                "oper-status": {"kind": "leaf", "type": "string"}
            }}
        }},
        "slice": {"kind": "list", "module": "mock-if", "keys": ["slice-id"], "children": {
            "slice-id": {"kind": "leaf", "type": "uint32"},
            "bitrate": {"kind": "choice", "cases": {
                "mbr-case": {"children": {"mbr": {"kind": "container", "children": {
                    "uplink": {"kind": "leaf", "type": "uint64"},
                    "downlink": {"kind": "leaf", "type": "uint64"}
                }}}},
                "gbr-case": {"children": {"gbr": {"kind": "leaf", "type": "uint32"}}}
            }}
        }},
        "route": {"kind": "list", "module": "mock-if", "keys": ["prefix", "vrf"], "children": {
            "prefix": {"kind": "leaf", "type": "string"},
            "vrf": {"kind": "leaf", "type": "uint32"},
            "next-hop": {"kind": "leaf", "type": "string"}
        }},
        "system": {"kind": "container", "module": "mock-sys", "children": {
            "hostname": {"kind": "leaf", "type": "string"},
            "uptime": {"kind": "leaf", "type": "int64"}
        }}
    }},
    "enums": {"AdminStatus": {
        "0": {"name": "UNSET"},
        "1": {"name": "UP"},
        "2": {"name": "DOWN"}
    }}
}"#;

pub fn model() -> Model {
    Model::from_json(FIXTURE_MODEL).expect("fixture model")
}

pub fn server() -> Server {
    Server::new(model(), ConfigRoot::default(), EngineConfig::default())
}

pub fn server_with(initial: Value) -> Server {
    let model = model();
    let root = model.new_root_from_value(&initial).expect("fixture config");
    Server::new(model, root, EngineConfig::default())
}

pub fn path(text: &str) -> Path {
    Path::parse(text).expect("fixture path")
}

pub fn json_val(value: Value) -> TypedValue {
    TypedValue::JsonIetfVal(serde_json::to_vec(&value).expect("json"))
}

pub fn update(text: &str, val: TypedValue) -> Update {
    Update::new(path(text), val)
}

pub fn update_req(updates: Vec<Update>) -> SetRequest {
    SetRequest {
        update: updates,
        ..Default::default()
    }
}

pub fn replace_req(replaces: Vec<Update>) -> SetRequest {
    SetRequest {
        replace: replaces,
        ..Default::default()
    }
}

pub fn delete_req(paths: &[&str]) -> SetRequest {
    SetRequest {
        delete: paths.iter().map(|p| path(p)).collect(),
        ..Default::default()
    }
}

/// Internal-style JSON of the server's current configuration.
pub async fn config_json(server: &Server) -> Value {
    server
        .config()
        .await
        .to_json(server.model(), gnmi_lite_core::JsonStyle::Internal)
}

/// Hook recording every call; `apply` and `rollback` fail on demand.
#[derive(Default)]
pub struct RecordingHook {
    pub calls: Mutex<Vec<String>>,
    pub fail_apply: bool,
    pub fail_rollback: bool,
    pub fail_delete: bool,
}

impl RecordingHook {
    pub fn failing_apply() -> Arc<Self> {
        Arc::new(Self {
            fail_apply: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ConfigHook for RecordingHook {
    fn apply(&self, candidate: &ConfigRoot) -> anyhow::Result<()> {
        self.record(format!("apply:{}", candidate.len()));
        if self.fail_apply {
            anyhow::bail!("device rejected config");
        }
        Ok(())
    }

    fn rollback(&self, previous: &ConfigRoot) -> anyhow::Result<()> {
        self.record(format!("rollback:{}", previous.len()));
        if self.fail_rollback {
            anyhow::bail!("device unreachable");
        }
        Ok(())
    }

    fn deleted(&self, _current: &ConfigRoot, path: &Path) -> anyhow::Result<()> {
        self.record(format!("deleted:{path}"));
        if self.fail_delete {
            anyhow::bail!("delete refused");
        }
        Ok(())
    }
}
