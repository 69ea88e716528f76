//! Request and response shapes of the management RPCs
//!
//! These mirror the Get/Set/Subscribe/Capabilities messages of the gNMI
//! protocol closely enough for a transport layer to map them one-to-one.
//! All of them are serde types so a front end can move them as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Paths ──

/// One step of a path, optionally selecting a keyed list entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathElem {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub key: BTreeMap<String, String>,
}

impl PathElem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: BTreeMap::new(),
        }
    }

    /// Add a key field to this element (builder style).
    pub fn with_key(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.key.insert(field.into(), value.into());
        self
    }

    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }
}

/// Hierarchical address into the configuration tree.
///
/// `element` is the deprecated string-only addressing form; it is accepted on
/// the wire but every operation rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub element: Vec<String>,
    #[serde(default)]
    pub elem: Vec<PathElem>,
}

impl Path {
    /// The absolute root of the tree.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(elem: Vec<PathElem>) -> Self {
        Self {
            elem,
            ..Default::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.elem.is_empty() && self.element.is_empty()
    }

    /// True when the path only uses the deprecated `element` form.
    pub fn uses_deprecated_elements(&self) -> bool {
        self.elem.is_empty() && !self.element.is_empty()
    }
}

// ── Values ──

/// A value carried by an update: a typed scalar or an encoded subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedValue {
    StringVal(String),
    IntVal(i64),
    UintVal(u64),
    BoolVal(bool),
    FloatVal(f32),
    DoubleVal(f64),
    BytesVal(#[serde(with = "base64_bytes")] Vec<u8>),
    AsciiVal(String),
    JsonVal(#[serde(with = "embedded_json")] Vec<u8>),
    JsonIetfVal(#[serde(with = "embedded_json")] Vec<u8>),
}

impl TypedValue {
    /// Encoded JSON payload, if this is a JSON or JSON-IETF value.
    pub fn json_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::JsonVal(bytes) | Self::JsonIetfVal(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Value of a single path; `val: None` signals that no data exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub path: Path,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<TypedValue>,
}

impl Update {
    pub fn new(path: Path, val: TypedValue) -> Self {
        Self {
            path,
            val: Some(val),
        }
    }

    /// An update without a value, delivered as a delete notification.
    pub fn empty(path: Path) -> Self {
        Self { path, val: None }
    }
}

// ── Set ──

/// Kind of a write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Delete,
    Replace,
    Update,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Delete => "delete",
            Self::Replace => "replace",
            Self::Update => "update",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Path>,
    #[serde(default)]
    pub delete: Vec<Path>,
    #[serde(default)]
    pub replace: Vec<Update>,
    #[serde(default)]
    pub update: Vec<Update>,
}

/// Outcome of one operation in a Set batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub path: Path,
    pub op: Operation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Path>,
    pub response: Vec<UpdateResult>,
    pub timestamp: i64,
}

// ── Get ──

/// Wire encodings a client may ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Json,
    Bytes,
    Proto,
    Ascii,
    JsonIetf,
}

/// Data-type namespace a Get is scoped to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    All,
    Config,
    State,
    Operational,
}

impl DataType {
    /// Lower-case name, used as the prune filter.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Config => "config",
            Self::State => "state",
            Self::Operational => "operational",
        }
    }
}

/// Identity of a schema module set the server supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelData {
    pub name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Path>,
    #[serde(default)]
    pub path: Vec<Path>,
    #[serde(default, rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub use_models: Vec<ModelData>,
}

/// A timestamped batch of updates and deletes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Path>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update: Vec<Update>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<Path>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
    pub notification: Vec<Notification>,
}

// ── Subscribe ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionMode {
    #[default]
    Stream,
    Once,
    Poll,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub path: Path,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Path>,
    #[serde(default)]
    pub subscription: Vec<Subscription>,
    #[serde(default)]
    pub mode: SubscriptionMode,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub use_models: Vec<ModelData>,
    /// Skip the initial collection pass of a STREAM subscription.
    #[serde(default)]
    pub updates_only: bool,
}

/// One message on a subscription stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeResponse {
    Update(Notification),
    SyncResponse(bool),
}

impl SubscribeResponse {
    /// Notification carrying a single update.
    pub fn update(update: Update) -> Self {
        Self::Update(Notification {
            timestamp: now_nanos(),
            update: vec![update],
            ..Default::default()
        })
    }

    /// Notification reporting a deleted (or unresolvable) path.
    pub fn delete(path: Path) -> Self {
        Self::Update(Notification {
            timestamp: now_nanos(),
            delete: vec![path],
            ..Default::default()
        })
    }

    pub fn sync() -> Self {
        Self::SyncResponse(true)
    }

    pub fn is_sync(&self) -> bool {
        matches!(self, Self::SyncResponse(_))
    }
}

// ── Capabilities ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityResponse {
    pub supported_models: Vec<ModelData>,
    pub supported_encodings: Vec<Encoding>,
    pub gnmi_version: String,
}

/// Wall clock in nanoseconds since the Unix epoch.
pub fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

/// JSON payloads travel as raw bytes but are shown as nested JSON.
mod embedded_json {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(serde::ser::Error::custom)?;
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        serde_json::to_vec(&value).map_err(serde::de::Error::custom)
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
