//! Selecting the part of a tree that belongs to one data-type namespace

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{GnmiError, GnmiResult};
use crate::types::DataType;

/// Containers that only hold data of their namesake type. They are dropped
/// when they do not match the filter, even if something below them does.
pub const DATA_TYPE_CONTAINERS: [&str; 3] = ["config", "state", "operational"];

/// Filter keeping fields whose name matches a pattern.
#[derive(Debug, Clone)]
pub struct TreeFilter {
    pattern: Option<Regex>,
}

impl TreeFilter {
    /// `"all"` keeps everything; anything else is an unanchored regex.
    pub fn new(filter: &str) -> GnmiResult<Self> {
        if filter == "all" {
            return Ok(Self { pattern: None });
        }
        let pattern = Regex::new(filter).map_err(|e| {
            GnmiError::invalid_argument(format!("invalid data type filter {filter:?}: {e}"))
        })?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn for_data_type(data_type: DataType) -> GnmiResult<Self> {
        Self::new(data_type.as_filter())
    }

    pub fn keeps_everything(&self) -> bool {
        self.pattern.is_none()
    }

    fn matches(&self, name: &str) -> bool {
        self.pattern.as_ref().is_none_or(|re| re.is_match(name))
    }

    /// Apply the filter to `tree`, returning the kept part.
    pub fn prune(&self, tree: &Value) -> Value {
        if self.keeps_everything() {
            return tree.clone();
        }
        match tree {
            Value::Object(map) => Value::Object(self.prune_object(map)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.prune(v)).collect()),
            scalar => scalar.clone(),
        }
    }

    fn prune_object(&self, map: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, value) in map {
            let nested = matches!(value, Value::Object(_) | Value::Array(_));
            if self.matches(name) {
                out.insert(name.clone(), self.prune(value));
            } else if nested {
                let kept = self.prune(value);
                if !is_empty(&kept) && !DATA_TYPE_CONTAINERS.contains(&name.as_str()) {
                    out.insert(name.clone(), kept);
                }
            } else {
                out.insert(name.clone(), value.clone());
            }
        }
        out
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Prune `tree` with a filter given as text.
pub fn prune(tree: &Value, filter: &str) -> GnmiResult<Value> {
    Ok(TreeFilter::new(filter)?.prune(tree))
}
