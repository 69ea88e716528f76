//! JSON decoding and encoding of typed nodes

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashSet};

use super::typed::{Fields, Located, NodeRef, Scalar, TypedNode};
use super::{Model, ModelError};
use crate::schema::{LeafKind, SchemaNode};

/// How names and numbers are written when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStyle {
    /// Plain names, native numbers.
    Internal,
    /// Plain names, 64-bit integers as decimal strings.
    Ietf,
    /// As `Ietf`, with `module:` on names whose module differs from the
    /// parent's.
    IetfQualified,
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

fn mismatch(at: &str, expected: &str, value: &Value) -> ModelError {
    ModelError::TypeMismatch {
        at: at.to_string(),
        expected: expected.to_string(),
        found: describe(value),
    }
}

fn child_at(at: &str, name: &str) -> String {
    format!("{at}/{name}")
}

impl Model {
    // ── Decoding ──

    pub(crate) fn decode_object(
        &self,
        schema: &SchemaNode,
        module: Option<&str>,
        value: &Value,
        at: &str,
    ) -> Result<Fields, ModelError> {
        let Value::Object(map) = value else {
            return Err(mismatch(at, "object", value));
        };
        let mut fields = Fields::new();
        for (raw_name, child_value) in map {
            let (qualifier, name) = match raw_name.split_once(':') {
                Some((m, n)) => (Some(m), n),
                None => (None, raw_name.as_str()),
            };
            let unknown = || ModelError::UnknownField {
                at: at.to_string(),
                field: raw_name.clone(),
            };
            let child = schema.find_child(name).ok_or_else(unknown)?;
            let child_module = child.module().or(module);
            if qualifier.is_some() && qualifier != child_module {
                return Err(unknown());
            }
            let here = child_at(at, name);
            if let Some(node) = self.decode_node(child, child_module, child_value, &here)? {
                if fields.insert(name.to_string(), node).is_some() {
                    return Err(unknown());
                }
            }
        }
        if let Some(children) = schema.children() {
            check_choices(children, &fields, at)?;
        }
        Ok(fields)
    }

    /// Decode one child value. Empty lists decode to nothing.
    pub(crate) fn decode_node(
        &self,
        schema: &SchemaNode,
        module: Option<&str>,
        value: &Value,
        at: &str,
    ) -> Result<Option<TypedNode>, ModelError> {
        match schema {
            SchemaNode::Container(_) => Ok(Some(TypedNode::Container(
                self.decode_object(schema, module, value, at)?,
            ))),
            SchemaNode::List(list) => {
                let Value::Array(items) = value else {
                    return Err(mismatch(at, "list", value));
                };
                if items.is_empty() {
                    return Ok(None);
                }
                let mut seen = HashSet::new();
                let mut entries = Vec::with_capacity(items.len());
                for item in items {
                    let entry = self.decode_object(schema, module, item, at)?;
                    let mut tuple = Vec::with_capacity(list.keys.len());
                    for key in &list.keys {
                        match entry.get(key) {
                            Some(TypedNode::Leaf(scalar)) => tuple.push(self.scalar_text(scalar)),
                            _ => {
                                return Err(ModelError::MissingKey {
                                    at: at.to_string(),
                                    key: key.clone(),
                                })
                            }
                        }
                    }
                    if !seen.insert(tuple.clone()) {
                        return Err(ModelError::DuplicateKey {
                            at: at.to_string(),
                            keys: tuple,
                        });
                    }
                    entries.push(entry);
                }
                Ok(Some(TypedNode::List(entries)))
            }
            SchemaNode::Leaf(leaf) => Ok(Some(TypedNode::Leaf(
                self.decode_scalar(&leaf.kind, value, at)?,
            ))),
            SchemaNode::Choice(_) => Err(ModelError::NotInSchema(at.to_string())),
        }
    }

    pub(crate) fn decode_scalar(
        &self,
        kind: &LeafKind,
        value: &Value,
        at: &str,
    ) -> Result<Scalar, ModelError> {
        let fail = || mismatch(at, kind.name(), value);
        match kind {
            LeafKind::Int8 | LeafKind::Int16 | LeafKind::Int32 | LeafKind::Int64 => {
                let n = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                }
                .ok_or_else(fail)?;
                let (min, max) = kind.signed_range().ok_or_else(fail)?;
                if n < min || n > max {
                    return Err(fail());
                }
                Ok(Scalar::Int(n))
            }
            LeafKind::Uint8 | LeafKind::Uint16 | LeafKind::Uint32 | LeafKind::Uint64 => {
                let n = match value {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.trim().parse::<u64>().ok(),
                    _ => None,
                }
                .ok_or_else(fail)?;
                if n > kind.unsigned_max().ok_or_else(fail)? {
                    return Err(fail());
                }
                Ok(Scalar::Uint(n))
            }
            LeafKind::Decimal64 => match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
                _ => None,
            }
            .map(Scalar::Float)
            .ok_or_else(fail),
            LeafKind::String => match value {
                Value::String(s) => Ok(Scalar::String(s.clone())),
                Value::Number(n) => Ok(Scalar::String(n.to_string())),
                _ => Err(fail()),
            },
            LeafKind::Boolean => match value {
                Value::Bool(b) => Ok(Scalar::Bool(*b)),
                Value::String(s) if s == "true" => Ok(Scalar::Bool(true)),
                Value::String(s) if s == "false" => Ok(Scalar::Bool(false)),
                _ => Err(fail()),
            },
            LeafKind::Binary => match value {
                Value::String(s) => STANDARD
                    .decode(s)
                    .map(Scalar::Binary)
                    .map_err(|_| fail()),
                _ => Err(fail()),
            },
            LeafKind::Enumeration(enum_type) => {
                let number = match value {
                    Value::String(label) => {
                        // identityref-style "module:LABEL" is accepted too
                        let bare = label.rsplit(':').next().unwrap_or(label);
                        self.enum_value(enum_type, bare).ok_or_else(|| {
                            ModelError::UnknownEnumLabel {
                                at: at.to_string(),
                                enum_type: enum_type.clone(),
                                label: label.clone(),
                            }
                        })?
                    }
                    Value::Number(n) => {
                        let n = n.as_i64().ok_or_else(fail)?;
                        self.enum_label(enum_type, n)
                            .ok_or_else(|| ModelError::UnknownEnumValue {
                                enum_type: enum_type.clone(),
                                value: n,
                            })?;
                        n
                    }
                    _ => return Err(fail()),
                };
                Ok(Scalar::Enum {
                    type_name: enum_type.clone(),
                    value: number,
                })
            }
        }
    }

    /// Text form of a scalar, as it appears in path keys.
    pub(crate) fn scalar_text(&self, scalar: &Scalar) -> String {
        match scalar {
            Scalar::Int(n) => n.to_string(),
            Scalar::Uint(n) => n.to_string(),
            Scalar::Float(f) => Number::from_f64(*f)
                .map(|n| n.to_string())
                .unwrap_or_else(|| f.to_string()),
            Scalar::String(s) => s.clone(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Binary(bytes) => STANDARD.encode(bytes),
            Scalar::Enum { type_name, value } => self
                .enum_label(type_name, *value)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
        }
    }

    // ── Encoding ──

    /// Encode a located node in the given style.
    pub fn encode(&self, located: &Located<'_>, style: JsonStyle) -> Value {
        match located.node {
            NodeRef::Leaf(scalar) => match located.schema.as_leaf() {
                Some(leaf) => self.encode_scalar(&leaf.kind, scalar, style),
                None => Value::Null,
            },
            NodeRef::Container(fields) => Value::Object(self.encode_fields(
                located.schema,
                fields,
                located.module,
                style,
            )),
            NodeRef::List(entries) => Value::Array(
                entries
                    .iter()
                    .map(|entry| {
                        Value::Object(self.encode_fields(
                            located.schema,
                            entry,
                            located.module,
                            style,
                        ))
                    })
                    .collect(),
            ),
        }
    }

    pub(crate) fn encode_fields(
        &self,
        schema: &SchemaNode,
        fields: &BTreeMap<String, TypedNode>,
        module: Option<&str>,
        style: JsonStyle,
    ) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, node) in fields {
            let Some(child) = schema.find_child(name) else {
                continue;
            };
            let child_module = child.module().or(module);
            let key = match (style, child_module) {
                (JsonStyle::IetfQualified, Some(m)) if child_module != module => {
                    format!("{m}:{name}")
                }
                _ => name.clone(),
            };
            let located = Located {
                node: node.as_node_ref(),
                schema: child,
                module: child_module,
            };
            out.insert(key, self.encode(&located, style));
        }
        out
    }

    fn encode_scalar(&self, kind: &LeafKind, scalar: &Scalar, style: JsonStyle) -> Value {
        let as_string = style != JsonStyle::Internal && kind.is_64bit();
        match scalar {
            Scalar::Int(n) if as_string => Value::String(n.to_string()),
            Scalar::Uint(n) if as_string => Value::String(n.to_string()),
            Scalar::Int(n) => Value::from(*n),
            Scalar::Uint(n) => Value::from(*n),
            Scalar::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Scalar::String(s) => Value::String(s.clone()),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Binary(bytes) => Value::String(STANDARD.encode(bytes)),
            Scalar::Enum { type_name, value } => match self.enum_label(type_name, *value) {
                Some(label) => Value::String(label.to_string()),
                None => Value::from(*value),
            },
        }
    }
}

/// At most one case of every choice may carry data, nested choices included.
fn check_choices(
    children: &BTreeMap<String, SchemaNode>,
    fields: &Fields,
    at: &str,
) -> Result<(), ModelError> {
    for (choice_name, child) in children {
        let SchemaNode::Choice(choice) = child else {
            continue;
        };
        let active = choice
            .cases
            .values()
            .filter(|case| fields.keys().any(|f| case.contains(f)))
            .count();
        if active > 1 {
            return Err(ModelError::MultipleCases {
                at: at.to_string(),
                choice: choice_name.clone(),
            });
        }
        for case in choice.cases.values() {
            check_choices(&case.children, fields, at)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::test_model;
    use serde_json::json;

    #[test]
    fn test_styles() {
        let model = test_model();
        let root = model
            .new_root_from_value(&json!({
                "interface": [{"name": "eth0", "counter": 7, "state": {"oper-status": "up"}}],
                "system": {"uptime": 12}
            }))
            .unwrap();

        assert_eq!(
            root.to_json(&model, JsonStyle::Internal),
            json!({
                "interface": [{"name": "eth0", "counter": 7, "state": {"oper-status": "up"}}],
                "system": {"uptime": 12}
            })
        );
        assert_eq!(
            root.to_json(&model, JsonStyle::Ietf),
            json!({
                "interface": [{"name": "eth0", "counter": "7", "state": {"oper-status": "up"}}],
                "system": {"uptime": "12"}
            })
        );
        assert_eq!(
            root.to_json(&model, JsonStyle::IetfQualified),
            json!({
                "mock-if:interface": [{
                    "name": "eth0",
                    "counter": "7",
                    "mock-if-state:state": {"oper-status": "up"}
                }],
                "mock-sys:system": {"uptime": "12"}
            })
        );
    }

    #[test]
    fn test_qualified_output_decodes_back() {
        let model = test_model();
        let root = model
            .new_root_from_value(&json!({"interface": [{"name": "eth0", "state": {"oper-status": "up"}}]}))
            .unwrap();
        let qualified = root.to_json(&model, JsonStyle::IetfQualified);
        assert_eq!(model.new_root_from_value(&qualified).unwrap(), root);
    }

    #[test]
    fn test_scalar_coercions() {
        let model = test_model();
        assert_eq!(
            model.decode_scalar(&LeafKind::Uint64, &json!("18446744073709551615"), "x").unwrap(),
            Scalar::Uint(u64::MAX)
        );
        assert_eq!(
            model.decode_scalar(&LeafKind::String, &json!(42), "x").unwrap(),
            Scalar::String("42".to_string())
        );
        assert!(model.decode_scalar(&LeafKind::Int8, &json!(200), "x").is_err());
        assert!(model.decode_scalar(&LeafKind::Boolean, &json!(1), "x").is_err());
        assert_eq!(
            model.decode_scalar(&LeafKind::Binary, &json!("AQI="), "x").unwrap(),
            Scalar::Binary(vec![1, 2])
        );
    }

    #[test]
    fn test_enum_labels() {
        let model = test_model();
        let kind = LeafKind::Enumeration("AdminStatus".to_string());
        assert_eq!(
            model.decode_scalar(&kind, &json!("UP"), "x").unwrap(),
            Scalar::Enum {
                type_name: "AdminStatus".to_string(),
                value: 1
            }
        );
        assert!(matches!(
            model.decode_scalar(&kind, &json!("SIDEWAYS"), "x"),
            Err(ModelError::UnknownEnumLabel { .. })
        ));
        assert!(matches!(
            model.decode_scalar(&kind, &json!(9), "x"),
            Err(ModelError::UnknownEnumValue { .. })
        ));
    }
}
