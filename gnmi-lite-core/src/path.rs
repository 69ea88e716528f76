//! Path helpers: joining, canonical string form and parsing
//!
//! The canonical form is `elem[k=v,k2=v2]/elem2` with keys in sorted order.
//! It is used as the subscription registry key and in log output, so two
//! paths selecting the same node always render identically.

use std::fmt;
use std::str::FromStr;

use crate::error::GnmiError;
use crate::types::{Path, PathElem};

/// Prefix elements followed by the path's own elements.
///
/// An absent prefix yields the path unchanged. The origin of the path wins
/// over the prefix's when both are set.
pub fn full_path(prefix: Option<&Path>, path: &Path) -> Path {
    let Some(prefix) = prefix else {
        return path.clone();
    };
    let mut elem = prefix.elem.clone();
    elem.extend(path.elem.iter().cloned());
    let mut element = prefix.element.clone();
    element.extend(path.element.iter().cloned());
    Path {
        origin: path.origin.clone().or_else(|| prefix.origin.clone()),
        element,
        elem,
    }
}

/// Canonical string of an optional path; `(nil)` when absent.
pub fn path_to_string(path: Option<&Path>) -> String {
    match path {
        Some(p) => p.to_string(),
        None => "(nil)".to_string(),
    }
}

/// Canonical string of prefix and path joined.
pub fn prefix_and_path_to_string(prefix: Option<&Path>, path: &Path) -> String {
    full_path(prefix, path).to_string()
}

impl fmt::Display for PathElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.key.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (k, v)) in self.key.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elem.is_empty() {
            return f.write_str(&self.element.join("/"));
        }
        for (i, elem) in self.elem.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{elem}")?;
        }
        Ok(())
    }
}

impl Path {
    /// Parse `/a[k=v]/b` style text. A leading `/` is optional; `""` and `"/"`
    /// are the root. Keys may be given as `[k=v][k2=v2]` or `[k=v,k2=v2]`.
    pub fn parse(text: &str) -> Result<Self, GnmiError> {
        text.parse()
    }
}

impl FromStr for Path {
    type Err = GnmiError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let body = text.strip_prefix('/').unwrap_or(text);
        let mut elem = Vec::new();
        for segment in split_segments(body)? {
            if segment.is_empty() {
                return Err(GnmiError::invalid_argument(format!(
                    "empty path element in {text:?}"
                )));
            }
            elem.push(parse_elem(segment)?);
        }
        Ok(Path::new(elem))
    }
}

/// Split on `/` outside of brackets.
fn split_segments(body: &str) -> Result<Vec<&str>, GnmiError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    GnmiError::invalid_argument(format!("unbalanced ']' in path {body:?}"))
                })?;
            }
            '/' if depth == 0 => {
                segments.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(GnmiError::invalid_argument(format!(
            "unterminated '[' in path {body:?}"
        )));
    }
    segments.push(&body[start..]);
    Ok(segments)
}

fn parse_elem(segment: &str) -> Result<PathElem, GnmiError> {
    let (name, mut rest) = match segment.find('[') {
        Some(i) => (&segment[..i], &segment[i..]),
        None => (segment, ""),
    };
    if name.is_empty() {
        return Err(GnmiError::invalid_argument(format!(
            "path element {segment:?} has no name"
        )));
    }
    let mut elem = PathElem::new(name);
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(|| {
            GnmiError::invalid_argument(format!("unexpected text in path element {segment:?}"))
        })?;
        let end = inner.find(']').ok_or_else(|| {
            GnmiError::invalid_argument(format!("unterminated key in path element {segment:?}"))
        })?;
        for pair in inner[..end].split(',') {
            let (k, v) = pair.split_once('=').ok_or_else(|| {
                GnmiError::invalid_argument(format!("malformed key {pair:?} in {segment:?}"))
            })?;
            let k = k.trim();
            if k.is_empty() {
                return Err(GnmiError::invalid_argument(format!(
                    "empty key name in {segment:?}"
                )));
            }
            elem.key.insert(k.to_string(), v.trim().to_string());
        }
        rest = &inner[end + 1..];
    }
    Ok(elem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_string_sorts_keys() {
        let path = Path::new(vec![
            PathElem::new("route")
                .with_key("vrf", "2")
                .with_key("prefix", "10.0.0.0/8"),
            PathElem::new("next-hop"),
        ]);
        assert_eq!(path.to_string(), "route[prefix=10.0.0.0/8,vrf=2]/next-hop");
    }

    #[test]
    fn test_root_and_nil() {
        assert_eq!(Path::root().to_string(), "");
        assert_eq!(path_to_string(None), "(nil)");
        assert_eq!(path_to_string(Some(&Path::root())), "");
    }

    #[test]
    fn test_full_path_joins_prefix() {
        let prefix = Path::parse("/interface[name=eth0]").unwrap();
        let path = Path::parse("config/mtu").unwrap();
        let full = full_path(Some(&prefix), &path);
        assert_eq!(full.to_string(), "interface[name=eth0]/config/mtu");
        assert_eq!(full_path(None, &path), path);
        assert_eq!(full_path(Some(&prefix), &Path::root()), prefix);
    }

    #[test]
    fn test_prefix_and_path_to_string() {
        let prefix = Path::parse("/system").unwrap();
        let path = Path::parse("/hostname").unwrap();
        assert_eq!(
            prefix_and_path_to_string(Some(&prefix), &path),
            "system/hostname"
        );
    }

    #[test]
    fn test_parse_both_key_forms() {
        let a = Path::parse("/route[prefix=10.0.0.0/8][vrf=2]/next-hop").unwrap();
        let b = Path::parse("route[vrf=2,prefix=10.0.0.0/8]/next-hop").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.elem.len(), 2);
        assert_eq!(a.elem[0].key["prefix"], "10.0.0.0/8");
    }

    #[test]
    fn test_parse_root() {
        assert!(Path::parse("/").unwrap().is_root());
        assert!(Path::parse("").unwrap().is_root());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Path::parse("/a[k=v").is_err());
        assert!(Path::parse("/a]").is_err());
        assert!(Path::parse("/a[kv]").is_err());
        assert!(Path::parse("/a//b").is_err());
        assert!(Path::parse("/[k=v]").is_err());
    }
}
