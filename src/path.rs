//! # Traveler Paths
//!
//! Resolves dotted path expressions against a traveler's documents and renders
//! templates from them.
//!
//! A path starts with an optional namespace:
//!
//! - `$name.field` reads from the element bound under mark `name`
//! - `$.field`, `$_current.field` or plain `field` read from the current element
//!
//! The rest of the path walks object keys; numeric segments and `[n]` suffixes
//! index into arrays. `$name` on its own returns the whole document.
//!
//! Every function here is total: missing marks, missing keys and type mismatches
//! resolve to "absent" rather than failing.

use crate::traveler::Traveler;
use serde_json::{Map, Value};

/// Namespace name of the current element.
pub const CURRENT: &str = "_current";

/// Splits a path into its namespace and the remaining field segments.
///
/// ```rust
/// use graphweave::path::split_namespace;
///
/// assert_eq!(split_namespace("$gene.symbol.ensembl"), ("gene", vec!["symbol", "ensembl"]));
/// assert_eq!(split_namespace("age"), ("_current", vec!["age"]));
/// assert_eq!(split_namespace("$.age"), ("_current", vec!["age"]));
/// ```
pub fn split_namespace(path: &str) -> (&str, Vec<&str>) {
  let mut parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
  let mut namespace = CURRENT;
  if let Some(first) = path.split('.').next() {
    if let Some(name) = first.strip_prefix('$') {
      if !name.is_empty() {
        namespace = name;
      }
      if !parts.is_empty() && parts[0] == first {
        parts.remove(0);
      }
    }
  }
  (namespace, parts)
}

/// Returns the document for a namespace, or `None` if it is not bound.
pub fn document(traveler: &Traveler, namespace: &str) -> Option<Value> {
  if traveler.is_signal() {
    return None;
  }
  let element = if namespace == CURRENT {
    traveler.current()
  } else {
    traveler.mark(namespace)
  };
  element.map(|e| e.to_document())
}

/// Looks up the value at `path`.
///
/// JSON `null` is reported as absent.
pub fn lookup(traveler: &Traveler, path: &str) -> Option<Value> {
  let (namespace, fields) = split_namespace(path);
  let doc = document(traveler, namespace)?;
  let mut cur = &doc;
  for field in fields {
    cur = step(cur, field)?;
  }
  match cur {
    Value::Null => None,
    v => Some(v.clone()),
  }
}

/// Returns true if `path` resolves to a value.
pub fn exists(traveler: &Traveler, path: &str) -> bool {
  lookup(traveler, path).is_some()
}

/// Walks one path segment, handling `key`, `n` and `key[n][m]` forms.
fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
  let (key, indexes) = match segment.find('[') {
    Some(pos) => (&segment[..pos], &segment[pos..]),
    None => (segment, ""),
  };

  let mut cur = if key.is_empty() {
    value
  } else {
    match value {
      Value::Object(map) => map.get(key)?,
      Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
      _ => return None,
    }
  };

  for index in indexes.split('[').filter(|s| !s.is_empty()) {
    let idx = index.strip_suffix(']')?.parse::<usize>().ok()?;
    cur = cur.as_array()?.get(idx)?;
  }
  Some(cur)
}

/// Fills a template from the traveler.
///
/// Strings are treated as paths and replaced by the value they resolve to
/// (`null` when absent). Objects and arrays are rendered element by element.
/// Any other literal renders as `null`.
pub fn render(traveler: &Traveler, template: &Value) -> Value {
  match template {
    Value::String(path) => lookup(traveler, path).unwrap_or(Value::Null),
    Value::Object(map) => {
      let mut out = Map::with_capacity(map.len());
      for (k, v) in map {
        out.insert(k.clone(), render(traveler, v));
      }
      Value::Object(out)
    }
    Value::Array(items) => Value::Array(items.iter().map(|v| render(traveler, v)).collect()),
    _ => Value::Null,
  }
}
