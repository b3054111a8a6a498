//! # Projection Stages
//!
//! `fields(keys)` trims the current element to selected properties and
//! `unwind(field)` fans a list property out into one traveler per entry.
//!
//! Both only reshape the current element. Paths into marks are ignored with a
//! warning, and object paths use plain dotted keys (no array indexes).

use super::spawn_filter_map;
use crate::element::{DataElement, Element, FROM_KEY, GID_KEY, LABEL_KEY, TO_KEY};
use crate::path::{self, CURRENT};
use crate::processor::{GraphHandle, InPipe, OutPipe, PipelineContext, Processor};
use crate::traveler::Traveler;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Splits `key` into field segments of the current element, or `None` for a
/// path into a mark.
fn current_path(key: &str) -> Option<Vec<String>> {
  let (namespace, fields) = path::split_namespace(key);
  if namespace != CURRENT {
    warn!(key, "only fields of the current element can be selected");
    return None;
  }
  Some(fields.into_iter().map(str::to_string).collect())
}

fn get_path<'a>(map: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
  let (first, rest) = path.split_first()?;
  let value = map.get(first)?;
  if rest.is_empty() {
    return Some(value);
  }
  get_path(value.as_object()?, rest)
}

fn set_path(map: &mut Map<String, Value>, path: &[String], value: Value) {
  let Some((first, rest)) = path.split_first() else {
    return;
  };
  if rest.is_empty() {
    map.insert(first.clone(), value);
    return;
  }
  let child = map
    .entry(first.clone())
    .or_insert_with(|| Value::Object(Map::new()));
  if !child.is_object() {
    *child = Value::Object(Map::new());
  }
  if let Value::Object(child) = child {
    set_path(child, rest, value);
  }
}

fn remove_path(map: &mut Map<String, Value>, path: &[String]) {
  match path {
    [] => {}
    [last] => {
      map.remove(last);
    }
    [first, rest @ ..] => {
      if let Some(Value::Object(child)) = map.get_mut(first) {
        remove_path(child, rest);
      }
    }
  }
}

fn is_reserved(path: &[String]) -> bool {
  matches!(
    path,
    [key] if [GID_KEY, LABEL_KEY, FROM_KEY, TO_KEY].contains(&key.as_str())
  )
}

/// The property map of an element, if it has one.
fn data_of(element: &Element) -> Option<&Map<String, Value>> {
  match element {
    Element::Vertex(e) | Element::Edge(e) => Some(&e.data),
    Element::Value(Value::Object(map)) => Some(map),
    _ => None,
  }
}

/// Rebuilds `element` around new properties.
fn with_data(element: &Element, data: Map<String, Value>) -> Element {
  let rebuild = |e: &DataElement, data: Map<String, Value>| DataElement {
    id: e.id.clone(),
    label: e.label.clone(),
    from: e.from.clone(),
    to: e.to.clone(),
    data,
  };
  match element {
    Element::Vertex(e) => Element::Vertex(rebuild(e, data)),
    Element::Edge(e) => Element::Edge(rebuild(e, data)),
    _ => Element::Value(Value::Object(data)),
  }
}

/// `fields(keys)` step.
///
/// Plain keys are kept and `-key` entries are dropped. When both kinds are
/// given, the kept keys win. The element's id, label and endpoints always
/// survive. An empty key list passes travelers through unchanged.
pub struct Fields {
  include: Vec<Vec<String>>,
  exclude: Vec<Vec<String>>,
}

impl Fields {
  /// Projects onto `keys`.
  pub fn new(keys: Vec<String>) -> Self {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for key in keys {
      let (list, key) = match key.strip_prefix('-') {
        Some(rest) => (&mut exclude, rest.to_string()),
        None => (&mut include, key),
      };
      if let Some(path) = current_path(&key) {
        if !path.is_empty() {
          list.push(path);
        }
      }
    }
    Self { include, exclude }
  }

  fn project(&self, element: &Element) -> Option<Element> {
    let data = data_of(element)?;
    let mut out = Map::new();
    if !self.exclude.is_empty() {
      out = data.clone();
      for path in &self.exclude {
        remove_path(&mut out, path);
      }
    }
    if !self.include.is_empty() {
      out = Map::new();
      for path in self.include.iter().filter(|p| !is_reserved(p)) {
        if let Some(value) = get_path(data, path) {
          set_path(&mut out, path, value.clone());
        }
      }
    }
    Some(with_data(element, out))
  }
}

impl Processor for Fields {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let passthrough = self.include.is_empty() && self.exclude.is_empty();
    spawn_filter_map("Fields", ctx.clone(), input, output, move |t| {
      if passthrough {
        return Some(t);
      }
      let projected = t.current().and_then(|e| self.project(e));
      match projected {
        Some(element) => Some(t.with_current(element)),
        None => Some(t),
      }
    });
    ctx.with_load_data(true)
  }
}

/// `unwind(field)` step.
///
/// A non-empty list under `field` yields one traveler per entry, each with the
/// field replaced by that entry. An empty list becomes `null`. Travelers
/// without a list there pass through unchanged.
pub struct Unwind {
  field: String,
  path: Option<Vec<String>>,
}

impl Unwind {
  /// Unwinds the list at `field`.
  pub fn new(field: impl Into<String>) -> Self {
    let field = field.into();
    let path = current_path(&field).filter(|p| !p.is_empty());
    Self { field, path }
  }

  /// Travelers produced for one input traveler.
  fn expand(&self, t: Traveler) -> Vec<Traveler> {
    let Some(path) = &self.path else {
      return vec![t];
    };
    let Some(current) = t.current() else {
      return vec![t];
    };
    let Some(data) = data_of(current) else {
      return vec![t];
    };
    let items = match get_path(data, path) {
      Some(Value::Array(items)) => items,
      _ => return vec![t],
    };
    if items.is_empty() {
      let mut data = data.clone();
      set_path(&mut data, path, Value::Null);
      return vec![t.with_current(with_data(current, data))];
    }
    items
      .iter()
      .map(|item| {
        let mut data = data.clone();
        set_path(&mut data, path, item.clone());
        t.with_current(with_data(current, data))
      })
      .collect()
  }
}

impl Processor for Unwind {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    mut input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let task_ctx = ctx.clone();
    tokio::spawn(async move {
      let ctx = task_ctx;
      'travelers: while let Some(t) = ctx.recv(&mut input).await {
        let out = if t.is_signal() { vec![t] } else { self.expand(t) };
        for t in out {
          if !ctx.send(&output, t).await {
            break 'travelers;
          }
        }
      }
      debug!(stage = "Unwind", field = %self.field, "stage finished");
    });
    ctx.with_load_data(true)
  }
}
