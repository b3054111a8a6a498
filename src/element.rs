//! # Graph Elements
//!
//! The values a [`Traveler`](crate::traveler::Traveler) can carry as its current
//! element or bind under a mark.
//!
//! Vertices and edges share one record type, [`DataElement`]. Everything else a
//! traversal produces (rendered documents, aggregates, counts) is carried as a
//! plain value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved document key holding an element's id.
pub const GID_KEY: &str = "_gid";
/// Reserved document key holding an element's label.
pub const LABEL_KEY: &str = "_label";
/// Reserved document key holding an edge's source vertex id.
pub const FROM_KEY: &str = "_from";
/// Reserved document key holding an edge's target vertex id.
pub const TO_KEY: &str = "_to";

/// A vertex or edge as stored in the graph.
///
/// `from` and `to` are empty for vertices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataElement {
  /// Unique element id.
  pub id: String,
  /// Element label.
  pub label: String,
  /// Source vertex id (edges only).
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub from: String,
  /// Target vertex id (edges only).
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub to: String,
  /// Property map.
  #[serde(default)]
  pub data: Map<String, Value>,
}

impl DataElement {
  /// Creates a vertex record with no properties.
  pub fn vertex(id: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      label: label.into(),
      ..Default::default()
    }
  }

  /// Creates an edge record with no properties.
  pub fn edge(
    id: impl Into<String>,
    label: impl Into<String>,
    from: impl Into<String>,
    to: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      label: label.into(),
      from: from.into(),
      to: to.into(),
      data: Map::new(),
    }
  }

  /// Sets a property, returning the updated record.
  pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.data.insert(key.into(), value.into());
    self
  }

  /// Returns the document form of this element.
  ///
  /// The document holds every property plus the reserved keys `_gid`, `_label`,
  /// `_from` and `_to`. Reserved keys are only present when non-empty.
  pub fn to_document(&self) -> Value {
    let mut doc = self.data.clone();
    if !self.id.is_empty() {
      doc.insert(GID_KEY.to_string(), Value::String(self.id.clone()));
    }
    if !self.label.is_empty() {
      doc.insert(LABEL_KEY.to_string(), Value::String(self.label.clone()));
    }
    if !self.from.is_empty() {
      doc.insert(FROM_KEY.to_string(), Value::String(self.from.clone()));
    }
    if !self.to.is_empty() {
      doc.insert(TO_KEY.to_string(), Value::String(self.to.clone()));
    }
    Value::Object(doc)
  }
}

/// The active value of a traveler.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
  /// A graph vertex.
  Vertex(DataElement),
  /// A graph edge.
  Edge(DataElement),
  /// A free-form value such as a rendered document.
  Value(Value),
  /// The result of a count step.
  Count(u64),
}

impl Element {
  /// Returns the underlying vertex or edge record, if any.
  pub fn as_data_element(&self) -> Option<&DataElement> {
    match self {
      Element::Vertex(e) | Element::Edge(e) => Some(e),
      Element::Value(_) | Element::Count(_) => None,
    }
  }

  /// Returns the id of a vertex or edge.
  pub fn id(&self) -> Option<&str> {
    self.as_data_element().map(|e| e.id.as_str())
  }

  /// Returns the document used for path lookups.
  pub fn to_document(&self) -> Value {
    match self {
      Element::Vertex(e) | Element::Edge(e) => e.to_document(),
      Element::Value(v) => v.clone(),
      Element::Count(c) => Value::from(*c),
    }
  }
}
