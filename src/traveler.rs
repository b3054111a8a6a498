//! # Traveler
//!
//! The unit of data flowing through a traversal pipeline.
//!
//! A traveler is either a data traveler (a current element plus named marks) or a
//! control signal used by the Jump/Mark quiescence protocol, never both. The two
//! constructors [`Traveler::new`] and [`Traveler::signal`] are the only ways to
//! build one, so the exclusivity holds by construction.
//!
//! Travelers are immutable by convention: every "update" returns a new traveler.
//! Elements are held behind `Arc`, so cloning a traveler is a structural copy that
//! shares the (never mutated) elements.

use crate::element::Element;
use std::collections::HashMap;
use std::sync::Arc;

/// Control payload of a quiescence signal round.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signal {
  /// Round id issued by the owning mark.
  pub id: u64,
  /// Name of the mark the signal belongs to.
  pub dest: String,
}

/// One unit of traversal state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Traveler {
  current: Option<Arc<Element>>,
  marks: HashMap<String, Arc<Element>>,
  signal: Option<Signal>,
}

impl Traveler {
  /// Creates an empty data traveler.
  ///
  /// Pipelines start by sending one empty traveler into the first stage.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a signal traveler.
  pub fn signal(signal: Signal) -> Self {
    Self {
      current: None,
      marks: HashMap::new(),
      signal: Some(signal),
    }
  }

  /// Returns a copy of this traveler with `element` as its current element.
  ///
  /// Marks are carried over. Signals have no data, so a signal is returned
  /// unchanged.
  pub fn with_current(&self, element: Element) -> Self {
    self.with_current_arc(Arc::new(element))
  }

  /// Same as [`Traveler::with_current`], reusing an already shared element.
  pub fn with_current_arc(&self, element: Arc<Element>) -> Self {
    if self.is_signal() {
      return self.clone();
    }
    Self {
      current: Some(element),
      marks: self.marks.clone(),
      signal: None,
    }
  }

  /// Returns a copy of this traveler with `element` bound under `name`.
  ///
  /// A mark is never overwritten: if `name` is already bound, the copy keeps
  /// the original binding.
  pub fn with_mark(&self, name: &str, element: Arc<Element>) -> Self {
    let mut out = self.clone();
    if out.is_signal() {
      return out;
    }
    out.marks.entry(name.to_string()).or_insert(element);
    out
  }

  /// Returns the current element.
  pub fn current(&self) -> Option<&Arc<Element>> {
    self.current.as_ref()
  }

  /// Returns the element bound under `name`.
  pub fn mark(&self, name: &str) -> Option<&Arc<Element>> {
    self.marks.get(name)
  }

  /// Returns the names of all bound marks.
  pub fn mark_names(&self) -> impl Iterator<Item = &str> {
    self.marks.keys().map(String::as_str)
  }

  /// Returns the signal payload if this is a control traveler.
  pub fn get_signal(&self) -> Option<&Signal> {
    self.signal.as_ref()
  }

  /// Returns true if this is a control traveler.
  pub fn is_signal(&self) -> bool {
    self.signal.is_some()
  }
}
