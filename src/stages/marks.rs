//! # Mark Stages
//!
//! `as(name)` binds the current element under a name; `select(name)` brings a
//! bound element back as the current one.
//!
//! Bound elements may be read by any later stage, so both ask upstream stages
//! to load element properties.

use super::spawn_filter_map;
use crate::processor::{GraphHandle, InPipe, OutPipe, PipelineContext, Processor};
use std::sync::Arc;
use tracing::trace;

/// `as(name)` step.
pub struct Marker {
  name: String,
}

impl Marker {
  /// Binds under `name`.
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

impl Processor for Marker {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    spawn_filter_map("As", ctx.clone(), input, output, move |t| {
      match t.current() {
        Some(current) => {
          let current = Arc::clone(current);
          Some(t.with_mark(&self.name, current))
        }
        None => Some(t),
      }
    });
    ctx.with_load_data(true)
  }
}

/// `select(name)` step. Travelers without the mark are dropped.
pub struct Select {
  name: String,
}

impl Select {
  /// Restores mark `name`.
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

impl Processor for Select {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    spawn_filter_map("Select", ctx.clone(), input, output, move |t| {
      match t.mark(&self.name) {
        Some(element) => Some(t.with_current_arc(Arc::clone(element))),
        None => {
          trace!(mark = %self.name, "traveler has no such mark");
          None
        }
      }
    });
    ctx.with_load_data(true)
  }
}
