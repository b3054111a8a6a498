//! `render(template)` step.

use super::spawn_filter_map;
use crate::element::Element;
use crate::path;
use crate::processor::{GraphHandle, InPipe, OutPipe, PipelineContext, Processor};
use serde_json::Value;

/// Replaces the current element with a rendered template.
pub struct Render {
  template: Value,
}

impl Render {
  /// Renders `template` for every traveler.
  pub fn new(template: Value) -> Self {
    Self { template }
  }
}

impl Processor for Render {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    spawn_filter_map("Render", ctx.clone(), input, output, move |t| {
      let rendered = path::render(&t, &self.template);
      Some(t.with_current(Element::Value(rendered)))
    });
    ctx.with_load_data(true)
  }
}
