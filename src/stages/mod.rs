//! # Traversal Stages
//!
//! The fixed set of operators a traversal compiles into.
//!
//! ## Stage Kinds
//!
//! - **Sources**: `V`, `E` (scan or fetch by id), `Out`, `In`, `Both`, `OutE`,
//!   `InE`, `BothE` (adjacency)
//! - **Filters**: `Has`, `HasLabel`, `HasId`, `HasKey`, `Limit`, `Skip`,
//!   `Range`, `Distinct`
//! - **Transforms**: `As`, `Select`, `Fields`, `Unwind`, `Render`, `Count`
//! - **Cycles**: `Jump`, `JumpMark`
//!
//! Every stage forwards signal travelers unchanged and in order, so quiescence
//! signals issued by a [`JumpMark`] reach every jump downstream of it.

pub mod filter;
pub mod jump;
pub mod lookup;
pub mod marks;
pub mod project;
pub mod render;

#[cfg(test)]
mod filter_test;
#[cfg(test)]
mod project_test;

pub use filter::{Count, Distinct, Has, HasKey, Limit, Range, Skip};
pub use jump::{Jump, JumpMark};
pub use lookup::{Adjacent, Direction, LookupEdges, LookupVertices};
pub use marks::{Marker, Select};
pub use project::{Fields, Unwind};
pub use render::Render;

use crate::expression::HasExpression;
use crate::processor::{GraphHandle, InPipe, OutPipe, PipelineContext, Processor};
use crate::traveler::Traveler;
use serde_json::Value;
use tracing::debug;

/// A pipeline stage.
pub enum Stage {
  /// Vertex lookup (`V`).
  LookupVertices(LookupVertices),
  /// Edge lookup (`E`).
  LookupEdges(LookupEdges),
  /// Adjacency step (`Out`, `In`, `Both`, `OutE`, `InE`, `BothE`).
  Adjacent(Adjacent),
  /// Predicate filter (`Has`, `HasLabel`, `HasId`).
  Has(Has),
  /// Keeps travelers that define every listed key.
  HasKey(HasKey),
  /// Binds the current element under a name.
  As(Marker),
  /// Restores a bound element as current.
  Select(Select),
  /// Keeps the first `n` data travelers.
  Limit(Limit),
  /// Drops the first `n` data travelers.
  Skip(Skip),
  /// Keeps data travelers in a half-open position window.
  Range(Range),
  /// Counts data travelers.
  Count(Count),
  /// Drops travelers with an already seen key.
  Distinct(Distinct),
  /// Trims the current element to selected properties.
  Fields(Fields),
  /// Fans a list property out into one traveler per entry.
  Unwind(Unwind),
  /// Replaces the current element with a rendered template.
  Render(Render),
  /// Sends matching travelers back to a mark.
  Jump(Jump),
  /// Rejoin point of a cyclic sub-query.
  JumpMark(JumpMark),
}

impl Stage {
  /// `V()` / `V(ids)`
  pub fn v(ids: Vec<String>) -> Self {
    Stage::LookupVertices(LookupVertices::new(ids))
  }

  /// `E()` / `E(ids)`
  pub fn e(ids: Vec<String>) -> Self {
    Stage::LookupEdges(LookupEdges::new(ids))
  }

  /// `out(labels)`
  pub fn out(labels: Vec<String>) -> Self {
    Stage::Adjacent(Adjacent::vertices(Direction::Out, labels))
  }

  /// `in(labels)`
  pub fn in_(labels: Vec<String>) -> Self {
    Stage::Adjacent(Adjacent::vertices(Direction::In, labels))
  }

  /// `both(labels)`
  pub fn both(labels: Vec<String>) -> Self {
    Stage::Adjacent(Adjacent::vertices(Direction::Both, labels))
  }

  /// `outE(labels)`
  pub fn out_e(labels: Vec<String>) -> Self {
    Stage::Adjacent(Adjacent::edges(Direction::Out, labels))
  }

  /// `inE(labels)`
  pub fn in_e(labels: Vec<String>) -> Self {
    Stage::Adjacent(Adjacent::edges(Direction::In, labels))
  }

  /// `bothE(labels)`
  pub fn both_e(labels: Vec<String>) -> Self {
    Stage::Adjacent(Adjacent::edges(Direction::Both, labels))
  }

  /// `has(expr)`
  pub fn has(expr: HasExpression) -> Self {
    Stage::Has(Has::new(expr))
  }

  /// `hasLabel(labels)`
  pub fn has_label(labels: Vec<String>) -> Self {
    Stage::Has(Has::labels(labels))
  }

  /// `hasId(ids)`
  pub fn has_id(ids: Vec<String>) -> Self {
    Stage::Has(Has::ids(ids))
  }

  /// `hasKey(keys)`
  pub fn has_key(keys: Vec<String>) -> Self {
    Stage::HasKey(HasKey::new(keys))
  }

  /// `as(name)`
  pub fn as_mark(name: impl Into<String>) -> Self {
    Stage::As(Marker::new(name))
  }

  /// `select(name)`
  pub fn select(name: impl Into<String>) -> Self {
    Stage::Select(Select::new(name))
  }

  /// `limit(n)`
  pub fn limit(n: u64) -> Self {
    Stage::Limit(Limit::new(n))
  }

  /// `skip(n)`
  pub fn skip(n: u64) -> Self {
    Stage::Skip(Skip::new(n))
  }

  /// `range(start, stop)`; no `stop` means unbounded.
  pub fn range(start: u64, stop: Option<u64>) -> Self {
    Stage::Range(Range::new(start, stop))
  }

  /// `count()`
  pub fn count() -> Self {
    Stage::Count(Count)
  }

  /// `distinct(paths)`
  pub fn distinct(paths: Vec<String>) -> Self {
    Stage::Distinct(Distinct::new(paths))
  }

  /// `fields(keys)`
  pub fn fields(keys: Vec<String>) -> Self {
    Stage::Fields(Fields::new(keys))
  }

  /// `unwind(field)`
  pub fn unwind(field: impl Into<String>) -> Self {
    Stage::Unwind(Unwind::new(field))
  }

  /// `render(template)`
  pub fn render(template: Value) -> Self {
    Stage::Render(Render::new(template))
  }

  /// `mark(name)`
  pub fn mark(name: impl Into<String>) -> Self {
    Stage::JumpMark(JumpMark::new(name))
  }

  /// `jump(mark, expr, emit)`
  pub fn jump(mark: impl Into<String>, filter: Option<HasExpression>, emit: bool) -> Self {
    Stage::Jump(Jump::new(mark, filter, emit))
  }

  /// Short name used in logs and step counts.
  pub fn name(&self) -> &'static str {
    match self {
      Stage::LookupVertices(_) => "V",
      Stage::LookupEdges(_) => "E",
      Stage::Adjacent(a) => a.name(),
      Stage::Has(h) => h.name(),
      Stage::HasKey(_) => "HasKey",
      Stage::As(_) => "As",
      Stage::Select(_) => "Select",
      Stage::Limit(_) => "Limit",
      Stage::Skip(_) => "Skip",
      Stage::Range(_) => "Range",
      Stage::Count(_) => "Count",
      Stage::Distinct(_) => "Distinct",
      Stage::Fields(_) => "Fields",
      Stage::Unwind(_) => "Unwind",
      Stage::Render(_) => "Render",
      Stage::Jump(_) => "Jump",
      Stage::JumpMark(_) => "Mark",
    }
  }
}

impl Processor for Stage {
  fn process(
    self,
    ctx: PipelineContext,
    graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    match self {
      Stage::LookupVertices(s) => s.process(ctx, graph, input, output),
      Stage::LookupEdges(s) => s.process(ctx, graph, input, output),
      Stage::Adjacent(s) => s.process(ctx, graph, input, output),
      Stage::Has(s) => s.process(ctx, graph, input, output),
      Stage::HasKey(s) => s.process(ctx, graph, input, output),
      Stage::As(s) => s.process(ctx, graph, input, output),
      Stage::Select(s) => s.process(ctx, graph, input, output),
      Stage::Limit(s) => s.process(ctx, graph, input, output),
      Stage::Skip(s) => s.process(ctx, graph, input, output),
      Stage::Range(s) => s.process(ctx, graph, input, output),
      Stage::Count(s) => s.process(ctx, graph, input, output),
      Stage::Distinct(s) => s.process(ctx, graph, input, output),
      Stage::Fields(s) => s.process(ctx, graph, input, output),
      Stage::Unwind(s) => s.process(ctx, graph, input, output),
      Stage::Render(s) => s.process(ctx, graph, input, output),
      Stage::Jump(s) => s.process(ctx, graph, input, output),
      Stage::JumpMark(s) => s.process(ctx, graph, input, output),
    }
  }
}

/// Spawns a one-in/at-most-one-out stage.
///
/// `handle` sees every data traveler; signals bypass it. The output closes after
/// the input is exhausted or the pipeline is cancelled.
pub(crate) fn spawn_filter_map<F>(
  name: &'static str,
  ctx: PipelineContext,
  mut input: InPipe,
  output: OutPipe,
  mut handle: F,
) where
  F: FnMut(Traveler) -> Option<Traveler> + Send + 'static,
{
  tokio::spawn(async move {
    debug!(stage = name, "stage started");
    while let Some(t) = ctx.recv(&mut input).await {
      let next = if t.is_signal() { Some(t) } else { handle(t) };
      if let Some(t) = next {
        if !ctx.send(&output, t).await {
          break;
        }
      }
    }
    debug!(stage = name, "stage finished");
    drop(output);
  });
}
