//! # Lookup Stages
//!
//! Stages that pull elements out of the storage layer.
//!
//! - [`LookupVertices`] / [`LookupEdges`]: for every incoming traveler, emit one
//!   traveler per vertex/edge (all of them, or the listed ids)
//! - [`Adjacent`]: step from the current element to its neighbours
//!
//! Storage failures are logged and the traveler that triggered the call simply
//! produces no (further) output.

use crate::element::{DataElement, Element};
use crate::processor::{GraphHandle, InPipe, OutPipe, PipelineContext, Processor};
use crate::storage::ElementStream;
use crate::traveler::Traveler;
use tracing::{debug, warn};

/// Edge direction of an adjacency step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  /// Follow edges from `from` to `to`.
  Out,
  /// Follow edges from `to` to `from`.
  In,
  /// `Out` first, then `In`.
  Both,
}

impl Direction {
  /// Single directions walked, in order.
  fn sides(self) -> &'static [Direction] {
    match self {
      Direction::Out => &[Direction::Out],
      Direction::In => &[Direction::In],
      Direction::Both => &[Direction::Out, Direction::In],
    }
  }
}

/// Sends every element of `stream` downstream as the new current element.
///
/// Returns `false` when the stage must stop.
async fn emit_stream(
  ctx: &PipelineContext,
  output: &OutPipe,
  traveler: &Traveler,
  mut stream: ElementStream,
  wrap: fn(DataElement) -> Element,
) -> bool {
  while let Some(item) = ctx.next(&mut stream).await {
    match item {
      Ok(element) => {
        if !ctx.send(output, traveler.with_current(wrap(element))).await {
          return false;
        }
      }
      Err(err) => {
        warn!(error = %err, "storage scan failed");
        break;
      }
    }
  }
  !ctx.is_cancelled()
}

/// `V` step.
pub struct LookupVertices {
  ids: Vec<String>,
}

impl LookupVertices {
  /// Looks up `ids`, or every vertex when empty.
  pub fn new(ids: Vec<String>) -> Self {
    Self { ids }
  }
}

impl Processor for LookupVertices {
  fn process(
    self,
    ctx: PipelineContext,
    graph: GraphHandle,
    mut input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let task_ctx = ctx.clone();
    tokio::spawn(async move {
      let ctx = task_ctx;
      'travelers: while let Some(t) = ctx.recv(&mut input).await {
        if t.is_signal() {
          if !ctx.send(&output, t).await {
            break;
          }
          continue;
        }
        if self.ids.is_empty() {
          let stream = graph.get_vertex_list(&ctx);
          if !emit_stream(&ctx, &output, &t, stream, Element::Vertex).await {
            break;
          }
          continue;
        }
        for id in &self.ids {
          match graph.get_vertex(&ctx, id).await {
            Ok(Some(v)) => {
              if !ctx.send(&output, t.with_current(Element::Vertex(v))).await {
                break 'travelers;
              }
            }
            Ok(None) => {}
            Err(err) => warn!(id = %id, error = %err, "vertex lookup failed"),
          }
        }
      }
      debug!(stage = "V", "stage finished");
    });
    ctx.with_load_data(false)
  }
}

/// `E` step.
pub struct LookupEdges {
  ids: Vec<String>,
}

impl LookupEdges {
  /// Looks up `ids`, or every edge when empty.
  pub fn new(ids: Vec<String>) -> Self {
    Self { ids }
  }
}

impl Processor for LookupEdges {
  fn process(
    self,
    ctx: PipelineContext,
    graph: GraphHandle,
    mut input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let task_ctx = ctx.clone();
    tokio::spawn(async move {
      let ctx = task_ctx;
      'travelers: while let Some(t) = ctx.recv(&mut input).await {
        if t.is_signal() {
          if !ctx.send(&output, t).await {
            break;
          }
          continue;
        }
        if self.ids.is_empty() {
          let stream = graph.get_edge_list(&ctx);
          if !emit_stream(&ctx, &output, &t, stream, Element::Edge).await {
            break;
          }
          continue;
        }
        for id in &self.ids {
          match graph.get_edge(&ctx, id).await {
            Ok(Some(e)) => {
              if !ctx.send(&output, t.with_current(Element::Edge(e))).await {
                break 'travelers;
              }
            }
            Ok(None) => {}
            Err(err) => warn!(id = %id, error = %err, "edge lookup failed"),
          }
        }
      }
      debug!(stage = "E", "stage finished");
    });
    ctx.with_load_data(false)
  }
}

/// `Out`, `In`, `Both`, `OutE`, `InE` and `BothE` steps.
///
/// From a vertex, follows its out/in edges (optionally restricted to `labels`)
/// and emits either the edges or the vertices at their other end. From an edge,
/// the vertex variants step to the edge's `to` (`Out`) or `from` (`In`) vertex.
/// `Both` walks the out side before the in side.
pub struct Adjacent {
  direction: Direction,
  labels: Vec<String>,
  emit_edges: bool,
}

impl Adjacent {
  /// `Out` / `In`: emit neighbouring vertices.
  pub fn vertices(direction: Direction, labels: Vec<String>) -> Self {
    Self {
      direction,
      labels,
      emit_edges: false,
    }
  }

  /// `OutE` / `InE`: emit the connecting edges.
  pub fn edges(direction: Direction, labels: Vec<String>) -> Self {
    Self {
      direction,
      labels,
      emit_edges: true,
    }
  }

  /// Step name for logs.
  pub fn name(&self) -> &'static str {
    match (self.direction, self.emit_edges) {
      (Direction::Out, false) => "Out",
      (Direction::In, false) => "In",
      (Direction::Both, false) => "Both",
      (Direction::Out, true) => "OutE",
      (Direction::In, true) => "InE",
      (Direction::Both, true) => "BothE",
    }
  }

  /// Emits the neighbours of one data traveler. Returns `false` when the stage
  /// must stop.
  async fn step(
    &self,
    ctx: &PipelineContext,
    graph: &GraphHandle,
    output: &OutPipe,
    traveler: &Traveler,
  ) -> bool {
    let Some(current) = traveler.current() else {
      return true;
    };
    for &side in self.direction.sides() {
      match &**current {
        Element::Vertex(v) => {
          let mut edges = match side {
            Direction::In => graph.get_in_edges(ctx, &v.id, &self.labels),
            _ => graph.get_out_edges(ctx, &v.id, &self.labels),
          };
          while let Some(item) = ctx.next(&mut edges).await {
            let edge = match item {
              Ok(edge) => edge,
              Err(err) => {
                warn!(vertex = %v.id, error = %err, "adjacency scan failed");
                break;
              }
            };
            let next = if self.emit_edges {
              Some(Element::Edge(edge))
            } else {
              let id = match side {
                Direction::In => &edge.from,
                _ => &edge.to,
              };
              self.fetch_vertex(ctx, graph, id).await
            };
            if let Some(element) = next {
              if !ctx.send(output, traveler.with_current(element)).await {
                return false;
              }
            }
          }
        }
        Element::Edge(e) if !self.emit_edges => {
          let id = match side {
            Direction::In => &e.from,
            _ => &e.to,
          };
          if let Some(element) = self.fetch_vertex(ctx, graph, id).await {
            if !ctx.send(output, traveler.with_current(element)).await {
              return false;
            }
          }
        }
        _ => {}
      }
      if ctx.is_cancelled() {
        return false;
      }
    }
    true
  }

  async fn fetch_vertex(
    &self,
    ctx: &PipelineContext,
    graph: &GraphHandle,
    id: &str,
  ) -> Option<Element> {
    match graph.get_vertex(ctx, id).await {
      Ok(v) => v.map(Element::Vertex),
      Err(err) => {
        warn!(vertex = %id, error = %err, "vertex lookup failed");
        None
      }
    }
  }
}

impl Processor for Adjacent {
  fn process(
    self,
    ctx: PipelineContext,
    graph: GraphHandle,
    mut input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let task_ctx = ctx.clone();
    tokio::spawn(async move {
      let ctx = task_ctx;
      while let Some(t) = ctx.recv(&mut input).await {
        if t.is_signal() {
          if !ctx.send(&output, t).await {
            break;
          }
          continue;
        }
        if !self.step(&ctx, &graph, &output, &t).await {
          break;
        }
      }
      debug!(stage = self.name(), "stage finished");
    });
    ctx.with_load_data(false)
  }
}
