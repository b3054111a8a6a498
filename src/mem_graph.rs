//! # In-Memory Graph
//!
//! A [`GraphStore`] held entirely in memory, used by tests and demos.
//!
//! Elements are kept in id order so scans are deterministic. Adjacency is indexed
//! per vertex in insertion order.

use crate::element::DataElement;
use crate::error::StorageError;
use crate::processor::PipelineContext;
use crate::storage::{ElementStream, GraphStore};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct GraphState {
  vertices: BTreeMap<String, DataElement>,
  edges: BTreeMap<String, DataElement>,
  out_index: HashMap<String, Vec<String>>,
  in_index: HashMap<String, Vec<String>>,
}

/// In-memory graph backend.
#[derive(Default, Clone)]
pub struct MemGraph {
  state: Arc<RwLock<GraphState>>,
}

impl MemGraph {
  /// Creates an empty graph.
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts or replaces a vertex.
  pub async fn add_vertex(&self, vertex: DataElement) {
    let mut state = self.state.write().await;
    state.vertices.insert(vertex.id.clone(), vertex);
  }

  /// Inserts an edge and indexes it on both endpoints.
  ///
  /// Endpoints are not required to exist.
  pub async fn add_edge(&self, edge: DataElement) {
    let mut state = self.state.write().await;
    if let Some(old) = state.edges.insert(edge.id.clone(), edge.clone()) {
      if let Some(ids) = state.out_index.get_mut(&old.from) {
        ids.retain(|id| id != &old.id);
      }
      if let Some(ids) = state.in_index.get_mut(&old.to) {
        ids.retain(|id| id != &old.id);
      }
    }
    state
      .out_index
      .entry(edge.from.clone())
      .or_default()
      .push(edge.id.clone());
    state
      .in_index
      .entry(edge.to.clone())
      .or_default()
      .push(edge.id);
  }

  /// Number of vertices.
  pub async fn vertex_count(&self) -> usize {
    self.state.read().await.vertices.len()
  }

  /// Number of edges.
  pub async fn edge_count(&self) -> usize {
    self.state.read().await.edges.len()
  }

  fn adjacent(
    &self,
    ctx: &PipelineContext,
    vertex_id: &str,
    labels: &[String],
    outgoing: bool,
  ) -> ElementStream {
    let state = Arc::clone(&self.state);
    let cancel = ctx.cancel_token().clone();
    let load = ctx.load_data();
    let vertex_id = vertex_id.to_string();
    let labels = labels.to_vec();
    Box::pin(stream! {
      let edges: Vec<DataElement> = {
        let state = state.read().await;
        let index = if outgoing { &state.out_index } else { &state.in_index };
        index
          .get(&vertex_id)
          .map(|ids| {
            ids
              .iter()
              .filter_map(|id| state.edges.get(id))
              .filter(|e| labels.is_empty() || labels.contains(&e.label))
              .cloned()
              .collect()
          })
          .unwrap_or_default()
      };
      for edge in edges {
        if cancel.is_cancelled() {
          yield Err(StorageError::Cancelled);
          break;
        }
        yield Ok(strip(edge, load));
      }
    })
  }

  fn scan(&self, ctx: &PipelineContext, vertices: bool) -> ElementStream {
    let state = Arc::clone(&self.state);
    let cancel = ctx.cancel_token().clone();
    let load = ctx.load_data();
    Box::pin(stream! {
      let items: Vec<DataElement> = {
        let state = state.read().await;
        let map = if vertices { &state.vertices } else { &state.edges };
        map.values().cloned().collect()
      };
      for item in items {
        if cancel.is_cancelled() {
          yield Err(StorageError::Cancelled);
          break;
        }
        yield Ok(strip(item, load));
      }
    })
  }
}

/// Drops properties when the pipeline does not need them.
fn strip(mut element: DataElement, load: bool) -> DataElement {
  if !load {
    element.data.clear();
  }
  element
}

#[async_trait]
impl GraphStore for MemGraph {
  async fn get_vertex(
    &self,
    ctx: &PipelineContext,
    id: &str,
  ) -> Result<Option<DataElement>, StorageError> {
    if ctx.is_cancelled() {
      return Err(StorageError::Cancelled);
    }
    let state = self.state.read().await;
    Ok(state.vertices.get(id).cloned().map(|v| strip(v, ctx.load_data())))
  }

  async fn get_edge(
    &self,
    ctx: &PipelineContext,
    id: &str,
  ) -> Result<Option<DataElement>, StorageError> {
    if ctx.is_cancelled() {
      return Err(StorageError::Cancelled);
    }
    let state = self.state.read().await;
    Ok(state.edges.get(id).cloned().map(|e| strip(e, ctx.load_data())))
  }

  fn get_vertex_list(&self, ctx: &PipelineContext) -> ElementStream {
    self.scan(ctx, true)
  }

  fn get_edge_list(&self, ctx: &PipelineContext) -> ElementStream {
    self.scan(ctx, false)
  }

  fn get_out_edges(
    &self,
    ctx: &PipelineContext,
    vertex_id: &str,
    labels: &[String],
  ) -> ElementStream {
    self.adjacent(ctx, vertex_id, labels, true)
  }

  fn get_in_edges(
    &self,
    ctx: &PipelineContext,
    vertex_id: &str,
    labels: &[String],
  ) -> ElementStream {
    self.adjacent(ctx, vertex_id, labels, false)
  }
}
