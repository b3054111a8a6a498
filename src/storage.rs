//! # Storage Interface
//!
//! The boundary between traversal stages and a graph backend.
//!
//! Backends hand out lazily produced element streams. Source stages (`V`, `E`,
//! `Out`, `In`, ...) drive those streams and stop polling them as soon as the
//! pipeline is cancelled; backends may additionally watch the token carried by
//! the [`PipelineContext`] to abandon in-flight work.

use crate::element::DataElement;
use crate::error::StorageError;
use crate::processor::PipelineContext;
use async_trait::async_trait;
use std::pin::Pin;
use futures::Stream;

/// Stream of elements produced by a backend scan.
pub type ElementStream = Pin<Box<dyn Stream<Item = Result<DataElement, StorageError>> + Send>>;

/// Read access to a graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
  /// Fetches a vertex by id.
  async fn get_vertex(
    &self,
    ctx: &PipelineContext,
    id: &str,
  ) -> Result<Option<DataElement>, StorageError>;

  /// Fetches an edge by id.
  async fn get_edge(
    &self,
    ctx: &PipelineContext,
    id: &str,
  ) -> Result<Option<DataElement>, StorageError>;

  /// Streams every vertex.
  fn get_vertex_list(&self, ctx: &PipelineContext) -> ElementStream;

  /// Streams every edge.
  fn get_edge_list(&self, ctx: &PipelineContext) -> ElementStream;

  /// Streams the outgoing edges of a vertex. An empty label list matches all.
  fn get_out_edges(&self, ctx: &PipelineContext, vertex_id: &str, labels: &[String])
  -> ElementStream;

  /// Streams the incoming edges of a vertex. An empty label list matches all.
  fn get_in_edges(&self, ctx: &PipelineContext, vertex_id: &str, labels: &[String])
  -> ElementStream;
}
