//! # Processor Contract
//!
//! The uniform shape of every pipeline stage.
//!
//! A stage consumes one input pipe and produces one output pipe on its own
//! spawned task:
//!
//! 1. read travelers from `input` until it closes
//! 2. write zero or more results per traveler to `output`
//! 3. close `output` (drop the sender) as the very last action
//!
//! Every blocking receive and send also waits on the context's cancellation
//! token. A cancelled stage stops immediately and drops its output, so the close
//! propagates down the chain instead of leaving consumers waiting forever.

use crate::storage::GraphStore;
use crate::traveler::Traveler;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Read end of a pipe between two stages.
pub type InPipe = mpsc::Receiver<Traveler>;

/// Write end of a pipe between two stages. Dropping it closes the pipe.
pub type OutPipe = mpsc::Sender<Traveler>;

/// Shared handle to the storage layer passed to every stage.
pub type GraphHandle = Arc<dyn GraphStore>;

/// Context threaded through `process` calls while a pipeline is wired.
///
/// Carries the cancellation token shared by every stage and a load hint telling
/// source stages whether downstream stages will read element properties.
#[derive(Debug, Clone)]
pub struct PipelineContext {
  cancel: CancellationToken,
  load_data: bool,
}

impl Default for PipelineContext {
  fn default() -> Self {
    Self::new(CancellationToken::new())
  }
}

impl PipelineContext {
  /// Creates a context around a cancellation token.
  pub fn new(cancel: CancellationToken) -> Self {
    Self {
      cancel,
      load_data: true,
    }
  }

  /// Returns a copy of this context with a different load hint.
  pub fn with_load_data(&self, load_data: bool) -> Self {
    Self {
      cancel: self.cancel.clone(),
      load_data,
    }
  }

  /// Whether element properties should be loaded.
  pub fn load_data(&self) -> bool {
    self.load_data
  }

  /// The cancellation token shared by the pipeline.
  pub fn cancel_token(&self) -> &CancellationToken {
    &self.cancel
  }

  /// Returns true once the pipeline has been cancelled.
  pub fn is_cancelled(&self) -> bool {
    self.cancel.is_cancelled()
  }

  /// Receives the next traveler, or `None` when the pipe closed or the pipeline
  /// was cancelled.
  pub async fn recv(&self, input: &mut InPipe) -> Option<Traveler> {
    tokio::select! {
      biased;
      _ = self.cancel.cancelled() => None,
      t = input.recv() => t,
    }
  }

  /// Pulls the next item from a storage stream, or `None` on cancellation.
  pub async fn next<S>(&self, stream: &mut S) -> Option<S::Item>
  where
    S: Stream + Unpin,
  {
    tokio::select! {
      biased;
      _ = self.cancel.cancelled() => None,
      item = stream.next() => item,
    }
  }

  /// Sends a traveler downstream.
  ///
  /// Returns `false` when the pipeline was cancelled or the downstream stage is
  /// gone; the caller should stop and drop its output.
  pub async fn send(&self, output: &OutPipe, traveler: Traveler) -> bool {
    tokio::select! {
      biased;
      _ = self.cancel.cancelled() => false,
      res = output.send(traveler) => res.is_ok(),
    }
  }
}

/// A pipeline stage.
///
/// `process` spawns the stage's task and returns immediately with the context
/// the next stage should be wired with.
pub trait Processor {
  /// Starts the stage.
  fn process(
    self,
    ctx: PipelineContext,
    graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext;
}
