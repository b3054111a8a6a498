//! Error types.
//!
//! Only pipeline assembly and storage access can fail. Once a pipeline is
//! running, failures are logged and the affected traveler produces no output.

use thiserror::Error;

/// Errors raised while assembling a pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
  /// The pipeline has no stages.
  #[error("pipeline has no stages")]
  Empty,
  /// A jump targets a mark that is not part of the pipeline.
  #[error("jump targets unknown mark '{0}'")]
  MissingMark(String),
  /// Two marks share a name.
  #[error("mark '{0}' is declared more than once")]
  DuplicateMark(String),
  /// A jump appears before the mark it targets.
  #[error("jump to mark '{0}' must come after the mark")]
  ForwardJump(String),
  /// A `HasLabel`, `HasId` or `HasKey` step was given nothing to match.
  #[error("{0} needs at least one value")]
  EmptySelection(&'static str),
}

/// Errors raised by a storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
  /// The backend could not serve the request.
  #[error("storage error: {0}")]
  Backend(String),
  /// The request was cancelled before it completed.
  #[error("storage request cancelled")]
  Cancelled,
}
