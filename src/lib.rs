//! # GraphWeave
//!
//! Streaming graph traversals over a pluggable storage layer.
//!
//! A traversal is an ordered list of [`Stage`](stages::Stage)s. Each stage runs
//! on its own tokio task and talks to its neighbours over channels, passing
//! [`Traveler`](traveler::Traveler)s along. Cyclic sub-queries are expressed with
//! a [`JumpMark`](stages::JumpMark) rejoin point and [`Jump`](stages::Jump)
//! stages that send travelers back to it; the mark detects when the cycle has
//! gone quiet with signal rounds.
//!
//! ## Key Features
//!
//! - **Task per stage**: every stage is an independent tokio task
//! - **Predicates**: `has` filters over paths into the current element or marks
//! - **Cycles**: jump/mark with quiescence detection
//! - **Cancellation**: one token tears the whole chain down
//! - **Zero-copy travelers**: elements are shared behind `Arc`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graphweave::element::DataElement;
//! use graphweave::mem_graph::MemGraph;
//! use graphweave::pipeline;
//! use graphweave::stages::Stage;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), graphweave::error::PipelineError> {
//! let graph = MemGraph::new();
//! graph.add_vertex(DataElement::vertex("a", "Person")).await;
//! graph.add_vertex(DataElement::vertex("b", "Person")).await;
//! graph.add_edge(DataElement::edge("ab", "knows", "a", "b")).await;
//!
//! let out = pipeline::run(
//!   vec![Stage::v(vec!["a".into()]), Stage::out(vec![]), Stage::count()],
//!   Arc::new(graph),
//! )
//! .await?;
//! assert_eq!(out.len(), 1);
//! # Ok(())
//! # }
//! ```

// Documentation enforcement - treat missing docs as errors
#![deny(missing_docs)]

/// Pipeline settings.
pub mod config;
/// Vertices, edges and values carried by travelers.
pub mod element;
/// Assembly and storage errors.
pub mod error;
/// Predicate trees.
pub mod expression;
/// Predicate evaluation.
pub mod matcher;
/// In-memory storage backend.
pub mod mem_graph;
/// Path lookup and template rendering.
pub mod path;
/// Pipeline assembly and execution.
pub mod pipeline;
/// The stage contract.
pub mod processor;
/// Unbounded decoupling queue.
pub mod queue;
/// The stage set.
pub mod stages;
/// Storage interface.
pub mod storage;
/// The unit of traversal state.
pub mod traveler;

#[cfg(test)]
mod matcher_test;
#[cfg(test)]
mod path_test;
