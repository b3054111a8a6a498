//! # Filter Stages
//!
//! Stages that drop, count or deduplicate data travelers. Signals always pass
//! through untouched, and positional filters (`limit`, `skip`, `range`) count
//! data travelers only.

use super::spawn_filter_map;
use crate::element::{Element, GID_KEY, LABEL_KEY};
use crate::expression::{HasExpression, Operator};
use crate::matcher;
use crate::path;
use crate::processor::{GraphHandle, InPipe, OutPipe, PipelineContext, Processor};
use crate::traveler::Traveler;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, trace};

/// `has(expr)`: keeps travelers matching a predicate.
///
/// `hasLabel` and `hasId` are `has` with a `WITHIN` condition on the reserved
/// label or id key.
pub struct Has {
  expr: HasExpression,
  step: &'static str,
}

impl Has {
  /// Filters on `expr`.
  pub fn new(expr: HasExpression) -> Self {
    Self { expr, step: "Has" }
  }

  /// `hasLabel(labels)`
  pub fn labels(labels: Vec<String>) -> Self {
    Self {
      expr: HasExpression::within(LABEL_KEY, labels),
      step: "HasLabel",
    }
  }

  /// `hasId(ids)`
  pub fn ids(ids: Vec<String>) -> Self {
    Self {
      expr: HasExpression::within(GID_KEY, ids),
      step: "HasId",
    }
  }

  /// Step name for logs and step counts.
  pub fn name(&self) -> &'static str {
    self.step
  }

  /// True for a `hasLabel`/`hasId` built from an empty list, which could never
  /// match anything.
  pub fn selects_nothing(&self) -> bool {
    if self.step == "Has" {
      return false;
    }
    match &self.expr {
      HasExpression::Condition(c) => {
        c.condition == Operator::Within && c.value.as_array().is_some_and(|v| v.is_empty())
      }
      _ => false,
    }
  }
}

impl Processor for Has {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let expr = self.expr;
    spawn_filter_map(self.step, ctx.clone(), input, output, move |t| {
      if matcher::matches(&t, &expr) {
        Some(t)
      } else {
        trace!("traveler rejected by has filter");
        None
      }
    });
    ctx.with_load_data(true)
  }
}

/// `hasKey(keys)`: keeps travelers whose current element has every key.
pub struct HasKey {
  keys: Vec<String>,
}

impl HasKey {
  /// Requires every path in `keys` to resolve.
  pub fn new(keys: Vec<String>) -> Self {
    Self { keys }
  }

  /// True when no key was given.
  pub fn is_empty(&self) -> bool {
    self.keys.is_empty()
  }
}

impl Processor for HasKey {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    spawn_filter_map("HasKey", ctx.clone(), input, output, move |t| {
      self.keys.iter().all(|k| path::exists(&t, k)).then_some(t)
    });
    ctx.with_load_data(true)
  }
}

/// `limit(n)`: keeps the first `n` data travelers.
///
/// Once the limit is reached the stage keeps reading its input, dropping data
/// and forwarding signals, so a jump mark upstream can still finish its rounds.
pub struct Limit {
  limit: u64,
}

impl Limit {
  /// Keeps at most `limit` data travelers.
  pub fn new(limit: u64) -> Self {
    Self { limit }
  }
}

impl Processor for Limit {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let limit = self.limit;
    let mut seen = 0u64;
    spawn_filter_map("Limit", ctx.clone(), input, output, move |t| {
      seen += 1;
      (seen <= limit).then_some(t)
    });
    ctx
  }
}

/// `skip(n)`: drops the first `n` data travelers.
pub struct Skip {
  skip: u64,
}

impl Skip {
  /// Drops the first `skip` data travelers.
  pub fn new(skip: u64) -> Self {
    Self { skip }
  }
}

impl Processor for Skip {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let skip = self.skip;
    let mut seen = 0u64;
    spawn_filter_map("Skip", ctx.clone(), input, output, move |t| {
      seen += 1;
      (seen > skip).then_some(t)
    });
    ctx
  }
}

/// `range(start, stop)`: keeps data travelers at positions `start..stop`.
///
/// Without `stop` every traveler from `start` on is kept. Like [`Limit`], the
/// stage keeps draining its input past the window.
pub struct Range {
  start: u64,
  stop: Option<u64>,
}

impl Range {
  /// Keeps positions `start..stop` (zero-based).
  pub fn new(start: u64, stop: Option<u64>) -> Self {
    Self { start, stop }
  }
}

impl Processor for Range {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let Range { start, stop } = self;
    let mut pos = 0u64;
    spawn_filter_map("Range", ctx.clone(), input, output, move |t| {
      let at = pos;
      pos += 1;
      (at >= start && stop.is_none_or(|stop| at < stop)).then_some(t)
    });
    ctx
  }
}

/// `count()`: emits a single [`Element::Count`] once the input closes.
pub struct Count;

impl Processor for Count {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    mut input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let task_ctx = ctx.clone();
    tokio::spawn(async move {
      let ctx = task_ctx;
      let mut count = 0u64;
      while let Some(t) = ctx.recv(&mut input).await {
        if t.is_signal() {
          if !ctx.send(&output, t).await {
            return;
          }
          continue;
        }
        count += 1;
      }
      if ctx.is_cancelled() {
        return;
      }
      debug!(count, "count finished");
      ctx
        .send(&output, Traveler::new().with_current(Element::Count(count)))
        .await;
    });
    ctx.with_load_data(false)
  }
}

/// `distinct(paths)`: drops travelers whose key was already seen.
///
/// The key is the tuple of values the paths resolve to. With no paths the
/// element id (`_gid`) is the key.
pub struct Distinct {
  paths: Vec<String>,
}

impl Distinct {
  /// Deduplicates on `paths`, or on the element id when empty.
  pub fn new(paths: Vec<String>) -> Self {
    let paths = if paths.is_empty() {
      vec![GID_KEY.to_string()]
    } else {
      paths
    };
    Self { paths }
  }

  fn key(&self, t: &Traveler) -> String {
    let parts: Vec<Value> = self
      .paths
      .iter()
      .map(|p| path::lookup(t, p).unwrap_or(Value::Null))
      .collect();
    Value::Array(parts).to_string()
  }
}

impl Processor for Distinct {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    let mut seen = HashSet::new();
    spawn_filter_map("Distinct", ctx.clone(), input, output, move |t| {
      seen.insert(self.key(&t)).then_some(t)
    });
    ctx.with_load_data(true)
  }
}
