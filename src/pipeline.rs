//! # Pipeline
//!
//! Assembles a list of [`Stage`]s into a running chain of tasks.
//!
//! ## Wiring
//!
//! Stages are connected input-to-output with bounded channels. They are started
//! from last to first: the context returned by stage `i` (carrying its load hint)
//! is what stage `i - 1` is started with, so source stages know whether anyone
//! downstream reads element properties.
//!
//! Every [`Jump`](crate::stages::Jump) gets its own decoupling queue whose read
//! end is registered on the target [`JumpMark`](crate::stages::JumpMark).
//!
//! ## Output
//!
//! Signal travelers never leave the pipeline: [`RunningPipeline`] filters them
//! from the last stage's output.
//!
//! ## Step counts
//!
//! With [`PipelineConfig::step_counts`] enabled, a small forwarding task after
//! every stage counts the data travelers it emits.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::processor::{GraphHandle, InPipe, OutPipe, PipelineContext, Processor};
use crate::stages::Stage;
use crate::traveler::Traveler;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// A validated, not yet started chain of stages.
pub struct Pipeline {
  stages: Vec<Stage>,
  config: PipelineConfig,
}

impl Pipeline {
  /// Validates `stages`.
  ///
  /// Mark names must be unique and every jump must come after the mark it
  /// targets.
  pub fn new(stages: Vec<Stage>, config: PipelineConfig) -> Result<Self, PipelineError> {
    if stages.is_empty() {
      return Err(PipelineError::Empty);
    }

    let mut marks: HashMap<&str, usize> = HashMap::new();
    for (i, stage) in stages.iter().enumerate() {
      match stage {
        Stage::Has(has) if has.selects_nothing() => {
          return Err(PipelineError::EmptySelection(has.name()));
        }
        Stage::HasKey(keys) if keys.is_empty() => {
          return Err(PipelineError::EmptySelection("HasKey"));
        }
        _ => {}
      }
      if let Stage::JumpMark(mark) = stage {
        if marks.insert(mark.name(), i).is_some() {
          return Err(PipelineError::DuplicateMark(mark.name().to_string()));
        }
      }
    }
    for (i, stage) in stages.iter().enumerate() {
      if let Stage::Jump(jump) = stage {
        match marks.get(jump.target()) {
          None => return Err(PipelineError::MissingMark(jump.target().to_string())),
          Some(&at) if at > i => return Err(PipelineError::ForwardJump(jump.target().to_string())),
          Some(_) => {}
        }
      }
    }

    Ok(Self { stages, config })
  }

  /// Number of stages.
  pub fn len(&self) -> usize {
    self.stages.len()
  }

  /// Always false for a validated pipeline.
  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  /// Spawns every stage and returns a handle on the output.
  ///
  /// Without `input`, a single empty traveler is fed to the first stage so
  /// source stages run once. Must be called from within a tokio runtime.
  pub fn start(
    self,
    ctx: PipelineContext,
    graph: GraphHandle,
    input: Option<InPipe>,
  ) -> RunningPipeline {
    let Pipeline { mut stages, config } = self;
    let capacity = config.buffer_size.max(1);

    connect_jumps(&mut stages, config.queue_buffer_size);

    let (out_tx, out_rx) = mpsc::channel(capacity);
    let mut downstream = out_tx;
    let mut stage_ctx = ctx.with_load_data(config.load_data);
    let mut counters = Vec::new();

    for (i, stage) in stages.into_iter().enumerate().rev() {
      let name = format!("{}_{}", stage.name(), i);
      let stage_out = if config.step_counts {
        let counter = Arc::new(AtomicU64::new(0));
        counters.push((name.clone(), Arc::clone(&counter)));
        count_steps(&ctx, counter, downstream, capacity)
      } else {
        downstream
      };
      let (in_tx, in_rx) = mpsc::channel(capacity);
      trace!(stage = %name, load_data = stage_ctx.load_data(), "starting stage");
      stage_ctx = stage.process(stage_ctx, Arc::clone(&graph), in_rx, stage_out);
      downstream = in_tx;
    }
    counters.reverse();

    feed(&ctx, downstream, input);
    debug!(steps = counters.len(), "pipeline started");

    RunningPipeline {
      output: out_rx,
      ctx,
      counters,
    }
  }
}

/// Gives every jump a queue and registers its read end on the target mark.
fn connect_jumps(stages: &mut [Stage], capacity: usize) {
  let mut jumpers = Vec::new();
  for stage in stages.iter_mut() {
    if let Stage::Jump(jump) = stage {
      let rx = jump.connect(capacity);
      jumpers.push((jump.target().to_string(), rx));
    }
  }
  for (target, rx) in jumpers {
    let mark = stages.iter_mut().find_map(|s| match s {
      Stage::JumpMark(m) if m.name() == target => Some(m),
      _ => None,
    });
    if let Some(mark) = mark {
      mark.add_input(rx);
    }
  }
}

/// Inserts a counting forwarder in front of `downstream`.
fn count_steps(
  ctx: &PipelineContext,
  counter: Arc<AtomicU64>,
  downstream: OutPipe,
  capacity: usize,
) -> OutPipe {
  let (tx, mut rx) = mpsc::channel::<Traveler>(capacity);
  let ctx = ctx.clone();
  tokio::spawn(async move {
    while let Some(t) = ctx.recv(&mut rx).await {
      if !t.is_signal() {
        counter.fetch_add(1, Ordering::Relaxed);
      }
      if !ctx.send(&downstream, t).await {
        break;
      }
    }
  });
  tx
}

/// Feeds the head of the chain, then closes it.
fn feed(ctx: &PipelineContext, head: OutPipe, input: Option<InPipe>) {
  let ctx = ctx.clone();
  tokio::spawn(async move {
    match input {
      Some(mut input) => {
        while let Some(t) = ctx.recv(&mut input).await {
          if !ctx.send(&head, t).await {
            break;
          }
        }
      }
      None => {
        ctx.send(&head, Traveler::new()).await;
      }
    }
  });
}

/// Handle on a started pipeline.
pub struct RunningPipeline {
  output: InPipe,
  ctx: PipelineContext,
  counters: Vec<(String, Arc<AtomicU64>)>,
}

impl RunningPipeline {
  /// Next data traveler, or `None` once the pipeline has finished.
  pub async fn next(&mut self) -> Option<Traveler> {
    loop {
      let t = self.output.recv().await?;
      if t.is_signal() {
        trace!("dropping signal at pipeline output");
        continue;
      }
      return Some(t);
    }
  }

  /// Drains the pipeline.
  pub async fn collect(mut self) -> Vec<Traveler> {
    let mut out = Vec::new();
    while let Some(t) = self.next().await {
      out.push(t);
    }
    self.log_step_counts();
    out
  }

  /// Turns the output into a stream of data travelers.
  pub fn into_stream(self) -> impl Stream<Item = Traveler> + Send {
    ReceiverStream::new(self.output).filter(|t| !t.is_signal())
  }

  /// Cancels every stage.
  pub fn cancel(&self) {
    debug!("cancelling pipeline");
    self.ctx.cancel_token().cancel();
  }

  /// Token cancelling this pipeline.
  pub fn cancel_token(&self) -> CancellationToken {
    self.ctx.cancel_token().clone()
  }

  /// Data travelers emitted so far by each stage, named `<step>_<index>`.
  ///
  /// Empty unless step counting was enabled.
  pub fn step_counts(&self) -> Vec<(String, u64)> {
    self
      .counters
      .iter()
      .map(|(name, c)| (name.clone(), c.load(Ordering::Relaxed)))
      .collect()
  }

  /// Logs the step counts at `info`.
  pub fn log_step_counts(&self) {
    for (name, count) in self.step_counts() {
      info!(step = %name, count, "step count");
    }
  }
}

/// Runs `stages` to completion over `graph` with the default configuration.
pub async fn run(stages: Vec<Stage>, graph: GraphHandle) -> Result<Vec<Traveler>, PipelineError> {
  let pipeline = Pipeline::new(stages, PipelineConfig::default())?;
  Ok(
    pipeline
      .start(PipelineContext::default(), graph, None)
      .collect()
      .await,
  )
}
