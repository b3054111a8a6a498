//! # Jump / Mark
//!
//! Cyclic sub-queries: a [`Jump`] sends matching travelers back to a named
//! [`JumpMark`] earlier in the pipeline, which merges them into its output again.
//!
//! ## Wiring
//!
//! Each jump owns a decoupling queue (see [`crate::queue`]). The write end, the
//! jumper sink, stays with the jump; the read end is registered on the mark with
//! [`JumpMark::add_input`]. The queue never blocks the jump, so the cycle
//! cannot deadlock on full channels.
//!
//! ## Closing
//!
//! Channel close cannot propagate around a cycle: the jumps only close once the
//! mark's output closes, and the mark cannot close while a jump might still send
//! something back. After its main input closes the mark therefore tests the
//! cycle with signal rounds:
//!
//! 1. emit `Signal { id, dest: mark }` downstream
//! 2. every stage forwards the signal in order; each jump targeting the mark also
//!    sends it into its sink
//! 3. a data traveler arriving on any jump input cancels the round
//! 4. once the signal came back on every jump input with no data in between,
//!    nothing is in flight and the mark closes its output
//!
//! A cancelled round is followed by a fresh one with a higher id. There is no cap
//! on the number of rounds: a sub-query that keeps producing travelers keeps the
//! mark open until the pipeline is cancelled.
//!
//! ## Nesting
//!
//! A mark inside another mark's cycle sees the outer signals on its main input.
//! It runs its own rounds before passing such a signal on, so an outer round
//! only completes once every inner cycle it crossed was quiet.

use crate::expression::HasExpression;
use crate::matcher;
use crate::processor::{GraphHandle, InPipe, OutPipe, PipelineContext, Processor};
use crate::queue::new_queue;
use crate::traveler::{Signal, Traveler};
use std::future::poll_fn;
use std::task::Poll;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, trace, warn};

/// Sends travelers back to a [`JumpMark`].
pub struct Jump {
  mark: String,
  filter: Option<HasExpression>,
  emit: bool,
  jumper_sink: Option<OutPipe>,
}

impl Jump {
  /// Creates a jump to `mark`.
  ///
  /// Travelers matching `filter` (all of them when `None`) are sent to the mark.
  /// With `emit` set, every traveler is also forwarded downstream.
  pub fn new(mark: impl Into<String>, filter: Option<HasExpression>, emit: bool) -> Self {
    Self {
      mark: mark.into(),
      filter,
      emit,
      jumper_sink: None,
    }
  }

  /// Name of the mark this jump targets.
  pub fn target(&self) -> &str {
    &self.mark
  }

  /// Creates the jumper queue and returns its read end, to be registered on the
  /// target mark.
  pub fn connect(&mut self, capacity: usize) -> InPipe {
    let (sink, jumpers) = new_queue(capacity);
    self.jumper_sink = Some(sink);
    jumpers
  }

  async fn run(self, ctx: PipelineContext, mut input: InPipe, output: OutPipe) {
    let mut sink = self.jumper_sink;
    if sink.is_none() {
      warn!(mark = %self.mark, "jump is not connected to its mark");
    }

    while let Some(t) = ctx.recv(&mut input).await {
      if let Some(signal) = t.get_signal() {
        if signal.dest == self.mark {
          if let Some(s) = &sink {
            trace!(mark = %self.mark, round = signal.id, "returning signal to mark");
            if !ctx.send(s, t.clone()).await {
              if ctx.is_cancelled() {
                break;
              }
              sink = None;
            }
          }
        }
        if !ctx.send(&output, t).await {
          break;
        }
        continue;
      }

      let matched = self
        .filter
        .as_ref()
        .is_none_or(|f| matcher::matches(&t, f));
      let copy = self.emit.then(|| t.clone());
      if matched {
        if let Some(s) = &sink {
          trace!(mark = %self.mark, "jumping traveler");
          if !ctx.send(s, t).await {
            if ctx.is_cancelled() {
              break;
            }
            debug!(mark = %self.mark, "mark is gone, dropping jumpers");
            sink = None;
          }
        }
      }
      if let Some(copy) = copy {
        if !ctx.send(&output, copy).await {
          break;
        }
      }
    }

    drop(sink);
    debug!(mark = %self.mark, "jump finished");
    drop(output);
  }
}

impl Processor for Jump {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    tokio::spawn(self.run(ctx.clone(), input, output));
    ctx.with_load_data(true)
  }
}

/// Progress of the current signal round of a mark.
///
/// `returned` holds one flag per live jump input, so a signal seen twice on one
/// input cannot stand in for a missing one.
#[derive(Debug, Default)]
pub(crate) struct SignalRound {
  id: u64,
  ongoing: bool,
  returned: Vec<bool>,
}

impl SignalRound {
  /// Starts a new round over `inputs` jump inputs and returns its id.
  pub(crate) fn start(&mut self, inputs: usize) -> u64 {
    self.id += 1;
    self.ongoing = true;
    self.returned = vec![false; inputs];
    self.id
  }

  /// Abandons the outstanding round.
  pub(crate) fn cancel(&mut self) {
    self.ongoing = false;
  }

  /// Records the return of signal `id` on input `idx`. Stale ids are ignored.
  pub(crate) fn record_return(&mut self, idx: usize, id: u64) -> bool {
    if !self.ongoing || id != self.id {
      return false;
    }
    match self.returned.get_mut(idx) {
      Some(flag) => {
        *flag = true;
        true
      }
      None => false,
    }
  }

  /// Forgets a closed input.
  pub(crate) fn remove_input(&mut self, idx: usize) {
    if idx < self.returned.len() {
      self.returned.remove(idx);
    }
  }

  pub(crate) fn id(&self) -> u64 {
    self.id
  }

  pub(crate) fn is_ongoing(&self) -> bool {
    self.ongoing
  }

  pub(crate) fn return_count(&self) -> usize {
    self.returned.iter().filter(|r| **r).count()
  }

  /// True once the outstanding round came back on every input.
  pub(crate) fn is_complete(&self) -> bool {
    self.ongoing && self.returned.iter().all(|r| *r)
  }
}

/// Waits for the next item on any of `inputs`, polling them in turn starting at
/// `start`. Returns the input index and the item (`None` when it closed).
///
/// Never resolves for an empty slice.
async fn next_jumper(inputs: &mut [InPipe], start: usize) -> (usize, Option<Traveler>) {
  poll_fn(|cx| {
    let n = inputs.len();
    for k in 0..n {
      let idx = (start + k) % n;
      if let Poll::Ready(item) = inputs[idx].poll_recv(cx) {
        return Poll::Ready((idx, item));
      }
    }
    Poll::Pending
  })
  .await
}

/// Rejoin point of a cyclic sub-query.
pub struct JumpMark {
  name: String,
  inputs: Vec<InPipe>,
}

impl JumpMark {
  /// Creates a mark with no jump inputs.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      inputs: Vec::new(),
    }
  }

  /// Mark name jumps refer to.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Registers the read end of a jump's queue.
  pub fn add_input(&mut self, input: InPipe) {
    self.inputs.push(input);
  }

  /// Number of registered jump inputs.
  pub fn input_count(&self) -> usize {
    self.inputs.len()
  }

  /// Takes at most one item from every jump input without waiting.
  ///
  /// Returns the items with their input index, and the indexes of inputs found
  /// closed.
  fn sweep(&mut self) -> (Vec<(usize, Traveler)>, Vec<usize>) {
    let mut items = Vec::new();
    let mut closed = Vec::new();
    for (idx, rx) in self.inputs.iter_mut().enumerate() {
      match rx.try_recv() {
        Ok(t) => items.push((idx, t)),
        Err(TryRecvError::Empty) => {}
        Err(TryRecvError::Disconnected) => closed.push(idx),
      }
    }
    (items, closed)
  }

  fn remove_input(&mut self, idx: usize, round: &mut SignalRound) {
    self.inputs.remove(idx);
    round.remove_input(idx);
    debug!(mark = %self.name, remaining = self.inputs.len(), "jump input closed");
  }

  fn remove_closed(&mut self, closed: Vec<usize>, round: &mut SignalRound) {
    for idx in closed.into_iter().rev() {
      self.remove_input(idx, round);
    }
  }

  /// Handles one item from jump input `idx` while closing.
  ///
  /// Signals are recorded against the round; data cancels the round and is
  /// returned for forwarding.
  fn absorb(&self, round: &mut SignalRound, idx: usize, t: Traveler) -> Option<Traveler> {
    match t.get_signal() {
      Some(signal) => {
        if signal.dest == self.name && round.record_return(idx, signal.id) {
          trace!(
            mark = %self.name,
            round = signal.id,
            returned = round.return_count(),
            "signal returned"
          );
        }
        None
      }
      None => {
        if round.is_ongoing() {
          debug!(mark = %self.name, round = round.id(), "round cancelled by jumper");
          round.cancel();
        }
        Some(t)
      }
    }
  }

  /// Runs signal rounds until one comes back on every jump input with no data
  /// in between. Data arriving meanwhile is forwarded.
  ///
  /// Returns `false` when the pipeline was cancelled or the output is gone.
  async fn quiesce(
    &mut self,
    ctx: &PipelineContext,
    output: &OutPipe,
    round: &mut SignalRound,
    cursor: &mut usize,
  ) -> bool {
    loop {
      if self.inputs.is_empty() {
        return true;
      }

      let (items, closed) = self.sweep();
      let mut forwarded = false;
      for (idx, t) in items {
        if let Some(t) = self.absorb(round, idx, t) {
          forwarded = true;
          if !ctx.send(output, t).await {
            return false;
          }
        }
      }
      self.remove_closed(closed, round);
      if forwarded {
        continue;
      }

      if !round.is_ongoing() {
        if self.inputs.is_empty() {
          return true;
        }
        let id = round.start(self.inputs.len());
        debug!(mark = %self.name, round = id, "starting signal round");
        let signal = Traveler::signal(Signal {
          id,
          dest: self.name.clone(),
        });
        if !ctx.send(output, signal).await {
          return false;
        }
        continue;
      }

      if round.is_complete() {
        debug!(mark = %self.name, round = round.id(), "signal round complete");
        round.cancel();
        return true;
      }

      tokio::select! {
        biased;
        _ = ctx.cancel_token().cancelled() => return false,
        (idx, item) = next_jumper(&mut self.inputs, *cursor) => {
          *cursor = idx + 1;
          match item {
            Some(t) => {
              if let Some(t) = self.absorb(round, idx, t) {
                if !ctx.send(output, t).await {
                  return false;
                }
              }
            }
            None => self.remove_input(idx, round),
          }
        }
      }
    }
  }

  /// Forwards one item from the main input while it is open.
  ///
  /// A signal of an enclosing mark is held back until this mark's own jumps are
  /// quiet, so it cannot overtake travelers still circling the inner cycle.
  async fn forward_main(
    &mut self,
    ctx: &PipelineContext,
    output: &OutPipe,
    round: &mut SignalRound,
    cursor: &mut usize,
    t: Traveler,
  ) -> bool {
    if let Some(signal) = t.get_signal() {
      if signal.dest == self.name {
        trace!(mark = %self.name, "dropping stray signal");
        return true;
      }
      debug!(mark = %self.name, outer = %signal.dest, "settling jumps before passing outer signal");
      if !self.quiesce(ctx, output, round, cursor).await {
        return false;
      }
    }
    ctx.send(output, t).await
  }

  async fn run(mut self, ctx: PipelineContext, mut input: InPipe, output: OutPipe) {
    let mut round = SignalRound::default();
    let mut cursor = 0usize;
    debug!(mark = %self.name, inputs = self.inputs.len(), "mark started");

    // Main input open: jumpers take priority over new input.
    let mut main_open = true;
    while main_open {
      let (items, closed) = self.sweep();
      let found = !items.is_empty();
      for (_, t) in items {
        if t.is_signal() {
          trace!(mark = %self.name, "dropping stray signal");
          continue;
        }
        if !ctx.send(&output, t).await {
          return;
        }
      }
      self.remove_closed(closed, &mut round);
      if found {
        continue;
      }

      tokio::select! {
        biased;
        _ = ctx.cancel_token().cancelled() => return,
        (idx, item) = next_jumper(&mut self.inputs, cursor), if !self.inputs.is_empty() => {
          cursor = idx + 1;
          match item {
            Some(t) if t.is_signal() => trace!(mark = %self.name, "dropping stray signal"),
            Some(t) => {
              if !ctx.send(&output, t).await {
                return;
              }
            }
            None => self.remove_input(idx, &mut round),
          }
        }
        item = input.recv() => match item {
          Some(t) => {
            if !self.forward_main(&ctx, &output, &mut round, &mut cursor, t).await {
              return;
            }
          }
          None => main_open = false,
        },
      }
    }
    drop(input);
    debug!(mark = %self.name, inputs = self.inputs.len(), "main input closed, running signal rounds");

    // Main input closed: run signal rounds until one returns undisturbed.
    if !self.quiesce(&ctx, &output, &mut round, &mut cursor).await {
      return;
    }

    debug!(mark = %self.name, rounds = round.id(), "mark finished");
    drop(output);
  }
}

impl Processor for JumpMark {
  fn process(
    self,
    ctx: PipelineContext,
    _graph: GraphHandle,
    input: InPipe,
    output: OutPipe,
  ) -> PipelineContext {
    tokio::spawn(self.run(ctx.clone(), input, output));
    ctx
  }
}
