//! Pipeline tuning knobs.

use serde::Deserialize;

/// Settings used when a [`Pipeline`](crate::pipeline::Pipeline) is wired.
///
/// Deserializes from a partial document; missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Capacity of every channel between two stages.
  pub buffer_size: usize,
  /// Capacity of the channels on either side of a jump queue.
  pub queue_buffer_size: usize,
  /// Initial load hint handed to the last stage.
  pub load_data: bool,
  /// Count the travelers leaving every stage.
  pub step_counts: bool,
}

impl PipelineConfig {
  /// Sets the inter-stage channel capacity.
  pub fn with_buffer_size(mut self, n: usize) -> Self {
    self.buffer_size = n;
    self
  }

  /// Sets the jump queue channel capacity.
  pub fn with_queue_buffer_size(mut self, n: usize) -> Self {
    self.queue_buffer_size = n;
    self
  }

  /// Sets the initial load hint.
  pub fn with_load_data(mut self, load: bool) -> Self {
    self.load_data = load;
    self
  }

  /// Enables or disables per-stage counting.
  pub fn with_step_counts(mut self, enabled: bool) -> Self {
    self.step_counts = enabled;
    self
  }
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      buffer_size: 100,
      queue_buffer_size: 50,
      load_data: true,
      step_counts: false,
    }
  }
}
