//! # Decoupling Queue
//!
//! An unbounded FIFO between a write end and a read end.
//!
//! Cyclic wiring over bounded channels can deadlock: both sides of the cycle may
//! block on a full channel with nobody reading. The queue breaks that by
//! accepting every write into an internal buffer, so a writer only ever waits for
//! the (always running) inbound pump, never for the reader.
//!
//! ## Internals
//!
//! Two tasks share one buffer behind a mutex:
//!
//! - the inbound pump reads the write end and appends to the buffer
//! - the outbound pump pops the oldest item and sends it to the read end, parking
//!   on a [`Notify`] while the buffer is empty and still open
//!
//! The read end closes exactly once, after the write end is closed and the buffer
//! is drained.

use crate::traveler::Traveler;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::{debug, trace};

#[derive(Default)]
struct Buffer {
  items: VecDeque<Traveler>,
  closed: bool,
  reader_gone: bool,
  received: u64,
  delivered: u64,
}

struct Shared {
  buffer: Mutex<Buffer>,
  ready: Notify,
}

/// Creates a queue and returns its `(write_end, read_end)`.
///
/// `capacity` bounds the channels on either side of the buffer, not the buffer
/// itself. Must be called from within a tokio runtime.
pub fn new_queue(capacity: usize) -> (mpsc::Sender<Traveler>, mpsc::Receiver<Traveler>) {
  let (write_tx, mut write_rx) = mpsc::channel::<Traveler>(capacity.max(1));
  let (read_tx, read_rx) = mpsc::channel::<Traveler>(capacity.max(1));

  let shared = Arc::new(Shared {
    buffer: Mutex::new(Buffer::default()),
    ready: Notify::new(),
  });

  let inbound = Arc::clone(&shared);
  tokio::spawn(async move {
    while let Some(t) = write_rx.recv().await {
      let mut buf = inbound.buffer.lock().await;
      buf.received += 1;
      if buf.reader_gone {
        continue;
      }
      if t.is_signal() {
        trace!(queued = buf.items.len(), "queue got signal");
      }
      buf.items.push_back(t);
      drop(buf);
      inbound.ready.notify_one();
    }
    inbound.buffer.lock().await.closed = true;
    inbound.ready.notify_one();
  });

  let outbound = shared;
  tokio::spawn(async move {
    loop {
      let next = {
        let mut buf = outbound.buffer.lock().await;
        match buf.items.pop_front() {
          Some(t) => Some(t),
          None if buf.closed => break,
          None => None,
        }
      };
      match next {
        Some(t) => {
          if read_tx.send(t).await.is_err() {
            let mut buf = outbound.buffer.lock().await;
            buf.reader_gone = true;
            buf.items.clear();
            debug!("queue reader dropped, discarding buffered travelers");
            return;
          }
          outbound.buffer.lock().await.delivered += 1;
        }
        None => outbound.ready.notified().await,
      }
    }
    let buf = outbound.buffer.lock().await;
    debug!(
      received = buf.received,
      delivered = buf.delivered,
      "closing decoupling queue"
    );
  });

  (write_tx, read_rx)
}
