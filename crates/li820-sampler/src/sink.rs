use std::sync::mpsc;

use tokio::sync::broadcast;

use crate::error::SinkError;
use crate::measurement::Measurement;

/// Default capacity of the handoff ring between sampler and consumers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Largest handoff ring [`handoff`] will allocate. Every slot is allocated up
/// front.
pub const MAX_QUEUE_CAPACITY: usize = 65_536;

/// Accepts records from the sampling loop, one at a time and in order.
pub trait RecordSink {
    /// Hand one record downstream. An error means nobody will ever read it.
    fn send(&mut self, record: Measurement) -> Result<(), SinkError>;
}

/// Never blocks: a full ring overwrites the oldest record, and slow receivers
/// see it as `RecvError::Lagged`.
impl RecordSink for broadcast::Sender<Measurement> {
    fn send(&mut self, record: Measurement) -> Result<(), SinkError> {
        broadcast::Sender::send(self, record)
            .map(|_| ())
            .map_err(|_| SinkError::Closed)
    }
}

impl RecordSink for mpsc::Sender<Measurement> {
    fn send(&mut self, record: Measurement) -> Result<(), SinkError> {
        mpsc::Sender::send(self, record).map_err(|_| SinkError::Closed)
    }
}

/// Blocks while the channel is full.
impl RecordSink for mpsc::SyncSender<Measurement> {
    fn send(&mut self, record: Measurement) -> Result<(), SinkError> {
        mpsc::SyncSender::send(self, record).map_err(|_| SinkError::Closed)
    }
}

impl RecordSink for Vec<Measurement> {
    fn send(&mut self, record: Measurement) -> Result<(), SinkError> {
        self.push(record);
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn send(&mut self, record: Measurement) -> Result<(), SinkError> {
        (**self).send(record)
    }
}

/// Create the bounded sampler-to-consumer handoff channel.
///
/// `capacity` is clamped to `1..=MAX_QUEUE_CAPACITY`. More consumers can join
/// with [`broadcast::Sender::subscribe`].
pub fn handoff(
    capacity: usize,
) -> (
    broadcast::Sender<Measurement>,
    broadcast::Receiver<Measurement>,
) {
    broadcast::channel(capacity.clamp(1, MAX_QUEUE_CAPACITY))
}
