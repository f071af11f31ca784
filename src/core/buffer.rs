use crossbeam_channel::{unbounded, Receiver, Sender};
use std::ops::Deref;

use super::{Record, SensorChannel};

/// Producer handle handed to a sensor capability.
///
/// Appends are non-blocking and keep call order. A sink can be cloned and
/// moved to whichever context the platform delivers sensor events on.
#[derive(Debug, Clone)]
pub struct SampleSink {
    channel: SensorChannel,
    tx: Sender<Record>,
}

impl SampleSink {
    pub fn channel(&self) -> SensorChannel {
        self.channel
    }

    /// Push one sample. Returns false once the owning buffer is frozen.
    pub fn on_sample(&self, record: Record) -> bool {
        self.tx.send(record).is_ok()
    }
}

/// Append-only collection of records for one channel of one session
#[derive(Debug)]
pub struct SampleBuffer {
    channel: SensorChannel,
    records: Vec<Record>,
    tx: Sender<Record>,
    rx: Receiver<Record>,
}

impl SampleBuffer {
    pub fn new(channel: SensorChannel) -> Self {
        let (tx, rx) = unbounded();
        Self {
            channel,
            records: Vec::new(),
            tx,
            rx,
        }
    }

    pub fn channel(&self) -> SensorChannel {
        self.channel
    }

    /// Sink feeding this buffer
    pub fn sink(&self) -> SampleSink {
        SampleSink {
            channel: self.channel,
            tx: self.tx.clone(),
        }
    }

    pub fn append(&mut self, record: Record) {
        self.drain_pending();
        self.records.push(record);
    }

    /// Move samples pushed through sinks into the buffer
    pub fn drain_pending(&mut self) -> usize {
        let before = self.records.len();
        self.records.extend(self.rx.try_iter());
        self.records.len() - before
    }

    pub fn len(&self) -> usize {
        self.records.len() + self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&mut self) -> &[Record] {
        self.drain_pending();
        &self.records
    }

    /// Collect every pending sample and stop accepting new ones.
    ///
    /// Subscriptions feeding this buffer must be deactivated first.
    pub fn freeze(self) -> FrozenBuffer {
        let Self {
            channel,
            mut records,
            tx,
            rx,
        } = self;
        drop(tx);
        records.extend(rx.try_iter());
        FrozenBuffer { channel, records }
    }
}

/// Read-only records of a finished session
#[derive(Debug, Clone, PartialEq)]
pub struct FrozenBuffer {
    channel: SensorChannel,
    records: Vec<Record>,
}

impl FrozenBuffer {
    pub fn channel(&self) -> SensorChannel {
        self.channel
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl Deref for FrozenBuffer {
    type Target = [Record];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}
