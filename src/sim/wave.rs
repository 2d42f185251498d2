//! Waveform capture for the simulator.
//!
//! Every edge the simulator evaluates can be recorded as a [`Sample`]
//! of all pin values at that time. Samples are handed to a [`Waveform`] sink.
//!
//! This module provides two sinks:
//! - [`BufferedWaveform`]: appends samples to a shared buffer.
//! - [`ChannelWaveform`]: sends samples through a channel to a consumer (e.g., on another thread).

use std::sync::{Arc, RwLock, RwLockWriteGuard, TryLockError};

use crossbeam_channel as cbc;
use serde::Serialize;

use super::model::{InputPins, OutputPins};

/// The values of every pin of the model at one point in time.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
pub struct Sample {
    /// The simulation time (in edges) the sample was taken at.
    pub time: u64,
    /// The input pins.
    pub inputs: InputPins,
    /// The output pins after evaluation.
    pub outputs: OutputPins,
}

/// A sink for waveform samples.
pub trait Waveform {
    /// Records a sample.
    fn dump(&mut self, sample: &Sample);

    /// Flushes and releases the sink. Samples dumped after this are discarded.
    fn close(&mut self);
}
impl dyn Waveform {} // assert Waveform is dyn safe

/// A waveform that appends its samples to a buffer.
///
/// Note that if a lock guard is acquired from the buffer,
/// samples dumped while it is held are dropped.
///
/// ```
/// use cpu8_ensemble::sim::wave::{BufferedWaveform, Sample, Waveform};
///
/// let mut wave = BufferedWaveform::new();
/// let buffer = wave.get_buffer().clone();
/// wave.dump(&Sample { time: 0, inputs: Default::default(), outputs: Default::default() });
/// assert_eq!(buffer.read().unwrap().len(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct BufferedWaveform {
    buffer: Arc<RwLock<Vec<Sample>>>,
    closed: bool,
}
impl BufferedWaveform {
    /// Creates a new waveform with an empty buffer.
    pub fn new() -> Self {
        Default::default()
    }
    /// Creates a new waveform, wrapping it around a given buffer.
    pub fn with_buffer(buffer: Arc<RwLock<Vec<Sample>>>) -> Self {
        Self { buffer, closed: false }
    }

    /// Gets a reference to the internal buffer of this waveform.
    pub fn get_buffer(&self) -> &Arc<RwLock<Vec<Sample>>> {
        &self.buffer
    }

    fn try_buffer(&self) -> Option<RwLockWriteGuard<'_, Vec<Sample>>> {
        match self.buffer.try_write() {
            Ok(g) => Some(g),
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}
impl Waveform for BufferedWaveform {
    fn dump(&mut self, sample: &Sample) {
        if self.closed { return; }
        match self.try_buffer() {
            Some(mut buf) => buf.push(*sample),
            None => tracing::trace!(time = sample.time, "waveform buffer busy, dropping sample"),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// A waveform that sends its samples through a channel.
///
/// Closing the waveform drops its sender, so the receiving end
/// observes a disconnect once it has drained the remaining samples.
///
/// ```
/// use cpu8_ensemble::sim::wave::{ChannelWaveform, Sample, Waveform};
///
/// let (mut wave, rx) = ChannelWaveform::new();
/// wave.dump(&Sample { time: 0, inputs: Default::default(), outputs: Default::default() });
/// wave.close();
///
/// assert_eq!(rx.iter().count(), 1);
/// ```
#[derive(Debug)]
pub struct ChannelWaveform {
    sender: Option<cbc::Sender<Sample>>,
}
impl ChannelWaveform {
    /// Creates a new waveform and the receiver of its samples.
    pub fn new() -> (Self, cbc::Receiver<Sample>) {
        let (tx, rx) = cbc::unbounded();
        (Self::with_sender(tx), rx)
    }
    /// Creates a new waveform around an existing sender.
    pub fn with_sender(sender: cbc::Sender<Sample>) -> Self {
        Self { sender: Some(sender) }
    }

    /// Whether the waveform can still send samples.
    pub fn is_open(&self) -> bool {
        self.sender.is_some()
    }
}
impl Waveform for ChannelWaveform {
    fn dump(&mut self, sample: &Sample) {
        let Some(tx) = &self.sender else { return };
        if tx.send(*sample).is_err() {
            // Nobody is listening anymore.
            tracing::debug!(time = sample.time, "waveform receiver disconnected");
            self.sender.take();
        }
    }

    fn close(&mut self) {
        self.sender.take();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use super::{BufferedWaveform, ChannelWaveform, Sample, Waveform};

    fn sample(time: u64) -> Sample {
        Sample { time, inputs: Default::default(), outputs: Default::default() }
    }

    #[test]
    fn test_buffered() {
        let buffer = Arc::new(RwLock::new(vec![]));
        let mut wave = BufferedWaveform::with_buffer(Arc::clone(&buffer));
        wave.dump(&sample(0));
        wave.dump(&sample(1));

        // held lock drops the sample
        {
            let _guard = buffer.write().unwrap();
            wave.dump(&sample(2));
        }
        wave.close();
        wave.dump(&sample(3));

        let times: Vec<_> = buffer.read().unwrap().iter().map(|s| s.time).collect();
        assert_eq!(times, [0, 1]);
    }

    #[test]
    fn test_channel() {
        let (mut wave, rx) = ChannelWaveform::new();
        wave.dump(&sample(0));
        wave.dump(&sample(1));
        assert_eq!(rx.try_recv().map(|s| s.time), Ok(0));

        wave.close();
        assert!(!wave.is_open());
        wave.dump(&sample(2));

        assert_eq!(rx.try_recv().map(|s| s.time), Ok(1));
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_channel_receiver_dropped() {
        let (mut wave, rx) = ChannelWaveform::new();
        drop(rx);
        wave.dump(&sample(0));
        assert!(!wave.is_open());
    }

    #[test]
    fn test_sample_serialize() {
        let json = serde_json::to_value(sample(4)).unwrap();
        assert_eq!(json["time"], 4);
        assert_eq!(json["inputs"]["clock"], false);
        assert_eq!(json["outputs"]["data_memory_data_out"], 0);
    }
}
