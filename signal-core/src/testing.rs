//! In-memory collaborators for unit tests.

use std::collections::VecDeque;

use embassy_time::Duration;

use crate::counts::Lane;
use crate::display::SignalDisplay;
use crate::error::LinkError;
use crate::link::RadioChannel;

/// Channel that replays queued reads and records everything written.
/// An empty queue reads as a timeout.
#[derive(Default)]
pub struct ScriptedChannel {
    reads: VecDeque<Result<Vec<u8>, LinkError>>,
    written: Vec<u8>,
    read_timeouts: Vec<Duration>,
    flushes: usize,
    fail_writes: bool,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_read(&mut self, bytes: &[u8]) {
        self.reads.push_back(Ok(bytes.to_vec()));
    }

    pub fn push_error(&mut self, err: LinkError) {
        self.reads.push_back(Err(err));
    }

    pub fn fail_writes(&mut self) {
        self.fail_writes = true;
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn read_timeouts(&self) -> &[Duration] {
        &self.read_timeouts
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl RadioChannel for ScriptedChannel {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.fail_writes {
            return Err(LinkError::Transport);
        }
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, LinkError> {
        self.read_timeouts.push(timeout);
        match self.reads.pop_front() {
            Some(Ok(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None => Err(LinkError::Timeout),
        }
    }

    async fn flush_input(&mut self) {
        self.flushes += 1;
        self.reads.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Signals(Lane),
    Report(String),
}

/// Display that keeps every call in order.
#[derive(Default)]
pub struct RecordingDisplay {
    pub events: Vec<DisplayEvent>,
}

impl RecordingDisplay {
    pub fn reports(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match e {
            DisplayEvent::Report(line) => Some(line.as_str()),
            DisplayEvent::Signals(_) => None,
        })
    }
}

impl SignalDisplay for RecordingDisplay {
    async fn show_signals(&mut self, green: Lane) {
        self.events.push(DisplayEvent::Signals(green));
    }

    async fn report(&mut self, line: &str) {
        self.events.push(DisplayEvent::Report(line.into()));
    }
}
