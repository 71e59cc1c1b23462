//! Test doubles for driving the listener without hardware or HTTP

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use coin_listener::ShutdownController;
use deposit_client::{CoinEvent, CoinForwarder, ForwardOutcome};
use serial_link::{LinePort, PortOpener, Result, SerialError};

pub const MACHINE_ID: &str = "ESP32_COIN_001";

/// One scripted read on a fake serial port
#[derive(Debug, Clone)]
pub enum ReadStep {
    Line(&'static str),
    Bytes(Vec<u8>),
    Timeout,
    Fail(ErrorKind),
}

/// What happens once a port's script runs out
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WhenExhausted {
    /// Cancel the shutdown controller, then time out
    Shutdown,
    /// Keep timing out slowly, like an idle device
    Idle,
}

/// One scripted `open` call
#[derive(Debug, Clone)]
pub enum OpenStep {
    Fail(&'static str),
    Port(Vec<ReadStep>),
}

/// Everything the fakes observed
#[derive(Debug, Default)]
pub struct Observed {
    pub opens: Vec<Instant>,
    pub written: Vec<u8>,
    pub forwarded: Vec<CoinEvent>,
}

impl Observed {
    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written).to_string()
    }
}

pub type Shared = Arc<Mutex<Observed>>;

pub struct FakePort {
    reads: VecDeque<ReadStep>,
    when_exhausted: WhenExhausted,
    fail_writes: bool,
    controller: ShutdownController,
    observed: Shared,
}

impl Read for FakePort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reads.pop_front() {
            Some(ReadStep::Line(line)) => {
                let bytes = format!("{}\n", line).into_bytes();
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(ReadStep::Bytes(bytes)) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(ReadStep::Timeout) => Err(io::Error::new(ErrorKind::TimedOut, "timed out")),
            Some(ReadStep::Fail(kind)) => Err(io::Error::new(kind, "device unplugged")),
            None => {
                match self.when_exhausted {
                    WhenExhausted::Shutdown => {
                        self.controller.cancel();
                    }
                    WhenExhausted::Idle => thread::sleep(Duration::from_millis(10)),
                }
                Err(io::Error::new(ErrorKind::TimedOut, "timed out"))
            }
        }
    }
}

impl Write for FakePort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(ErrorKind::BrokenPipe, "write failed"));
        }
        self.observed.lock().unwrap().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct FakeOpener {
    steps: Mutex<VecDeque<OpenStep>>,
    when_exhausted: WhenExhausted,
    fail_writes: bool,
    controller: ShutdownController,
    observed: Shared,
}

impl FakeOpener {
    pub fn new(steps: Vec<OpenStep>, controller: &ShutdownController, observed: &Shared) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            when_exhausted: WhenExhausted::Shutdown,
            fail_writes: false,
            controller: controller.clone(),
            observed: Arc::clone(observed),
        }
    }

    pub fn when_exhausted(mut self, behaviour: WhenExhausted) -> Self {
        self.when_exhausted = behaviour;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

impl PortOpener for FakeOpener {
    fn open(&self, path: &str, _baud_rate: u32, _read_timeout: Duration) -> Result<Box<dyn LinePort>> {
        self.observed.lock().unwrap().opens.push(Instant::now());

        match self.steps.lock().unwrap().pop_front() {
            Some(OpenStep::Port(reads)) => Ok(Box::new(FakePort {
                reads: reads.into(),
                when_exhausted: self.when_exhausted,
                fail_writes: self.fail_writes,
                controller: self.controller.clone(),
                observed: Arc::clone(&self.observed),
            })),
            Some(OpenStep::Fail(reason)) => Err(SerialError::Open {
                port: path.to_string(),
                reason: reason.to_string(),
            }),
            None => {
                self.controller.cancel();
                Err(SerialError::Open {
                    port: path.to_string(),
                    reason: "no more devices".to_string(),
                })
            }
        }
    }
}

/// Records every event and answers with scripted outcomes (default: success)
pub struct RecordingForwarder {
    outcomes: Mutex<VecDeque<ForwardOutcome>>,
    cancel_on_forward: Option<ShutdownController>,
    observed: Shared,
}

impl RecordingForwarder {
    pub fn new(observed: &Shared) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            cancel_on_forward: None,
            observed: Arc::clone(observed),
        }
    }

    pub fn with_outcomes(self, outcomes: Vec<ForwardOutcome>) -> Self {
        *self.outcomes.lock().unwrap() = outcomes.into();
        self
    }

    /// Request shutdown while the forward is "in flight"
    pub fn cancelling(mut self, controller: &ShutdownController) -> Self {
        self.cancel_on_forward = Some(controller.clone());
        self
    }
}

impl CoinForwarder for RecordingForwarder {
    fn forward(&self, event: &CoinEvent) -> ForwardOutcome {
        self.observed.lock().unwrap().forwarded.push(event.clone());

        if let Some(controller) = &self.cancel_on_forward {
            controller.cancel();
        }

        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ForwardOutcome::Success)
    }
}

pub fn observed() -> Shared {
    Arc::new(Mutex::new(Observed::default()))
}

pub fn amounts(observed: &Shared) -> Vec<f64> {
    observed
        .lock()
        .unwrap()
        .forwarded
        .iter()
        .map(|event| event.amount)
        .collect()
}
