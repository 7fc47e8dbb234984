//! Stream coordination
//!
//! The top-level facade over the hardware and synthetic paths. Scans for
//! headsets, falls back to the synthetic source on any scan or connect
//! failure, and drives the periodic sampling loop that delivers
//! [`StreamSample`]s to the single registered consumer. Consumers cannot
//! tell which path is feeding them.
//!
//! The consumer callback is owned exclusively by the loop task;
//! registration and replacement travel over a control channel, so a tick
//! always observes a whole callback, never a torn reference. The
//! synthetic-mode flag is a single atomic that is set once and never
//! cleared for the life of the coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use headset_types::{EegChannel, HeadsetConfig, StreamSample};

use crate::session::{ChannelBank, DeviceSession, SessionError};
use crate::synthetic::SyntheticSource;
use crate::transport::{DiscoveredDevice, Transport, TransportError};

/// The single consumer of the sample stream.
pub type SampleCallback = Box<dyn FnMut(StreamSample) + Send>;

/// Errors surfaced by scan and connect. Both also trigger the synthetic
/// fallback before surfacing, so a caller that sees one of these still
/// has a live stream.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

enum LoopControl {
    SetConsumer(SampleCallback),
}

/// What the sampling loop reads on each tick.
enum TickSource {
    Synthetic(SyntheticSource),
    Hardware(ChannelBank),
}

impl TickSource {
    fn sample(&mut self, tick: u64) -> StreamSample {
        match self {
            TickSource::Synthetic(source) => StreamSample {
                raw_eeg: source.generate(),
                attention_score: source.attention_score(),
                tick,
            },
            TickSource::Hardware(bank) => StreamSample {
                raw_eeg: EegChannel::SCORED.map(|channel| bank.read_eeg(channel).unwrap_or(0.0)),
                attention_score: bank.attention_score(),
                tick,
            },
        }
    }
}

struct LoopHandle {
    synthetic: bool,
    cancel: CancellationToken,
    control_tx: flume::Sender<LoopControl>,
    task: JoinHandle<Option<SampleCallback>>,
}

/// Caller-owned context for one stream. No globals: construct one, pass
/// it around, drop it when done.
pub struct StreamCoordinator {
    transport: Arc<dyn Transport>,
    config: HeadsetConfig,
    synthetic_mode: Arc<AtomicBool>,
    session: Option<DeviceSession>,
    sampling_loop: Option<LoopHandle>,
}

impl StreamCoordinator {
    pub fn new(transport: Arc<dyn Transport>, config: HeadsetConfig) -> Self {
        Self {
            transport,
            config,
            synthetic_mode: Arc::new(AtomicBool::new(false)),
            session: None,
            sampling_loop: None,
        }
    }

    /// Discovers headsets within the configured scan window. A scan
    /// error, or a clean scan that finds nothing, switches to the
    /// synthetic source and starts it streaming immediately; scanning is
    /// enough to guarantee a live stream, with or without hardware.
    pub async fn scan(&mut self) -> Result<Vec<DiscoveredDevice>, StreamError> {
        match self.transport.scan(self.config.scan_timeout()).await {
            Ok(devices) if !devices.is_empty() => {
                info!(count = devices.len(), "scan found headsets");
                Ok(devices)
            }
            Ok(devices) => {
                warn!("no headsets found within the scan window, switching to synthetic source");
                self.start_synthetic_streaming().await;
                Ok(devices)
            }
            Err(e) => {
                warn!(error = %e, "scan failed, switching to synthetic source");
                self.start_synthetic_streaming().await;
                Err(e.into())
            }
        }
    }

    /// Opens a hardware session. On failure the synthetic source starts
    /// streaming and the error is still surfaced; callers must not infer
    /// success from a live stream.
    pub async fn connect(&mut self, device_id: &str) -> Result<(), StreamError> {
        let mut session = DeviceSession::new(device_id, self.config.buffer_capacity);
        match session.connect(self.transport.as_ref()).await {
            Ok(()) => {
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                warn!(device = device_id, error = %e, "connect failed, switching to synthetic source");
                self.start_synthetic_streaming().await;
                Err(e.into())
            }
        }
    }

    /// Registers the stream consumer and starts the sampling loop. Only
    /// one consumer exists at a time; registering while a loop is running
    /// silently replaces the previous consumer.
    pub async fn start_streaming(&mut self, callback: SampleCallback) {
        let callback = if let Some(handle) = &self.sampling_loop {
            match handle
                .control_tx
                .send_async(LoopControl::SetConsumer(callback))
                .await
            {
                Ok(()) => return,
                Err(flume::SendError(LoopControl::SetConsumer(callback))) => {
                    // Loop task died without being asked to; start a
                    // fresh one.
                    warn!("sampling loop was gone, restarting");
                    self.sampling_loop = None;
                    callback
                }
            }
        } else {
            callback
        };

        let source = match (&self.session, self.is_synthetic_mode()) {
            (Some(session), false) => TickSource::Hardware(session.channel_bank()),
            _ => {
                self.enable_synthetic_mode();
                TickSource::Synthetic(SyntheticSource::new())
            }
        };
        self.spawn_loop(source, Some(callback));
    }

    /// Halts the sampling loop before returning (no consumer callback
    /// runs after this resolves) and closes any hardware session. The
    /// registered consumer is dropped. Safe to call with nothing running,
    /// and safe to call twice.
    pub async fn stop_streaming(&mut self) {
        let consumer = self.halt_loop().await;
        drop(consumer);
        if let Some(mut session) = self.session.take() {
            session.disconnect().await;
        }
    }

    pub fn is_synthetic_mode(&self) -> bool {
        self.synthetic_mode.load(Ordering::Acquire)
    }

    /// Flips the sticky synthetic flag. There is deliberately no way to
    /// clear it: once a coordinator has fallen back, it stays on the
    /// synthetic source until the caller builds a new one.
    pub fn enable_synthetic_mode(&self) {
        self.synthetic_mode.store(true, Ordering::Release);
    }

    /// The active hardware session, when one is connected.
    pub fn session(&self) -> Option<&DeviceSession> {
        self.session.as_ref()
    }

    /// Switches emission to the synthetic source, preserving a registered
    /// consumer if a loop was already running on the hardware path.
    async fn start_synthetic_streaming(&mut self) {
        self.enable_synthetic_mode();
        if let Some(handle) = &self.sampling_loop {
            if handle.synthetic {
                return;
            }
        }
        let consumer = self.halt_loop().await;
        self.spawn_loop(TickSource::Synthetic(SyntheticSource::new()), consumer);
    }

    fn spawn_loop(&mut self, source: TickSource, consumer: Option<SampleCallback>) {
        let synthetic = matches!(source, TickSource::Synthetic(_));
        let (control_tx, control_rx) = flume::bounded(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_sampling_loop(
            source,
            self.config.tick_interval(),
            consumer,
            control_rx,
            cancel.clone(),
        ));
        info!(synthetic, "sampling loop started");
        self.sampling_loop = Some(LoopHandle {
            synthetic,
            cancel,
            control_tx,
            task,
        });
    }

    /// Cancels the running loop and waits for it to wind down, recovering
    /// the consumer it owned.
    async fn halt_loop(&mut self) -> Option<SampleCallback> {
        let Some(handle) = self.sampling_loop.take() else {
            return None;
        };
        handle.cancel.cancel();
        match handle.task.await {
            Ok(consumer) => consumer,
            Err(e) => {
                warn!(error = %e, "sampling loop did not shut down cleanly");
                None
            }
        }
    }
}

/// The periodic emission loop. Owns the consumer callback outright;
/// control messages are the only way to change it. Returns the consumer
/// on shutdown so a path switch can carry it over.
async fn run_sampling_loop(
    mut source: TickSource,
    period: Duration,
    mut consumer: Option<SampleCallback>,
    control_rx: flume::Receiver<LoopControl>,
    cancel: CancellationToken,
) -> Option<SampleCallback> {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(tick, "sampling loop cancelled");
                break;
            }
            message = control_rx.recv_async() => match message {
                Ok(LoopControl::SetConsumer(callback)) => {
                    debug!("stream consumer replaced");
                    consumer = Some(callback);
                }
                // The coordinator is gone; nothing can cancel us later,
                // so wind down now.
                Err(_) => break,
            },
            _ = ticker.tick() => {
                if let Some(callback) = consumer.as_mut() {
                    callback(source.sample(tick));
                }
                tick += 1;
            }
        }
    }
    consumer
}
