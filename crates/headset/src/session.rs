//! Device session lifecycle
//!
//! Owns one connected link: maps each characteristic to a
//! decode-and-buffer-write handler, drives the bring-up command sequence,
//! and exposes channel read accessors plus the attention score. All
//! subscriptions and buffers are released deterministically on
//! disconnect, including disconnects the transport initiates on its own.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, info, warn};

use headset_types::{EegChannel, MotionAxis, PpgChannel};

use crate::codec;
use crate::ring::RingBuffer;
use crate::score;
use crate::transport::{
    DeviceLink, NotificationHandler, SubscriptionId, Transport, TransportError,
};

/// Vendor service carrying every characteristic below.
pub const SERVICE: u16 = 0xfe8d;

pub const CONTROL_CHARACTERISTIC: &str = "273e0001-4c4d-454d-96be-f03bac821358";
pub const BATTERY_CHARACTERISTIC: &str = "273e000b-4c4d-454d-96be-f03bac821358";
pub const GYROSCOPE_CHARACTERISTIC: &str = "273e0009-4c4d-454d-96be-f03bac821358";
pub const ACCELEROMETER_CHARACTERISTIC: &str = "273e000a-4c4d-454d-96be-f03bac821358";

/// Ambient, infrared, red, in [`PpgChannel`] wire order.
pub const PPG_CHARACTERISTICS: [&str; PpgChannel::COUNT] = [
    "273e000f-4c4d-454d-96be-f03bac821358",
    "273e0010-4c4d-454d-96be-f03bac821358",
    "273e0011-4c4d-454d-96be-f03bac821358",
];

/// TP9, AF7, AF8, TP10, AUX, in [`EegChannel`] wire order.
pub const EEG_CHARACTERISTICS: [&str; EegChannel::COUNT] = [
    "273e0003-4c4d-454d-96be-f03bac821358",
    "273e0004-4c4d-454d-96be-f03bac821358",
    "273e0005-4c4d-454d-96be-f03bac821358",
    "273e0006-4c4d-454d-96be-f03bac821358",
    "273e0007-4c4d-454d-96be-f03bac821358",
];

/// Bring-up sequence issued after subscriptions are in place: halt any
/// running stream, select the EEG+PPG preset, start acquisition, resume,
/// then request a firmware version report.
const STARTUP_COMMANDS: [&str; 5] = ["h", "p50", "s", "d", "v1"];

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
}

/// Errors raised while establishing or operating a session.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
}

type SharedRing<T> = Arc<Mutex<RingBuffer<T>>>;

/// The per-channel ring buffers, exclusively owned by one session but
/// shared between notification handlers and the sampling loop. Cloning
/// yields another handle onto the same buffers.
#[derive(Clone)]
pub(crate) struct ChannelBank {
    eeg: [SharedRing<f32>; EegChannel::COUNT],
    ppg: [SharedRing<u32>; PpgChannel::COUNT],
    accelerometer: [SharedRing<f32>; MotionAxis::COUNT],
    gyroscope: [SharedRing<f32>; MotionAxis::COUNT],
}

impl ChannelBank {
    fn new(capacity: usize) -> Self {
        Self {
            eeg: std::array::from_fn(|_| Arc::new(Mutex::new(RingBuffer::new(capacity)))),
            ppg: std::array::from_fn(|_| Arc::new(Mutex::new(RingBuffer::new(capacity)))),
            accelerometer: std::array::from_fn(|_| {
                Arc::new(Mutex::new(RingBuffer::new(capacity)))
            }),
            gyroscope: std::array::from_fn(|_| Arc::new(Mutex::new(RingBuffer::new(capacity)))),
        }
    }

    pub(crate) fn read_eeg(&self, channel: EegChannel) -> Option<f32> {
        self.eeg[channel.index()].lock().unwrap().read()
    }

    pub(crate) fn read_ppg(&self, channel: PpgChannel) -> Option<u32> {
        self.ppg[channel.index()].lock().unwrap().read()
    }

    pub(crate) fn read_accelerometer(&self, axis: MotionAxis) -> Option<f32> {
        self.accelerometer[axis.index()].lock().unwrap().read()
    }

    pub(crate) fn read_gyroscope(&self, axis: MotionAxis) -> Option<f32> {
        self.gyroscope[axis.index()].lock().unwrap().read()
    }

    /// Drains one full scoring window from each scored lead and feeds the
    /// estimator. Reads are interleaved oldest-first across the four
    /// leads; the moment any lead runs dry the score is 0, an explicit
    /// insufficient-data answer rather than a partial estimate.
    pub(crate) fn attention_score(&self) -> f32 {
        let mut tp9_buf = self.eeg[EegChannel::Tp9.index()].lock().unwrap();
        let mut af7_buf = self.eeg[EegChannel::Af7.index()].lock().unwrap();
        let mut af8_buf = self.eeg[EegChannel::Af8.index()].lock().unwrap();
        let mut tp10_buf = self.eeg[EegChannel::Tp10.index()].lock().unwrap();

        let mut tp9 = Vec::with_capacity(score::WINDOW_SAMPLES);
        let mut af7 = Vec::with_capacity(score::WINDOW_SAMPLES);
        let mut af8 = Vec::with_capacity(score::WINDOW_SAMPLES);
        let mut tp10 = Vec::with_capacity(score::WINDOW_SAMPLES);

        for _ in 0..score::WINDOW_SAMPLES {
            match (
                tp9_buf.read(),
                af7_buf.read(),
                af8_buf.read(),
                tp10_buf.read(),
            ) {
                (Some(a), Some(b), Some(c), Some(d)) => {
                    tp9.push(a);
                    af7.push(b);
                    af8.push(c);
                    tp10.push(d);
                }
                _ => return 0.0,
            }
        }

        score::attention_from_windows(&tp9, &af7, &af8, &tp10)
    }
}

/// State the disconnect observer can reach from the transport's callback
/// context.
struct SharedSessionState {
    state: Mutex<SessionState>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

/// One session against one device.
pub struct DeviceSession {
    device_id: String,
    link: Option<Box<dyn DeviceLink>>,
    shared: Arc<SharedSessionState>,
    channels: ChannelBank,
    battery: Arc<Mutex<Option<f32>>>,
    info: Arc<Mutex<serde_json::Map<String, Value>>>,
    fragment: Arc<Mutex<String>>,
}

impl DeviceSession {
    /// Creates an idle session bound to a device identifier. Each channel
    /// gets its own ring buffer of `buffer_capacity` samples.
    pub fn new(device_id: impl Into<String>, buffer_capacity: usize) -> Self {
        Self {
            device_id: device_id.into(),
            link: None,
            shared: Arc::new(SharedSessionState {
                state: Mutex::new(SessionState::Idle),
                subscriptions: Mutex::new(Vec::new()),
            }),
            channels: ChannelBank::new(buffer_capacity),
            battery: Arc::new(Mutex::new(None)),
            info: Arc::new(Mutex::new(serde_json::Map::new())),
            fragment: Arc::new(Mutex::new(String::new())),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock().unwrap()
    }

    /// Opens the link, wires up every characteristic, and runs the
    /// bring-up command sequence. A failure at any step tears down the
    /// subscriptions created so far before the error is surfaced. Calling
    /// on a session that is not idle is a no-op.
    pub async fn connect(&mut self, transport: &dyn Transport) -> Result<(), SessionError> {
        if self.state() != SessionState::Idle {
            return Ok(());
        }
        self.set_state(SessionState::Connecting);

        let link = match transport.connect(&self.device_id).await {
            Ok(link) => link,
            Err(e) => {
                self.set_state(SessionState::Idle);
                return Err(e.into());
            }
        };

        match self.configure(link.as_ref()).await {
            Ok(()) => {
                info!(device = %self.device_id, "headset session streaming");
                self.link = Some(link);
                self.set_state(SessionState::Streaming);
                Ok(())
            }
            Err(e) => {
                warn!(device = %self.device_id, error = %e, "session bring-up failed, tearing down");
                self.release_subscriptions(link.as_ref()).await;
                let _ = link.disconnect().await;
                self.set_state(SessionState::Idle);
                Err(e)
            }
        }
    }

    /// Closes the link and releases every subscription. Idempotent: safe
    /// on an already-idle session.
    pub async fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            self.release_subscriptions(link.as_ref()).await;
            if let Err(e) = link.disconnect().await {
                debug!(device = %self.device_id, error = %e, "link close reported an error");
            }
        }
        self.set_state(SessionState::Idle);
    }

    pub fn read_eeg(&self, channel: EegChannel) -> Option<f32> {
        self.channels.read_eeg(channel)
    }

    pub fn read_ppg(&self, channel: PpgChannel) -> Option<u32> {
        self.channels.read_ppg(channel)
    }

    pub fn read_accelerometer(&self, axis: MotionAxis) -> Option<f32> {
        self.channels.read_accelerometer(axis)
    }

    pub fn read_gyroscope(&self, axis: MotionAxis) -> Option<f32> {
        self.channels.read_gyroscope(axis)
    }

    /// Last reported battery fraction of full charge, if any report has
    /// arrived yet.
    pub fn battery_level(&self) -> Option<f32> {
        *self.battery.lock().unwrap()
    }

    /// Device-reported metadata accumulated from control-channel JSON
    /// fragments (firmware version and friends).
    pub fn device_info(&self) -> serde_json::Map<String, Value> {
        self.info.lock().unwrap().clone()
    }

    /// Attention score over the freshest buffered window, 0 when any
    /// scored lead cannot supply a full second of samples.
    pub fn attention_score(&self) -> f32 {
        self.channels.attention_score()
    }

    pub(crate) fn channel_bank(&self) -> ChannelBank {
        self.channels.clone()
    }

    fn set_state(&self, state: SessionState) {
        *self.shared.state.lock().unwrap() = state;
    }

    async fn configure(&mut self, link: &dyn DeviceLink) -> Result<(), SessionError> {
        link.discover_characteristics().await?;

        let shared = Arc::clone(&self.shared);
        let device_id = self.device_id.clone();
        link.set_disconnect_observer(Box::new(move || {
            // Transport-initiated drop: the link is already gone, so the
            // handles are dead. Release them and return to idle.
            warn!(device = %device_id, "link dropped by transport");
            shared.subscriptions.lock().unwrap().clear();
            *shared.state.lock().unwrap() = SessionState::Idle;
        }));

        self.subscribe_all(link).await?;

        for cmd in STARTUP_COMMANDS {
            link.write(CONTROL_CHARACTERISTIC, &codec::encode_command(cmd))
                .await?;
        }
        Ok(())
    }

    async fn subscribe_all(&mut self, link: &dyn DeviceLink) -> Result<(), SessionError> {
        let mut plan: Vec<(&'static str, NotificationHandler)> = vec![
            (CONTROL_CHARACTERISTIC, self.control_handler()),
            (BATTERY_CHARACTERISTIC, self.battery_handler()),
            (
                GYROSCOPE_CHARACTERISTIC,
                self.motion_handler(self.channels.gyroscope.clone(), codec::GYROSCOPE_SCALE),
            ),
            (
                ACCELEROMETER_CHARACTERISTIC,
                self.motion_handler(
                    self.channels.accelerometer.clone(),
                    codec::ACCELEROMETER_SCALE,
                ),
            ),
        ];
        for (index, characteristic) in PPG_CHARACTERISTICS.into_iter().enumerate() {
            plan.push((characteristic, self.ppg_handler(index)));
        }
        for (index, characteristic) in EEG_CHARACTERISTICS.into_iter().enumerate() {
            plan.push((characteristic, self.eeg_handler(index)));
        }

        for (characteristic, handler) in plan {
            let id = link.subscribe(characteristic, handler).await?;
            self.shared.subscriptions.lock().unwrap().push(id);
        }
        Ok(())
    }

    async fn release_subscriptions(&self, link: &dyn DeviceLink) {
        let ids: Vec<SubscriptionId> = {
            let mut subscriptions = self.shared.subscriptions.lock().unwrap();
            subscriptions.drain(..).collect()
        };
        for id in ids {
            let _ = link.unsubscribe(id).await;
        }
    }

    fn eeg_handler(&self, index: usize) -> NotificationHandler {
        let buffer = Arc::clone(&self.channels.eeg[index]);
        Box::new(move |payload| {
            let Some(body) = payload.get(codec::SEQUENCE_HEADER_LEN..) else {
                return;
            };
            let mut buffer = buffer.lock().unwrap();
            for raw in codec::decode_u12(body) {
                buffer.write(codec::eeg_microvolts(raw));
            }
        })
    }

    fn ppg_handler(&self, index: usize) -> NotificationHandler {
        let buffer = Arc::clone(&self.channels.ppg[index]);
        Box::new(move |payload| {
            let Some(body) = payload.get(codec::SEQUENCE_HEADER_LEN..) else {
                return;
            };
            let mut buffer = buffer.lock().unwrap();
            for sample in codec::decode_u24(body) {
                buffer.write(sample);
            }
        })
    }

    fn motion_handler(
        &self,
        axes: [SharedRing<f32>; MotionAxis::COUNT],
        scale: f32,
    ) -> NotificationHandler {
        Box::new(move |payload| {
            for triplet in codec::decode_motion(payload, scale) {
                for (axis, &value) in axes.iter().zip(triplet.iter()) {
                    axis.lock().unwrap().write(value);
                }
            }
        })
    }

    fn battery_handler(&self) -> NotificationHandler {
        let battery = Arc::clone(&self.battery);
        Box::new(move |payload| {
            if let Some(fraction) = codec::decode_battery(payload) {
                *battery.lock().unwrap() = Some(fraction);
            }
        })
    }

    fn control_handler(&self) -> NotificationHandler {
        let fragment = Arc::clone(&self.fragment);
        let info = Arc::clone(&self.info);
        Box::new(move |payload| {
            let Some(text) = codec::decode_fragment(payload) else {
                return;
            };
            let mut fragment = fragment.lock().unwrap();
            for c in text.chars() {
                fragment.push(c);
                if c == '}' {
                    match serde_json::from_str::<serde_json::Map<String, Value>>(&fragment) {
                        Ok(object) => info.lock().unwrap().extend(object),
                        Err(e) => {
                            warn!(error = %e, "discarding unparseable control fragment");
                        }
                    }
                    fragment.clear();
                }
            }
        })
    }
}
