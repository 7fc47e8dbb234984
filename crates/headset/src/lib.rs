//! Headset streaming core
//!
//! Decodes the wearable headset's characteristic-notification telemetry
//! into per-channel ring buffers, derives a real-time attention score, and
//! falls back to a synthetic signal source whenever hardware is
//! unreachable. Consumers see the same stream either way.
//!
//! Data flow: transport notifications -> codec -> ring buffers
//! ([`session::DeviceSession`]) or [`synthetic::SyntheticSource`] direct
//! generation -> [`score`] -> [`coordinator::StreamCoordinator`] emits a
//! [`headset_types::StreamSample`] to the registered consumer.

pub mod codec;
pub mod coordinator;
pub mod ring;
pub mod score;
pub mod session;
pub mod synthetic;
pub mod transport;

pub use coordinator::{StreamCoordinator, StreamError};
pub use ring::RingBuffer;
pub use session::{DeviceSession, SessionError, SessionState};
pub use transport::{DeviceLink, DiscoveredDevice, Transport, TransportError};
