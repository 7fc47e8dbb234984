//! Channel and frequency band definitions
//!
//! Each channel role owns exactly one ring buffer for its lifetime; the
//! enums here are the keys used to address those buffers.

use serde::{Deserialize, Serialize};

/// EEG electrode positions carried by the wire protocol.
///
/// TP9/TP10 are the temporal leads, AF7/AF8 the frontal pair used for
/// asymmetry scoring. AUX is the optional fifth lead on the reference
/// headband; it is buffered but never scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EegChannel {
    Tp9,
    Af7,
    Af8,
    Tp10,
    Aux,
}

impl EegChannel {
    pub const COUNT: usize = 5;

    /// All leads in wire order (characteristic index order).
    pub const ALL: [EegChannel; Self::COUNT] = [
        EegChannel::Tp9,
        EegChannel::Af7,
        EegChannel::Af8,
        EegChannel::Tp10,
        EegChannel::Aux,
    ];

    /// The four leads that feed the attention score, in emission order.
    pub const SCORED: [EegChannel; 4] = [
        EegChannel::Tp9,
        EegChannel::Af7,
        EegChannel::Af8,
        EegChannel::Tp10,
    ];

    /// Wire index of this lead (position in the characteristic list).
    pub fn index(self) -> usize {
        match self {
            EegChannel::Tp9 => 0,
            EegChannel::Af7 => 1,
            EegChannel::Af8 => 2,
            EegChannel::Tp10 => 3,
            EegChannel::Aux => 4,
        }
    }
}

/// Optical pulse (PPG) wavelengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PpgChannel {
    Ambient,
    Infrared,
    Red,
}

impl PpgChannel {
    pub const COUNT: usize = 3;

    pub const ALL: [PpgChannel; Self::COUNT] =
        [PpgChannel::Ambient, PpgChannel::Infrared, PpgChannel::Red];

    pub fn index(self) -> usize {
        match self {
            PpgChannel::Ambient => 0,
            PpgChannel::Infrared => 1,
            PpgChannel::Red => 2,
        }
    }
}

/// Motion axes, shared by the accelerometer and gyroscope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionAxis {
    X,
    Y,
    Z,
}

impl MotionAxis {
    pub const COUNT: usize = 3;

    pub const ALL: [MotionAxis; Self::COUNT] = [MotionAxis::X, MotionAxis::Y, MotionAxis::Z];

    pub fn index(self) -> usize {
        match self {
            MotionAxis::X => 0,
            MotionAxis::Y => 1,
            MotionAxis::Z => 2,
        }
    }
}

/// Canonical physiological frequency bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl Band {
    pub const COUNT: usize = 5;

    pub const ALL: [Band; Self::COUNT] =
        [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    /// Nominal frequency range in Hz.
    pub fn frequency_range(self) -> (f32, f32) {
        match self {
            Band::Delta => (1.0, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 13.0),
            Band::Beta => (13.0, 30.0),
            Band::Gamma => (30.0, 50.0),
        }
    }
}

/// Per-channel band power estimates. Derived from a fresh sample window on
/// every score request, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    pub delta: f32,
    pub theta: f32,
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

impl BandPowers {
    pub fn get(&self, band: Band) -> f32 {
        match band {
            Band::Delta => self.delta,
            Band::Theta => self.theta,
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
            Band::Gamma => self.gamma,
        }
    }
}
