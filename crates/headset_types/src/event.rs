//! Consumer-facing stream events

use serde::{Deserialize, Serialize};

/// One emission of the sampling loop: the current raw value of each scored
/// EEG channel (wire order TP9, AF7, AF8, TP10) plus the attention score
/// for that tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamSample {
    /// Most recent raw microvolt value per scored channel, 0.0 when a
    /// channel had nothing buffered this tick.
    pub raw_eeg: [f32; 4],
    /// Attention score in [0, 100]; 0 also doubles as the
    /// insufficient-data sentinel.
    pub attention_score: f32,
    /// Monotonic tick counter, starts at 0 when streaming begins.
    pub tick: u64,
}
