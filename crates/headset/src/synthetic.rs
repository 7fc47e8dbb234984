//! Synthetic signal source
//!
//! Stands in for the hardware path whenever no headset is reachable.
//! Produces four channels shaped like the frontal/temporal EEG layout and
//! an attention score through the same weighted combination as the
//! buffered estimator. Unlike the hardware path, band powers here come
//! straight from the closed-form oscillator amplitudes rather than a
//! sample window; a model-based generator has nothing to buffer. The two
//! derivations are calibrated independently; only the combination weights
//! and output range are shared.

use std::f64::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::score;

/// Alpha carrier frequency in the generated raw signal, Hz.
const ALPHA_CARRIER_HZ: f64 = 10.0;

/// Beta carrier frequency in the generated raw signal, Hz.
const BETA_CARRIER_HZ: f64 = 20.0;

const ALPHA_AMPLITUDE: f64 = 5.0;
const BETA_AMPLITUDE: f64 = 3.0;

/// Slow modulation frequencies for the per-channel band powers; frontal
/// and temporal pairs drift at slightly different rates so the score
/// wanders naturally.
const FRONTAL_ALPHA_DRIFT: f64 = 0.10;
const TEMPORAL_ALPHA_DRIFT: f64 = 0.12;
const FRONTAL_BETA_DRIFT: f64 = 0.15;
const TEMPORAL_BETA_DRIFT: f64 = 0.17;

/// Generates plausible four-channel samples and scores on demand.
///
/// Everything is parameterized by wall-clock time, not tick count, so a
/// restarted generator does not replay earlier output.
#[derive(Debug, Default)]
pub struct SyntheticSource;

impl SyntheticSource {
    pub fn new() -> Self {
        Self
    }

    /// One raw sample per scored channel: a 10 Hz alpha sinusoid plus a
    /// 20 Hz beta sinusoid plus bounded uniform noise.
    pub fn generate(&mut self) -> [f32; 4] {
        let t = wall_clock_secs();
        let carrier = ALPHA_AMPLITUDE * (2.0 * PI * ALPHA_CARRIER_HZ * t).sin()
            + BETA_AMPLITUDE * (2.0 * PI * BETA_CARRIER_HZ * t).sin();
        let mut rng = rand::thread_rng();
        std::array::from_fn(|_| {
            let noise = (rng.gen::<f64>() - 0.5) * 2.0;
            (carrier + noise) as f32
        })
    }

    /// Attention score from the modeled band powers, in [0, 100].
    pub fn attention_score(&self) -> f32 {
        let t = wall_clock_secs();
        // Powers oscillate between 0.2 and 0.8 per channel. Index order
        // matches the frontal pair first, then the temporal pair; the
        // frontal channels share one drift rate, so the asymmetry term
        // idles at its midpoint by construction.
        let alpha_af7 = modeled_power(t, FRONTAL_ALPHA_DRIFT, 0.0);
        let alpha_af8 = modeled_power(t, FRONTAL_ALPHA_DRIFT, 0.0);
        let alpha_tp9 = modeled_power(t, TEMPORAL_ALPHA_DRIFT, 0.0);
        let alpha_tp10 = modeled_power(t, TEMPORAL_ALPHA_DRIFT, 0.0);
        let beta_af7 = modeled_power(t, FRONTAL_BETA_DRIFT, PI / 4.0);
        let beta_af8 = modeled_power(t, FRONTAL_BETA_DRIFT, PI / 4.0);
        let beta_tp9 = modeled_power(t, TEMPORAL_BETA_DRIFT, PI / 4.0);
        let beta_tp10 = modeled_power(t, TEMPORAL_BETA_DRIFT, PI / 4.0);

        score::weighted_score(
            &[alpha_af7, alpha_af8, alpha_tp9, alpha_tp10],
            &[beta_af7, beta_af8, beta_tp9, beta_tp10],
            alpha_af7,
            alpha_af8,
        )
    }
}

fn modeled_power(t: f64, drift_hz: f64, phase: f64) -> f32 {
    (0.5 + 0.3 * (t * drift_hz + phase).sin()) as f32
}

fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
