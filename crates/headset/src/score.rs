//! Attention scoring
//!
//! Band-power extraction over a one-second sample window and the weighted
//! combination that turns four channels of band powers into a single
//! attention score in [0, 100]. The combination function here is the one
//! shared surface between the hardware path (windowed estimates, see
//! [`crate::session`]) and the synthetic path (closed-form oscillator
//! amplitudes, see [`crate::synthetic`]); the two derive their band powers
//! differently on purpose and must not be unified.

use headset_types::{Band, BandPowers};

/// Samples per scoring window: one second of EEG at 256 Hz.
pub const WINDOW_SAMPLES: usize = 256;

/// Weight of the alpha-suppression component.
pub const ALPHA_SUPPRESSION_WEIGHT: f32 = 40.0;

/// Weight of the beta-engagement component.
pub const BETA_ENGAGEMENT_WEIGHT: f32 = 30.0;

/// Weight of the frontal-asymmetry component.
pub const FRONTAL_ASYMMETRY_WEIGHT: f32 = 30.0;

/// Power estimate for one band over a sample window.
///
/// Currently every band receives the whole-window mean square; the band
/// argument does not select a frequency range, so the five-way split is
/// nominal. Calibration of the score weights assumes exactly this
/// estimate. A true spectral decomposition would change observable scores
/// and must not be introduced silently.
pub fn band_power(samples: &[f32], _band: Band) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64) as f32
}

/// All five band estimates for one channel's window.
pub fn band_powers(samples: &[f32]) -> BandPowers {
    BandPowers {
        delta: band_power(samples, Band::Delta),
        theta: band_power(samples, Band::Theta),
        alpha: band_power(samples, Band::Alpha),
        beta: band_power(samples, Band::Beta),
        gamma: band_power(samples, Band::Gamma),
    }
}

/// The 40/30/30 weighted combination, clamped to [0, 100].
///
/// `alpha` and `beta` carry one power per scored channel; the frontal
/// pair additionally feeds the asymmetry term. Both streaming paths call
/// this with their own band-power derivations.
pub fn weighted_score(
    alpha: &[f32],
    beta: &[f32],
    left_frontal_alpha: f32,
    right_frontal_alpha: f32,
) -> f32 {
    let alpha_suppression = 1.0 - mean(alpha);
    let beta_engagement = mean(beta);
    let asymmetry_denominator = right_frontal_alpha + left_frontal_alpha;
    // A dead frontal pair gives no asymmetry signal; hold the term at its
    // midpoint instead of dividing by zero.
    let frontal_asymmetry = if asymmetry_denominator == 0.0 {
        0.0
    } else {
        (right_frontal_alpha - left_frontal_alpha) / asymmetry_denominator
    };

    let score = alpha_suppression * ALPHA_SUPPRESSION_WEIGHT
        + beta_engagement * BETA_ENGAGEMENT_WEIGHT
        + ((frontal_asymmetry + 1.0) / 2.0) * FRONTAL_ASYMMETRY_WEIGHT;
    if score.is_nan() {
        // Only reachable through degenerate power sums (inf - inf); treat
        // as insufficient data.
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// Scores one window per scored channel (wire order TP9, AF7, AF8, TP10).
pub fn attention_from_windows(tp9: &[f32], af7: &[f32], af8: &[f32], tp10: &[f32]) -> f32 {
    let af7_powers = band_powers(af7);
    let af8_powers = band_powers(af8);
    let tp9_powers = band_powers(tp9);
    let tp10_powers = band_powers(tp10);

    let alpha = [
        af7_powers.alpha,
        af8_powers.alpha,
        tp9_powers.alpha,
        tp10_powers.alpha,
    ];
    let beta = [
        af7_powers.beta,
        af8_powers.beta,
        tp9_powers.beta,
        tp10_powers.beta,
    ];
    weighted_score(&alpha, &beta, af7_powers.alpha, af8_powers.alpha)
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn band_power_is_mean_square_for_every_band() {
        let samples = [1.0, -2.0, 3.0, -4.0];
        let expected = (1.0 + 4.0 + 9.0 + 16.0) / 4.0;
        for band in Band::ALL {
            assert_eq!(band_power(&samples, band), expected);
        }
    }

    #[test]
    fn band_power_of_empty_window_is_zero() {
        assert_eq!(band_power(&[], Band::Alpha), 0.0);
    }

    #[test]
    fn quiet_signal_scores_at_the_component_baselines() {
        // All-zero powers: alpha suppression saturates at 1, beta
        // engagement contributes nothing, asymmetry holds its midpoint.
        let score = weighted_score(&[0.0; 4], &[0.0; 4], 0.0, 0.0);
        assert_eq!(
            score,
            ALPHA_SUPPRESSION_WEIGHT + FRONTAL_ASYMMETRY_WEIGHT / 2.0
        );
    }

    #[test]
    fn rightward_asymmetry_raises_the_score() {
        let balanced = weighted_score(&[0.5; 4], &[0.5; 4], 0.5, 0.5);
        let rightward = weighted_score(&[0.5; 4], &[0.5; 4], 0.2, 0.8);
        assert!(rightward > balanced);
    }

    #[test]
    fn saturated_alpha_cannot_push_the_score_below_zero() {
        let score = weighted_score(&[1e6; 4], &[0.0; 4], 1e6, 1e6);
        assert_eq!(score, 0.0);
    }

    proptest! {
        /// The score stays in [0, 100] for arbitrary finite window
        /// contents, including pathological magnitudes.
        #[test]
        fn score_is_bounded_for_finite_windows(
            tp9 in proptest::collection::vec(-1e20f32..1e20, 0..64),
            af7 in proptest::collection::vec(-1e20f32..1e20, 0..64),
            af8 in proptest::collection::vec(-1e20f32..1e20, 0..64),
            tp10 in proptest::collection::vec(-1e20f32..1e20, 0..64),
        ) {
            let score = attention_from_windows(&tp9, &af7, &af8, &tp10);
            prop_assert!((0.0..=100.0).contains(&score));
        }
    }
}
