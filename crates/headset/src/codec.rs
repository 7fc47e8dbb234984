//! Vendor wire-format codec
//!
//! Pure, stateless transforms from notification payloads to typed values.
//! Every function is total over arbitrary byte input: truncated trailing
//! data is ignored and no partial sample is ever produced.

/// Microvolts per ADC step: 2 mV full scale over 4096 steps.
pub const EEG_UV_PER_STEP: f32 = 0.48828125;

/// Midpoint of the 12-bit ADC range; decoded values are centered on it.
pub const EEG_MIDPOINT: u16 = 2048;

/// Accelerometer scale, raw counts to g.
pub const ACCELEROMETER_SCALE: f32 = 0.000_061_035_2;

/// Gyroscope scale, raw counts to deg/s.
pub const GYROSCOPE_SCALE: f32 = 0.007_476_8;

/// Battery register scale: raw u16 / 512 yields a fraction of full charge.
pub const BATTERY_SCALE: f32 = 512.0;

/// Samples per motion notification (triplets after the sequence header).
const MOTION_TRIPLETS: usize = 3;

/// Byte length of the sequence header preceding motion and sample payloads.
pub const SEQUENCE_HEADER_LEN: usize = 2;

/// Unpacks 12-bit unsigned samples: each 3-byte group carries two samples,
/// high byte then low nibble for the first, low nibble then low byte for
/// the second.
pub fn decode_u12(payload: &[u8]) -> Vec<u16> {
    let mut samples = Vec::with_capacity(payload.len() / 3 * 2);
    for group in payload.chunks_exact(3) {
        samples.push(((group[0] as u16) << 4) | ((group[1] as u16) >> 4));
        samples.push((((group[1] & 0x0f) as u16) << 8) | group[2] as u16);
    }
    samples
}

/// Converts a decoded 12-bit sample to microvolts, centered on the ADC
/// midpoint.
pub fn eeg_microvolts(raw: u16) -> f32 {
    EEG_UV_PER_STEP * (raw as f32 - EEG_MIDPOINT as f32)
}

/// Unpacks 24-bit unsigned samples, one per 3-byte group. Left as raw ADC
/// counts; the optical front end is not calibrated to physical units.
pub fn decode_u24(payload: &[u8]) -> Vec<u32> {
    payload
        .chunks_exact(3)
        .map(|group| ((group[0] as u32) << 16) | ((group[1] as u32) << 8) | group[2] as u32)
        .collect()
}

/// Decodes a motion notification: a 2-byte sequence header followed by up
/// to three X/Y/Z triplets of signed little-endian 16-bit counts, each
/// scaled by the per-sensor constant. Incomplete trailing triplets are
/// dropped.
pub fn decode_motion(payload: &[u8], scale: f32) -> Vec<[f32; 3]> {
    let Some(body) = payload.get(SEQUENCE_HEADER_LEN..) else {
        return Vec::new();
    };
    body.chunks_exact(6)
        .take(MOTION_TRIPLETS)
        .map(|triplet| {
            [
                scale * i16::from_le_bytes([triplet[0], triplet[1]]) as f32,
                scale * i16::from_le_bytes([triplet[2], triplet[3]]) as f32,
                scale * i16::from_le_bytes([triplet[4], triplet[5]]) as f32,
            ]
        })
        .collect()
}

/// Decodes a length-prefixed text fragment: first byte is the length, the
/// following bytes are UTF-8 text. Returns `None` for an empty payload;
/// a length prefix that overruns the payload is clamped to what is there.
pub fn decode_fragment(payload: &[u8]) -> Option<String> {
    let (&len, rest) = payload.split_first()?;
    let text = rest.get(..len as usize).unwrap_or(rest);
    Some(String::from_utf8_lossy(text).into_owned())
}

/// Decodes the battery fraction: u16 little-endian at byte offset 2,
/// divided by the register scale. `None` when the payload is too short.
pub fn decode_battery(payload: &[u8]) -> Option<f32> {
    let bytes = payload.get(2..4)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]) as f32 / BATTERY_SCALE)
}

/// Encodes a control command for the wire: one length byte counting the
/// command text plus the trailing newline, then the text, then `\n`.
pub fn encode_command(cmd: &str) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(cmd.len() + 2);
    encoded.push((cmd.len() + 1) as u8);
    encoded.extend_from_slice(cmd.as_bytes());
    encoded.push(b'\n');
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u12_decodes_two_samples_per_group() {
        // 0x123 and 0x456 packed as [0x12, 0x34, 0x56].
        assert_eq!(decode_u12(&[0x12, 0x34, 0x56]), vec![0x123, 0x456]);
    }

    #[test]
    fn u12_midpoint_decodes_to_zero_microvolts() {
        // 2048 and 2048 packed: 0x800, 0x800 -> [0x80, 0x08, 0x00].
        let samples = decode_u12(&[0x80, 0x08, 0x00]);
        assert_eq!(samples, vec![2048, 2048]);
        assert_eq!(eeg_microvolts(samples[0]), 0.0);
    }

    #[test]
    fn u12_full_scale_decodes_to_top_of_range() {
        let samples = decode_u12(&[0xff, 0xff, 0xff]);
        assert_eq!(samples, vec![4095, 4095]);
        assert_eq!(eeg_microvolts(4095), EEG_UV_PER_STEP * 2047.0);
    }

    #[test]
    fn u12_ignores_truncated_trailing_bytes() {
        assert_eq!(decode_u12(&[0x12, 0x34, 0x56, 0x78]), vec![0x123, 0x456]);
        assert!(decode_u12(&[0x12]).is_empty());
        assert!(decode_u12(&[]).is_empty());
    }

    #[test]
    fn u24_decodes_big_endian_groups() {
        assert_eq!(decode_u24(&[0x01, 0x02, 0x03]), vec![66051]);
        assert_eq!(
            decode_u24(&[0x01, 0x02, 0x03, 0xff, 0xff, 0xff]),
            vec![66051, 0xff_ffff]
        );
        assert!(decode_u24(&[0x01, 0x02]).is_empty());
    }

    #[test]
    fn motion_decodes_negative_counts_with_correct_sign() {
        // Header, then one triplet of -1 on each axis; the rest truncated.
        let payload = [0x00, 0x01, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        let triplets = decode_motion(&payload, ACCELEROMETER_SCALE);
        assert_eq!(triplets.len(), 1);
        for value in triplets[0] {
            assert_eq!(value, -ACCELEROMETER_SCALE);
        }
    }

    #[test]
    fn motion_decodes_three_triplets_per_notification() {
        let mut payload = vec![0x00, 0x07];
        for i in 0..9i16 {
            payload.extend_from_slice(&(i + 1).to_le_bytes());
        }
        let triplets = decode_motion(&payload, GYROSCOPE_SCALE);
        assert_eq!(triplets.len(), 3);
        assert_eq!(triplets[2][2], GYROSCOPE_SCALE * 9.0);
    }

    #[test]
    fn motion_tolerates_short_payloads() {
        assert!(decode_motion(&[], ACCELEROMETER_SCALE).is_empty());
        assert!(decode_motion(&[0x00], ACCELEROMETER_SCALE).is_empty());
        assert!(decode_motion(&[0x00, 0x01, 0x02], ACCELEROMETER_SCALE).is_empty());
    }

    #[test]
    fn fragment_honors_length_prefix() {
        let mut payload = vec![4u8];
        payload.extend_from_slice(b"{\"rc\":0} trailing garbage");
        assert_eq!(decode_fragment(&payload).unwrap(), "{\"rc");
        assert_eq!(decode_fragment(&[0]).unwrap(), "");
        assert!(decode_fragment(&[]).is_none());
    }

    #[test]
    fn fragment_clamps_overrunning_length() {
        let payload = [200u8, b'h', b'i'];
        assert_eq!(decode_fragment(&payload).unwrap(), "hi");
    }

    #[test]
    fn battery_halfway_register_is_full_charge() {
        // 512 LE at offset 2 -> 1.0.
        assert_eq!(decode_battery(&[0, 0, 0x00, 0x02]).unwrap(), 1.0);
        assert_eq!(decode_battery(&[0, 0, 0x00, 0x01]).unwrap(), 0.5);
        assert!(decode_battery(&[0, 0, 0x00]).is_none());
    }

    #[test]
    fn commands_are_length_prefixed_with_newline() {
        assert_eq!(encode_command("h"), vec![2, b'h', b'\n']);
        assert_eq!(encode_command("p50"), vec![4, b'p', b'5', b'0', b'\n']);
        assert_eq!(encode_command("v1"), vec![3, b'v', b'1', b'\n']);
    }
}
