/// Energy level reported for empty or all-zero audio.
pub const SILENCE_FLOOR_DBFS: f32 = -96.0;

/// Root mean square of normalized f32 samples.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Convert an RMS value to dBFS, where 1.0 is full scale.
pub fn rms_to_dbfs(rms: f32) -> f32 {
    if rms > 0.0 {
        20.0 * rms.log10()
    } else {
        SILENCE_FLOOR_DBFS
    }
}

/// RMS energy of a sample slice in dBFS.
pub fn samples_to_dbfs(samples: &[f32]) -> f32 {
    rms_to_dbfs(rms(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slice_is_silence() {
        assert_eq!(samples_to_dbfs(&[]), SILENCE_FLOOR_DBFS);
    }

    #[test]
    fn zeros_are_silence() {
        assert_eq!(samples_to_dbfs(&[0.0; 160]), SILENCE_FLOOR_DBFS);
    }

    #[test]
    fn full_scale_is_zero_dbfs() {
        let db = samples_to_dbfs(&[1.0; 160]);
        assert!(db.abs() < 0.01, "expected ~0 dBFS, got {}", db);
    }

    #[test]
    fn half_scale_is_about_minus_six() {
        let db = samples_to_dbfs(&[0.5; 160]);
        assert!((db + 6.02).abs() < 0.1, "expected ~-6 dBFS, got {}", db);
    }
}
