use rubato::{FftFixedIn, Resampler};

/// Buffers shorter than this skip the FFT resampler; its windowing needs
/// more context than a couple of milliseconds of audio provides.
const MIN_FFT_INPUT: usize = 64;

/// One-shot mono resample. FFT-based when the input is long enough, linear
/// interpolation otherwise or when the FFT path errors.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }
    if samples.len() < MIN_FFT_INPUT {
        return resample_linear(samples, from_rate, to_rate);
    }

    let chunk_size = samples.len().min(1024);
    match FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, 2, 1) {
        Ok(mut resampler) => {
            let input: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
            let mut output = Vec::new();
            let mut offset = 0;
            while offset < input.len() {
                let needed = resampler.input_frames_next();
                let end = (offset + needed).min(input.len());
                let chunk = &input[offset..end];
                let result = if chunk.len() == needed {
                    resampler.process(&[chunk.to_vec()], None)
                } else {
                    resampler.process_partial(Some(&[chunk.to_vec()]), None)
                };
                match result {
                    Ok(mut frames) => {
                        if let Some(channel) = frames.pop() {
                            output.extend(channel.into_iter().map(|s| s as f32));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(target: "audio", error = %e, "fft resample failed, falling back to linear");
                        return resample_linear(samples, from_rate, to_rate);
                    }
                }
                offset = end;
            }
            output
        }
        Err(e) => {
            tracing::warn!(target: "audio", error = %e, "fft resampler init failed, falling back to linear");
            resample_linear(samples, from_rate, to_rate)
        }
    }
}

fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio).round() as usize;
    let mut out = Vec::with_capacity(new_len);
    for i in 0..new_len {
        let src = i as f64 / ratio;
        let lo = src.floor() as usize;
        let hi = (lo + 1).min(samples.len() - 1);
        let frac = (src - lo as f64) as f32;
        out.push(samples[lo] * (1.0 - frac) + samples[hi] * frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_identity() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&input, 16_000, 16_000), input);
    }

    #[test]
    fn linear_path_preserves_constant_signal() {
        let input = vec![0.25; 32];
        let out = resample(&input, 16_000, 8_000);
        assert!(!out.is_empty());
        for s in &out {
            assert!((s - 0.25).abs() < 0.01);
        }
    }

    #[test]
    fn noise_survives_resampling_without_clipping() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(7);
        let input: Vec<f32> = (0..4800).map(|_| rng.gen_range(-0.5..0.5)).collect();
        let out = resample(&input, 48_000, 16_000);
        assert!(!out.is_empty());
        for s in &out {
            assert!(s.abs() <= 1.0, "sample {} out of range", s);
        }
    }

    #[test]
    fn downsample_ratio_roughly_holds() {
        let input: Vec<f32> = (0..4800).map(|i| ((i % 100) as f32 - 50.0) / 50.0).collect();
        let out = resample(&input, 48_000, 16_000);
        let expected = input.len() / 3;
        assert!(
            out.len() >= expected - 100 && out.len() <= expected + 100,
            "expected ~{}, got {}",
            expected,
            out.len()
        );
    }
}
