use std::io::Write;

use crate::error::{BvError, Result};
use crate::types::{DataFormat, SignalMatrix};
use crate::utils::format_decimal;

/// Samples in their on-disk numeric type, already multiplexed
/// (ch1@t1, ch2@t1, ..., chN@t1, ch1@t2, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum QuantizedSamples {
    Float32(Vec<f32>),
    Int16(Vec<i16>),
}

impl QuantizedSamples {
    /// Format the samples were cast to
    pub fn format(&self) -> DataFormat {
        match self {
            QuantizedSamples::Float32(_) => DataFormat::BinaryFloat32,
            QuantizedSamples::Int16(_) => DataFormat::BinaryInt16,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            QuantizedSamples::Float32(v) => v.len(),
            QuantizedSamples::Int16(v) => v.len(),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.format().bytes_per_sample()
    }

    /// 以小端序写出，不依赖主机字节序
    pub fn write_le<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        match self {
            QuantizedSamples::Float32(values) => {
                for v in values {
                    out.write_all(&v.to_le_bytes())?;
                }
            }
            QuantizedSamples::Int16(values) => {
                for v in values {
                    out.write_all(&v.to_le_bytes())?;
                }
            }
        }
        Ok(())
    }
}

/// Exclusive bounds of the on-disk type
fn representable_range(format: DataFormat) -> (f64, f64) {
    match format {
        DataFormat::BinaryFloat32 => (f32::MIN as f64, f32::MAX as f64),
        DataFormat::BinaryInt16 => (i16::MIN as f64, i16::MAX as f64),
    }
}

/// Divides every channel by its resolution and casts to `format`.
///
/// `data` must already be in the target units. `resolutions` holds one value
/// per channel. Any value at or beyond the bounds of the on-disk type, and any
/// NaN, fails the whole call before anything is produced.
///
/// # Errors
///
/// * `BvError::DataOutOfRange` - a step-scaled value does not fit the format.
///   The message names the format, the resolution(s) and the units, and
///   suggests `binary_float32` when `binary_int16` was requested.
pub fn quantize(
    data: &SignalMatrix,
    resolutions: &[f64],
    units: &[String],
    format: DataFormat,
) -> Result<QuantizedSamples> {
    let n_channels = data.n_channels();
    let n_samples = data.n_samples();
    let (min, max) = representable_range(format);

    // 先按分辨率缩放
    let mut steps = data.clone();
    for ch in 0..n_channels {
        let factor = 1.0 / resolutions[ch];
        for v in steps.channel_mut(ch) {
            *v *= factor;
        }
    }

    // 范围检查（边界值本身也视为越界，NaN 同样不通过）
    let out_of_range = (0..n_channels)
        .flat_map(|ch| steps.channel(ch).iter())
        .any(|&v| v.is_nan() || v <= min || v >= max);
    if out_of_range {
        return Err(range_error(resolutions, units, format));
    }

    // 按列优先顺序交织各通道
    let samples = match format {
        DataFormat::BinaryFloat32 => {
            let mut out = Vec::with_capacity(n_channels * n_samples);
            for t in 0..n_samples {
                for ch in 0..n_channels {
                    out.push(steps.get(ch, t) as f32);
                }
            }
            QuantizedSamples::Float32(out)
        }
        DataFormat::BinaryInt16 => {
            let mut out = Vec::with_capacity(n_channels * n_samples);
            for t in 0..n_samples {
                for ch in 0..n_channels {
                    out.push(steps.get(ch, t).round() as i16);
                }
            }
            QuantizedSamples::Int16(out)
        }
    };

    log::debug!(
        "quantized {} channels x {} samples as {}",
        n_channels,
        n_samples,
        format
    );
    Ok(samples)
}

fn range_error(resolutions: &[f64], units: &[String], format: DataFormat) -> BvError {
    let uniform = resolutions.windows(2).all(|w| w[0] == w[1]);
    let resolution = match resolutions.first() {
        Some(r) if uniform => format!("resolution ('{}')", format_decimal(*r)),
        _ => format!(
            "resolutions ('{}')",
            resolutions.iter().map(|r| format_decimal(*r)).collect::<Vec<_>>().join(", ")
        ),
    };

    let suggestion = if format == DataFormat::BinaryInt16 {
        format!("\nPlease consider writing using '{}' format.", DataFormat::BinaryFloat32)
    } else {
        String::new()
    };

    BvError::DataOutOfRange {
        format: format.to_string(),
        resolution,
        units: units.join(", "),
        suggestion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uv(n: usize) -> Vec<String> {
        vec!["µV".to_string(); n]
    }

    #[test]
    fn test_multiplexed_order() {
        let data = SignalMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]]).unwrap();
        let q = quantize(&data, &[1.0, 1.0], &uv(2), DataFormat::BinaryFloat32).unwrap();
        assert_eq!(q, QuantizedSamples::Float32(vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]));
    }

    #[test]
    fn test_per_channel_resolution() {
        let data = SignalMatrix::from_rows(&[vec![1.0, -1.0], vec![1.0, -1.0]]).unwrap();
        let q = quantize(&data, &[0.1, 0.5], &uv(2), DataFormat::BinaryInt16).unwrap();
        assert_eq!(q, QuantizedSamples::Int16(vec![10, 2, -10, -2]));
    }

    #[test]
    fn test_int16_rounds_to_nearest_step() {
        let data = SignalMatrix::from_rows(&[vec![0.26, -0.26, 0.24]]).unwrap();
        let q = quantize(&data, &[0.1], &uv(1), DataFormat::BinaryInt16).unwrap();
        assert_eq!(q, QuantizedSamples::Int16(vec![3, -3, 2]));
    }

    #[test]
    fn test_int16_bounds_are_exclusive() {
        let ok = SignalMatrix::from_rows(&[vec![32766.0, -32767.0]]).unwrap();
        assert!(quantize(&ok, &[1.0], &uv(1), DataFormat::BinaryInt16).is_ok());

        let at_max = SignalMatrix::from_rows(&[vec![32767.0]]).unwrap();
        assert!(quantize(&at_max, &[1.0], &uv(1), DataFormat::BinaryInt16).is_err());

        let at_min = SignalMatrix::from_rows(&[vec![-32768.0]]).unwrap();
        assert!(quantize(&at_min, &[1.0], &uv(1), DataFormat::BinaryInt16).is_err());
    }

    #[test]
    fn test_int16_error_suggests_float32() {
        let data = SignalMatrix::from_rows(&[vec![5000.0]]).unwrap();
        let err = quantize(&data, &[0.1], &uv(1), DataFormat::BinaryInt16).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("binary_int16"));
        assert!(msg.contains("'0.1'"));
        assert!(msg.contains("µV"));
        assert!(msg.contains("binary_float32"));
    }

    #[test]
    fn test_float32_error_has_no_suggestion() {
        let data = SignalMatrix::from_rows(&[vec![f64::INFINITY], vec![0.0]]).unwrap();
        let err = quantize(&data, &[0.1, 0.2], &uv(2), DataFormat::BinaryFloat32).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("binary_float32"));
        assert!(msg.contains("resolutions ('0.1, 0.2')"));
        assert!(!msg.contains("consider"));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        for format in [DataFormat::BinaryInt16, DataFormat::BinaryFloat32] {
            for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
                let data = SignalMatrix::from_rows(&[vec![bad, 1e-6]]).unwrap();
                let err = quantize(&data, &[0.1], &uv(1), format).unwrap_err();
                assert!(
                    matches!(err, BvError::DataOutOfRange { .. }),
                    "{} accepted {}",
                    format,
                    bad
                );
            }
        }
    }

    #[test]
    fn test_float32_bounds_are_exclusive() {
        let at_max = SignalMatrix::from_rows(&[vec![f32::MAX as f64]]).unwrap();
        assert!(quantize(&at_max, &[1.0], &uv(1), DataFormat::BinaryFloat32).is_err());

        let near_max = SignalMatrix::from_rows(&[vec![f32::MAX as f64 / 2.0]]).unwrap();
        assert!(quantize(&near_max, &[1.0], &uv(1), DataFormat::BinaryFloat32).is_ok());
    }

    #[test]
    fn test_little_endian_bytes() {
        let q = QuantizedSamples::Int16(vec![1, -2]);
        let mut out = Vec::new();
        q.write_le(&mut out).unwrap();
        assert_eq!(out, vec![0x01, 0x00, 0xFE, 0xFF]);
        assert_eq!(q.byte_len(), 4);
        assert_eq!(q.format(), DataFormat::BinaryInt16);

        let q = QuantizedSamples::Float32(vec![1.0]);
        let mut out = Vec::new();
        q.write_le(&mut out).unwrap();
        assert_eq!(out, 1.0f32.to_le_bytes().to_vec());
    }
}
