use std::io::Write;

use crate::error::Result;
use crate::quantize::QuantizedSamples;

/// Writes the raw `.eeg` payload: little-endian values, no header.
///
/// Returns the number of bytes written.
pub fn write_eeg<W: Write>(out: &mut W, samples: &QuantizedSamples) -> Result<usize> {
    samples.write_le(out)?;
    Ok(samples.byte_len())
}
