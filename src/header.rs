use std::io::Write;

use crate::error::Result;
use crate::types::{EncodingContext, Orientation};
use crate::utils::{escape_commas, format_decimal, sampling_interval};

/// Inputs of the `.vhdr` file besides the encoding context
#[derive(Debug)]
pub struct HeaderInfo<'a> {
    pub eeg_file: &'a str,
    pub vmrk_file: &'a str,
    pub sfreq: f64,
    pub ch_names: &'a [String],
    pub ref_names: &'a [String],
}

/// Writes the BrainVision header file.
///
/// Sections come in fixed order: `[Common Infos]`, `[Binary Infos]` (binary
/// formats only), `[Channel Infos]` and an empty `[Comment]`. File names are
/// base names of the sibling files, never paths.
pub fn write_vhdr<W: Write>(out: &mut W, info: &HeaderInfo<'_>, ctx: &EncodingContext) -> Result<()> {
    writeln!(out, "Brain Vision Data Exchange Header File Version 1.0")?;
    writeln!(out, "; Written using brainvision {}", crate::version())?;
    writeln!(out)?;

    // 1. Common Infos
    writeln!(out, "[Common Infos]")?;
    writeln!(out, "Codepage=UTF-8")?;
    writeln!(out, "DataFile={}", info.eeg_file)?;
    writeln!(out, "MarkerFile={}", info.vmrk_file)?;
    if ctx.format.is_binary() {
        writeln!(out, "DataFormat=BINARY")?;
    }
    match ctx.orientation {
        Orientation::Multiplexed => {
            writeln!(out, "; Data orientation: MULTIPLEXED=ch1,pt1, ch2,pt1 ...")?;
            writeln!(out, "DataOrientation=MULTIPLEXED")?;
        }
    }
    writeln!(out, "NumberOfChannels={}", info.ch_names.len())?;
    writeln!(out, "; Sampling interval in microseconds")?;
    writeln!(out, "SamplingInterval={}", sampling_interval(info.sfreq))?;
    writeln!(out)?;

    // 2. Binary Infos
    if ctx.format.is_binary() {
        writeln!(out, "[Binary Infos]")?;
        writeln!(out, "BinaryFormat={}", ctx.format.binary_tag())?;
        writeln!(out)?;
    }

    // 3. Channel Infos
    writeln!(out, "[Channel Infos]")?;
    writeln!(out, "; Each entry: Ch<Channel number>=<Name>,<Reference channel name>,")?;
    writeln!(out, "; <Resolution in \"Unit\">,<Unit>, Future extensions..")?;
    writeln!(out, "; Fields are delimited by commas, some fields might be omitted (empty).")?;
    writeln!(out, "; Commas in channel names are coded as \"\\1\".")?;
    for (i, name) in info.ch_names.iter().enumerate() {
        writeln!(
            out,
            "Ch{}={},{},{},{}",
            i + 1,
            escape_commas(name),
            escape_commas(&info.ref_names[i]),
            format_decimal(ctx.resolutions[i]),
            ctx.units[i]
        )?;
    }
    writeln!(out)?;

    // 4. Comment
    writeln!(out, "[Comment]")?;
    writeln!(out)?;

    Ok(())
}
