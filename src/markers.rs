use std::io::Write;

use crate::error::Result;
use crate::types::CanonicalEvent;

/// Writes the BrainVision marker file.
///
/// With a measurement date the first marker is a `New Segment` at position 1
/// carrying the date, and events are numbered from 2. An event that targets
/// several (but not all) channels is written once per channel.
///
/// Returns the number of marker lines written.
pub fn write_vmrk<W: Write>(
    out: &mut W,
    eeg_file: &str,
    events: &[CanonicalEvent],
    meas_date: Option<&str>,
) -> Result<usize> {
    writeln!(out, "Brain Vision Data Exchange Marker File, Version 1.0")?;
    writeln!(out, "; Exported using brainvision {}", crate::version())?;
    writeln!(out)?;
    writeln!(out, "[Common Infos]")?;
    writeln!(out, "Codepage=UTF-8")?;
    writeln!(out, "DataFile={}", eeg_file)?;
    writeln!(out)?;
    writeln!(out, "[Marker Infos]")?;
    writeln!(out, "; Each entry: Mk<Marker number>=<Type>,<Description>,<Position in data points>,")?;
    writeln!(out, ";             <Size in data points>, <Channel number (0 = marker is related to all channels)>")?;
    writeln!(out, ";             <Date (YYYYMMDDhhmmssuuuuuu)>")?;
    writeln!(out, "; Fields are delimited by commas, some fields might be omitted (empty).")?;
    writeln!(out, "; Commas in type or description text are coded as \"\\1\".")?;

    let mut index = 1;
    if let Some(date) = meas_date {
        writeln!(out, "Mk{}=New Segment,,1,1,0,{}", index, date)?;
        index += 1;
    }

    for event in events {
        // 每个相关通道写一行
        for channel in &event.channels {
            writeln!(
                out,
                "Mk{}={},{},{},{},{}",
                index,
                event.kind,
                event.label,
                event.position(),
                event.duration,
                channel
            )?;
            index += 1;
        }
    }

    Ok(index - 1)
}
