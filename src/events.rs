//! Event normalization.
//!
//! Callers describe events either as an integer table or as a list of
//! [`EventRecord`]s. Both shapes are resolved here, once, into
//! [`CanonicalEvent`]s; nothing downstream looks at the input shape again.
//!
//! Stimulus and Response descriptions are non-negative integers rendered as
//! fixed-width labels so markers line up in readers: with descriptions
//! `1, 23, 345` the labels become `S  1`, `S 23` and `S345`. The width is the
//! digit count of the largest Stimulus/Response description of the whole
//! event set, and never less than 3.

use std::collections::HashSet;
use std::str::FromStr;

use crate::error::{BvError, Result};
use crate::types::{
    CanonicalEvent, ChannelRefs, Description, Diagnostic, EventKind, EventRecord, EventSpec,
};
use crate::utils::{digit_count, escape_commas};

/// Minimum width of Stimulus/Response labels (without the kind initial)
const MIN_LABEL_WIDTH: usize = 3;

/// Reserved channel keyword meaning "every channel"
const ALL_CHANNELS: &str = "all";

/// Output of [`normalize_events`]
#[derive(Debug, Clone, Default)]
pub struct NormalizedEvents {
    pub events: Vec<CanonicalEvent>,
    pub diagnostics: Vec<Diagnostic>,
}

impl NormalizedEvents {
    /// Number of marker lines these events expand to
    pub fn marker_line_count(&self) -> usize {
        self.events.iter().map(|e| e.channels.len().max(1)).sum()
    }
}

/// Validates `spec` against the channel set and the data length.
///
/// # Arguments
///
/// * `spec` - events as passed to the writer
/// * `ch_names` - channel names of the data, in order
/// * `n_samples` - number of samples per channel
///
/// # Errors
///
/// * `BvError::InvalidEvents` - table is not rectangular or does not have 2 or 3 columns
/// * `BvError::EventOutOfRange` - onset or duration outside the data
/// * `BvError::UnknownEventKind` - kind is not Stimulus, Response or Comment
/// * `BvError::InvalidDescription` - negative or textual Stimulus/Response description
/// * `BvError::AmbiguousAllChannel` - `all` requested while a channel is named `all`
/// * `BvError::UnknownEventChannel` / `BvError::DuplicateEventChannel`
pub fn normalize_events(
    spec: &EventSpec,
    ch_names: &[String],
    n_samples: usize,
) -> Result<NormalizedEvents> {
    let records = match spec {
        EventSpec::None => Vec::new(),
        EventSpec::Array(rows) => records_from_array(rows)?,
        EventSpec::Records(records) => records.clone(),
    };

    let width = label_width(&records);
    let mut events = Vec::with_capacity(records.len());
    let mut partial = 0;

    for record in &records {
        let (onset, duration) = check_timing(record, n_samples)?;

        let kind = match &record.kind {
            Some(k) => EventKind::from_str(k)?,
            None => EventKind::Stimulus,
        };

        let label = format_label(kind, &record.description, width)?;
        let channels = resolve_channels(record.channels.as_ref(), ch_names)?;
        if channels.len() > 1 {
            partial += 1;
        }

        events.push(CanonicalEvent {
            onset,
            duration,
            kind,
            label,
            channels,
        });
    }

    let mut diagnostics = Vec::new();
    if partial > 0 {
        diagnostics.push(Diagnostic::PartialChannelEvents(partial));
    }

    Ok(NormalizedEvents { events, diagnostics })
}

/// 将二维整数表转换为事件记录
fn records_from_array(rows: &[Vec<i64>]) -> Result<Vec<EventRecord>> {
    let n_cols = match rows.first() {
        Some(row) => row.len(),
        None => return Ok(Vec::new()),
    };

    if rows.iter().any(|row| row.len() != n_cols) {
        return Err(BvError::InvalidEvents(
            "when array, events must be 2D with the same number of columns in every row".to_string(),
        ));
    }
    if n_cols != 2 && n_cols != 3 {
        return Err(BvError::InvalidEvents(format!(
            "when array, events must have 2 or 3 columns, but got: {}",
            n_cols
        )));
    }

    Ok(rows
        .iter()
        .map(|row| {
            let record = EventRecord::new(row[0], Description::Int(row[1]));
            if n_cols == 3 {
                record.with_duration(row[2])
            } else {
                record
            }
        })
        .collect())
}

fn check_timing(record: &EventRecord, n_samples: usize) -> Result<(usize, usize)> {
    let n = n_samples as i64;
    let onset = record.onset;
    let duration = record.duration.unwrap_or(1);

    if onset < 0 || onset >= n {
        return Err(BvError::EventOutOfRange(format!(
            "onset sample {} is not in range of data (0-{})",
            onset,
            n - 1
        )));
    }
    if duration < 0 {
        return Err(BvError::EventOutOfRange(format!(
            "duration {} is negative, durations must be >= 0 samples",
            duration
        )));
    }
    if onset.checked_add(duration).map_or(true, |end| end > n) {
        return Err(BvError::EventOutOfRange(format!(
            "event at onset {} with duration {} exceeds the range of data (0-{})",
            onset,
            duration,
            n - 1
        )));
    }

    Ok((onset as usize, duration as usize))
}

/// 计算标签宽度：所有 Stimulus/Response 描述的最大位数，最小为 3
fn label_width(records: &[EventRecord]) -> usize {
    let max_description = records
        .iter()
        .filter(|r| !matches!(r.kind.as_deref(), Some("Comment")))
        .filter_map(|r| match r.description {
            Description::Int(v) if v >= 0 => Some(v as u64),
            _ => None,
        })
        .fold(1, u64::max);

    MIN_LABEL_WIDTH.max(digit_count(max_description))
}

fn format_label(kind: EventKind, description: &Description, width: usize) -> Result<String> {
    match kind {
        EventKind::Stimulus | EventKind::Response => match description {
            Description::Int(v) if *v >= 0 => {
                Ok(format!("{}{:>width$}", kind.initial(), v, width = width))
            }
            Description::Int(_) => Err(BvError::InvalidDescription(format!(
                "when type is {}, descriptions must be non-negative ints",
                kind
            ))),
            Description::Text(_) => Err(BvError::InvalidDescription(format!(
                "when type is {}, description must be non-negative int",
                kind
            ))),
        },
        // 注释中的逗号同样需要编码
        EventKind::Comment => match description {
            Description::Int(v) => Ok(v.to_string()),
            Description::Text(s) => Ok(escape_commas(s)),
        },
    }
}

/// Resolves event channels to sorted 1-based indices, `[0]` meaning all channels.
fn resolve_channels(channels: Option<&ChannelRefs>, ch_names: &[String]) -> Result<Vec<usize>> {
    let names: Vec<&str> = match channels {
        None => return Ok(vec![0]),
        Some(ChannelRefs::All) => {
            if ch_names.iter().any(|n| n == ALL_CHANNELS) {
                return Err(BvError::AmbiguousAllChannel);
            }
            return Ok(vec![0]);
        }
        Some(ChannelRefs::Name(name)) => vec![name.as_str()],
        Some(ChannelRefs::Names(names)) => names.iter().map(String::as_str).collect(),
    };

    let mut seen = HashSet::new();
    let mut indices = Vec::with_capacity(names.len());
    for name in names {
        let idx = ch_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| BvError::UnknownEventChannel(name.to_string()))?;
        if !seen.insert(name) {
            return Err(BvError::DuplicateEventChannel(name.to_string()));
        }
        indices.push(idx + 1);
    }

    // 空列表或覆盖全部通道都等同于 "all"
    if indices.is_empty() || indices.len() == ch_names.len() {
        return Ok(vec![0]);
    }

    indices.sort_unstable();
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn labels(events: &NormalizedEvents) -> Vec<&str> {
        events.events.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn test_no_events() {
        let out = normalize_events(&EventSpec::None, &names(&["Fp1"]), 10).unwrap();
        assert!(out.events.is_empty());
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.marker_line_count(), 0);

        let out = normalize_events(&EventSpec::Array(vec![]), &names(&["Fp1"]), 10).unwrap();
        assert!(out.events.is_empty());
    }

    #[test]
    fn test_array_two_columns() {
        let spec = EventSpec::Array(vec![vec![0, 1], vec![4, 23], vec![9, 345]]);
        let out = normalize_events(&spec, &names(&["Fp1", "Fp2"]), 10).unwrap();

        assert_eq!(labels(&out), vec!["S  1", "S 23", "S345"]);
        for e in &out.events {
            assert_eq!(e.kind, EventKind::Stimulus);
            assert_eq!(e.duration, 1);
            assert_eq!(e.channels, vec![0]);
        }
        assert_eq!(out.events[0].position(), 1);
        assert_eq!(out.events[2].position(), 10);
    }

    #[test]
    fn test_array_three_columns_sets_duration() {
        let spec = EventSpec::Array(vec![vec![2, 5, 3], vec![7, 6, 0]]);
        let out = normalize_events(&spec, &names(&["Fp1"]), 10).unwrap();
        assert_eq!(out.events[0].duration, 3);
        assert_eq!(out.events[1].duration, 0);
    }

    #[test]
    fn test_array_shape_errors() {
        let ch = names(&["Fp1"]);
        let four_cols = EventSpec::Array(vec![vec![0, 1, 1, 1]]);
        assert!(matches!(
            normalize_events(&four_cols, &ch, 10),
            Err(BvError::InvalidEvents(_))
        ));

        let ragged = EventSpec::Array(vec![vec![0, 1], vec![0, 1, 1]]);
        assert!(matches!(
            normalize_events(&ragged, &ch, 10),
            Err(BvError::InvalidEvents(_))
        ));
    }

    #[test]
    fn test_label_width_grows_with_largest_description() {
        let spec = EventSpec::Records(vec![
            EventRecord::new(0, 1),
            EventRecord::new(1, 1000).with_kind("Response"),
        ]);
        let out = normalize_events(&spec, &names(&["Fp1"]), 10).unwrap();
        assert_eq!(labels(&out), vec!["S   1", "R1000"]);
    }

    #[test]
    fn test_comment_descriptions_do_not_affect_width() {
        let spec = EventSpec::Records(vec![
            EventRecord::new(0, 5),
            EventRecord::new(1, 123456).with_kind("Comment"),
            EventRecord::new(2, "eyes, closed").with_kind("Comment"),
        ]);
        let out = normalize_events(&spec, &names(&["Fp1"]), 10).unwrap();
        assert_eq!(labels(&out), vec!["S  5", "123456", "eyes\\1 closed"]);
    }

    #[test]
    fn test_onset_and_duration_bounds() {
        let ch = names(&["Fp1"]);
        let last = EventSpec::Records(vec![EventRecord::new(9, 1).with_duration(1)]);
        assert!(normalize_events(&last, &ch, 10).is_ok());

        let past_end = EventSpec::Records(vec![EventRecord::new(10, 1)]);
        assert!(matches!(
            normalize_events(&past_end, &ch, 10),
            Err(BvError::EventOutOfRange(_))
        ));

        let negative = EventSpec::Records(vec![EventRecord::new(-1, 1)]);
        assert!(normalize_events(&negative, &ch, 10).is_err());

        let too_long = EventSpec::Records(vec![EventRecord::new(8, 1).with_duration(3)]);
        assert!(matches!(
            normalize_events(&too_long, &ch, 10),
            Err(BvError::EventOutOfRange(_))
        ));

        let negative_duration = EventSpec::Records(vec![EventRecord::new(0, 1).with_duration(-1)]);
        assert!(normalize_events(&negative_duration, &ch, 10).is_err());
    }

    #[test]
    fn test_kind_and_description_validation() {
        let ch = names(&["Fp1"]);
        let unknown = EventSpec::Records(vec![EventRecord::new(0, 1).with_kind("New Segment")]);
        assert!(matches!(
            normalize_events(&unknown, &ch, 10),
            Err(BvError::UnknownEventKind(_))
        ));

        let text_stimulus = EventSpec::Records(vec![EventRecord::new(0, "one")]);
        assert!(matches!(
            normalize_events(&text_stimulus, &ch, 10),
            Err(BvError::InvalidDescription(_))
        ));

        let negative_response =
            EventSpec::Records(vec![EventRecord::new(0, -3).with_kind("Response")]);
        assert!(matches!(
            normalize_events(&negative_response, &ch, 10),
            Err(BvError::InvalidDescription(_))
        ));
    }

    #[test]
    fn test_channel_resolution() {
        let ch = names(&["Fp1", "Fp2", "Cz", "Oz"]);
        let spec = EventSpec::Records(vec![
            EventRecord::new(0, 1).with_channels(ChannelRefs::All),
            EventRecord::new(0, 1).with_channels(ChannelRefs::Name("Cz".to_string())),
            EventRecord::new(0, 1).with_channels(ChannelRefs::Names(names(&["Oz", "Fp1"]))),
            EventRecord::new(0, 1).with_channels(ChannelRefs::Names(vec![])),
            EventRecord::new(0, 1).with_channels(ChannelRefs::Names(names(&["Oz", "Cz", "Fp2", "Fp1"]))),
        ]);
        let out = normalize_events(&spec, &ch, 10).unwrap();

        let channels: Vec<Vec<usize>> = out.events.iter().map(|e| e.channels.clone()).collect();
        assert_eq!(channels, vec![vec![0], vec![3], vec![1, 4], vec![0], vec![0]]);
        assert_eq!(out.marker_line_count(), 6);
        assert_eq!(out.diagnostics, vec![Diagnostic::PartialChannelEvents(1)]);
    }

    #[test]
    fn test_channel_errors() {
        let ch = names(&["Fp1", "Fp2", "Cz"]);
        let unknown = EventSpec::Records(vec![
            EventRecord::new(0, 1).with_channels(ChannelRefs::Name("Pz".to_string())),
        ]);
        assert!(matches!(
            normalize_events(&unknown, &ch, 10),
            Err(BvError::UnknownEventChannel(_))
        ));

        let duplicate = EventSpec::Records(vec![
            EventRecord::new(0, 1).with_channels(ChannelRefs::Names(names(&["Fp1", "Fp1"]))),
        ]);
        assert!(matches!(
            normalize_events(&duplicate, &ch, 10),
            Err(BvError::DuplicateEventChannel(_))
        ));
    }

    #[test]
    fn test_channel_named_all() {
        let ch = names(&["all", "Fp2"]);

        let ambiguous = EventSpec::Records(vec![EventRecord::new(0, 1).with_channels(ChannelRefs::All)]);
        assert!(matches!(
            normalize_events(&ambiguous, &ch, 10),
            Err(BvError::AmbiguousAllChannel)
        ));

        // 默认值和显式的通道名都不受影响
        let fine = EventSpec::Records(vec![
            EventRecord::new(0, 1),
            EventRecord::new(0, 1).with_channels(ChannelRefs::Name("all".to_string())),
        ]);
        let out = normalize_events(&fine, &ch, 10).unwrap();
        assert_eq!(out.events[0].channels, vec![0]);
        assert_eq!(out.events[1].channels, vec![1]);
    }
}
