use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::error::{BvError, Result};

/// Physical-unit samples, one row per channel.
///
/// Values are stored channel-major: row `c` holds every sample of channel `c`.
/// Voltage channels are expected in volts and get rescaled to the configured
/// unit when written.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMatrix {
    n_channels: usize,
    n_samples: usize,
    data: Vec<f64>,
}

impl SignalMatrix {
    /// Builds a matrix from per-channel rows. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_channels = rows.len();
        let n_samples = rows.first().map_or(0, |r| r.len());

        let mut data = Vec::with_capacity(n_channels * n_samples);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != n_samples {
                return Err(BvError::InvalidShape(format!(
                    "data must be 2D with shape (n_channels, n_times), but channel {} has {} samples instead of {}",
                    idx, row.len(), n_samples
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(SignalMatrix { n_channels, n_samples, data })
    }

    /// 创建全零矩阵
    pub fn zeros(n_channels: usize, n_samples: usize) -> Self {
        SignalMatrix {
            n_channels,
            n_samples,
            data: vec![0.0; n_channels * n_samples],
        }
    }

    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// 获取单个通道的样本
    pub fn channel(&self, idx: usize) -> &[f64] {
        &self.data[idx * self.n_samples..(idx + 1) * self.n_samples]
    }

    pub fn channel_mut(&mut self, idx: usize) -> &mut [f64] {
        &mut self.data[idx * self.n_samples..(idx + 1) * self.n_samples]
    }

    pub fn get(&self, channel: usize, sample: usize) -> f64 {
        self.data[channel * self.n_samples + sample]
    }
}

/// On-disk numeric type of the `.eeg` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    #[default]
    BinaryFloat32,
    BinaryInt16,
}

impl DataFormat {
    /// Selector name as accepted by `FromStr`
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::BinaryFloat32 => "binary_float32",
            DataFormat::BinaryInt16 => "binary_int16",
        }
    }

    /// `BinaryFormat=` value in the header
    pub fn binary_tag(&self) -> &'static str {
        match self {
            DataFormat::BinaryFloat32 => "IEEE_FLOAT_32",
            DataFormat::BinaryInt16 => "INT_16",
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, DataFormat::BinaryFloat32 | DataFormat::BinaryInt16)
    }

    /// 每个样本占用的字节数
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            DataFormat::BinaryFloat32 => 4,
            DataFormat::BinaryInt16 => 2,
        }
    }
}

impl FromStr for DataFormat {
    type Err = BvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "binary_float32" => Ok(DataFormat::BinaryFloat32),
            "binary_int16" => Ok(DataFormat::BinaryInt16),
            other => Err(BvError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sample layout in the `.eeg` file. Only multiplexed is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Multiplexed,
}

impl FromStr for Orientation {
    type Err = BvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "multiplexed" => Ok(Orientation::Multiplexed),
            other => Err(BvError::UnsupportedOrientation(other.to_string())),
        }
    }
}

/// Quantization step, either shared by all channels or given per channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Uniform(f64),
    PerChannel(Vec<f64>),
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Uniform(0.1)
    }
}

impl Resolution {
    /// 展开为每个通道一个分辨率，并检查取值
    pub fn resolve(&self, n_channels: usize) -> Result<Vec<f64>> {
        let values = match self {
            Resolution::Uniform(r) => vec![*r; n_channels],
            Resolution::PerChannel(v) => {
                if v.len() != n_channels {
                    return Err(BvError::InvalidResolution(format!(
                        "resolution should be one or n_channels ({}) floats, got {}",
                        n_channels,
                        v.len()
                    )));
                }
                v.clone()
            }
        };
        check_resolution_values(self.values())?;
        Ok(values)
    }

    fn values(&self) -> &[f64] {
        match self {
            Resolution::Uniform(r) => std::slice::from_ref(r),
            Resolution::PerChannel(v) => v,
        }
    }
}

pub(crate) fn check_resolution_values(values: &[f64]) -> Result<()> {
    for &r in values {
        if !r.is_finite() {
            return Err(BvError::InvalidResolution(format!("resolution should be numeric, got {}", r)));
        }
        if r <= 0.0 {
            return Err(BvError::InvalidResolution("resolution should be > 0".to_string()));
        }
    }
    Ok(())
}

/// Unit of every channel. Voltage units are scaled from volts, anything else is written as is.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitSpec {
    Uniform(String),
    PerChannel(Vec<String>),
}

impl Default for UnitSpec {
    fn default() -> Self {
        UnitSpec::Uniform(crate::DEFAULT_UNIT.to_string())
    }
}

impl UnitSpec {
    pub fn resolve(&self, n_channels: usize) -> Result<Vec<String>> {
        match self {
            UnitSpec::Uniform(u) => Ok(vec![u.clone(); n_channels]),
            UnitSpec::PerChannel(v) => {
                if v.len() != n_channels {
                    return Err(BvError::ChannelCountMismatch {
                        what: "units",
                        expected: n_channels,
                        found: v.len(),
                    });
                }
                Ok(v.clone())
            }
        }
    }
}

/// Reference channel names written into the `Ch<n>=` lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RefChannels {
    /// Common but unspecified reference, written as an empty field
    #[default]
    Unspecified,
    Common(String),
    PerChannel(Vec<String>),
}

impl RefChannels {
    pub fn resolve(&self, n_channels: usize) -> Result<Vec<String>> {
        match self {
            RefChannels::Unspecified => Ok(vec![String::new(); n_channels]),
            RefChannels::Common(name) => Ok(vec![name.clone(); n_channels]),
            RefChannels::PerChannel(names) => {
                if names.iter().any(|n| n.is_empty()) {
                    return Err(BvError::InvalidReference(format!(
                        "{:?} contains an empty string; empty strings are reserved and not permitted as reference channel names",
                        names
                    )));
                }
                if names.len() != n_channels {
                    return Err(BvError::ChannelCountMismatch {
                        what: "reference channel names",
                        expected: n_channels,
                        found: names.len(),
                    });
                }
                Ok(names.clone())
            }
        }
    }
}

/// Recording start written as the `New Segment` marker.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasDate {
    DateTime(NaiveDateTime),
    /// `YYYYMMDDhhmmssuuuuuu`, `u` being microseconds
    Digits(String),
}

impl MeasDate {
    pub fn to_digits(&self) -> Result<String> {
        match self {
            // 年份超出 1000..=9999 时 chrono 输出的位数不是 20
            MeasDate::DateTime(dt) => {
                let digits = dt.format("%Y%m%d%H%M%S%6f").to_string();
                if crate::utils::is_meas_date_digits(&digits) {
                    Ok(digits)
                } else {
                    Err(BvError::InvalidMeasDate(dt.to_string()))
                }
            }
            MeasDate::Digits(s) => {
                if crate::utils::is_meas_date_digits(s) {
                    Ok(s.clone())
                } else {
                    Err(BvError::InvalidMeasDate(s.clone()))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Stimulus,
    Response,
    Comment,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Stimulus => "Stimulus",
            EventKind::Response => "Response",
            EventKind::Comment => "Comment",
        }
    }

    /// 标签前缀：S 或 R
    pub fn initial(&self) -> char {
        match self {
            EventKind::Stimulus => 'S',
            EventKind::Response => 'R',
            EventKind::Comment => 'C',
        }
    }
}

impl FromStr for EventKind {
    type Err = BvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Stimulus" => Ok(EventKind::Stimulus),
            "Response" => Ok(EventKind::Response),
            "Comment" => Ok(EventKind::Comment),
            other => Err(BvError::UnknownEventKind(other.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Description {
    Int(i64),
    Text(String),
}

impl From<i64> for Description {
    fn from(v: i64) -> Self {
        Description::Int(v)
    }
}

impl From<i32> for Description {
    fn from(v: i32) -> Self {
        Description::Int(v as i64)
    }
}

impl From<&str> for Description {
    fn from(v: &str) -> Self {
        Description::Text(v.to_string())
    }
}

impl From<String> for Description {
    fn from(v: String) -> Self {
        Description::Text(v)
    }
}

/// Channels an event applies to
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelRefs {
    All,
    Name(String),
    Names(Vec<String>),
}

/// One caller-supplied event. Missing optional fields take their defaults
/// (duration 1, kind `Stimulus`, all channels).
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub onset: i64,
    pub description: Description,
    pub duration: Option<i64>,
    pub kind: Option<String>,
    pub channels: Option<ChannelRefs>,
}

impl EventRecord {
    pub fn new(onset: i64, description: impl Into<Description>) -> Self {
        EventRecord {
            onset,
            description: description.into(),
            duration: None,
            kind: None,
            channels: None,
        }
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    pub fn with_channels(mut self, channels: ChannelRefs) -> Self {
        self.channels = Some(channels);
        self
    }
}

/// Events to write, either as an integer table or as records.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventSpec {
    #[default]
    None,
    /// Rows of `[onset, description]` or `[onset, description, duration]`
    Array(Vec<Vec<i64>>),
    Records(Vec<EventRecord>),
}

/// Normalized event ready for the marker file.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEvent {
    pub onset: usize,           // 0-based 采样点
    pub duration: usize,        // 采样点数
    pub kind: EventKind,
    pub label: String,
    pub channels: Vec<usize>,   // 1-based 通道索引，[0] 表示所有通道
}

impl CanonicalEvent {
    /// 1-based position written to the marker file
    pub fn position(&self) -> usize {
        self.onset + 1
    }
}

/// Everything the emitters need to agree on, built once per write.
#[derive(Debug, Clone)]
pub struct EncodingContext {
    pub format: DataFormat,
    pub orientation: Orientation,
    pub resolutions: Vec<f64>,
    pub units: Vec<String>,
}

/// Advisory produced while encoding. Writes still succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Greek mu or `u` spellings were folded to the micro sign
    MicroSignFolded(Vec<String>),
    /// Voltage units other than µV, scaled accordingly
    NonDefaultVoltageUnits(Vec<String>),
    /// Units that are not voltages, written as is
    NonVoltageUnits(Vec<String>),
    /// Events targeting more than one but fewer than all channels
    PartialChannelEvents(usize),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MicroSignFolded(units) => write!(
                f,
                "Encountered small Greek letter mu 'μ' or 'u' in unit: {}. Converting to micro sign 'µ'.",
                units.join(", ")
            ),
            Diagnostic::NonDefaultVoltageUnits(units) => write!(
                f,
                "Encountered unsupported voltage units: {}. The data is scaled appropriately, but for maximum compatibility use µV for all channels.",
                units.join(", ")
            ),
            Diagnostic::NonVoltageUnits(units) => write!(
                f,
                "Encountered unsupported non-voltage units: {}. The BrainVision format specification supports only µV; these channels are written as is.",
                units.join(", ")
            ),
            Diagnostic::PartialChannelEvents(count) => write!(
                f,
                "{} event(s) impact more than one but less than all channels and are written once per channel. This may not be supported by all BrainVision readers.",
                count
            ),
        }
    }
}

/// Result of a successful write
#[derive(Debug, Clone)]
pub struct WriteReport {
    pub eeg_path: PathBuf,
    pub vmrk_path: PathBuf,
    pub vhdr_path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}
