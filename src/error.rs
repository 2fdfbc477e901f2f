use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BvError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot create file: {0}")]
    FileNotWritable(String),

    #[error("File already exists: {}. Consider enabling overwrite.", .0.display())]
    FileExists(PathBuf),

    #[error("Invalid data shape: {0}")]
    InvalidShape(String),

    #[error("Number of {what} ({found}) does not match number of channels ({expected})")]
    ChannelCountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Channel names must be unique, found duplicate name: {0}")]
    DuplicateChannelName(String),

    #[error("Invalid sampling frequency: {0} (must be finite and > 0)")]
    InvalidSamplingFrequency(f64),

    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("Data format {0} not supported. Currently supported formats are: binary_float32, binary_int16")]
    UnsupportedFormat(String),

    #[error("Orientation {0} not supported. Currently supported orientations are: multiplexed")]
    UnsupportedOrientation(String),

    #[error("Invalid measurement date {0:?}: expected a str in the format \"YYYYMMDDhhmmssuuuuuu\"")]
    InvalidMeasDate(String),

    #[error("Invalid reference channel names: {0}")]
    InvalidReference(String),

    #[error("The provided data for the reference channel {0} does not appear to be zero across all time points")]
    ReferenceNotZero(String),

    #[error("Invalid events: {0}")]
    InvalidEvents(String),

    #[error("events: {0}")]
    EventOutOfRange(String),

    #[error("events: unknown type {0:?}, must be one of Stimulus, Response, Comment")]
    UnknownEventKind(String),

    #[error("events: {0}")]
    InvalidDescription(String),

    #[error("Found channel named 'all' while an event targets 'all' channels; rename the channel or list the channels explicitly")]
    AmbiguousAllChannel,

    #[error("events: found channel name that is not present in the data: {0}")]
    UnknownEventChannel(String),

    #[error("events: found duplicate channel name: {0}")]
    DuplicateEventChannel(String),

    #[error("`data` can not be represented in '{format}' given the desired {resolution} and units ('{units}').{suggestion}")]
    DataOutOfRange {
        format: String,
        resolution: String,
        units: String,
        suggestion: String,
    },
}

pub type Result<T> = std::result::Result<T, BvError>;
