//! # BrainVision Writer for Rust
//!
//! A pure Rust library for writing multichannel recordings in the BrainVision
//! Core Data Format. One write produces three sibling files:
//!
//! - `<base>.eeg` - raw little-endian samples, multiplexed (ch1@t1, ch2@t1, ...)
//! - `<base>.vhdr` - text header describing channels, units and resolutions
//! - `<base>.vmrk` - text marker file with events
//!
//! ## Quick Start
//!
//! ```rust
//! use brainvision::{BvWriter, SignalMatrix, Result};
//! # use brainvision::doctest_utils::scratch_dir;
//!
//! fn main() -> Result<()> {
//!     # let folder = scratch_dir("quickstart");
//!     // 3 channels, 5 samples, values in volts
//!     let data = SignalMatrix::from_rows(&[
//!         vec![1e-6, 2e-6, 3e-6, 4e-6, 5e-6],
//!         vec![0.0, -1e-6, -2e-6, -3e-6, -4e-6],
//!         vec![10e-6; 5],
//!     ])?;
//!     let ch_names = vec!["Fp1".to_string(), "Fp2".to_string(), "Cz".to_string()];
//!
//!     let mut writer = BvWriter::new(&folder, "quickstart");
//!     let report = writer.write(&data, 1000.0, &ch_names)?;
//!
//!     // float32 by default: 3 channels x 5 samples x 4 bytes
//!     assert_eq!(std::fs::metadata(&report.eeg_path)?.len(), 60);
//!     let header = std::fs::read_to_string(&report.vhdr_path)?;
//!     assert!(header.contains("NumberOfChannels=3"));
//!
//!     # std::fs::remove_dir_all(&folder).ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Units and Resolution
//!
//! Voltage input is expected in volts. Each channel is scaled to its unit
//! (`V`, `mV`, `µV`, `nV`; `uV` and Greek `μV` are folded to `µV`) and then
//! divided by its resolution before being cast to the on-disk type. Channels
//! with other units (for example `°C`) are written as is.
//!
//! ```rust
//! use brainvision::{BvWriter, Diagnostic, UnitSpec};
//! # use brainvision::doctest_utils::*;
//!
//! # let folder = scratch_dir("units");
//! let data = demo_matrix(3, 100);
//! let ch_names = vec!["A1".to_string(), "A2".to_string(), "TEMP".to_string()];
//!
//! let mut writer = BvWriter::new(&folder, "units");
//! writer.set_units(UnitSpec::PerChannel(vec![
//!     "µV".to_string(),
//!     "mV".to_string(),
//!     "°C".to_string(),
//! ]));
//! let report = writer.write(&data, 100.0, &ch_names)?;
//!
//! // Advisories are returned instead of printed
//! assert!(report.diagnostics.contains(&Diagnostic::NonVoltageUnits(vec!["°C".to_string()])));
//! # std::fs::remove_dir_all(&folder).ok();
//! # Ok::<(), brainvision::BvError>(())
//! ```
//!
//! ## Events
//!
//! Events are given as an integer table (`[onset, description(, duration)]`)
//! or as [`EventRecord`]s. Onsets are 0-based sample indices and are written
//! 1-based. Stimulus and Response descriptions become fixed-width labels:
//!
//! ```rust
//! use brainvision::{BvWriter, EventSpec};
//! # use brainvision::doctest_utils::*;
//!
//! # let folder = scratch_dir("events");
//! let data = demo_matrix(2, 400);
//! let mut writer = BvWriter::new(&folder, "events");
//! writer.set_events(EventSpec::Array(vec![vec![0, 1], vec![10, 23], vec![20, 345]]));
//! let report = writer.write(&data, 100.0, &demo_channel_names(2))?;
//!
//! let markers = std::fs::read_to_string(&report.vmrk_path)?;
//! assert!(markers.contains("Mk1=Stimulus,S  1,1,1,0"));
//! assert!(markers.contains("Mk2=Stimulus,S 23,11,1,0"));
//! assert!(markers.contains("Mk3=Stimulus,S345,21,1,0"));
//! # std::fs::remove_dir_all(&folder).ok();
//! # Ok::<(), brainvision::BvError>(())
//! ```

pub mod error;
pub mod types;
pub mod utils;
pub mod units;
pub mod quantize;
pub mod events;
pub mod header;
pub mod markers;
pub mod samples;
pub mod writer;

#[doc(hidden)]
pub mod doctest_utils; // For internal doctest support

// Re-export main types for convenience
pub use error::{BvError, Result};
pub use types::{
    CanonicalEvent, ChannelRefs, DataFormat, Description, Diagnostic, EncodingContext, EventKind,
    EventRecord, EventSpec, MeasDate, Orientation, RefChannels, Resolution, SignalMatrix, UnitSpec,
    WriteReport,
};
pub use events::normalize_events;
pub use writer::{BvWriter, WriteState};

/// Unit every voltage channel should ideally be written in
pub const DEFAULT_UNIT: &str = "µV";

/// Library version
///
/// Returns the current version of the brainvision library. It is also
/// written into the comment line of the `.vhdr` and `.vmrk` files.
///
/// # Examples
///
/// ```rust
/// let version = brainvision::version();
/// assert!(!version.is_empty());
/// assert!(version.contains('.'));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
