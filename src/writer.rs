use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{BvError, Result};
use crate::events::normalize_events;
use crate::header::{write_vhdr, HeaderInfo};
use crate::markers::write_vmrk;
use crate::quantize::{quantize, QuantizedSamples};
use crate::samples::write_eeg;
use crate::types::{
    check_resolution_values, CanonicalEvent, DataFormat, Diagnostic, EncodingContext, EventSpec,
    MeasDate, Orientation, RefChannels, Resolution, SignalMatrix, UnitSpec, WriteReport,
};
use crate::units::{fold_micro_sign, UnitScaler};

/// Absolute tolerance for reference channels that must be flat
const REFERENCE_ZERO_TOLERANCE: f64 = 1e-8;

/// Progress of a single [`BvWriter::write`] call.
///
/// `Validating → Scaling → Emitting → Done`; any error moves to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Idle,
    Validating,
    Scaling,
    Emitting,
    Done,
    Failed,
}

/// Paths of the three sibling files
#[derive(Debug, Clone)]
struct TargetFiles {
    eeg: PathBuf,
    vmrk: PathBuf,
    vhdr: PathBuf,
}

impl TargetFiles {
    fn new(folder: &Path, fname_base: &str) -> Self {
        TargetFiles {
            eeg: folder.join(format!("{}.eeg", fname_base)),
            vmrk: folder.join(format!("{}.vmrk", fname_base)),
            vhdr: folder.join(format!("{}.vhdr", fname_base)),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.eeg, &self.vmrk, &self.vhdr]
    }
}

/// 文件名（不含路径），写入 vhdr/vmrk 的引用字段
fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Everything that survived validation, resolved to per-channel form
struct ValidatedInput {
    ref_names: Vec<String>,
    resolutions: Vec<f64>,
    units: Vec<String>,
    events: Vec<CanonicalEvent>,
    meas_date: Option<String>,
}

/// Tracks what one write created on disk so it can be undone.
///
/// The snapshot of whether the output folder existed is taken before anything
/// is created. Rolling back removes the folder recursively if this write
/// created it, otherwise only the files this write opened.
#[derive(Debug)]
pub(crate) struct OutputGuard {
    folder: PathBuf,
    folder_created: bool,
    created: Vec<PathBuf>,
}

impl OutputGuard {
    pub(crate) fn prepare(folder: &Path) -> Result<Self> {
        let folder_created = !folder.exists();
        fs::create_dir_all(folder)?;
        Ok(OutputGuard {
            folder: folder.to_path_buf(),
            folder_created,
            created: Vec::new(),
        })
    }

    pub(crate) fn create_file(&mut self, path: &Path) -> Result<BufWriter<File>> {
        let file = File::create(path)
            .map_err(|e| BvError::FileNotWritable(format!("{}: {}", path.display(), e)))?;
        self.created.push(path.to_path_buf());
        Ok(BufWriter::new(file))
    }

    pub(crate) fn rollback(self) {
        if self.folder_created {
            log::debug!("removing output folder {}", self.folder.display());
            fs::remove_dir_all(&self.folder).ok();
        } else {
            for path in &self.created {
                log::debug!("removing partially written {}", path.display());
                fs::remove_file(path).ok();
            }
        }
    }
}

/// BrainVision writer producing the `.eeg`, `.vmrk` and `.vhdr` triplet
///
/// The `BvWriter` holds the output location and the encoding options. Every
/// call to [`write`](BvWriter::write) validates its inputs completely before
/// touching the disk, and either produces all three files or removes what it
/// created.
///
/// # Write Workflow
///
/// 1. Create the writer with `BvWriter::new()`
/// 2. Adjust options (`set_resolution()`, `set_units()`, `set_format()`, ...)
/// 3. Attach events and a measurement date if needed
/// 4. Call `write()` with the data, the sampling frequency and channel names
///
/// # Default Values
///
/// - Overwrite: disabled
/// - Resolution: 0.1 for every channel
/// - Unit: µV for every channel (input is in volts)
/// - Format: `binary_float32`, multiplexed orientation
/// - No events, no measurement date, unspecified reference channels
///
/// # Examples
///
/// ```rust
/// use brainvision::{BvWriter, EventRecord, EventSpec};
/// # use brainvision::doctest_utils::*;
///
/// let folder = scratch_dir("writer_overview");
/// let data = demo_matrix(3, 500);
/// let ch_names = demo_channel_names(3);
///
/// let mut writer = BvWriter::new(&folder, "overview");
/// writer.set_events(EventSpec::Records(vec![
///     EventRecord::new(100, 1),
///     EventRecord::new(250, 2).with_kind("Response"),
/// ]));
///
/// let report = writer.write(&data, 500.0, &ch_names)?;
/// assert!(report.vhdr_path.exists());
/// assert!(report.diagnostics.is_empty());
///
/// # std::fs::remove_dir_all(&folder).ok();
/// # Ok::<(), brainvision::BvError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BvWriter {
    folder_out: PathBuf,
    fname_base: String,
    overwrite: bool,
    resolution: Resolution,
    units: UnitSpec,
    format: DataFormat,
    orientation: Orientation,
    events: EventSpec,
    ref_channels: RefChannels,
    meas_date: Option<MeasDate>,
    state: WriteState,
}

impl BvWriter {
    /// Creates a writer for `<folder_out>/<fname_base>.{eeg,vmrk,vhdr}`
    ///
    /// Nothing is created on disk until [`write`](BvWriter::write) is called.
    /// The folder is created then if it does not exist yet.
    pub fn new<P: AsRef<Path>>(folder_out: P, fname_base: &str) -> Self {
        BvWriter {
            folder_out: folder_out.as_ref().to_path_buf(),
            fname_base: fname_base.to_string(),
            overwrite: false,
            resolution: Resolution::default(),
            units: UnitSpec::default(),
            format: DataFormat::default(),
            orientation: Orientation::default(),
            events: EventSpec::None,
            ref_channels: RefChannels::Unspecified,
            meas_date: None,
            state: WriteState::Idle,
        }
    }

    /// Whether existing target files may be replaced
    pub fn set_overwrite(&mut self, overwrite: bool) {
        self.overwrite = overwrite;
    }

    /// Sets the quantization step in the channel unit
    ///
    /// # Errors
    ///
    /// * `BvError::InvalidResolution` - a value is not finite or not > 0
    ///
    /// The per-channel length is checked against the data at write time.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use brainvision::{BvWriter, Resolution};
    ///
    /// let mut writer = BvWriter::new("out", "rec");
    /// writer.set_resolution(Resolution::Uniform(0.5))?;
    /// writer.set_resolution(Resolution::PerChannel(vec![0.1, 0.5, 1.0]))?;
    ///
    /// assert!(writer.set_resolution(Resolution::Uniform(0.0)).is_err());
    /// assert!(writer.set_resolution(Resolution::Uniform(f64::NAN)).is_err());
    /// # Ok::<(), brainvision::BvError>(())
    /// ```
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        match &resolution {
            Resolution::Uniform(r) => check_resolution_values(std::slice::from_ref(r))?,
            Resolution::PerChannel(v) => check_resolution_values(v)?,
        }
        self.resolution = resolution;
        Ok(())
    }

    /// Sets the unit of each channel. Voltage units scale the input (in volts),
    /// other units are written as is.
    pub fn set_units(&mut self, units: UnitSpec) {
        self.units = units;
    }

    pub fn set_format(&mut self, format: DataFormat) {
        self.format = format;
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub fn set_events(&mut self, events: EventSpec) {
        self.events = events;
    }

    pub fn set_reference_channels(&mut self, refs: RefChannels) {
        self.ref_channels = refs;
    }

    /// Sets the recording start, written as a `New Segment` marker
    ///
    /// # Errors
    ///
    /// * `BvError::InvalidMeasDate` - a digit string that is not `YYYYMMDDhhmmssuuuuuu`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use brainvision::{BvWriter, MeasDate};
    /// use chrono::NaiveDate;
    ///
    /// let mut writer = BvWriter::new("out", "rec");
    /// writer.set_meas_date(MeasDate::Digits("20240131093000123456".to_string()))?;
    ///
    /// let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    ///     .and_hms_micro_opt(9, 30, 0, 123456).unwrap();
    /// writer.set_meas_date(MeasDate::DateTime(start))?;
    ///
    /// assert!(writer.set_meas_date(MeasDate::Digits("2024-01-31".to_string())).is_err());
    /// # Ok::<(), brainvision::BvError>(())
    /// ```
    pub fn set_meas_date(&mut self, meas_date: MeasDate) -> Result<()> {
        meas_date.to_digits()?;
        self.meas_date = Some(meas_date);
        Ok(())
    }

    pub fn clear_meas_date(&mut self) {
        self.meas_date = None;
    }

    /// State reached by the last `write()` call
    pub fn state(&self) -> WriteState {
        self.state
    }

    fn transition(&mut self, next: WriteState) {
        log::debug!("write {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Writes the three BrainVision files
    ///
    /// # Arguments
    ///
    /// * `data` - physical samples, one row per channel, voltages in volts
    /// * `sfreq` - sampling frequency in Hz
    /// * `ch_names` - unique channel names, one per row of `data`
    ///
    /// # Errors
    ///
    /// Input errors are reported before anything is created on disk:
    ///
    /// * `BvError::ChannelCountMismatch`, `BvError::DuplicateChannelName`
    /// * `BvError::InvalidSamplingFrequency`, `BvError::InvalidResolution`
    /// * `BvError::InvalidReference`, `BvError::ReferenceNotZero`
    /// * event errors from [`normalize_events`]
    /// * `BvError::FileExists` - a target exists and overwrite is disabled
    /// * `BvError::DataOutOfRange` - the data does not fit the chosen format
    ///
    /// An I/O failure while writing removes what this call created and is
    /// returned unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use brainvision::{BvWriter, BvError, DataFormat, Resolution, SignalMatrix};
    /// # use brainvision::doctest_utils::*;
    ///
    /// let folder = scratch_dir("write_int16");
    /// // 5 mV does not fit in int16 at 0.1 µV steps
    /// let data = SignalMatrix::from_rows(&[vec![5e-3, -5e-3]])?;
    /// let ch_names = vec!["Fp1".to_string()];
    ///
    /// let mut writer = BvWriter::new(&folder, "int16");
    /// writer.set_format(DataFormat::BinaryInt16);
    /// let err = writer.write(&data, 100.0, &ch_names).unwrap_err();
    /// assert!(matches!(err, BvError::DataOutOfRange { .. }));
    /// assert!(!folder.exists());
    ///
    /// // A coarser step makes it fit
    /// writer.set_resolution(Resolution::Uniform(1.0))?;
    /// writer.write(&data, 100.0, &ch_names)?;
    ///
    /// # std::fs::remove_dir_all(&folder).ok();
    /// # Ok::<(), BvError>(())
    /// ```
    pub fn write(&mut self, data: &SignalMatrix, sfreq: f64, ch_names: &[String]) -> Result<WriteReport> {
        self.state = WriteState::Idle;
        match self.run(data, sfreq, ch_names) {
            Ok(report) => {
                self.transition(WriteState::Done);
                log::info!(
                    "wrote {} channels x {} samples to {}",
                    data.n_channels(),
                    data.n_samples(),
                    report.vhdr_path.display()
                );
                Ok(report)
            }
            Err(e) => {
                self.transition(WriteState::Failed);
                log::debug!("write failed: {}", e);
                Err(e)
            }
        }
    }

    fn run(&mut self, data: &SignalMatrix, sfreq: f64, ch_names: &[String]) -> Result<WriteReport> {
        let mut diagnostics = Vec::new();
        let targets = TargetFiles::new(&self.folder_out, &self.fname_base);

        self.transition(WriteState::Validating);
        let input = self.validate(data, sfreq, ch_names, &targets, &mut diagnostics)?;

        self.transition(WriteState::Scaling);
        let mut scaler = UnitScaler::new();
        let scaled = scaler.scale(data, &input.units);
        for diag in scaler.diagnostics() {
            record(&mut diagnostics, diag);
        }
        let samples = quantize(&scaled, &input.resolutions, &input.units, self.format)?;
        drop(scaled);

        let ctx = EncodingContext {
            format: self.format,
            orientation: self.orientation,
            resolutions: input.resolutions,
            units: input.units,
        };

        self.transition(WriteState::Emitting);
        let mut guard = OutputGuard::prepare(&self.folder_out)?;
        let emitted = emit_files(
            &mut guard,
            &targets,
            &samples,
            &input.events,
            input.meas_date.as_deref(),
            sfreq,
            ch_names,
            &input.ref_names,
            &ctx,
        );
        if let Err(e) = emitted {
            guard.rollback();
            return Err(e);
        }

        Ok(WriteReport {
            eeg_path: targets.eeg,
            vmrk_path: targets.vmrk,
            vhdr_path: targets.vhdr,
            diagnostics,
        })
    }

    fn validate(
        &self,
        data: &SignalMatrix,
        sfreq: f64,
        ch_names: &[String],
        targets: &TargetFiles,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<ValidatedInput> {
        let n_channels = ch_names.len();

        // 验证通道数和通道名
        if data.n_channels() != n_channels {
            return Err(BvError::ChannelCountMismatch {
                what: "channel names",
                expected: data.n_channels(),
                found: n_channels,
            });
        }
        let mut seen = HashSet::new();
        for name in ch_names {
            if !seen.insert(name.as_str()) {
                return Err(BvError::DuplicateChannelName(name.clone()));
            }
        }

        let events = normalize_events(&self.events, ch_names, data.n_samples())?;
        for diag in events.diagnostics {
            record(diagnostics, diag);
        }

        // 参考通道如果也在数据中，必须全为零（NaN 视为非零）
        let ref_names = self.ref_channels.resolve(n_channels)?;
        let ref_set: HashSet<&str> = ref_names.iter().map(String::as_str).collect();
        for (idx, name) in ch_names.iter().enumerate() {
            if ref_set.contains(name.as_str())
                && data.channel(idx).iter().any(|v| v.is_nan() || v.abs() > REFERENCE_ZERO_TOLERANCE)
            {
                return Err(BvError::ReferenceNotZero(name.clone()));
            }
        }

        if !sfreq.is_finite() || sfreq <= 0.0 {
            return Err(BvError::InvalidSamplingFrequency(sfreq));
        }

        let resolutions = self.resolution.resolve(n_channels)?;

        let (units, folded) = fold_micro_sign(&self.units.resolve(n_channels)?);
        if let Some(diag) = folded {
            record(diagnostics, diag);
        }

        let meas_date = self.meas_date.as_ref().map(MeasDate::to_digits).transpose()?;

        // 在创建任何文件之前检查目标文件
        if !self.overwrite {
            if let Some(existing) = targets.all().into_iter().find(|p| p.exists()) {
                return Err(BvError::FileExists(existing.to_path_buf()));
            }
        }

        Ok(ValidatedInput {
            ref_names,
            resolutions,
            units,
            events: events.events,
            meas_date,
        })
    }
}

fn record(diagnostics: &mut Vec<Diagnostic>, diag: Diagnostic) {
    log::warn!("{}", diag);
    diagnostics.push(diag);
}

/// Writes `.eeg`, `.vmrk` then `.vhdr`, registering each file with the guard
/// before its first byte.
#[allow(clippy::too_many_arguments)]
fn emit_files(
    guard: &mut OutputGuard,
    targets: &TargetFiles,
    samples: &QuantizedSamples,
    events: &[CanonicalEvent],
    meas_date: Option<&str>,
    sfreq: f64,
    ch_names: &[String],
    ref_names: &[String],
    ctx: &EncodingContext,
) -> Result<()> {
    let eeg_file = base_name(&targets.eeg);
    let vmrk_file = base_name(&targets.vmrk);

    let mut out = guard.create_file(&targets.eeg)?;
    let bytes = write_eeg(&mut out, samples)?;
    out.flush()?;
    log::debug!("{}: {} bytes", targets.eeg.display(), bytes);

    let mut out = guard.create_file(&targets.vmrk)?;
    let markers = write_vmrk(&mut out, &eeg_file, events, meas_date)?;
    out.flush()?;
    log::debug!("{}: {} markers", targets.vmrk.display(), markers);

    let mut out = guard.create_file(&targets.vhdr)?;
    let info = HeaderInfo {
        eeg_file: &eeg_file,
        vmrk_file: &vmrk_file,
        sfreq,
        ch_names,
        ref_names,
    };
    write_vhdr(&mut out, &info, ctx)?;
    out.flush()?;
    log::debug!("{}: {} channels", targets.vhdr.display(), ch_names.len());

    Ok(())
}
