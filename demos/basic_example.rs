use brainvision::{BvWriter, DataFormat, Result, SignalMatrix, UnitSpec};

fn main() -> Result<()> {
    env_logger::init();

    println!("BrainVision Writer Example");
    println!("Library Version: {}", brainvision::version());

    // 8 通道，10 秒，250 Hz
    let sfreq = 250.0;
    let n_samples = 2500;
    let ch_names: Vec<String> = ["Fp1", "Fp2", "F3", "F4", "C3", "C4", "O1", "O2"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows: Vec<Vec<f64>> = (0..ch_names.len())
        .map(|ch| {
            let freq = 6.0 + ch as f64;
            (0..n_samples)
                .map(|i| {
                    let t = i as f64 / sfreq;
                    40e-6 * (2.0 * std::f64::consts::PI * freq * t).sin()
                })
                .collect()
        })
        .collect();
    let data = SignalMatrix::from_rows(&rows)?;

    let mut writer = BvWriter::new("brainvision_demo", "basic");
    writer.set_overwrite(true);
    writer.set_units(UnitSpec::Uniform("µV".to_string()));
    writer.set_format(DataFormat::BinaryInt16);

    let report = writer.write(&data, sfreq, &ch_names)?;
    println!("Header:  {}", report.vhdr_path.display());
    println!("Markers: {}", report.vmrk_path.display());
    println!("Data:    {}", report.eeg_path.display());

    for diagnostic in &report.diagnostics {
        println!("Note: {}", diagnostic);
    }

    Ok(())
}
