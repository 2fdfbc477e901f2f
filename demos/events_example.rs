use brainvision::{BvWriter, ChannelRefs, EventRecord, EventSpec, MeasDate, RefChannels, Result, SignalMatrix};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let sfreq = 500.0;
    let n_samples = 5000;
    let ch_names: Vec<String> = ["Cz", "Pz", "Oz", "REF"].iter().map(|s| s.to_string()).collect();

    // 最后一个通道作为参考，必须为零
    let mut data = SignalMatrix::zeros(ch_names.len(), n_samples);
    for ch in 0..3 {
        for (i, v) in data.channel_mut(ch).iter_mut().enumerate() {
            *v = 20e-6 * (i as f64 / 50.0).sin();
        }
    }

    let events = EventSpec::Records(vec![
        EventRecord::new(500, 1),
        EventRecord::new(1200, 2).with_kind("Response"),
        EventRecord::new(2000, 11).with_duration(250),
        EventRecord::new(3000, "eyes closed, resting").with_kind("Comment"),
        EventRecord::new(4000, 3).with_channels(ChannelRefs::Names(vec!["Pz".to_string(), "Oz".to_string()])),
    ]);

    let mut writer = BvWriter::new("brainvision_demo", "events");
    writer.set_overwrite(true);
    writer.set_events(events);
    writer.set_reference_channels(RefChannels::Common("REF".to_string()));
    writer.set_meas_date(MeasDate::DateTime(chrono::Local::now().naive_local()))?;

    let report = writer.write(&data, sfreq, &ch_names)?;
    log::info!("markers written to {}", report.vmrk_path.display());

    let markers = std::fs::read_to_string(&report.vmrk_path)?;
    for line in markers.lines().filter(|l| l.starts_with("Mk")) {
        println!("{}", line);
    }

    Ok(())
}
