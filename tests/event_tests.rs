use brainvision::{
    BvError, BvWriter, ChannelRefs, Diagnostic, EventRecord, EventSpec, MeasDate, SignalMatrix,
};
use std::fs;

fn channel_names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// 写入并返回 vmrk 中的标记行
fn write_markers(spec: EventSpec, ch_names: &[String], n_samples: usize, dated: bool) -> (Vec<String>, Vec<Diagnostic>) {
    let dir = tempfile::tempdir().unwrap();
    let data = SignalMatrix::zeros(ch_names.len(), n_samples);

    let mut writer = BvWriter::new(dir.path(), "events");
    writer.set_events(spec);
    if dated {
        writer
            .set_meas_date(MeasDate::Digits("20000101000000000000".to_string()))
            .unwrap();
    }
    let report = writer.write(&data, 100.0, ch_names).unwrap();

    let vmrk = fs::read_to_string(&report.vmrk_path).unwrap();
    let lines = vmrk.lines().filter(|l| l.starts_with("Mk")).map(String::from).collect();
    (lines, report.diagnostics)
}

#[test]
fn test_stimulus_label_width_from_largest_description() {
    let ch = channel_names(&["Fp1", "Fp2"]);
    let spec = EventSpec::Array(vec![vec![0, 1], vec![1, 23], vec![2, 345]]);
    let (lines, _) = write_markers(spec, &ch, 10, false);

    assert_eq!(
        lines,
        vec![
            "Mk1=Stimulus,S  1,1,1,0",
            "Mk2=Stimulus,S 23,2,1,0",
            "Mk3=Stimulus,S345,3,1,0",
        ]
    );
}

#[test]
fn test_records_with_all_kinds() {
    let ch = channel_names(&["Fp1", "Fp2", "Cz"]);
    let spec = EventSpec::Records(vec![
        EventRecord::new(0, 4).with_duration(10),
        EventRecord::new(5, 2).with_kind("Response"),
        EventRecord::new(7, "lights off").with_kind("Comment").with_duration(0),
        EventRecord::new(9, 17).with_kind("Comment").with_channels(ChannelRefs::Name("Cz".to_string())),
    ]);
    let (lines, diagnostics) = write_markers(spec, &ch, 20, true);

    assert_eq!(
        lines,
        vec![
            "Mk1=New Segment,,1,1,0,20000101000000000000",
            "Mk2=Stimulus,S  4,1,10,0",
            "Mk3=Response,R  2,6,1,0",
            "Mk4=Comment,lights off,8,0,0",
            "Mk5=Comment,17,10,1,3",
        ]
    );
    assert!(diagnostics.is_empty());
}

#[test]
fn test_partial_channel_event_written_per_channel() {
    let ch = channel_names(&["C1", "C2", "C3", "C4", "C5", "C6", "C7", "C8", "C9", "C10"]);
    let spec = EventSpec::Records(vec![
        EventRecord::new(3, 8).with_channels(ChannelRefs::Names(channel_names(&["C7", "C2", "C4"]))),
        EventRecord::new(4, 9),
    ]);
    let (lines, diagnostics) = write_markers(spec, &ch, 10, false);

    assert_eq!(
        lines,
        vec![
            "Mk1=Stimulus,S  8,4,1,2",
            "Mk2=Stimulus,S  8,4,1,4",
            "Mk3=Stimulus,S  8,4,1,7",
            "Mk4=Stimulus,S  9,5,1,0",
        ]
    );
    assert_eq!(diagnostics, vec![Diagnostic::PartialChannelEvents(1)]);
}

#[test]
fn test_marker_line_count_matches_expansion() {
    let ch = channel_names(&["A", "B", "C", "D"]);
    let records = vec![
        EventRecord::new(0, 1),
        EventRecord::new(1, 1).with_channels(ChannelRefs::Names(channel_names(&["A", "B"]))),
        EventRecord::new(2, 1).with_channels(ChannelRefs::Names(channel_names(&["A", "B", "C"]))),
        EventRecord::new(3, 1).with_channels(ChannelRefs::Name("D".to_string())),
    ];

    let normalized = brainvision::normalize_events(&EventSpec::Records(records.clone()), &ch, 5).unwrap();
    let expected: usize = normalized.events.iter().map(|e| e.channels.len().max(1)).sum();
    assert_eq!(expected, 7);

    let (undated, _) = write_markers(EventSpec::Records(records.clone()), &ch, 5, false);
    assert_eq!(undated.len(), expected);

    let (dated, _) = write_markers(EventSpec::Records(records), &ch, 5, true);
    assert_eq!(dated.len(), expected + 1);
}

#[test]
fn test_last_sample_boundaries() {
    let ch = channel_names(&["Fp1"]);

    let (lines, _) = write_markers(
        EventSpec::Records(vec![EventRecord::new(9, 1).with_duration(1)]),
        &ch,
        10,
        false,
    );
    assert_eq!(lines, vec!["Mk1=Stimulus,S  1,10,1,0"]);

    let dir = tempfile::tempdir().unwrap();
    let data = SignalMatrix::zeros(1, 10);
    for record in [EventRecord::new(10, 1), EventRecord::new(9, 1).with_duration(2)] {
        let mut writer = BvWriter::new(dir.path(), "bounds");
        writer.set_events(EventSpec::Records(vec![record]));
        let err = writer.write(&data, 100.0, &ch).unwrap_err();
        assert!(matches!(err, BvError::EventOutOfRange(_)));
    }
    // 校验失败时不创建任何文件
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_event_validation_errors_surface_from_writer() {
    let ch = channel_names(&["all", "Fp2"]);
    let data = SignalMatrix::zeros(2, 10);
    let dir = tempfile::tempdir().unwrap();

    let write_err = |spec: EventSpec| {
        let mut writer = BvWriter::new(dir.path(), "invalid");
        writer.set_events(spec);
        writer.write(&data, 100.0, &ch).unwrap_err()
    };

    let err = write_err(EventSpec::Records(vec![EventRecord::new(0, 1).with_channels(ChannelRefs::All)]));
    assert!(matches!(err, BvError::AmbiguousAllChannel));

    let err = write_err(EventSpec::Records(vec![EventRecord::new(0, 1).with_kind("SyncStatus")]));
    assert!(matches!(err, BvError::UnknownEventKind(_)));

    let err = write_err(EventSpec::Records(vec![EventRecord::new(0, "x").with_kind("Response")]));
    assert!(matches!(err, BvError::InvalidDescription(_)));

    let err = write_err(EventSpec::Records(vec![
        EventRecord::new(0, 1).with_channels(ChannelRefs::Names(channel_names(&["Fp2", "Fp2"]))),
    ]));
    assert!(matches!(err, BvError::DuplicateEventChannel(_)));

    let err = write_err(EventSpec::Records(vec![
        EventRecord::new(0, 1).with_channels(ChannelRefs::Name("Oz".to_string())),
    ]));
    assert!(matches!(err, BvError::UnknownEventChannel(_)));

    let err = write_err(EventSpec::Array(vec![vec![0]]));
    assert!(matches!(err, BvError::InvalidEvents(_)));

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_comment_with_comma_is_escaped() {
    let ch = channel_names(&["Fp1"]);
    let spec = EventSpec::Records(vec![EventRecord::new(1, "eyes open, blink").with_kind("Comment")]);
    let (lines, _) = write_markers(spec, &ch, 5, false);
    assert_eq!(lines, vec!["Mk1=Comment,eyes open\\1 blink,2,1,0"]);
}
