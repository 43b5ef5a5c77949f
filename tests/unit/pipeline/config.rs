use super::*;

fn narration() -> Authority {
    Authority::Narration {
        audio: PathBuf::from("narration.mp3"),
    }
}

#[test]
fn builder_defaults() {
    let cfg = CompositorConfig::builder(narration(), "slides", "script.json", "out.mp4")
        .build()
        .unwrap();
    assert_eq!(cfg.transition, DEFAULT_TRANSITION_SECS);
    assert_eq!(cfg.jobs, 1);
    assert!(cfg.segment_range.is_none());
    assert!(!cfg.sync_to_authority);
    assert!(!cfg.keep_temp);
    assert_eq!(cfg.format, OutputFormat::default());
    assert_eq!(cfg.timeouts.mux_secs, 3600);
    assert_eq!(cfg.authority.path(), Path::new("narration.mp3"));
}

#[test]
fn builder_rejects_bad_options() {
    let base = || CompositorConfig::builder(narration(), "s", "j.json", "o.mp4");
    for bad in [-0.5, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            base().transition(bad).build(),
            Err(CompositorError::Configuration(_))
        ));
    }
    #[allow(clippy::reversed_empty_ranges)]
    let empty = 28..=15;
    assert!(base().segment_range(empty).build().is_err());
    assert!(base().jobs(0).build().is_err());
    assert!(base().transition(0.0).build().is_ok());
}

#[test]
fn job_file_resolves_paths_against_its_directory() {
    let json = r#"{
        "narration": "audio/ep3.mp3",
        "slides": "slides/ep3",
        "script": "/abs/ep3.json",
        "output": "out/ep3_part2.mp4",
        "segment_range": [15, 28],
        "skip_segments": [25],
        "sync": true,
        "jobs": 4
    }"#;
    let job = JobFile::from_reader(json.as_bytes())
        .unwrap()
        .relative_to(Path::new("/jobs"));
    let cfg = job.into_config().unwrap();

    assert_eq!(cfg.authority.path(), Path::new("/jobs/audio/ep3.mp3"));
    assert_eq!(cfg.asset_dir, PathBuf::from("/jobs/slides/ep3"));
    assert_eq!(cfg.script, PathBuf::from("/abs/ep3.json"));
    assert_eq!(cfg.output, PathBuf::from("/jobs/out/ep3_part2.mp4"));
    assert_eq!(cfg.segment_range, Some(15..=28));
    assert_eq!(cfg.skip_segments, vec![25]);
    assert!(cfg.sync_to_authority);
    assert_eq!(cfg.jobs, 4);
}

#[test]
fn job_file_presenter_mode() {
    let json = r#"{ "presenter": "/p/parts", "pip_position": "top-left", "pip_size": "large",
                    "slides": "/s", "script": "/j.json", "output": "/o.mp4",
                    "transition": 0 }"#;
    let cfg = JobFile::from_reader(json.as_bytes())
        .unwrap()
        .into_config()
        .unwrap();
    assert_eq!(
        cfg.authority,
        Authority::Presenter {
            video: PathBuf::from("/p/parts"),
            position: PipPosition::TopLeft,
            size: PipSize::Large,
        }
    );
    assert_eq!(cfg.transition, 0.0);
}

#[test]
fn job_file_needs_exactly_one_authority() {
    let both = r#"{ "narration": "a.mp3", "presenter": "p.mp4",
                    "slides": "s", "script": "j.json", "output": "o.mp4" }"#;
    let err = JobFile::from_reader(both.as_bytes())
        .unwrap()
        .into_config()
        .unwrap_err();
    assert!(matches!(err, CompositorError::Configuration(_)));

    let neither = r#"{ "slides": "s", "script": "j.json", "output": "o.mp4" }"#;
    assert!(
        JobFile::from_reader(neither.as_bytes())
            .unwrap()
            .into_config()
            .is_err()
    );
}

#[test]
fn job_file_rejects_unknown_keys() {
    let json = r#"{ "narration": "a.mp3", "slides": "s", "script": "j.json",
                    "output": "o.mp4", "trasition": 1.0 }"#;
    assert!(matches!(
        JobFile::from_reader(json.as_bytes()),
        Err(CompositorError::Serde(_))
    ));
}

#[test]
fn missing_job_file_is_a_configuration_error() {
    let err = JobFile::from_path("/definitely/not/job.json").unwrap_err();
    assert!(matches!(err, CompositorError::Configuration(_)));
}
