use super::*;

fn format() -> OutputFormat {
    OutputFormat::default()
}

fn position(args: &[String], flag: &str) -> usize {
    args.iter()
        .position(|a| a == flag)
        .unwrap_or_else(|| panic!("missing {flag} in {args:?}"))
}

fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
    &args[position(args, flag) + 1]
}

#[test]
fn image_clip_loops_still_for_exact_duration() {
    let req = ClipRequest {
        segment_id: 4,
        source: ClipSource::Image(PathBuf::from("/a/segment_004.png")),
        duration: 4.5,
        format: format(),
        output: PathBuf::from("/w/segment_004.mp4"),
    };
    let args = clip_args(&req, true);
    assert_eq!(&args[..4], ["-y", "-hide_banner", "-loglevel", "error"]);
    assert!(position(&args, "-loop") < position(&args, "-i"));
    assert_eq!(value_after(&args, "-i"), "/a/segment_004.png");
    assert_eq!(value_after(&args, "-t"), "4.500");
    assert_eq!(value_after(&args, "-r"), "30");
    assert_eq!(value_after(&args, "-c:v"), "libx264");
    assert!(value_after(&args, "-vf").contains("pad=1920:1080:(ow-iw)/2:(oh-ih)/2:color=0x1E1B4B"));
    assert!(args.contains(&"-an".to_string()));
    assert_eq!(args.last().unwrap(), "/w/segment_004.mp4");
}

#[test]
fn video_clip_holds_last_frame_and_drops_audio() {
    let req = ClipRequest {
        segment_id: 2,
        source: ClipSource::Video(PathBuf::from("/a/segment_002.mp4")),
        duration: 3.0,
        format: format(),
        output: PathBuf::from("/w/segment_002.mp4"),
    };
    let args = clip_args(&req, true);
    assert!(!args.contains(&"-loop".to_string()));
    assert!(value_after(&args, "-vf").ends_with("tpad=stop_mode=clone:stop_duration=3.000"));
    assert!(args.contains(&"-an".to_string()));
}

#[test]
fn placeholder_caption_is_optional() {
    let req = ClipRequest {
        segment_id: 7,
        source: ClipSource::Placeholder {
            frame: PathBuf::from("/w/placeholder_007.png"),
            caption: "Pricing - tiers".to_string(),
        },
        duration: 2.0,
        format: format(),
        output: PathBuf::from("/w/segment_007.mp4"),
    };
    let with = clip_args(&req, true);
    assert!(value_after(&with, "-vf").contains("drawtext=text='Pricing - tiers':fontsize=48"));
    let without = clip_args(&req, false);
    assert!(!value_after(&without, "-vf").contains("drawtext"));
    assert_eq!(value_after(&without, "-i"), "/w/placeholder_007.png");
}

#[test]
fn concat_list_quotes_and_escapes_paths() {
    let list = concat_list(&[
        PathBuf::from("/w/segment_001.mp4"),
        PathBuf::from("/w/it's.mp4"),
    ]);
    assert_eq!(
        list,
        "file '/w/segment_001.mp4'\nfile '/w/it'\\''s.mp4'\n"
    );
}

#[test]
fn concat_list_sits_next_to_output() {
    assert_eq!(
        concat_list_path(Path::new("/w/track.mp4")),
        PathBuf::from("/w/track_concat.txt")
    );
}

#[test]
fn concat_copy_or_reencode() {
    let copy = concat_args(Path::new("/w/l.txt"), Path::new("/w/o.mp4"), true);
    assert_eq!(value_after(&copy, "-f"), "concat");
    assert_eq!(value_after(&copy, "-safe"), "0");
    assert_eq!(value_after(&copy, "-c"), "copy");

    let encode = concat_args(Path::new("/w/l.txt"), Path::new("/w/o.mp4"), false);
    assert!(!encode.contains(&"copy".to_string()));
    assert_eq!(value_after(&encode, "-c:v"), "libx264");
}

#[test]
fn crossfade_graph_chains_every_pair() {
    assert_eq!(
        crossfade_graph(&[4.0, 7.0], 1.0),
        "[0:v][1:v]xfade=transition=fade:duration=1.000:offset=4.000[x1];\
         [x1][2:v]xfade=transition=fade:duration=1.000:offset=7.000[vout]"
    );
    assert_eq!(
        crossfade_graph(&[2.7], 0.3),
        "[0:v][1:v]xfade=transition=fade:duration=0.300:offset=2.700[vout]"
    );
}

#[test]
fn crossfade_args_list_every_input() {
    let clips: Vec<ClipSpan> = (1..=3)
        .map(|i| ClipSpan {
            path: PathBuf::from(format!("/w/segment_{i:03}.mp4")),
            duration: 5.0,
        })
        .collect();
    let args = crossfade_args(&clips, &[4.0, 8.0], 1.0, Path::new("/w/track.mp4"));
    assert_eq!(args.iter().filter(|a| *a == "-i").count(), 3);
    assert_eq!(value_after(&args, "-map"), "[vout]");
}

#[test]
fn extend_pads_with_cloned_frames() {
    let args = pad_or_trim_args(
        Path::new("/w/in.mp4"),
        Reconciliation::Extend { by: 5.2 },
        63.2,
        Path::new("/w/out.mp4"),
    );
    assert_eq!(value_after(&args, "-vf"), "tpad=stop_mode=clone:stop_duration=5.200");
    assert_eq!(value_after(&args, "-t"), "63.200");
}

#[test]
fn trim_cuts_tail_without_reencoding() {
    let args = pad_or_trim_args(
        Path::new("/w/in.mp4"),
        Reconciliation::Trim { by: 6.8 },
        63.2,
        Path::new("/w/out.mp4"),
    );
    assert_eq!(value_after(&args, "-t"), "63.200");
    assert_eq!(value_after(&args, "-c"), "copy");
    assert!(!args.contains(&"-vf".to_string()));
}

#[test]
fn narration_mux_takes_audio_from_narration_only() {
    let args = mux_args(&MuxRequest {
        visual: PathBuf::from("/w/visual.mp4"),
        authority: PathBuf::from("/in/narration.mp3"),
        layout: MuxLayout::Narration,
        duration: 63.2,
        format: format(),
        output: PathBuf::from("/w/final.mp4"),
    });
    let maps: Vec<&String> = args
        .iter()
        .enumerate()
        .filter(|(i, _)| *i > 0 && args[i - 1] == "-map")
        .map(|(_, a)| a)
        .collect();
    assert_eq!(maps, ["0:v:0", "1:a:0"]);
    assert_eq!(value_after(&args, "-c:a"), "aac");
    assert_eq!(value_after(&args, "-b:a"), "192k");
    assert!(args.contains(&"-shortest".to_string()));
    assert_eq!(value_after(&args, "-t"), "63.200");
}

#[test]
fn presenter_mux_overlays_pip_on_visual_area() {
    let pip = Rect {
        x: 1516,
        y: 844,
        width: 384,
        height: 216,
    };
    let args = mux_args(&MuxRequest {
        visual: PathBuf::from("/w/visual.mp4"),
        authority: PathBuf::from("/in/presenter.mp4"),
        layout: MuxLayout::Presenter {
            pip,
            visual_height: 864,
        },
        duration: 90.0,
        format: format(),
        output: PathBuf::from("/w/final.mp4"),
    });
    assert_eq!(value_after(&args, "-f"), "lavfi");
    assert_eq!(value_after(&args, "-i"), "color=c=0x1E1B4B:s=1920x1080:r=30");
    let graph = value_after(&args, "-filter_complex");
    assert!(graph.contains("scale=1920:864:force_original_aspect_ratio=decrease"));
    assert!(graph.contains("overlay=0:0:shortest=0"));
    assert!(graph.contains(
        "[2:v]scale=384:216:force_original_aspect_ratio=decrease,pad=384:216:(ow-iw)/2:(oh-ih)/2"
    ));
    assert!(graph.contains("overlay=1516:844"));
    assert!(args.contains(&"2:a:0".to_string()));
}

#[test]
fn presenter_keeps_its_aspect_inside_the_pip_box() {
    let pip = Rect {
        x: 20,
        y: 20,
        width: 480,
        height: 270,
    };
    let graph = presenter_graph(&format(), pip, 864);
    let branch = graph
        .split(';')
        .find(|part| part.starts_with("[2:v]"))
        .unwrap();
    assert_eq!(
        branch,
        "[2:v]scale=480:270:force_original_aspect_ratio=decrease,\
         pad=480:270:(ow-iw)/2:(oh-ih)/2:color=0x1E1B4B,setsar=1,format=yuv420p[pip]"
    );
}

#[test]
fn probe_output_is_parsed() {
    let d = parse_probe_duration(br#"{"format":{"duration":"63.200000"}}"#).unwrap();
    assert!((d - 63.2).abs() < 1e-9);
    assert!(parse_probe_duration(br#"{"format":{}}"#).is_err());
    assert!(parse_probe_duration(br#"{"format":{"duration":"N/A"}}"#).is_err());
    assert!(parse_probe_duration(b"not json").is_err());
}

#[test]
fn probe_args_request_json_duration() {
    let args = probe_args(Path::new("/in/a.mp3"));
    assert_eq!(value_after(&args, "-show_entries"), "format=duration");
    assert_eq!(value_after(&args, "-of"), "json");
}

#[test]
fn explicit_missing_binary_is_a_configuration_error() {
    let err = FfmpegEngine::locate_with(Some(PathBuf::from("/definitely/not/ffmpeg")), None)
        .unwrap_err();
    assert!(matches!(err, CompositorError::Configuration(_)));
}
