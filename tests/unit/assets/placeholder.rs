use super::*;

#[test]
fn caption_prefers_label_and_falls_back_to_id() {
    let s = Segment::new(9, 0.0, 1.0).unwrap();
    assert_eq!(placeholder_caption(&s), "Segment 9");
    let s = s.with_label("  Pricing tiers  ");
    assert_eq!(placeholder_caption(&s), "Pricing tiers");
    let blank = Segment::new(3, 0.0, 1.0).unwrap().with_label("   ");
    assert_eq!(placeholder_caption(&blank), "Segment 3");
}

#[test]
fn caption_is_clipped_to_forty_chars() {
    let long = "x".repeat(120);
    assert_eq!(sanitize_caption(&long).chars().count(), PLACEHOLDER_LABEL_CHARS);
    let wide = "é".repeat(60);
    assert_eq!(sanitize_caption(&wide).chars().count(), PLACEHOLDER_LABEL_CHARS);
}

#[test]
fn caption_strips_filter_metacharacters() {
    assert_eq!(
        sanitize_caption(r"Devon's tip: 100% \ done"),
        "Devons tip - 100  done"
    );
    assert_eq!(sanitize_caption("a\nb"), "a b");
}

#[test]
fn placeholder_frame_is_written_as_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("placeholder_001.png");
    write_placeholder_frame(
        &path,
        Canvas {
            width: 32,
            height: 18,
        },
        Rgb8([0x1E, 0x1B, 0x4B]),
    )
    .unwrap();

    let img = image::open(&path).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (32, 18));
    assert_eq!(img.get_pixel(5, 5).0, [0x1E, 0x1B, 0x4B]);
}

#[test]
fn empty_frame_size_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = write_placeholder_frame(
        &dir.path().join("p.png"),
        Canvas {
            width: 0,
            height: 10,
        },
        Rgb8([0, 0, 0]),
    )
    .unwrap_err();
    assert!(matches!(err, CompositorError::Resolution(_)));
}
