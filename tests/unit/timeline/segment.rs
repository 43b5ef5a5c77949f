use super::*;

fn seg(id: u32, start: f64, end: f64) -> Segment {
    Segment::new(id, start, end).unwrap()
}

fn episode(n: u32, each: f64) -> Timeline {
    let segments = (1..=n)
        .map(|id| seg(id, f64::from(id - 1) * each, f64::from(id) * each))
        .collect();
    Timeline::new("episode", segments).unwrap()
}

#[test]
fn segment_rejects_inverted_and_empty_spans() {
    assert!(Segment::new(1, 5.0, 5.0).is_err());
    assert!(Segment::new(1, 5.0, 4.0).is_err());
    assert!(Segment::new(1, -1.0, 4.0).is_err());
    assert!(Segment::new(1, 0.0, f64::NAN).is_err());
    assert_eq!(seg(1, 1.5, 4.0).duration(), 2.5);
}

#[test]
fn timeline_sorts_by_start_and_rejects_duplicates() {
    let tl = Timeline::new("t", vec![seg(2, 4.0, 6.0), seg(1, 0.0, 4.0)]).unwrap();
    let ids: Vec<u32> = tl.segments().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let dup = Timeline::new("t", vec![seg(1, 0.0, 1.0), seg(1, 1.0, 2.0)]);
    assert!(matches!(dup, Err(CompositorError::Validation(_))));
}

#[test]
fn total_duration_is_latest_end() {
    let tl = Timeline::new("t", vec![seg(1, 0.0, 9.0), seg(2, 3.0, 5.0)]).unwrap();
    assert_eq!(tl.total_duration(), 9.0);
    assert_eq!(Timeline::new("t", vec![]).unwrap().total_duration(), 0.0);
}

#[test]
fn rescale_preserves_order_and_ratios() {
    let tl = Timeline::new(
        "t",
        vec![seg(1, 0.0, 2.5), seg(2, 2.5, 7.0), seg(3, 8.0, 9.0)],
    )
    .unwrap();
    for scale in [0.25, 0.9, 1.0, 1.37, 4.0] {
        let scaled = tl.rescaled(scale).unwrap();
        assert_eq!(scaled.len(), tl.len());
        for (a, b) in tl.segments().iter().zip(scaled.segments()) {
            assert_eq!(a.id, b.id);
            let ratio = b.duration() / a.duration();
            assert!((ratio - scale).abs() < 1e-9, "ratio {ratio} != {scale}");
        }
        for pair in scaled.segments().windows(2) {
            assert!(pair[0].start_time <= pair[1].start_time);
        }
    }
}

#[test]
fn rescale_does_not_touch_the_original() {
    let tl = episode(3, 2.0);
    let before = tl.clone();
    let _ = tl.rescaled(3.0).unwrap();
    assert_eq!(tl, before);
}

#[test]
fn rescale_rejects_non_positive_scale() {
    let tl = episode(2, 1.0);
    assert!(matches!(
        tl.rescaled(0.0),
        Err(CompositorError::Reconciliation(_))
    ));
    assert!(tl.rescaled(-2.0).is_err());
    assert!(tl.rescaled(f64::INFINITY).is_err());
}

#[test]
fn range_filter_then_rebase_starts_at_zero() {
    let tl = episode(28, 4.0);
    let part = tl.filter_range(15..=28);
    assert_eq!(part.len(), 14);
    assert_eq!(part.segments()[0].id, 15);
    assert_eq!(part.segments()[0].start_time, 56.0);

    let rebased = part.rebased();
    assert_eq!(rebased.segments()[0].start_time, 0.0);
    let last = rebased.segments().last().unwrap();
    assert_eq!(last.end_time, rebased.total_duration());
    assert_eq!(rebased.total_duration(), 56.0);
}

#[test]
fn without_drops_listed_ids() {
    let tl = episode(5, 1.0).without(&[2, 5]);
    let ids: Vec<u32> = tl.segments().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 3, 4]);
}

#[test]
fn rebase_of_empty_timeline_is_empty() {
    let tl = Timeline::new("t", vec![]).unwrap();
    assert!(tl.rebased().is_empty());
}
