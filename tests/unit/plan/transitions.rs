use super::*;

fn approx(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
}

#[test]
fn three_clips_with_one_second_fade() {
    let offsets = plan_transitions(&[5.0, 4.0, 6.0], 1.0);
    assert!(approx(&offsets, &[4.0, 7.0]), "{offsets:?}");
}

#[test]
fn single_clip_has_no_transitions() {
    for fade in [0.0, 0.3, 10.0] {
        assert!(plan_transitions(&[12.5], fade).is_empty());
    }
    assert!(plan_transitions(&[], 0.5).is_empty());
}

#[test]
fn offsets_are_monotonic_when_fade_fits_every_clip() {
    let cases: &[(&[f64], f64)] = &[
        (&[1.0, 1.0, 1.0, 1.0], 1.0),
        (&[2.0, 7.5, 0.5, 3.25, 9.0], 0.5),
        (&[0.3, 0.3, 0.3], 0.3),
        (&[10.0, 4.0, 6.0, 8.0, 2.0, 5.0], 0.0),
    ];
    for (durations, fade) in cases {
        let offsets = plan_transitions(durations, *fade);
        assert_eq!(offsets.len(), durations.len() - 1);
        assert!(offsets.iter().all(|o| *o >= 0.0));
        for pair in offsets.windows(2) {
            assert!(pair[0] <= pair[1], "{offsets:?}");
        }
    }
}

#[test]
fn oversized_fade_clamps_to_zero() {
    let offsets = plan_transitions(&[0.5, 0.5, 4.0], 2.0);
    assert!(approx(&offsets, &[0.0, 0.0]), "{offsets:?}");
}

#[test]
fn zero_fade_is_a_running_sum() {
    let offsets = plan_transitions(&[3.0, 2.0, 1.0], 0.0);
    assert!(approx(&offsets, &[3.0, 5.0]));
}

#[test]
fn crossfaded_length_subtracts_each_overlap() {
    assert!((crossfaded_length(&[5.0, 4.0, 6.0], 1.0) - 13.0).abs() < 1e-9);
    assert_eq!(crossfaded_length(&[5.0], 1.0), 5.0);
    assert_eq!(crossfaded_length(&[], 1.0), 0.0);
}
