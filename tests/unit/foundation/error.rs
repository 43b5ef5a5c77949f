use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CompositorError::configuration("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        CompositorError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        CompositorError::transition("x")
            .to_string()
            .contains("transition error:")
    );
    assert!(
        CompositorError::reconciliation("x")
            .to_string()
            .contains("reconciliation error:")
    );
    assert_eq!(
        CompositorError::segment_render(7, "boom").to_string(),
        "segment 7 render error: boom"
    );
}

#[test]
fn recoverable_classes_match_taxonomy() {
    assert!(CompositorError::resolution("x").is_recoverable());
    assert!(CompositorError::transition("x").is_recoverable());
    assert!(CompositorError::segment_render(1, "x").is_recoverable());

    assert!(!CompositorError::configuration("x").is_recoverable());
    assert!(!CompositorError::reconciliation("x").is_recoverable());
    assert!(!CompositorError::mux("x").is_recoverable());
    assert!(!CompositorError::Cancelled.is_recoverable());
}

#[test]
fn timeout_names_operation() {
    let err = CompositorError::Timeout {
        operation: "mux".to_string(),
        secs: 5,
    };
    assert_eq!(err.to_string(), "engine timeout: mux exceeded 5s");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CompositorError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
